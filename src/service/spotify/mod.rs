//! Spotify Web API integration
//!
//! Provides playlist listings, library checks, playback control and
//! playlist writes against the Spotify Web API.
//!
//! API docs: https://developer.spotify.com/documentation/web-api

pub mod dto;
mod adapter;
mod client;

pub use client::SpotifyClient;
