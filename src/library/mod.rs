//! The user's library: reading corpora and finding playlists.

pub mod corpus;
pub mod lookup;

pub use corpus::{
    Corpus, CorpusReport, CorpusRequest, CorpusScope, Source, SourceFailure, build_corpus,
};
pub use lookup::{PlaylistLookup, Resolution, looks_like_id};
