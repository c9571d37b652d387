//! Default names for playlists the tool writes.

use chrono::NaiveDate;

pub fn cleaned(name: &str) -> String {
    format!("Cleaned: {name}")
}

pub fn backup(name: &str) -> String {
    format!("Dupes removed from: {name}")
}

pub fn merged<'a>(names: impl IntoIterator<Item = &'a str>) -> String {
    names.into_iter().collect::<Vec<_>>().join(" + ")
}

pub fn removed(count: usize, name: &str) -> String {
    format!("{count} removed: {name}")
}

pub fn artist_others(artist: &str) -> String {
    format!("{artist} - others")
}

/// `name` with a date suffix, for keeping several snapshots apart.
pub fn dated(name: &str, date: NaiveDate) -> String {
    format!("{name} ({})", date.format("%Y-%m-%d"))
}

/// File name for a plain-text export of `name`. Path separators and other
/// characters file systems reject become `_`.
pub fn export_file(name: &str) -> String {
    let stem: String = name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    if stem.is_empty() {
        "playlist.txt".to_string()
    } else {
        format!("{stem}.txt")
    }
}
