//! Test fixture creation for the corpus database

use super::constants::*;
use anyhow::Result;
use chordmatch_server::corpus::CORPUS_SCHEMA;
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// (id, title, artist, tonality, capo, chords, hits)
const FIXTURE_SONGS: &[(i64, &str, &str, &str, i32, &str, i64)] = &[
    (SONG_C_ID, "Four Chords", "The Test Band", "C", 0, "C G Am F", 10),
    (SONG_D_ID, "Four Chords Up", "The Test Band", "D", 2, "D A Bm G", 5),
    (SONG_E_ID, "Four Chords Live", "Cover Band", "E", 0, "E B C#m A", 50),
    (SONG_SHORT_ID, "Three Chords", "Cover Band", "C", 0, "C G Am", 1),
    (SONG_MINOR_ID, "Minor Blues", "Jazz Ensemble", "Cm", 3, "Cm Fm G7 Cm Ab Db", 1000),
    (SONG_NO_CHORDS_ID, "Drum Solo", "Jazz Ensemble", "G", 0, "x2 riff", 3),
    (SONG_A_ID, "Four Chords Again", "The Test Band", "A", 0, "A E F#m D", 5),
    (SONG_BAD_KEY_ID, "Broken", "Nobody", "H", 0, "C G", 7),
];

/// (song_id, label, url)
const FIXTURE_LINKS: &[(i64, Option<&str>, &str)] = &[
    (SONG_C_ID, Some("Studio"), SONG_C_LINK_URL),
    (SONG_C_ID, None, "https://tabs.example/four-chords"),
    (MISSING_SONG_ID, None, "https://tabs.example/gone"),
];

/// Creates a temporary corpus database with the fixture songs.
/// Returns (temp_dir, db_path)
pub fn create_test_corpus() -> Result<(TempDir, PathBuf)> {
    let dir = TempDir::new()?;
    let db_path = dir.path().join("corpus.db");

    let conn = Connection::open(&db_path)?;
    conn.execute_batch(CORPUS_SCHEMA)?;
    for (id, title, artist, tonality, capo, chords, hits) in FIXTURE_SONGS {
        insert_song(&conn, *id, title, artist, tonality, *capo, chords, *hits)?;
    }
    for (song_id, label, url) in FIXTURE_LINKS {
        conn.execute(
            "INSERT INTO links (song_id, label, url) VALUES (?1, ?2, ?3)",
            params![song_id, label, url],
        )?;
    }

    Ok((dir, db_path))
}

/// Adds a song to an existing corpus database, e.g. before a reload.
pub fn add_song(db_path: &Path, id: i64, tonality: &str, chords: &str) -> Result<()> {
    let conn = Connection::open(db_path)?;
    insert_song(&conn, id, "Added Later", "New Band", tonality, 0, chords, 0)
}

#[allow(clippy::too_many_arguments)]
fn insert_song(
    conn: &Connection,
    id: i64,
    title: &str,
    artist: &str,
    tonality: &str,
    capo: i32,
    chords: &str,
    hits: i64,
) -> Result<()> {
    conn.execute(
        "INSERT INTO chords (id, song, artist, tonality, capo, chords) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![id, title, artist, tonality, capo, chords],
    )?;
    conn.execute(
        "INSERT INTO hits (id, num_hits, votes, rating) VALUES (?1, ?2, 0, NULL)",
        params![id, hits],
    )?;
    Ok(())
}
