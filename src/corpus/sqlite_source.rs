use super::{CorpusSource, SongLink, SongRecord};
use anyhow::{Context, Result};
use rusqlite::{Connection, OpenFlags, OptionalExtension};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Tables read by [`SqliteCorpusSource`]. `states` and `links` are optional.
pub const CORPUS_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS chords (
    id INTEGER PRIMARY KEY,
    song TEXT NOT NULL,
    artist TEXT NOT NULL,
    tonality TEXT NOT NULL,
    capo INTEGER,
    chords TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS hits (
    id INTEGER PRIMARY KEY REFERENCES chords(id),
    num_hits INTEGER NOT NULL DEFAULT 0,
    votes INTEGER NOT NULL DEFAULT 0,
    rating REAL
);
CREATE TABLE IF NOT EXISTS states (
    groups TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS links (
    song_id INTEGER NOT NULL REFERENCES chords(id),
    label TEXT,
    url TEXT NOT NULL
);
"#;

const SONGS_QUERY: &str = r#"SELECT chords.id, chords.song, chords.artist, chords.tonality,
       chords.capo, chords.chords, hits.num_hits, hits.votes, hits.rating
  FROM chords INNER JOIN hits ON chords.id = hits.id
 ORDER BY chords.id"#;

const LINKS_QUERY: &str = "SELECT song_id, label, url FROM links ORDER BY song_id, rowid";

/// Reads the corpus from a SQLite database, opened read-only on every load.
pub struct SqliteCorpusSource {
    db_path: PathBuf,
}

impl SqliteCorpusSource {
    pub fn new<P: AsRef<Path>>(db_path: P) -> SqliteCorpusSource {
        SqliteCorpusSource {
            db_path: db_path.as_ref().to_path_buf(),
        }
    }

    fn open(&self) -> Result<Connection> {
        Connection::open_with_flags(
            &self.db_path,
            OpenFlags::SQLITE_OPEN_READ_ONLY
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .with_context(|| format!("Failed to open corpus database {:?}", self.db_path))
    }

    fn has_table(conn: &Connection, name: &str) -> Result<bool> {
        let found: Option<String> = conn
            .query_row(
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1",
                [name],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<SongRecord> {
        Ok(SongRecord {
            id: row.get(0)?,
            title: row.get(1)?,
            artist: row.get(2)?,
            key: row.get(3)?,
            capo: row.get::<_, Option<i32>>(4)?.unwrap_or(0),
            chords: row.get(5)?,
            hits: row.get(6)?,
            votes: row.get(7)?,
            rating: row.get::<_, Option<f64>>(8)?.unwrap_or(0.0),
        })
    }
}

impl CorpusSource for SqliteCorpusSource {
    fn load_records(&self) -> Result<Vec<SongRecord>> {
        let conn = self.open()?;
        let mut stmt = conn
            .prepare(SONGS_QUERY)
            .context("Failed to prepare corpus query")?;
        let records = stmt
            .query_map([], Self::row_to_record)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to read corpus rows")?;
        debug!("Read {} rows from {:?}", records.len(), self.db_path);
        Ok(records)
    }

    fn load_key_groups(&self) -> Result<Option<String>> {
        let conn = self.open()?;
        if !Self::has_table(&conn, "states")? {
            return Ok(None);
        }

        let groups: Option<String> = conn
            .query_row("SELECT groups FROM states LIMIT 1", [], |row| row.get(0))
            .optional()
            .context("Failed to read key groups")?;
        Ok(groups.filter(|g| !g.trim().is_empty()))
    }

    fn load_links(&self) -> Result<Vec<SongLink>> {
        let conn = self.open()?;
        if !Self::has_table(&conn, "links")? {
            return Ok(vec![]);
        }

        let mut stmt = conn
            .prepare(LINKS_QUERY)
            .context("Failed to prepare links query")?;
        let links = stmt
            .query_map([], |row| {
                Ok(SongLink {
                    song_id: row.get(0)?,
                    label: row.get(1)?,
                    url: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to read song links")?;
        Ok(links)
    }

    fn describe(&self) -> String {
        format!("SQLite corpus at {:?}", self.db_path)
    }
}
