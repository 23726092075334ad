use crate::music::{ChordToken, Key, UnknownKey};
use crate::normalizer::parse_progression;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;

pub type SongId = i64;

/// A corpus row as handed over by a corpus source, before validation.
#[derive(Debug, Clone, PartialEq)]
pub struct SongRecord {
    pub id: SongId,
    pub title: String,
    pub artist: String,
    pub key: String,
    pub capo: i32,
    pub chords: String,
    pub hits: i64,
    pub votes: i64,
    pub rating: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Song {
    pub id: SongId,
    pub title: String,
    pub artist: String,
    pub key: Key,
    pub capo: i32,
    pub chords: Vec<ChordToken>,
    pub hits: i64,
    pub votes: i64,
    pub rating: f64,
}

/// Non-fatal issues found while building a corpus.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Problem {
    #[error("song {id} skipped: {source}")]
    UnknownKey { id: SongId, source: UnknownKey },

    #[error("song {0} appears more than once, keeping the first occurrence")]
    DuplicateId(SongId),

    #[error("song {0} has no recognizable chords and will never match")]
    NoRecognizedChords(SongId),

    #[error("song {id} has {count} malformed chord token(s)")]
    MalformedTokens { id: SongId, count: usize },
}

struct ParsedRecord {
    song: Option<Song>,
    problems: Vec<Problem>,
}

fn parse_record(record: SongRecord) -> ParsedRecord {
    let key: Key = match record.key.parse() {
        Ok(key) => key,
        Err(err) => {
            return ParsedRecord {
                song: None,
                problems: vec![Problem::UnknownKey {
                    id: record.id,
                    source: err,
                }],
            }
        }
    };

    let chords = parse_progression(&record.chords);
    let mut problems = vec![];
    let malformed = chords.iter().filter(|c| !c.is_recognized()).count();
    if malformed == chords.len() {
        problems.push(Problem::NoRecognizedChords(record.id));
    } else if malformed > 0 {
        problems.push(Problem::MalformedTokens {
            id: record.id,
            count: malformed,
        });
    }

    ParsedRecord {
        song: Some(Song {
            id: record.id,
            title: record.title,
            artist: record.artist,
            key,
            capo: record.capo,
            chords,
            hits: record.hits,
            votes: record.votes,
            rating: record.rating,
        }),
        problems,
    }
}

/// An external reference for a song, such as a recording or a tab page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SongLink {
    #[serde(skip)]
    pub song_id: SongId,
    pub label: Option<String>,
    pub url: String,
}

pub struct CorpusBuildResult {
    pub corpus: Corpus,
    pub problems: Vec<Problem>,
}

#[derive(Debug, Default)]
pub struct Corpus {
    songs: HashMap<SongId, Song>,
    links: HashMap<SongId, Vec<SongLink>>,
}

impl Corpus {
    /// Validates raw records. Rows with a key outside the key space are
    /// skipped; on duplicate ids the first row wins.
    pub fn build(records: Vec<SongRecord>) -> CorpusBuildResult {
        let parsed: Vec<ParsedRecord> = records.into_par_iter().map(parse_record).collect();

        let mut songs = HashMap::with_capacity(parsed.len());
        let mut problems = vec![];
        for record in parsed {
            problems.extend(record.problems);
            if let Some(song) = record.song {
                if songs.contains_key(&song.id) {
                    problems.push(Problem::DuplicateId(song.id));
                    continue;
                }
                songs.insert(song.id, song);
            }
        }

        CorpusBuildResult {
            corpus: Corpus {
                songs,
                links: HashMap::new(),
            },
            problems,
        }
    }

    /// Attaches links to their songs, keeping source order per song.
    /// Returns how many links pointed at songs not in the corpus.
    pub fn attach_links(&mut self, links: Vec<SongLink>) -> usize {
        let mut orphans = 0;
        for link in links {
            if self.songs.contains_key(&link.song_id) {
                self.links.entry(link.song_id).or_default().push(link);
            } else {
                orphans += 1;
            }
        }
        orphans
    }

    pub fn links(&self, id: SongId) -> &[SongLink] {
        self.links.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn get(&self, id: SongId) -> Option<&Song> {
        self.songs.get(&id)
    }

    pub fn len(&self) -> usize {
        self.songs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.songs.is_empty()
    }

    pub fn par_iter_songs(&self) -> impl ParallelIterator<Item = &Song> {
        self.songs.par_iter().map(|(_, song)| song)
    }

    /// All songs ordered by id.
    pub fn songs_by_id(&self) -> Vec<&Song> {
        let mut songs: Vec<&Song> = self.songs.values().collect();
        songs.sort_by_key(|s| s.id);
        songs
    }
}
