//! Song corpus: the read-only table every query runs against.

mod load;
mod song;
mod source;
mod sqlite_source;

pub use load::load_corpus;
pub use song::{Corpus, CorpusBuildResult, Problem as LoadCorpusProblem, Song, SongId, SongLink, SongRecord};
pub use source::{CorpusSource, InMemoryCorpusSource};
pub use sqlite_source::{SqliteCorpusSource, CORPUS_SCHEMA};
