//! Chordmatch Server Library
//!
//! Transposition-aware similarity search over a corpus of chord progressions.

pub mod assembler;
pub mod config;
pub mod corpus;
pub mod index;
pub mod music;
pub mod normalizer;
pub mod registry;
pub mod server;
pub mod similarity;

// Re-export commonly used types for convenience
pub use corpus::{CorpusSource, InMemoryCorpusSource, SqliteCorpusSource};
pub use server::{run_server, RequestsLoggingLevel};
pub use similarity::{CorpusContext, SimilarityEngine, SimilaritySettings};
