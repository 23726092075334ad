//! Shared constants for end-to-end tests
//!
//! When the fixture corpus changes, update only this file.

// ============================================================================
// Fixture Corpus Song IDs
// ============================================================================

/// "C G Am F" in C major
pub const SONG_C_ID: i64 = 1;

/// Same progression in D major
pub const SONG_D_ID: i64 = 2;

/// Same progression in E major, most played
pub const SONG_E_ID: i64 = 3;

/// "C G Am", the C progression missing its last chord
pub const SONG_SHORT_ID: i64 = 4;

/// Minor-key song with an unrelated progression
pub const SONG_MINOR_ID: i64 = 5;

/// Song whose chord sheet has no recognizable chord
pub const SONG_NO_CHORDS_ID: i64 = 6;

/// Same progression in A major
pub const SONG_A_ID: i64 = 7;

/// Row with a key outside the key space, skipped on load
pub const SONG_BAD_KEY_ID: i64 = 8;

/// Id absent from the corpus
pub const MISSING_SONG_ID: i64 = 999999;

/// First link stored for SONG_C_ID
pub const SONG_C_LINK_URL: &str = "https://video.example/four-chords";

/// Songs served after loading the fixture corpus
pub const FIXTURE_SONG_COUNT: usize = 7;

// ============================================================================
// Timeouts
// ============================================================================

/// Max time to wait for the test server to accept requests
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

/// Delay between readiness polls
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 10;

/// Timeout applied to every test request
pub const REQUEST_TIMEOUT_SECS: u64 = 10;
