//! HTTP client for end-to-end tests
//!
//! Wraps reqwest with one method per chordmatch endpoint.
//! When API routes or request formats change, update only this file.

use super::constants::*;
use reqwest::Response;
use std::time::Duration;

pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    pub base_url: String,
}

#[allow(dead_code)]
impl TestClient {
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self { client, base_url }
    }

    async fn get(&self, path: &str, query: &[(&str, String)]) -> Response {
        self.client
            .get(format!("{}{}", self.base_url, path))
            .query(query)
            .send()
            .await
            .expect("Request failed")
    }

    /// GET / - the whole corpus ordered by id
    pub async fn list_corpus(&self) -> Response {
        self.get("/", &[]).await
    }

    /// GET /sim-by-song?songid={id}
    pub async fn sim_by_song(&self, song_id: i64) -> Response {
        self.get("/sim-by-song", &[("songid", song_id.to_string())])
            .await
    }

    /// GET /sim-by-song?songid={id}&limit={limit}
    pub async fn sim_by_song_limited(&self, song_id: i64, limit: usize) -> Response {
        self.get(
            "/sim-by-song",
            &[("songid", song_id.to_string()), ("limit", limit.to_string())],
        )
        .await
    }

    /// GET /sim-by-prog?chords={chords}
    pub async fn sim_by_prog(&self, chords: &str) -> Response {
        self.get("/sim-by-prog", &[("chords", chords.to_string())])
            .await
    }

    /// GET /sim-by-prog?chords={chords}&key={key}
    pub async fn sim_by_prog_in_key(&self, chords: &str, key: &str) -> Response {
        self.get(
            "/sim-by-prog",
            &[("chords", chords.to_string()), ("key", key.to_string())],
        )
        .await
    }

    /// GET /stats
    pub async fn stats(&self) -> Response {
        self.get("/stats", &[]).await
    }

    /// POST /reload
    pub async fn reload(&self) -> Response {
        self.client
            .post(format!("{}/reload", self.base_url))
            .send()
            .await
            .expect("Reload request failed")
    }
}
