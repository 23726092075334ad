//! End-to-end tests for the similarity endpoints
//!
//! Tests ranking, key handling, error mapping and corpus reload over HTTP.

mod common;

use common::*;
use reqwest::StatusCode;
use serde_json::Value;

fn dataset_ids(body: &Value) -> Vec<i64> {
    body["dataset"]
        .as_array()
        .expect("dataset should be an array")
        .iter()
        .map(|row| row["id"].as_i64().unwrap())
        .collect()
}

fn row_for(body: &Value, id: i64) -> Value {
    body["dataset"]
        .as_array()
        .unwrap()
        .iter()
        .find(|row| row["id"].as_i64() == Some(id))
        .cloned()
        .unwrap_or_else(|| panic!("song {} missing from dataset", id))
}

// =============================================================================
// Corpus Listing
// =============================================================================

#[tokio::test]
async fn test_list_corpus_orders_by_id_and_skips_unknown_keys() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.list_corpus().await;
    assert_eq!(response.status(), StatusCode::OK);

    let songs: Vec<Value> = response.json().await.unwrap();
    assert_eq!(songs.len(), FIXTURE_SONG_COUNT);
    let ids: Vec<i64> = songs.iter().map(|s| s["id"].as_i64().unwrap()).collect();
    assert_eq!(ids, vec![1, 2, 3, 4, 5, 6, 7]);
    assert!(!ids.contains(&SONG_BAD_KEY_ID));
    assert_eq!(songs[4]["key"], "Cm");
    assert_eq!(songs[0]["chords"], serde_json::json!(["C", "G", "Am", "F"]));
    assert_eq!(songs[5]["chords"], serde_json::json!(["x2", "riff"]));
}

// =============================================================================
// Similar By Song
// =============================================================================

#[tokio::test]
async fn test_sim_by_song_ranks_transposed_copies_first() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.sim_by_song(SONG_C_ID).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["query_song_id"], SONG_C_ID);
    assert_eq!(body["dropped"], 0);

    let ids = dataset_ids(&body);
    assert_eq!(&ids[..4], &[SONG_E_ID, SONG_D_ID, SONG_A_ID, SONG_SHORT_ID]);
    assert!(!ids.contains(&SONG_C_ID));
    assert!(!ids.contains(&SONG_NO_CHORDS_ID));

    let first = &body["dataset"][0];
    assert_eq!(first["score"], 1.0);
    assert_eq!(first["title"], "Four Chords Live");
    assert_eq!(first["matched_key"], "E");
    assert_eq!(first["transposition"], 4);

    let shorter = row_for(&body, SONG_SHORT_ID);
    assert_eq!(shorter["score"], 0.75);
}

#[tokio::test]
async fn test_sim_by_song_returns_query_song_links() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let body: Value = client.sim_by_song(SONG_C_ID).await.json().await.unwrap();
    let links = body["links"].as_array().unwrap();
    assert_eq!(links.len(), 2);
    assert_eq!(links[0]["url"], SONG_C_LINK_URL);
    assert_eq!(links[0]["label"], "Studio");
    assert!(links[1]["label"].is_null());

    let body: Value = client.sim_by_song(SONG_D_ID).await.json().await.unwrap();
    assert!(body["links"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_sim_by_song_without_chords_has_no_matches() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.sim_by_song(SONG_NO_CHORDS_ID).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert!(dataset_ids(&body).is_empty());
    assert_eq!(body["warnings"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_sim_by_song_carries_capo_as_metadata() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let body: Value = client.sim_by_song(SONG_C_ID).await.json().await.unwrap();
    let d = row_for(&body, SONG_D_ID);
    assert_eq!(d["capo"], 2);
    assert_eq!(d["score"], 1.0);
    assert_eq!(d["transposition"], 2);
}

#[tokio::test]
async fn test_sim_by_song_scores_are_non_increasing() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let body: Value = client.sim_by_song(SONG_MINOR_ID).await.json().await.unwrap();
    let scores: Vec<f64> = body["dataset"]
        .as_array()
        .unwrap()
        .iter()
        .map(|row| row["score"].as_f64().unwrap())
        .collect();
    assert!(!scores.is_empty());
    for pair in scores.windows(2) {
        assert!(pair[0] >= pair[1], "{:?}", scores);
    }
}

#[tokio::test]
async fn test_sim_by_song_honors_limit() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let body: Value = client
        .sim_by_song_limited(SONG_C_ID, 2)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(dataset_ids(&body), vec![SONG_E_ID, SONG_D_ID]);
}

#[tokio::test]
async fn test_sim_by_song_unknown_id_is_not_found() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.sim_by_song(MISSING_SONG_ID).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn test_sim_by_song_rejects_bad_parameters() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client
        .client
        .get(format!("{}/sim-by-song?songid=twelve", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "bad_request");

    let response = client
        .client
        .get(format!("{}/sim-by-song", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// =============================================================================
// Similar By Chords
// =============================================================================

#[tokio::test]
async fn test_sim_by_prog_detects_key() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.sim_by_prog("D A Bm G").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["comp_key"], "D");
    assert_eq!(
        &dataset_ids(&body)[..4],
        &[SONG_E_ID, SONG_C_ID, SONG_D_ID, SONG_A_ID]
    );
    assert_eq!(row_for(&body, SONG_C_ID)["transposition"], 10);
}

#[tokio::test]
async fn test_sim_by_prog_reports_malformed_tokens() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let body: Value = client
        .sim_by_prog("C | G | ??? | Am F")
        .await
        .json()
        .await
        .unwrap();
    let warnings = body["warnings"].as_array().unwrap();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0]["position"], 2);
    assert_eq!(warnings[0]["token"], "???");
    assert_eq!(body["dataset"][0]["score"], 1.0);
}

#[tokio::test]
async fn test_sim_by_prog_key_hint() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let body: Value = client
        .sim_by_prog_in_key("C G Am F", "C")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(body["comp_key"], "C");

    let response = client.sim_by_prog_in_key("C G Am F", "H").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "unknown_key");
}

#[tokio::test]
async fn test_sim_by_prog_without_chords_is_rejected() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.sim_by_prog("").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "unparsable_input");

    let response = client
        .client
        .get(format!("{}/sim-by-prog", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "bad_request");
}

// =============================================================================
// Stats And Reload
// =============================================================================

#[tokio::test]
async fn test_stats() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.stats().await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["songs"], FIXTURE_SONG_COUNT);
    assert_eq!(body["indexed"], FIXTURE_SONG_COUNT);
    assert_eq!(body["reference_key"], "C");
    assert_eq!(body["key_classes"], 12);
    assert_eq!(body["settings"]["default_limit"], 20);
}

#[tokio::test]
async fn test_reload_picks_up_new_songs() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    add_song(&server.db_path, 9, "G", "G D Em C").unwrap();

    // Not visible until reloaded
    let songs: Vec<Value> = client.list_corpus().await.json().await.unwrap();
    assert_eq!(songs.len(), FIXTURE_SONG_COUNT);

    let response = client.reload().await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["songs"], FIXTURE_SONG_COUNT + 1);

    let songs: Vec<Value> = client.list_corpus().await.json().await.unwrap();
    assert_eq!(songs.len(), FIXTURE_SONG_COUNT + 1);

    let body: Value = client.sim_by_song(SONG_C_ID).await.json().await.unwrap();
    assert_eq!(
        &dataset_ids(&body)[..5],
        &[SONG_E_ID, SONG_D_ID, SONG_A_ID, 9, SONG_SHORT_ID]
    );
}

#[tokio::test]
async fn test_failed_reload_keeps_serving() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    std::fs::remove_file(&server.db_path).unwrap();

    let response = client.reload().await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let response = client.sim_by_song(SONG_C_ID).await;
    assert_eq!(response.status(), StatusCode::OK);
    let songs: Vec<Value> = client.list_corpus().await.json().await.unwrap();
    assert_eq!(songs.len(), FIXTURE_SONG_COUNT);
}
