//! Opening explorer API integration tests using the `Router::oneshot` pattern.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use opening_explorer::api::{self, AppState};
use opening_explorer::auxstore::{GameInfoStore, PgnStore};
use opening_explorer::entry::Entry;
use opening_explorer::master_entry::MasterEntry;
use opening_explorer::store::PositionStore;
use opening_explorer::variant::Variant;
use rustc_hash::FxHashMap;
use serde_json::Value;
use tower::ServiceExt;

const SAMPLE_MASTER_PGN: &str = "[Event \"Test\"]\n[Site \"https://lichess.org/abcdefgh\"]\n[White \"Carlsen\"]\n[Black \"Caruana\"]\n[Result \"1-0\"]\n[WhiteElo \"2850\"]\n[BlackElo \"2820\"]\n[TimeControl \"1800+0\"]\n\n1. e4 e5 2. Nf3 Nc6 1-0\n";

fn test_state(dir: &tempfile::TempDir) -> AppState {
    let config = opening_explorer::config::Config {
        data_dir: dir.path().to_path_buf(),
        ..Default::default()
    };

    let master_store: PositionStore<MasterEntry> = PositionStore::open(config.master_store_path()).unwrap();
    let pgn_store = PgnStore::open(config.pgn_store_path()).unwrap();
    let game_info_store = GameInfoStore::open(config.game_info_store_path()).unwrap();

    let mut lichess_stores = FxHashMap::default();
    for variant in Variant::ALL {
        let store: PositionStore<Entry> = PositionStore::open(config.variant_store_path(variant.as_str())).unwrap();
        lichess_stores.insert(variant, Arc::new(store));
    }

    AppState {
        master_store: Arc::new(master_store),
        pgn_store: Arc::new(pgn_store),
        lichess_stores: Arc::new(lichess_stores),
        game_info_store: Arc::new(game_info_store),
        cache: Arc::new(api::cache_from_config(&config)),
        config: Arc::new(config),
    }
}

fn test_router() -> (Router, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(&dir);
    (api::router(state), dir)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn put_master_then_get_master_returns_the_indexed_move() {
    let (app, _dir) = test_router();

    let put_response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/master")
                .body(Body::from(SAMPLE_MASTER_PGN))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(put_response.status(), StatusCode::OK);
    let put_body = body_json(put_response).await;
    assert_eq!(put_body["pliesIndexed"].as_u64(), Some(4));

    let starting_fen = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";
    let get_response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(format!("/master?fen={}", urlencoding_space(starting_fen)))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(get_response.status(), StatusCode::OK);
    let body = body_json(get_response).await;
    assert_eq!(body["white"].as_u64(), Some(1));
    let moves = body["moves"].as_array().unwrap();
    assert!(moves.iter().any(|m| m["uci"] == "e2e4"));
}

#[tokio::test]
async fn duplicate_master_import_is_rejected() {
    let (app, _dir) = test_router();

    let first = app
        .clone()
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/master")
                .body(Body::from(SAMPLE_MASTER_PGN))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let second = app
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/master")
                .body(Body::from(SAMPLE_MASTER_PGN))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn stats_endpoint_reflects_imported_game() {
    let (app, _dir) = test_router();

    app.clone()
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/master")
                .body(Body::from(SAMPLE_MASTER_PGN))
                .unwrap(),
        )
        .await
        .unwrap();

    let stats_response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/stats")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(stats_response.status(), StatusCode::OK);
    let body = body_json(stats_response).await;
    assert_eq!(body["masterGames"].as_u64(), Some(1));
}

#[tokio::test]
async fn master_pgn_lookup_returns_stored_text() {
    let (app, _dir) = test_router();

    let put_response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/master")
                .body(Body::from(SAMPLE_MASTER_PGN))
                .unwrap(),
        )
        .await
        .unwrap();
    let put_body = body_json(put_response).await;
    let game_id = put_body["gameId"].as_str().unwrap().to_string();

    let pgn_response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(format!("/master/pgn/{game_id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(pgn_response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(pgn_response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(bytes, SAMPLE_MASTER_PGN.as_bytes());
}

fn urlencoding_space(fen: &str) -> String {
    fen.replace(' ', "%20")
}
