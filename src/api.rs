//! HTTP surface (spec §6). Thin: parses query params into a [`QueryFilter`],
//! calls into `query`/`importer`, and shapes the JSON response. Kept in one
//! file the way the teacher keeps its whole REST surface in `api.rs`.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::{delete, get};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use crate::auxstore::{GameInfoStore, PgnStore};
use crate::cache::{should_cache, ResponseCache};
use crate::config::Config;
use crate::entry::Entry;
use crate::error::ExplorerError;
use crate::gameref::{GameId, GameRef, Winner};
use crate::importer::{delete_master_game, ImportOutcome, LichessImporter, MasterImporter};
use crate::master_entry::MasterEntry;
use crate::position::Situation;
use crate::query::{explore, query_entry, query_master, ExplorerResponse, QueryFilter};
use crate::rating::RatingBand;
use crate::speed::SpeedBucket;
use crate::store::PositionStore;
use crate::variant::Variant;

#[derive(Clone)]
pub struct AppState {
    pub master_store: Arc<PositionStore<MasterEntry>>,
    pub pgn_store: Arc<PgnStore>,
    pub lichess_stores: Arc<rustc_hash::FxHashMap<Variant, Arc<PositionStore<Entry>>>>,
    pub game_info_store: Arc<GameInfoStore>,
    pub cache: Arc<ResponseCache>,
    pub config: Arc<Config>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/master", get(get_master).put(put_master))
        .route("/master/pgn/{id}", get(get_master_pgn))
        .route("/master/{id}", delete(delete_master))
        .route("/lichess", get(get_lichess).put(put_lichess))
        .route("/stats", get(get_stats))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[derive(Deserialize, Default)]
pub struct ExploreParams {
    pub variant: Option<String>,
    pub fen: Option<String>,
    pub ratings: Option<String>,
    pub speeds: Option<String>,
    pub moves: Option<usize>,
    #[serde(rename = "topGames")]
    pub top_games: Option<usize>,
    #[serde(rename = "recentGames")]
    pub recent_games: Option<usize>,
}

impl ExploreParams {
    fn variant(&self) -> Result<Variant, ExplorerError> {
        match &self.variant {
            Some(v) => Variant::from_str_opt(v).ok_or_else(|| ExplorerError::Validation(format!("unknown variant {v}"))),
            None => Ok(Variant::Standard),
        }
    }

    fn fen(&self) -> Result<&str, ExplorerError> {
        self.fen
            .as_deref()
            .ok_or_else(|| ExplorerError::Validation("missing fen parameter".into()))
    }

    fn filter(&self) -> Result<QueryFilter, ExplorerError> {
        let mut filter = QueryFilter::default();
        if let Some(moves) = self.moves {
            filter.max_moves = moves;
        }
        if let Some(top_games) = self.top_games {
            filter.top_games = top_games;
        }
        if let Some(recent_games) = self.recent_games {
            filter.recent_games = recent_games;
        }
        if let Some(ratings) = &self.ratings {
            for part in ratings.split(',').filter(|s| !s.is_empty()) {
                let min: u16 = part
                    .parse()
                    .map_err(|_| ExplorerError::Validation(format!("invalid rating {part}")))?;
                let band = RatingBand::from_min(min)
                    .ok_or_else(|| ExplorerError::Validation(format!("not a rating band boundary: {min}")))?;
                filter.bands.push(band);
            }
        }
        if let Some(speeds) = &self.speeds {
            for part in speeds.split(',').filter(|s| !s.is_empty()) {
                let speed = SpeedBucket::from_str_opt(part)
                    .ok_or_else(|| ExplorerError::Validation(format!("unknown speed {part}")))?;
                filter.speeds.push(speed);
            }
        }
        Ok(filter)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MoveJson {
    uci: String,
    san: String,
    white: u64,
    draws: u64,
    black: u64,
    average_rating: Option<u32>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GameJson {
    id: String,
    winner: &'static str,
    speed: &'static str,
    rating: u16,
}

impl From<GameRef> for GameJson {
    fn from(g: GameRef) -> Self {
        GameJson {
            id: g.id.to_str_id(),
            winner: match g.winner {
                Winner::White => "white",
                Winner::Black => "black",
                Winner::Draw => "draw",
            },
            speed: g.speed.as_str(),
            rating: g.average_rating,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExploreJson {
    white: u64,
    draws: u64,
    black: u64,
    average_rating: Option<u32>,
    moves: Vec<MoveJson>,
    top_games: Vec<GameJson>,
    recent_games: Vec<GameJson>,
}

impl From<ExplorerResponse> for ExploreJson {
    fn from(r: ExplorerResponse) -> Self {
        ExploreJson {
            white: r.white,
            draws: r.draws,
            black: r.black,
            average_rating: r.average_rating,
            moves: r
                .moves
                .into_iter()
                .map(|m| MoveJson {
                    uci: m.uci,
                    san: m.san,
                    white: m.stats.white,
                    draws: m.stats.draws,
                    black: m.stats.black,
                    average_rating: m.stats.average_rating(),
                })
                .collect(),
            top_games: r.top_games.into_iter().map(GameJson::from).collect(),
            recent_games: r.recent_games.into_iter().map(GameJson::from).collect(),
        }
    }
}

async fn get_master(
    State(state): State<AppState>,
    Query(params): Query<ExploreParams>,
) -> Result<Json<ExploreJson>, ExplorerError> {
    let fen = params.fen()?;
    let filter = params.filter()?;
    let cache_key = format!("master|{fen}|{}|{}|{}", filter.max_moves, filter.top_games, filter.recent_games);

    if let Some(cached) = state.cache.get(&cache_key) {
        let body: ExploreJson =
            serde_json::from_str(&cached).map_err(|e| ExplorerError::StoreIo(e.to_string()))?;
        return Ok(Json(body));
    }

    let situation = Situation::from_fen(Variant::Standard, fen)?;
    let response = explore(&state.master_store, &situation, &filter, query_master)?;
    let json = ExploreJson::from(response);

    if should_cache(fen, 40) {
        if let Ok(serialized) = serde_json::to_string(&json) {
            state.cache.put(cache_key, serialized);
        }
    }
    Ok(Json(json))
}

async fn get_lichess(
    State(state): State<AppState>,
    Query(params): Query<ExploreParams>,
) -> Result<Json<ExploreJson>, ExplorerError> {
    let variant = params.variant()?;
    let fen = params.fen()?;
    let filter = params.filter()?;
    let store = state
        .lichess_stores
        .get(&variant)
        .ok_or_else(|| ExplorerError::Validation(format!("no store open for variant {variant}")))?;

    let situation = Situation::from_fen(variant, fen)?;
    let response = explore(store, &situation, &filter, query_entry)?;
    Ok(Json(ExploreJson::from(response)))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ImportResponse {
    game_id: String,
    plies_indexed: usize,
}

impl From<ImportOutcome> for ImportResponse {
    fn from(o: ImportOutcome) -> Self {
        ImportResponse {
            game_id: o.game_id.to_str_id(),
            plies_indexed: o.plies_indexed,
        }
    }
}

async fn put_master(
    State(state): State<AppState>,
    pgn_text: String,
) -> Result<Json<ImportResponse>, ExplorerError> {
    let importer = MasterImporter {
        store: &state.master_store,
        pgn_store: &state.pgn_store,
        min_rating: state.config.master_min_rating,
        max_plies: state.config.max_plies,
    };
    let outcome = importer.import_one(&pgn_text)?;
    Ok(Json(ImportResponse::from(outcome)))
}

#[derive(Deserialize)]
pub struct PutLichessParams {
    pub variant: Option<String>,
}

async fn put_lichess(
    State(state): State<AppState>,
    Query(params): Query<PutLichessParams>,
    pgn_text: String,
) -> Result<Json<ImportResponse>, ExplorerError> {
    let variant = match &params.variant {
        Some(v) => Variant::from_str_opt(v).ok_or_else(|| ExplorerError::Validation(format!("unknown variant {v}")))?,
        None => Variant::Standard,
    };
    let store = state
        .lichess_stores
        .get(&variant)
        .ok_or_else(|| ExplorerError::Validation(format!("no store open for variant {variant}")))?;

    let importer = LichessImporter {
        store,
        game_info_store: &state.game_info_store,
        max_plies: state.config.max_plies,
    };
    let outcome = importer.import_one(&pgn_text)?;
    Ok(Json(ImportResponse::from(outcome)))
}

async fn get_master_pgn(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ExplorerError> {
    let game_id = GameId::from_str_id(&id).ok_or_else(|| ExplorerError::Validation(format!("not a game id: {id}")))?;
    let pgn = state.pgn_store.get(game_id)?.ok_or(ExplorerError::NotFound)?;
    Ok(([(axum::http::header::CONTENT_TYPE, "application/x-chess-pgn")], pgn))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DeleteResponse {
    plies_removed: usize,
}

async fn delete_master(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, ExplorerError> {
    let game_id = GameId::from_str_id(&id).ok_or_else(|| ExplorerError::Validation(format!("not a game id: {id}")))?;
    let plies_removed = delete_master_game(&state.master_store, &state.pgn_store, game_id, state.config.max_plies)?;
    Ok(Json(DeleteResponse { plies_removed }))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatsResponse {
    master_positions: u64,
    master_games: u64,
    lichess_positions: u64,
    cache_entries: usize,
}

async fn get_stats(State(state): State<AppState>) -> Result<Json<StatsResponse>, ExplorerError> {
    let master_positions = state.master_store.record_count()?;
    let master_games = state.pgn_store.record_count()?;
    let mut lichess_positions = 0;
    for store in state.lichess_stores.values() {
        lichess_positions += store.record_count()?;
    }
    Ok(Json(StatsResponse {
        master_positions,
        master_games,
        lichess_positions,
        cache_entries: state.cache.len(),
    }))
}

pub fn cache_from_config(config: &Config) -> ResponseCache {
    ResponseCache::new(Duration::from_secs(config.cache_ttl_secs), config.cache_capacity)
}
