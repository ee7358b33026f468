use std::sync::Arc;

use opening_explorer::api::{self, AppState};
use opening_explorer::auxstore::{GameInfoStore, PgnStore};
use opening_explorer::config::Config;
use opening_explorer::entry::Entry;
use opening_explorer::master_entry::MasterEntry;
use opening_explorer::store::PositionStore;
use opening_explorer::variant::Variant;
use rustc_hash::FxHashMap;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = Config::from_env()?;
    std::fs::create_dir_all(&config.data_dir)?;

    let master_store: PositionStore<MasterEntry> = PositionStore::open(config.master_store_path())?;
    let pgn_store = PgnStore::open(config.pgn_store_path())?;
    let game_info_store = GameInfoStore::open(config.game_info_store_path())?;

    let mut lichess_stores = FxHashMap::default();
    for variant in Variant::ALL {
        let store: PositionStore<Entry> = PositionStore::open(config.variant_store_path(variant.as_str()))?;
        lichess_stores.insert(variant, Arc::new(store));
    }

    let state = AppState {
        master_store: Arc::new(master_store),
        pgn_store: Arc::new(pgn_store),
        lichess_stores: Arc::new(lichess_stores),
        game_info_store: Arc::new(game_info_store),
        cache: Arc::new(api::cache_from_config(&config)),
        config: Arc::new(config.clone()),
    };

    let app = api::router(state);
    let listener = TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "opening explorer listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("shutdown signal received"),
        Err(err) => tracing::error!(%err, "failed to install ctrl-c handler"),
    }
}
