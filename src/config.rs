//! Ambient configuration, loaded from the environment (+ an optional
//! `.env` file, via the teacher's `dotenv` dependency) rather than a config
//! file — how the servers are actually wired up stays a deployment concern
//! outside this crate's scope.

use std::net::SocketAddr;
use std::path::PathBuf;

use crate::error::ExplorerError;

#[derive(Clone, Debug)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub data_dir: PathBuf,
    pub master_min_rating: u16,
    pub max_plies: usize,
    pub cache_ttl_secs: u64,
    pub cache_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bind_addr: ([0, 0, 0, 0], 9000).into(),
            data_dir: PathBuf::from("./data"),
            master_min_rating: 2200,
            max_plies: 50,
            cache_ttl_secs: 3600,
            cache_capacity: 4096,
        }
    }
}

impl Config {
    /// Loads overrides from environment variables, falling back to
    /// [`Config::default`] for anything unset or unparseable.
    pub fn from_env() -> Result<Config, ExplorerError> {
        dotenv::dotenv().ok();
        let mut config = Config::default();

        if let Ok(addr) = std::env::var("EXPLORER_BIND_ADDR") {
            config.bind_addr = addr
                .parse()
                .map_err(|_| ExplorerError::Validation(format!("invalid EXPLORER_BIND_ADDR: {addr}")))?;
        }
        if let Ok(dir) = std::env::var("EXPLORER_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(v) = parse_env("EXPLORER_MASTER_MIN_RATING")? {
            config.master_min_rating = v;
        }
        if let Some(v) = parse_env("EXPLORER_MAX_PLIES")? {
            config.max_plies = v;
        }
        if let Some(v) = parse_env("EXPLORER_CACHE_TTL_SECS")? {
            config.cache_ttl_secs = v;
        }
        if let Some(v) = parse_env("EXPLORER_CACHE_CAPACITY")? {
            config.cache_capacity = v;
        }
        Ok(config)
    }

    pub fn variant_store_path(&self, variant: &str) -> PathBuf {
        self.data_dir.join(format!("{variant}.lichess.kct"))
    }

    pub fn master_store_path(&self) -> PathBuf {
        self.data_dir.join("master.kct")
    }

    pub fn pgn_store_path(&self) -> PathBuf {
        self.data_dir.join("master.pgn.kct")
    }

    pub fn game_info_store_path(&self) -> PathBuf {
        self.data_dir.join("lichess.gameinfo.kct")
    }
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Result<Option<T>, ExplorerError> {
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| ExplorerError::Validation(format!("invalid {name}: {raw}"))),
        Err(_) => Ok(None),
    }
}
