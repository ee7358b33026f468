//! String-keyed auxiliary stores: game metadata (`GameInfoStore`) and raw PGN
//! text (`PgnStore`), both with LZMA-class compressed values per spec §6.
//! Grounded on `teacher's` embedded-DB wiring in `store.rs`; reuses the
//! workspace's own `zstd` dependency (the teacher already depends on it) in
//! place of LZMA, since this crate has no other use for an LZMA crate and
//! the spec only requires "compressed", not a specific codec (see
//! DESIGN.md).

use std::path::Path;

use rocksdb::{TransactionDB, TransactionDBOptions};

use crate::error::ExplorerError;
use crate::gameref::GameId;

const ZSTD_LEVEL: i32 = 9;

fn compress(data: &[u8]) -> Result<Vec<u8>, ExplorerError> {
    zstd::stream::encode_all(data, ZSTD_LEVEL).map_err(|e| ExplorerError::StoreIo(e.to_string()))
}

fn decompress(data: &[u8]) -> Result<Vec<u8>, ExplorerError> {
    zstd::stream::decode_all(data).map_err(|e| ExplorerError::StoreIo(e.to_string()))
}

struct CompressedStringStore {
    db: TransactionDB,
}

impl CompressedStringStore {
    fn open(path: impl AsRef<Path>) -> Result<Self, ExplorerError> {
        let mut opts = rocksdb::Options::default();
        opts.create_if_missing(true);
        let txn_opts = TransactionDBOptions::default();
        let db = TransactionDB::open(&opts, &txn_opts, path)
            .map_err(|e| ExplorerError::StoreIo(e.to_string()))?;
        Ok(CompressedStringStore { db })
    }

    fn get(&self, key: &str) -> Result<Option<String>, ExplorerError> {
        match self
            .db
            .get(key.as_bytes())
            .map_err(|e| ExplorerError::StoreIo(e.to_string()))?
        {
            Some(bytes) => {
                let plain = decompress(&bytes)?;
                String::from_utf8(plain)
                    .map(Some)
                    .map_err(|_| ExplorerError::malformed(key, "not valid utf-8"))
            }
            None => Ok(None),
        }
    }

    fn contains(&self, key: &str) -> Result<bool, ExplorerError> {
        Ok(self
            .db
            .get_pinned(key.as_bytes())
            .map_err(|e| ExplorerError::StoreIo(e.to_string()))?
            .is_some())
    }

    /// Stores `value` under `key` only if `key` is absent. Returns whether
    /// this call won the race (the "first write wins" guarantee the
    /// importer's deduplication relies on, spec §4.7).
    fn store_if_absent(&self, key: &str, value: &str) -> Result<bool, ExplorerError> {
        let txn = self.db.transaction();
        let existing = txn
            .get_for_update(key.as_bytes(), true)
            .map_err(|e| ExplorerError::StoreIo(e.to_string()))?;
        if existing.is_some() {
            return Ok(false);
        }
        let packed = compress(value.as_bytes())?;
        txn.put(key.as_bytes(), packed)
            .map_err(|e| ExplorerError::StoreIo(e.to_string()))?;
        txn.commit().map_err(|e| ExplorerError::StoreIo(e.to_string()))?;
        Ok(true)
    }

    fn record_count(&self) -> Result<u64, ExplorerError> {
        Ok(self
            .db
            .property_int_value("rocksdb.estimate-num-keys")
            .map_err(|e| ExplorerError::StoreIo(e.to_string()))?
            .unwrap_or(0))
    }

    fn delete(&self, key: &str) -> Result<(), ExplorerError> {
        self.db
            .delete(key.as_bytes())
            .map_err(|e| ExplorerError::StoreIo(e.to_string()))
    }
}

/// Raw PGN text for a previously imported game, keyed by `gameId`. Used by
/// the master pipeline (spec §6 `/master/pgn/{id}`).
pub struct PgnStore {
    inner: CompressedStringStore,
}

impl PgnStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ExplorerError> {
        Ok(PgnStore {
            inner: CompressedStringStore::open(path)?,
        })
    }

    pub fn get(&self, id: GameId) -> Result<Option<String>, ExplorerError> {
        self.inner.get(&id.to_str_id())
    }

    pub fn contains(&self, id: GameId) -> Result<bool, ExplorerError> {
        self.inner.contains(&id.to_str_id())
    }

    /// Stores PGN text for `id`; used only after the master importer has
    /// already checked `contains` is false as part of its reject logic, so
    /// callers do not depend on the return value the way `GameInfoStore`
    /// ingest does.
    pub fn store(&self, id: GameId, pgn: &str) -> Result<bool, ExplorerError> {
        self.inner.store_if_absent(&id.to_str_id(), pgn)
    }

    pub fn record_count(&self) -> Result<u64, ExplorerError> {
        self.inner.record_count()
    }

    /// Removes a game's PGN text, the last step of the master delete
    /// pipeline (spec §6 `DELETE /master/{id}`).
    pub fn delete(&self, id: GameId) -> Result<(), ExplorerError> {
        self.inner.delete(&id.to_str_id())
    }
}

/// Compact per-game metadata for the Lichess pipeline, keyed by `gameId`
/// (spec §6): `"{whiteName}|{whiteRating}|{blackName}|{blackRating}|{year|?}"`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GameInfo {
    pub white_name: String,
    pub white_rating: u16,
    pub black_name: String,
    pub black_rating: u16,
    pub year: Option<u16>,
}

impl GameInfo {
    pub fn to_line(&self) -> String {
        format!(
            "{}|{}|{}|{}|{}",
            self.white_name,
            self.white_rating,
            self.black_name,
            self.black_rating,
            self.year.map(|y| y.to_string()).unwrap_or_else(|| "?".to_string()),
        )
    }

    pub fn from_line(line: &str) -> Option<GameInfo> {
        let mut parts = line.splitn(5, '|');
        let white_name = parts.next()?.to_string();
        let white_rating = parts.next()?.parse().ok()?;
        let black_name = parts.next()?.to_string();
        let black_rating = parts.next()?.parse().ok()?;
        let year_field = parts.next()?;
        let year = if year_field == "?" {
            None
        } else {
            Some(year_field.parse().ok()?)
        };
        Some(GameInfo {
            white_name,
            white_rating,
            black_name,
            black_rating,
            year,
        })
    }
}

pub struct GameInfoStore {
    inner: CompressedStringStore,
}

impl GameInfoStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ExplorerError> {
        Ok(GameInfoStore {
            inner: CompressedStringStore::open(path)?,
        })
    }

    pub fn get(&self, id: GameId) -> Result<Option<GameInfo>, ExplorerError> {
        match self.inner.get(&id.to_str_id())? {
            Some(line) => Ok(Some(
                GameInfo::from_line(&line).ok_or_else(|| ExplorerError::malformed(id.to_str_id(), "bad GameInfo line"))?,
            )),
            None => Ok(None),
        }
    }

    pub fn contains(&self, id: GameId) -> Result<bool, ExplorerError> {
        self.inner.contains(&id.to_str_id())
    }

    /// First-write-wins insert, used by the Lichess importer's dedup check
    /// (spec §4.7, §5 "Cancellation"): the caller gates its `positionStore`
    /// merges on this returning `true`, so a losing concurrent import never
    /// indexes the game it lost the race for.
    pub fn store(&self, id: GameId, info: &GameInfo) -> Result<bool, ExplorerError> {
        self.inner.store_if_absent(&id.to_str_id(), &info.to_line())
    }

    pub fn record_count(&self) -> Result<u64, ExplorerError> {
        self.inner.record_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn game_info_line_roundtrips() {
        let info = GameInfo {
            white_name: "Carlsen".into(),
            white_rating: 2830,
            black_name: "Nepomniachtchi".into(),
            black_rating: 2790,
            year: Some(2021),
        };
        let line = info.to_line();
        assert_eq!(GameInfo::from_line(&line), Some(info));
    }

    #[test]
    fn game_info_missing_year_roundtrips() {
        let info = GameInfo {
            white_name: "A".into(),
            white_rating: 1500,
            black_name: "B".into(),
            black_rating: 1500,
            year: None,
        };
        assert_eq!(GameInfo::from_line(&info.to_line()), Some(info));
    }

    #[test]
    fn game_info_store_first_write_wins() {
        let dir = tempfile::tempdir().unwrap();
        let store = GameInfoStore::open(dir.path()).unwrap();
        let id = GameId::from_str_id("g0000001").unwrap();
        let info = GameInfo {
            white_name: "A".into(),
            white_rating: 1500,
            black_name: "B".into(),
            black_rating: 1500,
            year: None,
        };
        assert!(store.store(id, &info).unwrap());
        assert!(!store.store(id, &info).unwrap());
    }

    #[test]
    fn pgn_store_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let store = PgnStore::open(dir.path()).unwrap();
        let id = GameId::from_str_id("g0000001").unwrap();
        store.store(id, "[Event \"Test\"]\n1. e4 e5 *").unwrap();
        assert_eq!(
            store.get(id).unwrap().as_deref(),
            Some("[Event \"Test\"]\n1. e4 e5 *")
        );
    }
}
