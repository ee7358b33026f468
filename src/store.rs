//! `PositionStore`: an ordered KV store of position-hash -> packed record,
//! with atomic read-modify-write per key (spec §4.5).
//!
//! The backing engine is RocksDB opened in transactional mode. Design note
//! §9 asks for "a function taking a closure `(old_bytes) -> new_bytes_or_remove`
//! executed by the storage layer under its own lock" with "no user-visible
//! mutexes appear above that boundary" — that is precisely
//! `Transaction::get_for_update` + `put`/`delete` + `commit`: the row lock is
//! held by RocksDB for the lifetime of the transaction, and callers never see
//! a `Mutex`.

use std::path::Path;
use std::sync::Arc;

use rocksdb::{Transaction, TransactionDB, TransactionDBOptions};

use crate::codec::MoveToken;
use crate::entry::Entry;
use crate::error::{DecodeResult, ExplorerError};
use crate::gameref::GameRef;
use crate::master_entry::MasterEntry;
use crate::variant::PositionKey;

/// A packed per-position record: the common contract `Entry` and
/// `MasterEntry` both satisfy, so `PositionStore` is generic over either
/// (design note §9: model the shared codec as a trait with default-free
/// per-packer pack/unpack, not inheritance).
pub trait PackedRecord: Sized + Default {
    fn encode(&self) -> Vec<u8>;
    fn decode(buf: &[u8]) -> DecodeResult<Self>;
    fn total_games(&self) -> u64;
    fn insert_ref(&mut self, game: GameRef, mv: MoveToken);
    fn remove_ref(&mut self, game: &GameRef, mv: MoveToken);
}

impl PackedRecord for Entry {
    fn encode(&self) -> Vec<u8> {
        Entry::encode(self)
    }
    fn decode(buf: &[u8]) -> DecodeResult<Self> {
        Entry::decode(buf)
    }
    fn total_games(&self) -> u64 {
        Entry::total_games(self)
    }
    fn insert_ref(&mut self, game: GameRef, mv: MoveToken) {
        Entry::insert_ref(self, game, mv)
    }
    fn remove_ref(&mut self, game: &GameRef, mv: MoveToken) {
        Entry::remove_ref(self, game, mv)
    }
}

impl PackedRecord for MasterEntry {
    fn encode(&self) -> Vec<u8> {
        MasterEntry::encode(self)
    }
    fn decode(buf: &[u8]) -> DecodeResult<Self> {
        MasterEntry::decode(buf)
    }
    fn total_games(&self) -> u64 {
        MasterEntry::total_games(self)
    }
    fn insert_ref(&mut self, game: GameRef, mv: MoveToken) {
        MasterEntry::insert(self, game, mv)
    }
    fn remove_ref(&mut self, game: &GameRef, mv: MoveToken) {
        MasterEntry::remove(self, game, mv)
    }
}

pub struct PositionStore<T: PackedRecord> {
    db: Arc<TransactionDB>,
    _marker: std::marker::PhantomData<T>,
}

impl<T: PackedRecord> PositionStore<T> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ExplorerError> {
        let mut opts = rocksdb::Options::default();
        opts.create_if_missing(true);
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        let txn_opts = TransactionDBOptions::default();
        let db = TransactionDB::open(&opts, &txn_opts, path)
            .map_err(|e| ExplorerError::StoreIo(e.to_string()))?;
        Ok(PositionStore {
            db: Arc::new(db),
            _marker: std::marker::PhantomData,
        })
    }

    pub fn get(&self, key: PositionKey) -> Result<Option<T>, ExplorerError> {
        match self
            .db
            .get(key.as_bytes())
            .map_err(|e| ExplorerError::StoreIo(e.to_string()))?
        {
            Some(bytes) => Ok(Some(T::decode(&bytes).map_err(|e| {
                ExplorerError::from_decode(e, key.to_hex())
            })?)),
            None => Ok(None),
        }
    }

    pub fn exists(&self, key: PositionKey) -> Result<bool, ExplorerError> {
        Ok(self
            .db
            .get_pinned(key.as_bytes())
            .map_err(|e| ExplorerError::StoreIo(e.to_string()))?
            .is_some())
    }

    /// Approximate key count, via RocksDB's own live-estimate property. Exact
    /// to the last flush/compaction boundary, which is sufficient for the
    /// ambient `/stats` counters (spec §6 "Per-store tuning... affect
    /// performance only, not semantics" — the same applies to this count).
    pub fn record_count(&self) -> Result<u64, ExplorerError> {
        Ok(self
            .db
            .property_int_value("rocksdb.estimate-num-keys")
            .map_err(|e| ExplorerError::StoreIo(e.to_string()))?
            .unwrap_or(0))
    }

    /// Atomic read-modify-write: read the current record (absent treated as
    /// `T::default()`), run `f`, write the result back (or delete the key if
    /// `f` returns `None`). The whole operation is linearizable per key.
    fn read_modify_write(
        &self,
        key: PositionKey,
        f: impl FnOnce(T) -> Option<T>,
    ) -> Result<(), ExplorerError> {
        let txn = self.db.transaction();
        let current = read_for_update(&txn, key)?;
        match f(current) {
            Some(next) => txn
                .put(key.as_bytes(), next.encode())
                .map_err(|e| ExplorerError::StoreIo(e.to_string()))?,
            None => txn
                .delete(key.as_bytes())
                .map_err(|e| ExplorerError::StoreIo(e.to_string()))?,
        }
        txn.commit().map_err(|e| ExplorerError::StoreIo(e.to_string()))
    }

    pub fn merge(&self, key: PositionKey, game: GameRef, mv: MoveToken) -> Result<(), ExplorerError> {
        self.read_modify_write(key, move |mut record| {
            record.insert_ref(game, mv);
            Some(record)
        })
    }

    /// Inverse of [`PositionStore::merge`]. If the resulting record has no
    /// games left, the key is removed rather than written empty (spec §4.5).
    pub fn subtract(&self, key: PositionKey, game: GameRef, mv: MoveToken) -> Result<(), ExplorerError> {
        self.read_modify_write(key, move |mut record| {
            record.remove_ref(&game, mv);
            if record.total_games() == 0 {
                None
            } else {
                Some(record)
            }
        })
    }

    pub fn flush(&self) -> Result<(), ExplorerError> {
        self.db.flush().map_err(|e| ExplorerError::StoreIo(e.to_string()))
    }
}

fn read_for_update<T: PackedRecord>(
    txn: &Transaction<'_, TransactionDB>,
    key: PositionKey,
) -> Result<T, ExplorerError> {
    match txn
        .get_for_update(key.as_bytes(), true)
        .map_err(|e| ExplorerError::StoreIo(e.to_string()))?
    {
        Some(bytes) => T::decode(&bytes).map_err(|e| ExplorerError::from_decode(e, key.to_hex())),
        None => Ok(T::default()),
    }
}
