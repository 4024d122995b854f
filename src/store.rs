//! RocksDB-backed ledger store.
//!
//! All persisted records are serde_json values under typed string
//! keys; secondary indexes are key-only rows whose sort order encodes
//! the query (inverted big-endian timestamps/sequence numbers give
//! newest-first prefix scans).
//!
//! Writes go through a `UnitOfWork`: puts are staged into a single
//! RocksDB `WriteBatch` and committed once, so every settlement is
//! all-or-nothing. A crash or error before commit leaves no residual
//! state.

use crate::errors::{CasinoError, CasinoResult};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rocksdb::{Direction, IteratorMode, Options, WriteBatch, DB};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Key builders for the persisted layout. Kept in one place so the
/// layout is auditable at a glance.
pub mod keys {
    use super::*;

    pub const HOUSE_AGGREGATES: &[u8] = b"house:aggregates";
    pub const PRICE_SAMPLE_PREFIX: &[u8] = b"price:sample:";

    pub fn user_id(id: Uuid) -> Vec<u8> {
        format!("user:id:{id}").into_bytes()
    }

    pub fn user_addr(wallet_address: &str) -> Vec<u8> {
        format!("user:addr:{wallet_address}").into_bytes()
    }

    pub fn user_name(username: &str) -> Vec<u8> {
        format!("user:name:{username}").into_bytes()
    }

    pub fn wallet(user_id: Uuid) -> Vec<u8> {
        format!("wallet:{user_id}").into_bytes()
    }

    pub fn ledger_prefix(user_id: Uuid) -> Vec<u8> {
        format!("ledger:{user_id}:").into_bytes()
    }

    /// Ledger entries sort newest-first: the per-user sequence number
    /// is stored inverted, big-endian.
    pub fn ledger_entry(user_id: Uuid, seq: u64) -> Vec<u8> {
        let mut key = ledger_prefix(user_id);
        key.extend_from_slice(&(u64::MAX - seq).to_be_bytes());
        key
    }

    pub fn roulette_game(game_id: Uuid) -> Vec<u8> {
        format!("roulette:game:{game_id}").into_bytes()
    }

    pub fn roulette_user_prefix(user_id: Uuid) -> Vec<u8> {
        format!("roulette:user:{user_id}:").into_bytes()
    }

    pub fn poker_game(game_id: Uuid) -> Vec<u8> {
        format!("poker:game:{game_id}").into_bytes()
    }

    pub fn poker_user_prefix(user_id: Uuid) -> Vec<u8> {
        format!("poker:user:{user_id}:").into_bytes()
    }

    /// Per-user game index row. Key layout:
    /// `prefix | inv_created_millis(be) | game_id` — newest first,
    /// the uuid suffix disambiguates same-millisecond games.
    pub fn user_game_index(prefix: Vec<u8>, created_at: DateTime<Utc>, game_id: Uuid) -> Vec<u8> {
        let mut key = prefix;
        let millis = created_at.timestamp_millis().max(0) as u64;
        key.extend_from_slice(&(u64::MAX - millis).to_be_bytes());
        key.extend_from_slice(game_id.as_bytes());
        key
    }

    pub fn stats(user_id: Uuid) -> Vec<u8> {
        format!("stats:{user_id}").into_bytes()
    }

    pub fn price_sample(ts: DateTime<Utc>) -> Vec<u8> {
        let mut key = PRICE_SAMPLE_PREFIX.to_vec();
        let millis = ts.timestamp_millis().max(0) as u64;
        key.extend_from_slice(&(u64::MAX - millis).to_be_bytes());
        key
    }
}

/// Shared handle to the store. Cheap to clone; all clones share the
/// database and the wallet lock map.
#[derive(Clone)]
pub struct LedgerStore {
    db: Arc<DB>,
    wallet_locks: Arc<DashMap<Uuid, Arc<Mutex<()>>>>,
    house_lock: Arc<Mutex<()>>,
}

impl LedgerStore {
    pub fn open<P: AsRef<Path>>(path: P) -> CasinoResult<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.set_write_buffer_size(128 * 1024 * 1024);
        opts.set_max_write_buffer_number(4);
        opts.set_target_file_size_base(128 * 1024 * 1024);
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);

        let db = DB::open(&opts, path)?;
        Ok(Self {
            db: Arc::new(db),
            wallet_locks: Arc::new(DashMap::new()),
            house_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn get_raw(&self, key: &[u8]) -> CasinoResult<Option<Vec<u8>>> {
        Ok(self.db.get(key)?)
    }

    pub fn get_json<T: DeserializeOwned>(&self, key: &[u8]) -> CasinoResult<Option<T>> {
        match self.db.get(key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Scan all rows under `prefix` in key order, skipping `offset`
    /// rows and returning at most `limit`.
    pub fn scan_prefix(
        &self,
        prefix: &[u8],
        offset: usize,
        limit: usize,
    ) -> CasinoResult<Vec<(Vec<u8>, Vec<u8>)>> {
        let mut rows = Vec::new();
        let iter = self
            .db
            .iterator(IteratorMode::From(prefix, Direction::Forward));
        let mut skipped = 0;
        for item in iter {
            let (key, value) = item?;
            if !key.starts_with(prefix) {
                break;
            }
            if skipped < offset {
                skipped += 1;
                continue;
            }
            rows.push((key.to_vec(), value.to_vec()));
            if rows.len() >= limit {
                break;
            }
        }
        Ok(rows)
    }

    /// Scan rows under `prefix` starting at `start` (inclusive) in
    /// key order, returning at most `limit`.
    pub fn scan_from(
        &self,
        prefix: &[u8],
        start: &[u8],
        limit: usize,
    ) -> CasinoResult<Vec<(Vec<u8>, Vec<u8>)>> {
        let mut rows = Vec::new();
        let iter = self
            .db
            .iterator(IteratorMode::From(start, Direction::Forward));
        for item in iter {
            let (key, value) = item?;
            if !key.starts_with(prefix) {
                break;
            }
            rows.push((key.to_vec(), value.to_vec()));
            if rows.len() >= limit {
                break;
            }
        }
        Ok(rows)
    }

    /// Per-wallet settlement lock. Held (synchronously, no awaits)
    /// for a whole check-then-act sequence so concurrent wagers on
    /// one wallet serialize; wallets stay independent.
    pub fn wallet_lock(&self, user_id: Uuid) -> Arc<Mutex<()>> {
        self.wallet_locks
            .entry(user_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Lock serializing every read-modify-write of the house
    /// aggregates row. A write batch is atomic but not isolated:
    /// without this, two wallets updating the row concurrently would
    /// each stage a stale snapshot and the later commit would drop
    /// the earlier delta. Always acquired after the wallet lock,
    /// never before it, and held through the commit.
    pub fn house_lock(&self) -> Arc<Mutex<()>> {
        Arc::clone(&self.house_lock)
    }

    /// Start staging an atomic write set.
    pub fn begin(&self) -> UnitOfWork<'_> {
        UnitOfWork {
            store: self,
            batch: WriteBatch::default(),
        }
    }
}

/// A staged, all-or-nothing write set. Nothing is visible to readers
/// until `commit`; dropping the unit discards it.
pub struct UnitOfWork<'a> {
    store: &'a LedgerStore,
    batch: WriteBatch,
}

impl UnitOfWork<'_> {
    pub fn put_raw(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.batch.put(key, value);
    }

    pub fn put_json<T: Serialize>(&mut self, key: Vec<u8>, value: &T) -> CasinoResult<()> {
        let bytes = serde_json::to_vec(value).map_err(CasinoError::Serialization)?;
        self.batch.put(key, bytes);
        Ok(())
    }

    pub fn delete(&mut self, key: Vec<u8>) {
        self.batch.delete(key);
    }

    pub fn commit(self) -> CasinoResult<()> {
        self.store.db.write(self.batch)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Row {
        n: u32,
    }

    fn open_temp() -> (tempfile::TempDir, LedgerStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = LedgerStore::open(dir.path()).unwrap();
        (dir, store)
    }

    #[test]
    fn unit_of_work_commits_atomically() {
        let (_dir, store) = open_temp();
        let user = Uuid::new_v4();

        let mut unit = store.begin();
        unit.put_json(keys::wallet(user), &Row { n: 1 }).unwrap();
        unit.put_json(keys::stats(user), &Row { n: 2 }).unwrap();

        // Nothing visible before commit.
        assert!(store
            .get_json::<Row>(&keys::wallet(user))
            .unwrap()
            .is_none());

        unit.commit().unwrap();
        assert_eq!(
            store.get_json::<Row>(&keys::wallet(user)).unwrap(),
            Some(Row { n: 1 })
        );
        assert_eq!(
            store.get_json::<Row>(&keys::stats(user)).unwrap(),
            Some(Row { n: 2 })
        );
    }

    #[test]
    fn dropped_unit_of_work_writes_nothing() {
        let (_dir, store) = open_temp();
        let user = Uuid::new_v4();
        {
            let mut unit = store.begin();
            unit.put_json(keys::wallet(user), &Row { n: 7 }).unwrap();
            // dropped without commit
        }
        assert!(store
            .get_json::<Row>(&keys::wallet(user))
            .unwrap()
            .is_none());
    }

    #[test]
    fn ledger_keys_scan_newest_first() {
        let (_dir, store) = open_temp();
        let user = Uuid::new_v4();

        let mut unit = store.begin();
        for seq in 0..5u64 {
            unit.put_json(keys::ledger_entry(user, seq), &Row { n: seq as u32 })
                .unwrap();
        }
        unit.commit().unwrap();

        let rows = store.scan_prefix(&keys::ledger_prefix(user), 0, 10).unwrap();
        let order: Vec<u32> = rows
            .iter()
            .map(|(_, v)| serde_json::from_slice::<Row>(v).unwrap().n)
            .collect();
        assert_eq!(order, vec![4, 3, 2, 1, 0]);

        let page = store.scan_prefix(&keys::ledger_prefix(user), 2, 2).unwrap();
        let order: Vec<u32> = page
            .iter()
            .map(|(_, v)| serde_json::from_slice::<Row>(v).unwrap().n)
            .collect();
        assert_eq!(order, vec![2, 1]);
    }

    #[test]
    fn prefix_scan_does_not_leak_across_users() {
        let (_dir, store) = open_temp();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        let mut unit = store.begin();
        unit.put_json(keys::ledger_entry(a, 0), &Row { n: 1 }).unwrap();
        unit.put_json(keys::ledger_entry(b, 0), &Row { n: 2 }).unwrap();
        unit.commit().unwrap();

        let rows = store.scan_prefix(&keys::ledger_prefix(a), 0, 10).unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn wallet_lock_is_shared_per_user() {
        let (_dir, store) = open_temp();
        let user = Uuid::new_v4();
        let first = store.wallet_lock(user);
        let second = store.wallet_lock(user);
        assert!(Arc::ptr_eq(&first, &second));
        assert!(!Arc::ptr_eq(&first, &store.wallet_lock(Uuid::new_v4())));
    }
}
