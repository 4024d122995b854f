//! User identity and provisioning.
//!
//! Players are identified by wallet address. First contact on a
//! wagering path auto-provisions a `User` plus an empty `Wallet` in
//! one unit of work, with unique indexes on both the address and the
//! derived username. Provisioning is serialized so two concurrent
//! first requests for one address cannot double-create.

use crate::errors::{CasinoError, CasinoResult};
use crate::ledger::Wallet;
use crate::store::{keys, LedgerStore};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

const USERNAME_PREFIX_LEN: usize = 8;
const USERNAME_PROBE_LIMIT: u32 = 1_000;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub wallet_address: String,
    pub username: String,
    pub created_at: DateTime<Utc>,
    pub last_login_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct IdentityService {
    store: LedgerStore,
    provision_lock: Arc<Mutex<()>>,
}

impl IdentityService {
    pub fn new(store: LedgerStore) -> Self {
        IdentityService {
            store,
            provision_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn by_id(&self, id: Uuid) -> CasinoResult<Option<User>> {
        self.store.get_json(&keys::user_id(id))
    }

    pub fn by_address(&self, wallet_address: &str) -> CasinoResult<Option<User>> {
        let Some(id_bytes) = self.store.get_raw(&keys::user_addr(wallet_address))? else {
            return Ok(None);
        };
        let id: Uuid = serde_json::from_slice(&id_bytes)?;
        self.by_id(id)
    }

    /// Resolve a wallet address on a read-only path: no provisioning.
    pub fn require(&self, wallet_address: &str) -> CasinoResult<User> {
        self.by_address(wallet_address)?
            .ok_or_else(|| CasinoError::UserNotFound(wallet_address.to_string()))
    }

    /// Resolve a wallet address on a wagering path, provisioning a
    /// user and an empty wallet on first contact. Bumps
    /// `last_login_at` on every call.
    pub fn get_or_create(&self, wallet_address: &str) -> CasinoResult<User> {
        let wallet_address = wallet_address.trim();
        if wallet_address.len() < USERNAME_PREFIX_LEN {
            return Err(CasinoError::InvalidRequest(format!(
                "wallet address too short: {wallet_address:?}"
            )));
        }

        if let Some(mut user) = self.by_address(wallet_address)? {
            user.last_login_at = Utc::now();
            let mut unit = self.store.begin();
            unit.put_json(keys::user_id(user.id), &user)?;
            unit.commit()?;
            return Ok(user);
        }

        let _guard = self.provision_lock.lock().map_err(|_| {
            CasinoError::LedgerViolation("identity provisioning lock poisoned".into())
        })?;

        // Re-check under the lock: another request may have won.
        if let Some(user) = self.by_address(wallet_address)? {
            return Ok(user);
        }

        let username = self.derive_username(wallet_address)?;
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            wallet_address: wallet_address.to_string(),
            username: username.clone(),
            created_at: now,
            last_login_at: now,
        };

        let mut unit = self.store.begin();
        unit.put_json(keys::user_id(user.id), &user)?;
        unit.put_json(keys::user_addr(wallet_address), &user.id)?;
        unit.put_json(keys::user_name(&username), &user.id)?;
        unit.put_json(keys::wallet(user.id), &Wallet::new(user.id))?;
        unit.commit()?;

        tracing::info!(
            user_id = %user.id,
            username = %user.username,
            "provisioned new user"
        );
        Ok(user)
    }

    /// Username defaults to the wallet-address prefix; a derived-name
    /// collision (distinct addresses sharing a prefix) gets a numeric
    /// suffix probe. Exhausting the probe space is a conflict.
    fn derive_username(&self, wallet_address: &str) -> CasinoResult<String> {
        let base: String = wallet_address.chars().take(USERNAME_PREFIX_LEN).collect();
        if self.store.get_raw(&keys::user_name(&base))?.is_none() {
            return Ok(base);
        }
        for n in 2..USERNAME_PROBE_LIMIT {
            let candidate = format!("{base}{n}");
            if self.store.get_raw(&keys::user_name(&candidate))?.is_none() {
                return Ok(candidate);
            }
        }
        Err(CasinoError::Conflict(format!(
            "no available username for address prefix {base:?}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (tempfile::TempDir, IdentityService, LedgerStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = LedgerStore::open(dir.path()).unwrap();
        let service = IdentityService::new(store.clone());
        (dir, service, store)
    }

    #[test]
    fn first_contact_provisions_user_and_wallet() {
        let (_dir, identity, store) = setup();
        let user = identity.get_or_create("9xQeWvG816bUx9EPf2oKk2qTzLqE3h7y").unwrap();
        assert_eq!(user.username, "9xQeWvG8");

        let wallet: Option<Wallet> = store.get_json(&keys::wallet(user.id)).unwrap();
        assert!(wallet.is_some());
        assert!(wallet.unwrap().balance.is_zero());
    }

    #[test]
    fn repeat_contact_returns_same_user() {
        let (_dir, identity, _store) = setup();
        let first = identity.get_or_create("9xQeWvG816bUx9EPf2oKk2qTzLqE3h7y").unwrap();
        let second = identity.get_or_create("9xQeWvG816bUx9EPf2oKk2qTzLqE3h7y").unwrap();
        assert_eq!(first.id, second.id);
        assert!(second.last_login_at >= first.last_login_at);
    }

    #[test]
    fn derived_username_collision_gets_suffix() {
        let (_dir, identity, _store) = setup();
        let a = identity.get_or_create("AAAABBBB1111").unwrap();
        let b = identity.get_or_create("AAAABBBB2222").unwrap();
        assert_eq!(a.username, "AAAABBBB");
        assert_eq!(b.username, "AAAABBBB2");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn short_address_is_rejected() {
        let (_dir, identity, _store) = setup();
        assert!(identity.get_or_create("abc").is_err());
    }

    #[test]
    fn require_does_not_provision() {
        let (_dir, identity, _store) = setup();
        let err = identity.require("9xQeWvG816bUx9EPf2oKk2qTzLqE3h7y").unwrap_err();
        assert!(matches!(err, CasinoError::UserNotFound(_)));
    }
}
