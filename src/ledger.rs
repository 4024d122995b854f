//! Custodial wallet ledger.
//!
//! Every balance mutation appends exactly one `LedgerEntry` carrying
//! the balance before and after, staged in the caller's unit of work
//! so the wallet row, the entry, and whatever triggered them commit
//! together. Fund locks mutate `locked_balance` only and do not
//! produce entries; they exist to make check-then-act sequences safe
//! under the per-wallet settlement lock.

use crate::amount::Amount;
use crate::errors::{CasinoError, CasinoResult};
use crate::store::{keys, LedgerStore, UnitOfWork};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A user's custodial wallet. `entry_seq` is the next ledger entry
/// sequence number, bumped with the wallet in the same batch.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Wallet {
    pub user_id: Uuid,
    pub balance: Amount,
    pub locked_balance: Amount,
    pub entry_seq: u64,
    pub updated_at: DateTime<Utc>,
}

impl Wallet {
    pub fn new(user_id: Uuid) -> Self {
        Wallet {
            user_id,
            balance: Amount::ZERO,
            locked_balance: Amount::ZERO,
            entry_seq: 0,
            updated_at: Utc::now(),
        }
    }

    /// Balance not currently committed to an in-flight wager.
    pub fn available(&self) -> Amount {
        self.balance.saturating_sub(self.locked_balance)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Deposit,
    Withdraw,
    Win,
    Loss,
}

/// One immutable ledger line.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: EntryKind,
    pub amount: Amount,
    pub balance_before: Amount,
    pub balance_after: Amount,
    /// On-chain deposit signature, when the entry settles an external
    /// payment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

/// House-level running totals, updated only inside units of work.
/// The token market derives its reserve figure from this row.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct HouseAggregates {
    pub total_deposits: Amount,
    pub total_withdrawals: Amount,
    pub total_wagered: Amount,
    pub total_paid_out: Amount,
}

impl HouseAggregates {
    /// Net retained funds in minor units, floored at one whole unit
    /// to keep the price curve away from its zero singularity.
    pub fn reserves_minor(&self) -> u64 {
        let net = self.total_deposits.minor() as i128 - self.total_withdrawals.minor() as i128
            + self.total_wagered.minor() as i128
            - self.total_paid_out.minor() as i128;
        net.clamp(crate::amount::SCALE as i128, u64::MAX as i128) as u64
    }
}

/// Wallet ledger operations. Composable cores take a `UnitOfWork` and
/// an in-memory `Wallet` so settlements can stage several mutations
/// atomically; `deposit`/`withdraw` wrap a core in its own unit.
#[derive(Clone)]
pub struct LedgerService {
    store: LedgerStore,
}

impl LedgerService {
    pub fn new(store: LedgerStore) -> Self {
        LedgerService { store }
    }

    pub fn store(&self) -> &LedgerStore {
        &self.store
    }

    pub fn wallet(&self, user_id: Uuid) -> CasinoResult<Wallet> {
        self.store
            .get_json(&keys::wallet(user_id))?
            .ok_or(CasinoError::WalletNotFound(user_id))
    }

    pub fn transactions(
        &self,
        user_id: Uuid,
        limit: usize,
        offset: usize,
    ) -> CasinoResult<Vec<LedgerEntry>> {
        let rows = self
            .store
            .scan_prefix(&keys::ledger_prefix(user_id), offset, limit)?;
        rows.into_iter()
            .map(|(_, value)| serde_json::from_slice(&value).map_err(CasinoError::Serialization))
            .collect()
    }

    pub fn house_aggregates(&self) -> CasinoResult<HouseAggregates> {
        Ok(self
            .store
            .get_json(&keys::HOUSE_AGGREGATES.to_vec())?
            .unwrap_or_default())
    }

    /// Reserve funds for an in-flight wager. Fails without mutating
    /// anything if the available balance is short.
    pub fn lock_funds(&self, wallet: &mut Wallet, amount: Amount) -> CasinoResult<()> {
        let available = wallet.available();
        if amount > available {
            return Err(CasinoError::InsufficientFunds {
                requested: amount,
                available,
            });
        }
        wallet.locked_balance = wallet
            .locked_balance
            .checked_add(amount)
            .ok_or_else(|| CasinoError::LedgerViolation("locked balance overflow".into()))?;
        Ok(())
    }

    /// Release a previous lock. Unlocking more than is locked means a
    /// settlement bug already happened: logged and surfaced, never
    /// silently clamped.
    pub fn unlock_funds(&self, wallet: &mut Wallet, amount: Amount) -> CasinoResult<()> {
        match wallet.locked_balance.checked_sub(amount) {
            Some(remaining) => {
                wallet.locked_balance = remaining;
                Ok(())
            }
            None => {
                tracing::error!(
                    user_id = %wallet.user_id,
                    unlock = %amount,
                    locked = %wallet.locked_balance,
                    "attempted to unlock more than the locked balance"
                );
                Err(CasinoError::LedgerViolation(format!(
                    "unlock of {} exceeds locked balance {} for user {}",
                    amount, wallet.locked_balance, wallet.user_id
                )))
            }
        }
    }

    /// Stage a balance increase plus its ledger entry.
    pub fn credit(
        &self,
        unit: &mut UnitOfWork<'_>,
        wallet: &mut Wallet,
        kind: EntryKind,
        amount: Amount,
        signature: Option<String>,
        metadata: Option<serde_json::Value>,
    ) -> CasinoResult<LedgerEntry> {
        if amount.is_zero() {
            return Err(CasinoError::InvalidAmount("credit must be positive".into()));
        }
        let balance_before = wallet.balance;
        wallet.balance = wallet
            .balance
            .checked_add(amount)
            .ok_or_else(|| CasinoError::InvalidAmount("balance overflow".into()))?;
        self.append(unit, wallet, kind, amount, balance_before, signature, metadata)
    }

    /// Stage a balance decrease plus its ledger entry. The caller
    /// must have verified coverage (via `lock_funds` or an explicit
    /// available-balance check); a short balance here is a bug.
    pub fn debit(
        &self,
        unit: &mut UnitOfWork<'_>,
        wallet: &mut Wallet,
        kind: EntryKind,
        amount: Amount,
        metadata: Option<serde_json::Value>,
    ) -> CasinoResult<LedgerEntry> {
        if amount.is_zero() {
            return Err(CasinoError::InvalidAmount("debit must be positive".into()));
        }
        let balance_before = wallet.balance;
        wallet.balance = wallet.balance.checked_sub(amount).ok_or_else(|| {
            tracing::error!(
                user_id = %wallet.user_id,
                debit = %amount,
                balance = %balance_before,
                "debit exceeds balance"
            );
            CasinoError::LedgerViolation(format!(
                "debit of {} exceeds balance {} for user {}",
                amount, balance_before, wallet.user_id
            ))
        })?;
        self.append(unit, wallet, kind, amount, balance_before, None, metadata)
    }

    #[allow(clippy::too_many_arguments)]
    fn append(
        &self,
        unit: &mut UnitOfWork<'_>,
        wallet: &mut Wallet,
        kind: EntryKind,
        amount: Amount,
        balance_before: Amount,
        signature: Option<String>,
        metadata: Option<serde_json::Value>,
    ) -> CasinoResult<LedgerEntry> {
        let entry = LedgerEntry {
            id: Uuid::new_v4(),
            user_id: wallet.user_id,
            kind,
            amount,
            balance_before,
            balance_after: wallet.balance,
            signature,
            metadata,
            created_at: Utc::now(),
        };
        unit.put_json(keys::ledger_entry(wallet.user_id, wallet.entry_seq), &entry)?;
        wallet.entry_seq += 1;
        wallet.updated_at = entry.created_at;
        unit.put_json(keys::wallet(wallet.user_id), wallet)?;
        Ok(entry)
    }

    /// Credit an externally verified deposit as a standalone unit of
    /// work, bumping the house deposit total in the same batch.
    pub fn deposit(
        &self,
        user_id: Uuid,
        amount: Amount,
        signature: Option<String>,
    ) -> CasinoResult<LedgerEntry> {
        if amount.is_zero() {
            return Err(CasinoError::InvalidAmount("deposit must be positive".into()));
        }
        let lock = self.store.wallet_lock(user_id);
        let _guard = lock.lock().map_err(|_| {
            CasinoError::LedgerViolation(format!("wallet lock poisoned for user {user_id}"))
        })?;

        let mut wallet = self.wallet(user_id)?;
        let mut unit = self.store.begin();
        let entry = self.credit(&mut unit, &mut wallet, EntryKind::Deposit, amount, signature, None)?;

        let house = self.store.house_lock();
        let _house_guard = house.lock().map_err(|_| {
            CasinoError::LedgerViolation("house aggregates lock poisoned".into())
        })?;
        let mut aggregates = self.house_aggregates()?;
        aggregates.total_deposits = aggregates
            .total_deposits
            .checked_add(amount)
            .ok_or_else(|| CasinoError::LedgerViolation("house deposit total overflow".into()))?;
        unit.put_json(keys::HOUSE_AGGREGATES.to_vec(), &aggregates)?;

        unit.commit()?;
        tracing::info!(user_id = %user_id, amount = %amount, "deposit credited");
        Ok(entry)
    }

    /// Debit a withdrawal to an external destination as a standalone
    /// unit of work. The destination is the recorded withdrawal
    /// intent and is required. Locked funds are not withdrawable.
    pub fn withdraw(
        &self,
        user_id: Uuid,
        amount: Amount,
        destination: &str,
    ) -> CasinoResult<LedgerEntry> {
        if amount.is_zero() {
            return Err(CasinoError::InvalidAmount(
                "withdrawal must be positive".into(),
            ));
        }
        if destination.trim().is_empty() {
            return Err(CasinoError::InvalidRequest(
                "destination address is required".into(),
            ));
        }
        let lock = self.store.wallet_lock(user_id);
        let _guard = lock.lock().map_err(|_| {
            CasinoError::LedgerViolation(format!("wallet lock poisoned for user {user_id}"))
        })?;

        let mut wallet = self.wallet(user_id)?;
        let available = wallet.available();
        if amount > available {
            return Err(CasinoError::InsufficientFunds {
                requested: amount,
                available,
            });
        }

        let metadata = Some(serde_json::json!({ "destination": destination }));
        let mut unit = self.store.begin();
        let entry = self.debit(&mut unit, &mut wallet, EntryKind::Withdraw, amount, metadata)?;

        let house = self.store.house_lock();
        let _house_guard = house.lock().map_err(|_| {
            CasinoError::LedgerViolation("house aggregates lock poisoned".into())
        })?;
        let mut aggregates = self.house_aggregates()?;
        aggregates.total_withdrawals =
            aggregates.total_withdrawals.checked_add(amount).ok_or_else(|| {
                CasinoError::LedgerViolation("house withdrawal total overflow".into())
            })?;
        unit.put_json(keys::HOUSE_AGGREGATES.to_vec(), &aggregates)?;

        unit.commit()?;
        tracing::info!(user_id = %user_id, amount = %amount, "withdrawal debited");
        Ok(entry)
    }
}
