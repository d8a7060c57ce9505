use std::sync::atomic::{AtomicBool, Ordering};

use dashmap::{DashMap, DashSet};
use rust_decimal::Decimal;
use tracing::trace;

use crate::gateway::{Persistence, PersistenceError, SplitRequest};
use crate::models::{FieldPatch, SplitBreakdown, Transaction, TransactionPatch};
use crate::types::TransactionId;

/// In-process stand-in for the persistence API.
pub struct MemoryPersistence {
    records: DashMap<TransactionId, Transaction>,
    failing: DashSet<TransactionId>,
    offline: AtomicBool
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
            failing: DashSet::new(),
            offline: AtomicBool::new(false)
        }
    }

    pub fn seed(&self, transactions: impl IntoIterator<Item = Transaction>) {
        for transaction in transactions {
            self.records.insert(transaction.id.clone(), transaction);
        }
    }

    /// Every subsequent write touching `transaction_id` is rejected.
    pub fn fail_on(&self, transaction_id: &str) {
        self.failing.insert(transaction_id.to_string());
    }

    /// Rejects every call until switched back.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn load(&self, transaction_id: &str) -> Option<Transaction> {
        self.records.get(transaction_id).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn check_writable(&self, transaction_id: &str) -> Result<(), PersistenceError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(PersistenceError::Unavailable("offline".to_string()))
        }

        if self.failing.contains(transaction_id) {
            return Err(PersistenceError::rejected(transaction_id, "write refused"))
        }

        if !self.records.contains_key(transaction_id) {
            return Err(PersistenceError::NotFound(transaction_id.to_string()))
        }

        Ok(())
    }

    fn patch(&self, patch: &TransactionPatch) -> Result<Transaction, PersistenceError> {
        self.check_writable(&patch.id)?;

        let mut entry = self.records.get_mut(&patch.id)
            .ok_or_else(|| PersistenceError::NotFound(patch.id.clone()))?;

        patch.apply_to(entry.value_mut());
        trace!("Persisted patch for [{}]", patch.id);

        Ok(entry.value().clone())
    }
}

impl Default for MemoryPersistence {
    fn default() -> Self {
        Self::new()
    }
}

impl Persistence for MemoryPersistence {
    async fn update_transaction(&self, patch: &TransactionPatch) -> Result<Transaction, PersistenceError> {
        self.patch(patch)
    }

    async fn link_refund(&self, child_id: &str, parent_id: &str) -> Result<(), PersistenceError> {
        self.check_writable(parent_id)?;

        let mut patch = TransactionPatch::new(child_id);
        patch.link_parent_id = FieldPatch::Set(parent_id.to_string());
        patch.is_refund = Some(true);

        self.patch(&patch).map(|_| ())
    }

    async fn group_transfer(&self, group_id: &str, transaction_ids: &[TransactionId]) -> Result<(), PersistenceError> {
        for transaction_id in transaction_ids {
            self.check_writable(transaction_id)?;
        }

        for transaction_id in transaction_ids {
            let mut patch = TransactionPatch::new(transaction_id.clone());
            patch.transaction_group_id = FieldPatch::Set(group_id.to_string());
            self.patch(&patch)?;
        }

        Ok(())
    }

    async fn split_transaction(&self, request: &SplitRequest) -> Result<(), PersistenceError> {
        self.check_writable(&request.transaction_id)?;

        for part in &request.parts {
            self.records.insert(part.id.clone(), part.clone());
        }

        if request.delete_original {
            self.records.remove(&request.transaction_id);
        } else {
            let mut patch = TransactionPatch::new(request.transaction_id.clone());
            patch.transaction_group_id = FieldPatch::Set(request.group_id.clone());
            patch.is_split = Some(false);
            self.patch(&patch)?;
        }

        Ok(())
    }

    async fn update_transaction_split(&self, transaction_id: &str, breakdown: &SplitBreakdown, share_amount: Decimal) -> Result<(), PersistenceError> {
        let mut patch = TransactionPatch::new(transaction_id);
        patch.is_shared = Some(true);
        patch.split_breakdown = FieldPatch::Set(breakdown.clone());
        patch.split_share_amount = FieldPatch::Set(share_amount);

        self.patch(&patch).map(|_| ())
    }

    async fn clear_transaction_split(&self, transaction_id: &str) -> Result<(), PersistenceError> {
        let mut patch = TransactionPatch::new(transaction_id);
        patch.is_shared = Some(false);
        patch.split_breakdown = FieldPatch::Clear;
        patch.split_share_amount = FieldPatch::Clear;

        self.patch(&patch).map(|_| ())
    }

    async fn search_transactions(&self, query: &str, limit: usize, offset: usize) -> Result<Vec<Transaction>, PersistenceError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(PersistenceError::Unavailable("offline".to_string()))
        }

        let needle = query.trim().to_lowercase();
        let mut matches: Vec<Transaction> = self.records.iter()
            .filter(|entry| {
                let transaction = entry.value();
                needle.is_empty()
                    || transaction.id.to_lowercase().contains(&needle)
                    || transaction.description.to_lowercase().contains(&needle)
            })
            .map(|entry| entry.value().clone())
            .collect();

        matches.sort_by(|left, right| left.id.cmp(&right.id));

        Ok(matches.into_iter().skip(offset).take(limit).collect())
    }
}
