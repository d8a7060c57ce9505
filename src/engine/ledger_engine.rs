use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::engine::errors::{EngineError, SyncReport};
use crate::gateway::{Persistence, SplitRequest};
use crate::models::{RelationshipError, SplitBreakdown, Transaction, TransactionPatch};
use crate::relations::{
    ExpenseShareCalculator, GroupBalance, GroupResult, LinkResult, OriginalDisposition, RefundLinkManager,
    RemovalResult, SavedShare, SplitEngine, SplitPart, SplitResult, TransferGroupManager, UnlinkResult
};
use crate::storage::Storage;
use crate::types::{Tolerances, TransactionId};

/// Wires the relationship components to the persistence layer.
///
/// Every operation validates and applies the change in memory first, then issues the
/// persistence calls. Writes are not rolled back: when some of them fail the in-memory state
/// is ahead of the persisted one and the operation reports it as a partial failure.
pub struct LedgerEngine<S: Storage, P: Persistence> {
    storage: Arc<S>,
    persistence: Arc<P>,
    refunds: RefundLinkManager,
    transfers: TransferGroupManager,
    splits: SplitEngine,
    shares: ExpenseShareCalculator
}

impl<S: Storage, P: Persistence> LedgerEngine<S, P> {
    pub fn new(storage: Arc<S>, persistence: Arc<P>) -> Self {
        Self {
            storage,
            persistence,
            refunds: RefundLinkManager::new(),
            transfers: TransferGroupManager::new(),
            splits: SplitEngine::new(),
            shares: ExpenseShareCalculator::new()
        }
    }

    pub fn with_tolerances(mut self, tolerances: Tolerances) -> Self {
        self.transfers = TransferGroupManager::with_tolerances(tolerances);
        self.splits = SplitEngine::with_tolerances(tolerances);
        self.shares = ExpenseShareCalculator::with_tolerances(tolerances);
        self
    }

    pub fn storage(&self) -> &Arc<S> {
        &self.storage
    }

    pub async fn link_refund(&self, child_id: &str, parent_id: &str) -> Result<LinkResult, EngineError> {
        let result = self.refunds.link(self.storage.as_ref(), child_id, parent_id)?;
        let mut report = SyncReport::default();

        for patch in &result.patches {
            if patch.id == child_id {
                let outcome = self.persistence.link_refund(child_id, parent_id).await;
                report.record(&[patch.id.clone()], outcome);
            } else {
                self.persist_patch(patch, &mut report).await;
            }
        }

        finish("link_refund", report)?;
        Ok(result)
    }

    pub async fn unlink_refund(&self, child_id: &str) -> Result<UnlinkResult, EngineError> {
        let result = self.refunds.unlink(self.storage.as_ref(), child_id)?;
        self.persist_patches(&result.patches, "unlink_refund").await?;
        Ok(result)
    }

    /// Groups the transactions with a single batched write.
    pub async fn group(&self, transaction_ids: &[TransactionId]) -> Result<GroupResult, EngineError> {
        let result = self.transfers.group(self.storage.as_ref(), transaction_ids)?;
        let mut report = SyncReport::default();

        let outcome = self.persistence.group_transfer(&result.group_id, &result.members).await;
        report.record(&result.members, outcome);

        for patch in result.patches.iter().filter(|patch| !result.members.contains(&patch.id)) {
            self.persist_patch(patch, &mut report).await;
        }

        finish("group", report)?;
        self.report_balance(&result.group_id);

        Ok(result)
    }

    pub async fn add_to_group(&self, group_id: &str, transaction_ids: &[TransactionId]) -> Result<GroupResult, EngineError> {
        let result = self.transfers.add_to_group(self.storage.as_ref(), group_id, transaction_ids)?;
        self.persist_patches(&result.patches, "add_to_group").await?;
        self.report_balance(group_id);

        Ok(result)
    }

    pub async fn remove_from_group(&self, transaction_id: &str) -> Result<RemovalResult, EngineError> {
        let result = self.transfers.remove_from_group(self.storage.as_ref(), transaction_id)?;
        self.persist_patches(&result.patches, "remove_from_group").await?;
        Ok(result)
    }

    pub async fn ungroup(&self, group_id: &str) -> Result<GroupResult, EngineError> {
        let result = self.transfers.ungroup(self.storage.as_ref(), group_id)?;
        self.persist_patches(&result.patches, "ungroup").await?;
        Ok(result)
    }

    pub fn group_balance(&self, group_id: &str) -> Result<GroupBalance, EngineError> {
        Ok(self.transfers.balance(self.storage.as_ref(), group_id)?)
    }

    pub async fn split(&self, transaction_id: &str, parts: &[SplitPart], delete_original: bool) -> Result<SplitResult, EngineError> {
        let result = self.splits.apply(self.storage.as_ref(), transaction_id, parts, delete_original)?;
        let request = SplitRequest {
            transaction_id: result.original_id.clone(),
            group_id: result.group_id.clone(),
            parts: result.parts.clone(),
            delete_original: matches!(result.original, OriginalDisposition::Deleted(_))
        };

        let mut touched: Vec<TransactionId> = result.parts.iter().map(|part| part.id.clone()).collect();
        touched.push(result.original_id.clone());

        let mut report = SyncReport::default();
        let outcome = self.persistence.split_transaction(&request).await;
        report.record(&touched, outcome);

        if let Some(patch) = &result.refund_parent_patch {
            self.persist_patch(patch, &mut report).await;
        }

        finish("split", report)?;
        Ok(result)
    }

    /// Validates and stores the expense split of `transaction_id`.
    pub async fn save_share(&self, transaction_id: &str, breakdown: &SplitBreakdown) -> Result<SavedShare, EngineError> {
        let transaction = self.load(transaction_id)?;
        let saved = self.shares.save(&transaction, breakdown)?;

        self.storage.apply(&saved.patch);

        let mut report = SyncReport::default();
        let outcome = self.persistence.update_transaction_split(transaction_id, &saved.breakdown, saved.my_share).await;
        report.record(&[transaction.id.clone()], outcome);

        finish("save_share", report)?;
        Ok(saved)
    }

    pub async fn clear_share(&self, transaction_id: &str) -> Result<TransactionPatch, EngineError> {
        let transaction = self.load(transaction_id)?;
        let patch = self.shares.clear(&transaction);

        self.storage.apply(&patch);

        let mut report = SyncReport::default();
        let outcome = self.persistence.clear_transaction_split(transaction_id).await;
        report.record(&[transaction.id.clone()], outcome);

        finish("clear_share", report)?;
        Ok(patch)
    }

    /// Search results `child_id` could be linked to as a refund.
    pub async fn refund_candidates(&self, child_id: &str, query: &str, limit: usize, offset: usize) -> Result<Vec<Transaction>, EngineError> {
        let child = self.load(child_id)?;
        let candidates = self.persistence.search_transactions(query, limit, offset).await
            .map_err(EngineError::Search)?;

        Ok(self.refunds.filter_parent_candidates(&child, candidates))
    }

    /// Search results that may be grouped as transfer legs.
    pub async fn transfer_candidates(&self, query: &str, limit: usize, offset: usize) -> Result<Vec<Transaction>, EngineError> {
        let candidates = self.persistence.search_transactions(query, limit, offset).await
            .map_err(EngineError::Search)?;

        Ok(self.transfers.filter_candidates(self.storage.as_ref(), candidates))
    }

    fn load(&self, transaction_id: &str) -> Result<Transaction, RelationshipError> {
        self.storage.load(transaction_id).ok_or_else(|| RelationshipError::not_found(transaction_id))
    }

    async fn persist_patch(&self, patch: &TransactionPatch, report: &mut SyncReport) {
        let outcome = self.persistence.update_transaction(patch).await;
        report.record(&[patch.id.clone()], outcome);
    }

    async fn persist_patches(&self, patches: &[TransactionPatch], operation: &str) -> Result<(), EngineError> {
        let mut report = SyncReport::default();

        for patch in patches {
            self.persist_patch(patch, &mut report).await;
        }

        finish(operation, report)
    }

    fn report_balance(&self, group_id: &str) {
        match self.transfers.balance(self.storage.as_ref(), group_id) {
            Ok(balance) => debug!("Transfer group [{group_id}] nets to [{}]: {:?}", balance.net, balance.status),
            Err(error) => warn!("Transfer group [{group_id}] has no balance: {error}")
        }
    }
}

fn finish(operation: &str, report: SyncReport) -> Result<(), EngineError> {
    for failure in &report.failed {
        error!("{operation}: could not persist [{}]: {}", failure.transaction_id, failure.error);
    }

    report.into_result().map(|_| ())
}
