//! The persistence collaborator the orchestrator writes through.
//!
//! Calls are asynchronous and may fail independently per transaction. [`MemoryPersistence`]
//! keeps its own copy of every transaction and can be told to reject writes for given ids.

mod errors;
mod memory;

use std::future::Future;

use rust_decimal::Decimal;

use crate::models::{SplitBreakdown, Transaction, TransactionPatch};
use crate::types::{GroupId, TransactionId};

pub use errors::PersistenceError;
pub use memory::MemoryPersistence;

/// A committed split as sent to the persistence layer.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitRequest {
    pub transaction_id: TransactionId,
    pub group_id: GroupId,
    pub parts: Vec<Transaction>,
    pub delete_original: bool
}

pub trait Persistence: Send + Sync + 'static {
    /// Generic field patch; `Clear` fields are removed, `Keep` fields are untouched.
    fn update_transaction(&self, patch: &TransactionPatch) -> impl Future<Output = Result<Transaction, PersistenceError>> + Send;

    fn link_refund(&self, child_id: &str, parent_id: &str) -> impl Future<Output = Result<(), PersistenceError>> + Send;

    /// Assigns `group_id` to every listed transaction, all or nothing.
    fn group_transfer(&self, group_id: &str, transaction_ids: &[TransactionId]) -> impl Future<Output = Result<(), PersistenceError>> + Send;

    fn split_transaction(&self, request: &SplitRequest) -> impl Future<Output = Result<(), PersistenceError>> + Send;

    fn update_transaction_split(&self, transaction_id: &str, breakdown: &SplitBreakdown, share_amount: Decimal) -> impl Future<Output = Result<(), PersistenceError>> + Send;

    fn clear_transaction_split(&self, transaction_id: &str) -> impl Future<Output = Result<(), PersistenceError>> + Send;

    /// Candidate lookup; results are untrusted and must be filtered by the caller.
    fn search_transactions(&self, query: &str, limit: usize, offset: usize) -> impl Future<Output = Result<Vec<Transaction>, PersistenceError>> + Send;
}
