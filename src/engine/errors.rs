use thiserror::Error;

use crate::gateway::PersistenceError;
use crate::models::RelationshipError;
use crate::types::TransactionId;

#[derive(Debug, Clone, PartialEq)]
pub struct FailedWrite {
    pub transaction_id: TransactionId,
    pub error: PersistenceError
}

#[derive(Debug, Error)]
pub enum EngineError {
    /// Validation failed; nothing was changed in memory or persisted.
    #[error(transparent)]
    Rejected(#[from] RelationshipError),
    /// Applied in memory but no write reached the persistence layer.
    #[error("No change was persisted, [{}] writes failed", .failed.len())]
    Persistence {
        failed: Vec<FailedWrite>
    },
    /// Applied in memory, and persisted for only some of the records.
    #[error("[{}] records persisted, [{}] failed", .persisted.len(), .failed.len())]
    PartialFailure {
        persisted: Vec<TransactionId>,
        failed: Vec<FailedWrite>
    },
    #[error("Candidate search failed: {0}")]
    Search(PersistenceError)
}

/// Per-record outcome of the writes issued for one logical operation.
#[derive(Debug, Default)]
pub struct SyncReport {
    pub persisted: Vec<TransactionId>,
    pub failed: Vec<FailedWrite>
}

impl SyncReport {
    pub fn record<T>(&mut self, transaction_ids: &[TransactionId], outcome: Result<T, PersistenceError>) {
        match outcome {
            Ok(_) => self.persisted.extend_from_slice(transaction_ids),
            Err(error) => {
                self.failed.extend(transaction_ids.iter().map(|transaction_id| FailedWrite {
                    transaction_id: transaction_id.clone(),
                    error: error.clone()
                }));
            }
        }
    }

    pub fn into_result(self) -> Result<Vec<TransactionId>, EngineError> {
        if self.failed.is_empty() {
            return Ok(self.persisted)
        }

        if self.persisted.is_empty() {
            return Err(EngineError::Persistence { failed: self.failed })
        }

        Err(EngineError::PartialFailure {
            persisted: self.persisted,
            failed: self.failed
        })
    }
}
