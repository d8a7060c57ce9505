use thiserror::Error;

use crate::types::TransactionId;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum PersistenceError {
    #[error("Transaction [{0}] is unknown to the persistence layer")]
    NotFound(TransactionId),
    #[error("Persistence rejected transaction [{transaction_id}]: {reason}")]
    Rejected {
        transaction_id: TransactionId,
        reason: String
    },
    #[error("Persistence layer unavailable: {0}")]
    Unavailable(String)
}

impl PersistenceError {
    pub fn rejected(transaction_id: &str, reason: impl Into<String>) -> Self {
        Self::Rejected {
            transaction_id: transaction_id.to_string(),
            reason: reason.into()
        }
    }
}
