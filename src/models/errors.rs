use rust_decimal::Decimal;
use thiserror::Error;

use crate::models::{Direction, Transaction};
use crate::types::{GroupId, TransactionId};

/// Validation failures of the relationship components.
///
/// Every variant is detected before anything is mutated, so receiving one of these means
/// nothing happened.
#[derive(Debug, Error, PartialEq)]
pub enum RelationshipError {
    #[error("Transaction [{transaction_id}] was not found")]
    TransactionNotFound {
        transaction_id: TransactionId
    },
    #[error("Transaction [{transaction_id}] is a {actual} but a {expected} is required")]
    InvalidDirection {
        transaction_id: TransactionId,
        expected: Direction,
        actual: Direction
    },
    #[error("Transaction [{transaction_id}] cannot be linked to itself")]
    SelfReference {
        transaction_id: TransactionId
    },
    #[error("Transaction [{transaction_id}] belongs to a split and cannot be a transfer leg")]
    SplitPartExcluded {
        transaction_id: TransactionId
    },
    #[error("A transfer group needs at least 2 transactions, got [{count}]")]
    TooFewMembers {
        count: usize
    },
    #[error("Transaction [{transaction_id}] does not belong to any group")]
    NotGrouped {
        transaction_id: TransactionId
    },
    #[error("Group [{group_id}] was not found")]
    GroupNotFound {
        group_id: GroupId
    },
    #[error("Transaction [{transaction_id}] already belongs to group [{group_id}]")]
    AlreadyGrouped {
        transaction_id: TransactionId,
        group_id: GroupId
    },
    #[error("Transaction [{transaction_id}] is still referenced by [{count}] refunds")]
    LinkedRefunds {
        transaction_id: TransactionId,
        count: usize
    },
    #[error("Split parts total [{allocated}] but the original amount is [{expected}], remaining [{remaining}]")]
    UnbalancedParts {
        expected: Decimal,
        allocated: Decimal,
        remaining: Decimal
    },
    #[error("Split part [{index}] has an empty description")]
    EmptyDescription {
        index: usize
    },
    #[error("Split part [{index}] has a non-positive amount [{amount}]")]
    NonPositiveAmount {
        index: usize,
        amount: Decimal
    },
    #[error("A split needs at least 2 parts, got [{count}]")]
    MinimumParts {
        count: usize
    },
    #[error("Participant [{participant}] has a negative share [{amount}]")]
    NegativeShare {
        participant: String,
        amount: Decimal
    },
    #[error("Shares total [{allocated}] but the transaction amount is [{expected}], remaining [{remaining}]")]
    UnbalancedSplit {
        expected: Decimal,
        allocated: Decimal,
        remaining: Decimal
    },
    #[error("An expense split needs at least one participant")]
    NoParticipants,
    #[error("Participant [{participant}] appears more than once")]
    DuplicateParticipant {
        participant: String
    },
    #[error("Payer [{paid_by}] is not a participant of the split")]
    InvalidPayer {
        paid_by: String
    },
    #[error("Removing [me] from a split paid by [me] requires a new payer")]
    PayerRequired,
    /// `id` names the transaction or group whose amounts were being added up.
    #[error("Amounts of [{id}] add up beyond the representable range")]
    AmountOverflow {
        id: String
    }
}

impl RelationshipError {
    pub fn amount_overflow(id: &str) -> Self {
        Self::AmountOverflow { id: id.to_string() }
    }

    pub fn not_found(transaction_id: &str) -> Self {
        Self::TransactionNotFound { transaction_id: transaction_id.to_string() }
    }

    pub fn invalid_direction(tx: &Transaction, expected: Direction) -> Self {
        Self::InvalidDirection {
            transaction_id: tx.id.clone(),
            expected,
            actual: tx.direction
        }
    }

    pub fn self_reference(transaction_id: &str) -> Self {
        Self::SelfReference { transaction_id: transaction_id.to_string() }
    }

    pub fn split_part_excluded(tx: &Transaction) -> Self {
        Self::SplitPartExcluded { transaction_id: tx.id.clone() }
    }

    pub fn group_not_found(group_id: &str) -> Self {
        Self::GroupNotFound { group_id: group_id.to_string() }
    }

    pub fn already_grouped(tx: &Transaction, group_id: &str) -> Self {
        Self::AlreadyGrouped {
            transaction_id: tx.id.clone(),
            group_id: group_id.to_string()
        }
    }

    pub fn invalid_payer(paid_by: &str) -> Self {
        Self::InvalidPayer { paid_by: paid_by.to_string() }
    }
}
