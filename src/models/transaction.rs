use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::{Direction, SplitBreakdown};
use crate::types::{AccountId, GroupId, TransactionId};

/// A single ledger transaction together with its relationship fields.
///
/// The relationship fields (`link_parent_id`, `transaction_group_id`, the sharing fields and
/// `net_amount`) are owned by the relationship components and should only change through a
/// [`TransactionPatch`](crate::models::TransactionPatch) they produce.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique identifier.
    pub id: TransactionId,
    pub direction: Direction,
    /// Always positive, the sign is carried by `direction`.
    pub amount: Decimal,
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<AccountId>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// The debit this credit refunds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_parent_id: Option<TransactionId>,
    #[serde(default)]
    pub is_refund: bool,
    /// Shared key of a transfer group or of a split, see `is_split`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_group_id: Option<GroupId>,
    /// Set on parts generated by a split, which are never transfer legs.
    #[serde(default)]
    pub is_split: bool,
    #[serde(default)]
    pub is_shared: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub split_breakdown: Option<SplitBreakdown>,
    /// The ledger owner's share of a shared expense.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub split_share_amount: Option<Decimal>,
    /// Amount left after linked refunds. Absent when refunds did not reduce the amount.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub net_amount: Option<Decimal>
}

impl Transaction {
    /// Creates an unrelated transaction with no account, description or tags.
    pub fn new(id: impl Into<TransactionId>, direction: Direction, amount: Decimal, date: NaiveDate) -> Self {
        Self {
            id: id.into(),
            direction,
            amount,
            date,
            account_id: None,
            description: String::new(),
            tags: Vec::new(),
            link_parent_id: None,
            is_refund: false,
            transaction_group_id: None,
            is_split: false,
            is_shared: false,
            split_breakdown: None,
            split_share_amount: None,
            net_amount: None
        }
    }

    pub fn with_account(mut self, account_id: impl Into<AccountId>) -> Self {
        self.account_id = Some(account_id.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn is_credit(&self) -> bool {
        self.direction == Direction::Credit
    }

    pub fn is_debit(&self) -> bool {
        self.direction == Direction::Debit
    }

    /// Amount with credits positive and debits negative.
    pub fn signed_amount(&self) -> Decimal {
        match self.direction {
            Direction::Credit => self.amount,
            Direction::Debit => -self.amount
        }
    }

    pub fn in_group(&self, group_id: &str) -> bool {
        self.transaction_group_id.as_deref() == Some(group_id)
    }
}
