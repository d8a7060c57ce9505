use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::models::{Direction, SplitBreakdown, Transaction};
use crate::relations::SplitPart;
use crate::types::{deserialize_amount, TransactionId};

/// One row of the ledger CSV.
///
/// `tags` is a `;` separated list.
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerRecord {
    pub id: TransactionId,
    pub direction: Direction,
    #[serde(deserialize_with = "deserialize_amount")]
    pub amount: Decimal,
    pub date: NaiveDate,
    #[serde(default)]
    pub account: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: String
}

impl From<LedgerRecord> for Transaction {
    fn from(record: LedgerRecord) -> Self {
        let tags = record.tags.split(';')
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .map(str::to_string)
            .collect();

        let mut transaction = Transaction::new(record.id, record.direction, record.amount, record.date)
            .with_description(record.description)
            .with_tags(tags);

        transaction.account_id = record.account.filter(|account| !account.is_empty());
        transaction
    }
}

/// One line of the operations script.
///
/// Groups are addressed through one of their members since group ids are generated.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    LinkRefund {
        child: TransactionId,
        parent: TransactionId
    },
    UnlinkRefund {
        child: TransactionId
    },
    Group {
        transactions: Vec<TransactionId>
    },
    AddToGroup {
        member: TransactionId,
        transactions: Vec<TransactionId>
    },
    RemoveFromGroup {
        transaction: TransactionId
    },
    Ungroup {
        member: TransactionId
    },
    Split {
        transaction: TransactionId,
        parts: Vec<SplitPart>,
        #[serde(default)]
        delete_original: bool
    },
    Share {
        transaction: TransactionId,
        breakdown: SplitBreakdown
    },
    ClearShare {
        transaction: TransactionId
    }
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::LinkRefund { .. } => "link_refund",
            Operation::UnlinkRefund { .. } => "unlink_refund",
            Operation::Group { .. } => "group",
            Operation::AddToGroup { .. } => "add_to_group",
            Operation::RemoveFromGroup { .. } => "remove_from_group",
            Operation::Ungroup { .. } => "ungroup",
            Operation::Split { .. } => "split",
            Operation::Share { .. } => "share",
            Operation::ClearShare { .. } => "clear_share"
        }
    }
}
