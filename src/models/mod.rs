mod breakdown;
mod errors;
mod patch;
mod transaction;

use std::fmt;
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

pub use breakdown::{SplitBreakdown, SplitEntry, ME};
pub use errors::RelationshipError;
pub use patch::{FieldPatch, TransactionPatch};
pub use transaction::Transaction;

/// Whether money left (debit) or entered (credit) the account.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Debit,
    Credit
}

impl Display for Direction {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Debit => write!(formatter, "debit"),
            Direction::Credit => write!(formatter, "credit")
        }
    }
}

/// How an expense split allocates the transaction amount.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitMode {
    /// Every participant owes `amount / participants`; entry amounts are not stored.
    Equal,
    /// Every participant owes the amount stored on their entry.
    Custom
}
