use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::SplitMode;

/// Participant identifier reserved for the ledger owner.
pub const ME: &str = "me";

/// One participant's line in an expense split.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitEntry {
    pub participant: String,
    /// `None` in equal mode, where the share is computed rather than stored.
    pub amount: Option<Decimal>,
    /// What this participant paid towards the expense.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_share: Option<Decimal>,
    /// `paid_share` minus the participant's share, positive when they are owed money.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub net_balance: Option<Decimal>
}

impl SplitEntry {
    pub fn new(participant: impl Into<String>, amount: Option<Decimal>) -> Self {
        Self {
            participant: participant.into(),
            amount,
            paid_share: None,
            net_balance: None
        }
    }

    pub fn is_me(&self) -> bool {
        self.participant == ME
    }
}

/// Allocation of one transaction's amount among participants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitBreakdown {
    pub mode: SplitMode,
    pub include_me: bool,
    pub entries: Vec<SplitEntry>,
    /// The participant who fronted the money.
    pub paid_by: String,
    #[serde(default)]
    pub total_participants: usize
}

impl SplitBreakdown {
    /// Builds an equal split. `include_me` follows from whether [`ME`] is among the participants.
    pub fn equal(participants: &[&str], paid_by: impl Into<String>) -> Self {
        let entries: Vec<SplitEntry> = participants.iter()
            .map(|participant| SplitEntry::new(*participant, None))
            .collect();

        Self::from_entries(SplitMode::Equal, entries, paid_by.into())
    }

    /// Builds a custom split from `(participant, amount)` pairs.
    pub fn custom(allocations: &[(&str, Decimal)], paid_by: impl Into<String>) -> Self {
        let entries: Vec<SplitEntry> = allocations.iter()
            .map(|(participant, amount)| SplitEntry::new(*participant, Some(*amount)))
            .collect();

        Self::from_entries(SplitMode::Custom, entries, paid_by.into())
    }

    fn from_entries(mode: SplitMode, entries: Vec<SplitEntry>, paid_by: String) -> Self {
        Self {
            mode,
            include_me: entries.iter().any(SplitEntry::is_me),
            total_participants: entries.len(),
            entries,
            paid_by
        }
    }

    pub fn entry(&self, participant: &str) -> Option<&SplitEntry> {
        self.entries.iter().find(|entry| entry.participant == participant)
    }

    pub fn has_participant(&self, participant: &str) -> bool {
        self.entry(participant).is_some()
    }
}
