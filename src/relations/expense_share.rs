use std::collections::HashSet;

use rust_decimal::Decimal;
use tracing::debug;

use crate::models::{
    FieldPatch, RelationshipError, SplitBreakdown, SplitEntry, SplitMode, Transaction, TransactionPatch, ME
};
use crate::types::{checked_total, within, Tolerances};

#[derive(Debug, Clone, PartialEq)]
pub struct ParticipantShare {
    pub participant: String,
    pub share: Decimal
}

/// Effective shares of a breakdown, with the reconciliation against the transaction amount.
#[derive(Debug, Clone, PartialEq)]
pub struct SharesResult {
    pub shares: Vec<ParticipantShare>,
    pub allocated: Decimal,
    /// `amount − allocated`.
    pub remaining: Decimal,
    pub balanced: bool
}

impl SharesResult {
    pub fn share_of(&self, participant: &str) -> Option<Decimal> {
        self.shares.iter()
            .find(|share| share.participant == participant)
            .map(|share| share.share)
    }
}

/// A validated breakdown ready to be stored on its transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct SavedShare {
    pub breakdown: SplitBreakdown,
    pub my_share: Decimal,
    /// Marks the transaction shared and stores the breakdown and `my_share`.
    pub patch: TransactionPatch
}

/// Computes and validates how a transaction is shared among participants.
///
/// Everything here is a pure function of the transaction and the breakdown.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExpenseShareCalculator {
    tolerances: Tolerances
}

impl ExpenseShareCalculator {
    pub fn new() -> Self {
        Self::with_tolerances(Tolerances::default())
    }

    pub fn with_tolerances(tolerances: Tolerances) -> Self {
        Self { tolerances }
    }

    /// # Errors
    /// `AmountOverflow` when the custom amounts cannot be added up.
    pub fn compute_shares(&self, transaction: &Transaction, breakdown: &SplitBreakdown) -> Result<SharesResult, RelationshipError> {
        let shares: Vec<ParticipantShare> = match breakdown.mode {
            SplitMode::Equal if breakdown.entries.is_empty() => Vec::new(),
            SplitMode::Equal => {
                let share = transaction.amount / Decimal::from(breakdown.entries.len());

                breakdown.entries.iter()
                    .map(|entry| ParticipantShare { participant: entry.participant.clone(), share })
                    .collect()
            },
            SplitMode::Custom => breakdown.entries.iter()
                .map(|entry| ParticipantShare {
                    participant: entry.participant.clone(),
                    share: entry.amount.unwrap_or(Decimal::ZERO)
                })
                .collect()
        };

        let allocated = checked_total(shares.iter().map(|share| share.share))
            .ok_or_else(|| RelationshipError::amount_overflow(&transaction.id))?;
        let remaining = transaction.amount.checked_sub(allocated)
            .ok_or_else(|| RelationshipError::amount_overflow(&transaction.id))?;
        let balanced = match breakdown.mode {
            SplitMode::Equal => !shares.is_empty(),
            SplitMode::Custom => within(remaining, Decimal::ZERO, self.tolerances.epsilon)
        };

        Ok(SharesResult {
            shares,
            allocated,
            remaining,
            balanced
        })
    }

    /// The ledger owner's share, zero when they are not a participant.
    pub fn my_share(&self, transaction: &Transaction, breakdown: &SplitBreakdown) -> Result<Decimal, RelationshipError> {
        if !breakdown.include_me {
            return Ok(Decimal::ZERO)
        }

        Ok(self.compute_shares(transaction, breakdown)?
            .share_of(ME)
            .unwrap_or(Decimal::ZERO))
    }

    /// Adds or removes the ledger owner as a participant.
    ///
    /// Removing the owner while they are the payer requires `fallback_payer`, one of the
    /// remaining participants.
    pub fn toggle_include_me(&self, breakdown: &SplitBreakdown, include: bool, fallback_payer: Option<&str>) -> Result<SplitBreakdown, RelationshipError> {
        let mut toggled = breakdown.clone();

        if include {
            if !toggled.has_participant(ME) {
                let amount = match toggled.mode {
                    SplitMode::Equal => None,
                    SplitMode::Custom => Some(Decimal::ZERO)
                };

                toggled.entries.insert(0, SplitEntry::new(ME, amount));
            }
        } else {
            if toggled.paid_by == ME {
                let fallback = fallback_payer.ok_or(RelationshipError::PayerRequired)?;

                if fallback == ME || !toggled.has_participant(fallback) {
                    return Err(RelationshipError::invalid_payer(fallback))
                }

                toggled.paid_by = fallback.to_string();
            }

            toggled.entries.retain(|entry| !entry.is_me());
        }

        toggled.include_me = include;
        toggled.total_participants = toggled.entries.len();

        Ok(toggled)
    }

    /// Validates `breakdown` and produces the finalized breakdown and the patch storing it.
    ///
    /// # Errors
    /// - `NoParticipants` for an empty breakdown.
    /// - `DuplicateParticipant` when a participant is listed twice.
    /// - `InvalidPayer` when `paid_by` is not one of the entries.
    /// - `NegativeShare` for an entry with an amount below zero.
    /// - `UnbalancedSplit` when custom amounts do not add up to the transaction amount.
    pub fn save(&self, transaction: &Transaction, breakdown: &SplitBreakdown) -> Result<SavedShare, RelationshipError> {
        if breakdown.entries.is_empty() {
            return Err(RelationshipError::NoParticipants)
        }

        let mut seen = HashSet::new();

        for entry in &breakdown.entries {
            if !seen.insert(entry.participant.as_str()) {
                return Err(RelationshipError::DuplicateParticipant { participant: entry.participant.clone() })
            }
        }

        if !breakdown.has_participant(&breakdown.paid_by) {
            return Err(RelationshipError::invalid_payer(&breakdown.paid_by))
        }

        for entry in &breakdown.entries {
            if let Some(amount) = entry.amount.filter(|amount| *amount < Decimal::ZERO) {
                return Err(RelationshipError::NegativeShare { participant: entry.participant.clone(), amount })
            }
        }

        let result = self.compute_shares(transaction, breakdown)?;

        if !result.balanced {
            return Err(RelationshipError::UnbalancedSplit {
                expected: transaction.amount,
                allocated: result.allocated,
                remaining: result.remaining
            })
        }

        let finalized = finalize(transaction, breakdown, &result);
        let my_share = self.my_share(transaction, &finalized)?;

        let mut patch = TransactionPatch::new(transaction.id.clone());
        patch.is_shared = Some(true);
        patch.split_breakdown = FieldPatch::Set(finalized.clone());
        patch.split_share_amount = FieldPatch::Set(my_share);

        debug!("Shared [{}] among [{}] participants, own share [{my_share}]", transaction.id, finalized.total_participants);

        Ok(SavedShare {
            breakdown: finalized,
            my_share,
            patch
        })
    }

    /// The patch that returns `transaction` to an unshared state.
    pub fn clear(&self, transaction: &Transaction) -> TransactionPatch {
        let mut patch = TransactionPatch::new(transaction.id.clone());
        patch.is_shared = Some(false);
        patch.split_breakdown = FieldPatch::Clear;
        patch.split_share_amount = FieldPatch::Clear;
        patch
    }
}

fn finalize(transaction: &Transaction, breakdown: &SplitBreakdown, result: &SharesResult) -> SplitBreakdown {
    let mut finalized = breakdown.clone();

    for (entry, share) in finalized.entries.iter_mut().zip(&result.shares) {
        let paid_share = if entry.participant == breakdown.paid_by { transaction.amount } else { Decimal::ZERO };

        entry.paid_share = Some(paid_share);
        entry.net_balance = Some(paid_share - share.share);
    }

    finalized.include_me = finalized.has_participant(ME);
    finalized.total_participants = finalized.entries.len();
    finalized
}
