use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::models::{FieldPatch, RelationshipError, Transaction, TransactionPatch};
use crate::relations::RefundLinkManager;
use crate::storage::Storage;
use crate::types::{checked_total, distribute_evenly, within, AccountId, GroupId, Tolerances, TransactionId};

/// One requested part of a transaction split.
///
/// `date`, `account_id` and `tags` are copied from the original unless given here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitPart {
    pub description: String,
    pub amount: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<AccountId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>
}

impl SplitPart {
    pub fn new(description: impl Into<String>, amount: Decimal) -> Self {
        Self {
            description: description.into(),
            amount,
            date: None,
            account_id: None,
            tags: None
        }
    }
}

/// What happened to the transaction that was split.
#[derive(Debug, Clone, PartialEq)]
pub enum OriginalDisposition {
    /// Kept as the non-split anchor of the split group.
    Retained(TransactionPatch),
    /// Permanently removed; this is the last copy of it.
    Deleted(Transaction)
}

#[derive(Debug, Clone, PartialEq)]
pub struct SplitResult {
    pub group_id: GroupId,
    pub original_id: TransactionId,
    /// The generated parts, in the order they were requested.
    pub parts: Vec<Transaction>,
    pub original: OriginalDisposition,
    /// Net amount update of the refund parent when the deleted original was a linked refund.
    pub refund_parent_patch: Option<TransactionPatch>
}

/// Decomposes one transaction into several transactions summing to it.
#[derive(Debug, Default, Clone, Copy)]
pub struct SplitEngine {
    tolerances: Tolerances
}

impl SplitEngine {
    pub fn new() -> Self {
        Self::with_tolerances(Tolerances::default())
    }

    pub fn with_tolerances(tolerances: Tolerances) -> Self {
        Self { tolerances }
    }

    /// Checks that `parts` may replace a transaction of `original_amount`.
    ///
    /// # Errors
    /// - `MinimumParts` for fewer than two parts.
    /// - `EmptyDescription` / `NonPositiveAmount` for the first offending part.
    /// - `UnbalancedParts` when the parts do not add up to `|original_amount|`.
    pub fn validate_parts(&self, original_amount: Decimal, parts: &[SplitPart]) -> Result<(), RelationshipError> {
        if parts.len() < 2 {
            return Err(RelationshipError::MinimumParts { count: parts.len() })
        }

        for (index, part) in parts.iter().enumerate() {
            if part.description.trim().is_empty() {
                return Err(RelationshipError::EmptyDescription { index })
            }

            if part.amount <= Decimal::ZERO {
                return Err(RelationshipError::NonPositiveAmount { index, amount: part.amount })
            }
        }

        let expected = original_amount.abs();
        let allocated = allocated(parts)?;

        if !within(allocated, expected, self.tolerances.epsilon) {
            return Err(RelationshipError::UnbalancedParts {
                expected,
                allocated,
                remaining: expected - allocated
            })
        }

        Ok(())
    }

    /// Amount still to be allocated, negative when the parts overshoot.
    pub fn remaining(&self, original_amount: Decimal, parts: &[SplitPart]) -> Result<Decimal, RelationshipError> {
        original_amount.abs()
            .checked_sub(allocated(parts)?)
            .ok_or_else(|| RelationshipError::amount_overflow("split parts"))
    }

    /// Cent-rounded even amounts for `count` parts; the last part takes the rounding remainder.
    pub fn auto_distribute(&self, original_amount: Decimal, count: usize) -> Vec<Decimal> {
        distribute_evenly(original_amount.abs(), count)
    }

    /// Replaces `transaction_id` by the given parts.
    ///
    /// The parts share a new group id and are flagged `is_split`. The original either stays
    /// behind as the group's non-split anchor or, with `delete_original`, is removed for good.
    /// Deleting a linked refund recomputes the net amount of its parent.
    ///
    /// # Errors
    /// Any error of [`validate_parts`](Self::validate_parts), plus:
    /// - `TransactionNotFound` when the original is missing.
    /// - `AlreadyGrouped` when the original is already a transfer leg or part of a split.
    /// - `LinkedRefunds` when deleting an original that refunds still point to.
    pub fn apply<S: Storage>(&self, storage: &S, transaction_id: &str, parts: &[SplitPart], delete_original: bool) -> Result<SplitResult, RelationshipError> {
        let original = storage.load(transaction_id).ok_or_else(|| RelationshipError::not_found(transaction_id))?;

        if let Some(group_id) = &original.transaction_group_id {
            return Err(RelationshipError::already_grouped(&original, group_id))
        }

        self.validate_parts(original.amount, parts)?;

        if delete_original {
            let refunds = storage.refunds_of(transaction_id);

            if !refunds.is_empty() {
                return Err(RelationshipError::LinkedRefunds {
                    transaction_id: transaction_id.to_string(),
                    count: refunds.len()
                })
            }
        }

        let group_id = Uuid::new_v4().to_string();
        let generated: Vec<Transaction> = parts.iter()
            .map(|part| build_part(&original, part, &group_id))
            .collect();

        for part in &generated {
            storage.save(part.clone());
        }

        let mut refund_parent_patch = None;

        let disposition = if delete_original {
            storage.remove(transaction_id);

            if let Some(parent_id) = &original.link_parent_id {
                refund_parent_patch = RefundLinkManager::new()
                    .recompute(storage, parent_id)
                    .and_then(|(_, patch)| patch);

                debug!("Deleted refund [{transaction_id}], recomputed parent [{parent_id}]");
            }

            OriginalDisposition::Deleted(original)
        } else {
            let mut patch = TransactionPatch::new(transaction_id);
            patch.transaction_group_id = FieldPatch::Set(group_id.clone());
            patch.is_split = Some(false);

            storage.apply(&patch);
            OriginalDisposition::Retained(patch)
        };

        debug!("Split [{transaction_id}] into [{}] parts as group [{group_id}]", generated.len());

        Ok(SplitResult {
            group_id,
            original_id: transaction_id.to_string(),
            parts: generated,
            original: disposition,
            refund_parent_patch
        })
    }
}

fn allocated(parts: &[SplitPart]) -> Result<Decimal, RelationshipError> {
    checked_total(parts.iter().map(|part| part.amount))
        .ok_or_else(|| RelationshipError::amount_overflow("split parts"))
}

fn build_part(original: &Transaction, part: &SplitPart, group_id: &str) -> Transaction {
    let mut transaction = Transaction::new(
        Uuid::new_v4().to_string(),
        original.direction,
        part.amount,
        part.date.unwrap_or(original.date)
    )
    .with_description(part.description.trim())
    .with_tags(part.tags.clone().unwrap_or_else(|| original.tags.clone()));

    transaction.account_id = part.account_id.clone().or_else(|| original.account_id.clone());
    transaction.transaction_group_id = Some(group_id.to_string());
    transaction.is_split = true;
    transaction
}
