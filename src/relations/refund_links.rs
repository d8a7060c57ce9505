use rust_decimal::Decimal;
use tracing::debug;

use crate::models::{Direction, FieldPatch, RelationshipError, Transaction, TransactionPatch};
use crate::storage::Storage;
use crate::types::{checked_total, TransactionId};

/// Outcome of [`RefundLinkManager::link`].
#[derive(Debug, Clone, PartialEq)]
pub struct LinkResult {
    pub child_id: TransactionId,
    pub parent_id: TransactionId,
    /// The parent the child was linked to before, when this was a re-link.
    pub previous_parent_id: Option<TransactionId>,
    /// The parent's amount after all linked refunds. Zero when fully refunded.
    pub parent_net_amount: Decimal,
    /// Every change made to storage, in the order it was applied.
    pub patches: Vec<TransactionPatch>
}

/// Outcome of [`RefundLinkManager::unlink`].
#[derive(Debug, Clone, PartialEq)]
pub struct UnlinkResult {
    pub child_id: TransactionId,
    pub previous_parent_id: Option<TransactionId>,
    pub previous_parent_net_amount: Option<Decimal>,
    pub patches: Vec<TransactionPatch>
}

impl UnlinkResult {
    pub fn was_linked(&self) -> bool {
        self.previous_parent_id.is_some()
    }
}

/// Maintains refund links between credit children and debit parents.
///
/// A parent's `net_amount` is always derived from its currently linked refunds and is
/// recomputed here, and only here, whenever the set of linked refunds changes.
#[derive(Debug, Default, Clone, Copy)]
pub struct RefundLinkManager;

impl RefundLinkManager {
    pub fn new() -> Self {
        Self
    }

    /// Links the credit `child_id` as a refund of the debit `parent_id`.
    ///
    /// A child already linked to another parent is moved, and both parents are recomputed.
    ///
    /// # Errors
    /// - `SelfReference` when both ids are equal.
    /// - `TransactionNotFound` when either transaction is missing.
    /// - `InvalidDirection` when the child is not a credit or the parent is not a debit.
    pub fn link<S: Storage>(&self, storage: &S, child_id: &str, parent_id: &str) -> Result<LinkResult, RelationshipError> {
        if child_id == parent_id {
            return Err(RelationshipError::self_reference(child_id))
        }

        let child = storage.load(child_id).ok_or_else(|| RelationshipError::not_found(child_id))?;
        let parent = storage.load(parent_id).ok_or_else(|| RelationshipError::not_found(parent_id))?;

        if !child.is_credit() {
            return Err(RelationshipError::invalid_direction(&child, Direction::Credit))
        }

        if !parent.is_debit() {
            return Err(RelationshipError::invalid_direction(&parent, Direction::Debit))
        }

        let previous_parent_id = child.link_parent_id.clone().filter(|previous| previous != parent_id);
        let mut patches = Vec::new();

        if child.link_parent_id.as_deref() != Some(parent_id) || !child.is_refund {
            let mut patch = TransactionPatch::new(child_id);
            patch.link_parent_id = FieldPatch::Set(parent_id.to_string());
            patch.is_refund = Some(true);

            storage.apply(&patch);
            patches.push(patch);
        }

        if let Some(previous) = &previous_parent_id {
            if let Some((_, Some(patch))) = self.recompute(storage, previous) {
                patches.push(patch);
            }
        }

        let (parent_net_amount, parent_patch) = self.recompute(storage, parent_id)
            .ok_or_else(|| RelationshipError::not_found(parent_id))?;

        patches.extend(parent_patch);

        debug!("Refund [{child_id}] linked to [{parent_id}], net amount now [{parent_net_amount}]");

        Ok(LinkResult {
            child_id: child_id.to_string(),
            parent_id: parent_id.to_string(),
            previous_parent_id,
            parent_net_amount,
            patches
        })
    }

    /// Removes the refund link of `child_id`, if any, and recomputes the former parent.
    pub fn unlink<S: Storage>(&self, storage: &S, child_id: &str) -> Result<UnlinkResult, RelationshipError> {
        let child = storage.load(child_id).ok_or_else(|| RelationshipError::not_found(child_id))?;

        let Some(parent_id) = child.link_parent_id.clone() else {
            debug!("Refund [{child_id}] is not linked, nothing to unlink");

            return Ok(UnlinkResult {
                child_id: child_id.to_string(),
                previous_parent_id: None,
                previous_parent_net_amount: None,
                patches: Vec::new()
            })
        };

        let mut patch = TransactionPatch::new(child_id);
        patch.link_parent_id = FieldPatch::Clear;
        patch.is_refund = Some(false);

        storage.apply(&patch);

        let mut patches = vec![patch];
        let recomputed = self.recompute(storage, &parent_id);
        let previous_parent_net_amount = recomputed.as_ref().map(|(net_amount, _)| *net_amount);

        if let Some((_, Some(parent_patch))) = recomputed {
            patches.push(parent_patch);
        }

        debug!("Refund [{child_id}] unlinked from [{parent_id}]");

        Ok(UnlinkResult {
            child_id: child_id.to_string(),
            previous_parent_id: Some(parent_id),
            previous_parent_net_amount,
            patches
        })
    }

    /// Current net amount of `parent_id` after its linked refunds.
    pub fn net_amount_of<S: Storage>(&self, storage: &S, parent_id: &str) -> Result<Decimal, RelationshipError> {
        let parent = storage.load(parent_id).ok_or_else(|| RelationshipError::not_found(parent_id))?;
        Ok(Self::net_amount(&parent, &storage.refunds_of(parent_id)))
    }

    /// `max(0, parent.amount - Σ refunds)`.
    pub fn net_amount(parent: &Transaction, refunds: &[Transaction]) -> Decimal {
        // A refund total past the Decimal range is larger than any parent amount.
        checked_total(refunds.iter().map(|refund| refund.amount))
            .map_or(Decimal::ZERO, |refunded| (parent.amount - refunded).max(Decimal::ZERO))
    }

    /// The value stored in `net_amount`: present only for a partial reduction.
    fn stored_net_amount(parent: &Transaction, net_amount: Decimal) -> Option<Decimal> {
        if net_amount > Decimal::ZERO && net_amount < parent.amount {
            Some(net_amount)
        } else {
            None
        }
    }

    /// Recomputes and stores the net amount of `parent_id`; the patch is `None` when nothing changed.
    pub(crate) fn recompute<S: Storage>(&self, storage: &S, parent_id: &str) -> Option<(Decimal, Option<TransactionPatch>)> {
        let parent = storage.load(parent_id)?;
        let net_amount = Self::net_amount(&parent, &storage.refunds_of(parent_id));
        let stored = Self::stored_net_amount(&parent, net_amount);

        if stored == parent.net_amount {
            return Some((net_amount, None))
        }

        let mut patch = TransactionPatch::new(parent_id);
        patch.net_amount = FieldPatch::from_option(stored);
        storage.apply(&patch);

        Some((net_amount, Some(patch)))
    }

    /// Keeps the search results that `child` may be linked to as a refund.
    pub fn filter_parent_candidates(&self, child: &Transaction, candidates: Vec<Transaction>) -> Vec<Transaction> {
        candidates.into_iter()
            .filter(|candidate| candidate.is_debit() && candidate.id != child.id)
            .collect()
    }

    /// Keeps the search results that may be linked to `parent` as refunds.
    pub fn filter_refund_candidates(&self, parent: &Transaction, candidates: Vec<Transaction>) -> Vec<Transaction> {
        candidates.into_iter()
            .filter(|candidate| candidate.is_credit() && candidate.id != parent.id)
            .collect()
    }
}
