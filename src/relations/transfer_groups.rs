use std::collections::BTreeSet;

use rust_decimal::Decimal;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::{FieldPatch, RelationshipError, Transaction, TransactionPatch};
use crate::storage::Storage;
use crate::types::{checked_total, GroupId, Tolerances, TransactionId};

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum GroupStatus {
    /// A new group was created.
    Grouped,
    /// Transactions were added to an existing group.
    Extended,
    /// One member left and the group still has at least two members.
    Removed,
    /// The group no longer exists.
    Dissolved,
    /// There was nothing to ungroup.
    AlreadyUngrouped
}

/// Outcome of the group-level operations of [`TransferGroupManager`].
#[derive(Debug, Clone, PartialEq)]
pub struct GroupResult {
    pub group_id: GroupId,
    pub status: GroupStatus,
    /// Members of the group after the operation.
    pub members: Vec<TransactionId>,
    /// Former groups of the moved transactions that were left with a single member.
    pub dissolved_groups: Vec<GroupId>,
    pub patches: Vec<TransactionPatch>
}

/// Outcome of [`TransferGroupManager::remove_from_group`].
#[derive(Debug, Clone, PartialEq)]
pub struct RemovalResult {
    pub transaction_id: TransactionId,
    /// The group the transaction belonged to, `None` when it was not grouped.
    pub group_id: Option<GroupId>,
    pub status: GroupStatus,
    pub patches: Vec<TransactionPatch>
}

/// Advisory classification of a transfer group's net balance.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum BalanceStatus {
    Balanced,
    Warning,
    Imbalanced
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupBalance {
    pub group_id: GroupId,
    /// Σ credits − Σ debits over the legs.
    pub net: Decimal,
    pub status: BalanceStatus
}

/// Maintains transfer groups: two or more legs sharing a `transaction_group_id`.
///
/// Split parts and split anchors share the same field but are never transfer legs, every
/// operation here refuses to touch them.
#[derive(Debug, Default, Clone, Copy)]
pub struct TransferGroupManager {
    tolerances: Tolerances
}

impl TransferGroupManager {
    pub fn new() -> Self {
        Self::with_tolerances(Tolerances::default())
    }

    pub fn with_tolerances(tolerances: Tolerances) -> Self {
        Self { tolerances }
    }

    /// Puts the given transactions into a freshly generated group.
    ///
    /// Duplicate ids are ignored. Transactions leaving a previous group may dissolve it.
    pub fn group<S: Storage>(&self, storage: &S, transaction_ids: &[TransactionId]) -> Result<GroupResult, RelationshipError> {
        let unique_ids = unique(transaction_ids);

        if unique_ids.len() < 2 {
            return Err(RelationshipError::TooFewMembers { count: unique_ids.len() })
        }

        let transactions = self.load_legs(storage, &unique_ids)?;
        let group_id = Uuid::new_v4().to_string();

        let (mut patches, previous_groups) = assign(storage, &transactions, &group_id);
        let dissolved_groups = dissolve_orphans(storage, previous_groups, &mut patches);

        debug!("Grouped [{}] transactions as transfer group [{group_id}]", unique_ids.len());

        Ok(GroupResult {
            status: GroupStatus::Grouped,
            members: unique_ids,
            group_id,
            dissolved_groups,
            patches
        })
    }

    /// Adds transactions to the existing group `group_id`. Members already in it are skipped.
    pub fn add_to_group<S: Storage>(&self, storage: &S, group_id: &str, transaction_ids: &[TransactionId]) -> Result<GroupResult, RelationshipError> {
        let existing = storage.members_of(group_id);

        if existing.is_empty() {
            return Err(RelationshipError::group_not_found(group_id))
        }

        if let Some(split) = existing.iter().find(|member| member.is_split) {
            return Err(RelationshipError::split_part_excluded(split))
        }

        let candidates = self.load_legs(storage, &unique(transaction_ids))?;
        let joining: Vec<Transaction> = candidates.into_iter()
            .filter(|transaction| !transaction.in_group(group_id))
            .collect();

        let (mut patches, previous_groups) = assign(storage, &joining, group_id);
        let dissolved_groups = dissolve_orphans(storage, previous_groups, &mut patches);

        debug!("Added [{}] transactions to transfer group [{group_id}]", joining.len());

        Ok(GroupResult {
            group_id: group_id.to_string(),
            status: GroupStatus::Extended,
            members: member_ids(storage, group_id),
            dissolved_groups,
            patches
        })
    }

    /// Takes one transaction out of its group, dissolving the group if one member would remain.
    pub fn remove_from_group<S: Storage>(&self, storage: &S, transaction_id: &str) -> Result<RemovalResult, RelationshipError> {
        let transaction = storage.load(transaction_id).ok_or_else(|| RelationshipError::not_found(transaction_id))?;

        let Some(group_id) = transaction.transaction_group_id.clone() else {
            return Ok(RemovalResult {
                transaction_id: transaction_id.to_string(),
                group_id: None,
                status: GroupStatus::AlreadyUngrouped,
                patches: Vec::new()
            })
        };

        ensure_transfer_leg(storage, &transaction)?;

        let mut patches = vec![clear_group(storage, transaction_id)];
        let remaining = storage.members_of(&group_id);

        let status = if remaining.len() <= 1 {
            for member in remaining {
                patches.push(clear_group(storage, &member.id));
            }

            GroupStatus::Dissolved
        } else {
            GroupStatus::Removed
        };

        debug!("Removed [{transaction_id}] from transfer group [{group_id}]: {status:?}");

        Ok(RemovalResult {
            transaction_id: transaction_id.to_string(),
            group_id: Some(group_id),
            status,
            patches
        })
    }

    /// Clears the group id on every member. Ungrouping an empty group is not an error.
    pub fn ungroup<S: Storage>(&self, storage: &S, group_id: &str) -> Result<GroupResult, RelationshipError> {
        let members = storage.members_of(group_id);

        if let Some(split) = members.iter().find(|member| member.is_split) {
            return Err(RelationshipError::split_part_excluded(split))
        }

        if members.is_empty() {
            debug!("Transfer group [{group_id}] is already ungrouped");
        }

        let status = if members.is_empty() { GroupStatus::AlreadyUngrouped } else { GroupStatus::Dissolved };
        let patches: Vec<TransactionPatch> = members.iter()
            .map(|member| clear_group(storage, &member.id))
            .collect();

        Ok(GroupResult {
            group_id: group_id.to_string(),
            status,
            members: Vec::new(),
            dissolved_groups: Vec::new(),
            patches
        })
    }

    /// Computes the signed net across the legs of `group_id` and classifies it.
    pub fn balance<S: Storage>(&self, storage: &S, group_id: &str) -> Result<GroupBalance, RelationshipError> {
        let members = storage.members_of(group_id);

        if members.is_empty() {
            return Err(RelationshipError::group_not_found(group_id))
        }

        if let Some(split) = members.iter().find(|member| member.is_split) {
            return Err(RelationshipError::split_part_excluded(split))
        }

        let net = checked_total(members.iter().map(Transaction::signed_amount))
            .ok_or_else(|| RelationshipError::amount_overflow(group_id))?;
        let status = self.classify(net);

        if status != BalanceStatus::Balanced {
            warn!("Transfer group [{group_id}] does not net to zero: [{net}] ({status:?})");
        }

        Ok(GroupBalance {
            group_id: group_id.to_string(),
            net,
            status
        })
    }

    pub fn classify(&self, net: Decimal) -> BalanceStatus {
        let magnitude = net.abs();

        if magnitude < self.tolerances.transfer_balanced_below {
            BalanceStatus::Balanced
        } else if magnitude < self.tolerances.transfer_warning_below {
            BalanceStatus::Warning
        } else {
            BalanceStatus::Imbalanced
        }
    }

    /// Keeps the search results that may become transfer legs.
    pub fn filter_candidates<S: Storage>(&self, storage: &S, candidates: Vec<Transaction>) -> Vec<Transaction> {
        candidates.into_iter()
            .filter(|candidate| ensure_transfer_leg(storage, candidate).is_ok())
            .collect()
    }

    fn load_legs<S: Storage>(&self, storage: &S, transaction_ids: &[TransactionId]) -> Result<Vec<Transaction>, RelationshipError> {
        transaction_ids.iter()
            .map(|transaction_id| {
                let transaction = storage.load(transaction_id)
                    .ok_or_else(|| RelationshipError::not_found(transaction_id))?;

                ensure_transfer_leg(storage, &transaction)?;

                Ok(transaction)
            })
            .collect()
    }
}

fn unique(transaction_ids: &[TransactionId]) -> Vec<TransactionId> {
    let mut seen = BTreeSet::new();
    let mut unique_ids = Vec::with_capacity(transaction_ids.len());

    for transaction_id in transaction_ids {
        if seen.insert(transaction_id.as_str()) {
            unique_ids.push(transaction_id.clone());
        }
    }

    unique_ids
}

/// Split parts, and anchors of a group that contains split parts, are not transfer legs.
fn ensure_transfer_leg<S: Storage>(storage: &S, transaction: &Transaction) -> Result<(), RelationshipError> {
    if transaction.is_split {
        return Err(RelationshipError::split_part_excluded(transaction))
    }

    if let Some(group_id) = &transaction.transaction_group_id {
        if storage.members_of(group_id).iter().any(|member| member.is_split) {
            return Err(RelationshipError::split_part_excluded(transaction))
        }
    }

    Ok(())
}

fn assign<S: Storage>(storage: &S, transactions: &[Transaction], group_id: &str) -> (Vec<TransactionPatch>, BTreeSet<GroupId>) {
    let mut patches = Vec::with_capacity(transactions.len());
    let mut previous_groups = BTreeSet::new();

    for transaction in transactions {
        if let Some(previous) = &transaction.transaction_group_id {
            if previous != group_id {
                previous_groups.insert(previous.clone());
            }
        }

        let mut patch = TransactionPatch::new(transaction.id.clone());
        patch.transaction_group_id = FieldPatch::Set(group_id.to_string());

        storage.apply(&patch);
        patches.push(patch);
    }

    (patches, previous_groups)
}

fn dissolve_orphans<S: Storage>(storage: &S, groups: BTreeSet<GroupId>, patches: &mut Vec<TransactionPatch>) -> Vec<GroupId> {
    let mut dissolved = Vec::new();

    for group_id in groups {
        let members = storage.members_of(&group_id);

        if members.len() > 1 {
            continue;
        }

        for member in members {
            patches.push(clear_group(storage, &member.id));
        }

        debug!("Transfer group [{group_id}] dissolved, fewer than two members left");
        dissolved.push(group_id);
    }

    dissolved
}

fn clear_group<S: Storage>(storage: &S, transaction_id: &str) -> TransactionPatch {
    let mut patch = TransactionPatch::new(transaction_id);
    patch.transaction_group_id = FieldPatch::Clear;

    storage.apply(&patch);
    patch
}

fn member_ids<S: Storage>(storage: &S, group_id: &str) -> Vec<TransactionId> {
    storage.members_of(group_id).into_iter().map(|member| member.id).collect()
}
