use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::{SplitBreakdown, Transaction};
use crate::types::{GroupId, TransactionId};

/// Change to a single optional field.
///
/// `Clear` is a value of its own instead of an absent key, so a request to remove a
/// field survives serialization (`{"op":"clear"}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "value", rename_all = "lowercase")]
pub enum FieldPatch<T> {
    Keep,
    Set(T),
    Clear
}

impl<T> Default for FieldPatch<T> {
    fn default() -> Self {
        FieldPatch::Keep
    }
}

impl<T> FieldPatch<T> {
    pub fn is_keep(&self) -> bool {
        matches!(self, FieldPatch::Keep)
    }
}

impl<T: Clone> FieldPatch<T> {
    /// `Some` becomes `Set`, `None` becomes `Clear`.
    pub fn from_option(value: Option<T>) -> Self {
        match value {
            Some(value) => FieldPatch::Set(value),
            None => FieldPatch::Clear
        }
    }

    pub fn apply_to(&self, slot: &mut Option<T>) {
        match self {
            FieldPatch::Keep => {},
            FieldPatch::Set(value) => *slot = Some(value.clone()),
            FieldPatch::Clear => *slot = None
        }
    }
}

/// Field-level update of a transaction's relationship fields.
///
/// Flags use `None` for "leave unchanged"; optional fields use [`FieldPatch`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionPatch {
    pub id: TransactionId,
    #[serde(default, skip_serializing_if = "FieldPatch::is_keep")]
    pub link_parent_id: FieldPatch<TransactionId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_refund: Option<bool>,
    #[serde(default, skip_serializing_if = "FieldPatch::is_keep")]
    pub transaction_group_id: FieldPatch<GroupId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_split: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_shared: Option<bool>,
    #[serde(default, skip_serializing_if = "FieldPatch::is_keep")]
    pub split_breakdown: FieldPatch<SplitBreakdown>,
    #[serde(default, skip_serializing_if = "FieldPatch::is_keep")]
    pub split_share_amount: FieldPatch<Decimal>,
    #[serde(default, skip_serializing_if = "FieldPatch::is_keep")]
    pub net_amount: FieldPatch<Decimal>
}

impl TransactionPatch {
    pub fn new(id: impl Into<TransactionId>) -> Self {
        Self {
            id: id.into(),
            link_parent_id: FieldPatch::Keep,
            is_refund: None,
            transaction_group_id: FieldPatch::Keep,
            is_split: None,
            is_shared: None,
            split_breakdown: FieldPatch::Keep,
            split_share_amount: FieldPatch::Keep,
            net_amount: FieldPatch::Keep
        }
    }

    pub fn is_empty(&self) -> bool {
        self.link_parent_id.is_keep()
            && self.is_refund.is_none()
            && self.transaction_group_id.is_keep()
            && self.is_split.is_none()
            && self.is_shared.is_none()
            && self.split_breakdown.is_keep()
            && self.split_share_amount.is_keep()
            && self.net_amount.is_keep()
    }

    pub fn apply_to(&self, transaction: &mut Transaction) {
        self.link_parent_id.apply_to(&mut transaction.link_parent_id);
        self.transaction_group_id.apply_to(&mut transaction.transaction_group_id);
        self.split_breakdown.apply_to(&mut transaction.split_breakdown);
        self.split_share_amount.apply_to(&mut transaction.split_share_amount);
        self.net_amount.apply_to(&mut transaction.net_amount);

        if let Some(is_refund) = self.is_refund {
            transaction.is_refund = is_refund;
        }

        if let Some(is_split) = self.is_split {
            transaction.is_split = is_split;
        }

        if let Some(is_shared) = self.is_shared {
            transaction.is_shared = is_shared;
        }
    }
}
