mod expense_share;
mod refund_links;
mod split_engine;
#[cfg(test)]
mod tests;
mod transfer_groups;

pub use expense_share::{ExpenseShareCalculator, ParticipantShare, SavedShare, SharesResult};
pub use refund_links::{LinkResult, RefundLinkManager, UnlinkResult};
pub use split_engine::{OriginalDisposition, SplitEngine, SplitPart, SplitResult};
pub use transfer_groups::{BalanceStatus, GroupBalance, GroupResult, GroupStatus, RemovalResult, TransferGroupManager};
