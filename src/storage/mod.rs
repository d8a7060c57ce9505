mod transaction_storage;

use crate::models::{Transaction, TransactionPatch};

pub use transaction_storage::TransactionStorage;

/// The in-memory transaction collection the relationship components operate on.
pub trait Storage: Send + Sync + 'static {
    fn load(&self, transaction_id: &str) -> Option<Transaction>;
    fn save(&self, transaction: Transaction);
    fn remove(&self, transaction_id: &str) -> Option<Transaction>;
    /// Returns every transaction matching `predicate`, ordered by id.
    fn find(&self, predicate: &dyn Fn(&Transaction) -> bool) -> Vec<Transaction>;

    /// Applies `patch` to the stored transaction and returns the updated copy.
    fn apply(&self, patch: &TransactionPatch) -> Option<Transaction> {
        let mut transaction = self.load(&patch.id)?;
        patch.apply_to(&mut transaction);
        self.save(transaction.clone());
        Some(transaction)
    }

    /// Refunds currently linked to `parent_id`.
    fn refunds_of(&self, parent_id: &str) -> Vec<Transaction> {
        self.find(&|transaction| transaction.link_parent_id.as_deref() == Some(parent_id))
    }

    fn members_of(&self, group_id: &str) -> Vec<Transaction> {
        self.find(&|transaction| transaction.in_group(group_id))
    }
}
