use crate::models::Transaction;
use crate::storage::Storage;
use crate::types::TransactionId;
use dashmap::iter::Iter;
use dashmap::DashMap;
use std::sync::Arc;

pub struct TransactionStorage {
    cache: Arc<DashMap<TransactionId, Transaction>>
}

impl TransactionStorage {
    pub fn new() -> Self {
        Self {
            cache: Arc::new(DashMap::new())
        }
    }

    pub fn iter(&self) -> Iter<'_, TransactionId, Transaction> {
        self.cache.iter()
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// All transactions ordered by id.
    pub fn snapshot(&self) -> Vec<Transaction> {
        self.find(&|_| true)
    }
}

impl Default for TransactionStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl Storage for TransactionStorage {
    fn load(&self, transaction_id: &str) -> Option<Transaction> {
        self.cache.get(transaction_id).map(|entry| entry.value().clone())
    }

    fn save(&self, transaction: Transaction) {
        self.cache.insert(transaction.id.clone(), transaction);
    }

    fn remove(&self, transaction_id: &str) -> Option<Transaction> {
        self.cache.remove(transaction_id).map(|(_, transaction)| transaction)
    }

    fn find(&self, predicate: &dyn Fn(&Transaction) -> bool) -> Vec<Transaction> {
        let mut matches: Vec<Transaction> = self.cache.iter()
            .filter(|entry| predicate(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();

        matches.sort_by(|left, right| left.id.cmp(&right.id));
        matches
    }
}
