use crate::engine::errors::EngineError;
use crate::engine::ledger_engine::LedgerEngine;
use crate::engine::operation::{LedgerRecord, Operation};
use crate::gateway::Persistence;
use crate::models::{RelationshipError, Transaction};
use crate::storage::{Storage, TransactionStorage};
use crate::types::{GroupId, Tolerances};
use csv::{ReaderBuilder, Trim};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::{spawn_blocking, JoinHandle};
use tracing::{debug, error, warn};

/// Counts of what happened to the operations of one script.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq)]
pub struct BatchSummary {
    pub applied: usize,
    /// Failed validation, nothing changed.
    pub rejected: usize,
    /// Applied in memory but not (fully) persisted.
    pub unpersisted: usize,
    /// Lines that could not be parsed.
    pub malformed: usize
}

/// Applies a ledger CSV and a JSON-lines operations script through a [`LedgerEngine`].
pub struct BatchRunner<P: Persistence> {
    engine: LedgerEngine<TransactionStorage, P>,
    backpressure: usize
}

impl<P: Persistence> BatchRunner<P> {
    pub fn new(storage: Arc<TransactionStorage>, persistence: Arc<P>) -> Self {
        Self {
            engine: LedgerEngine::new(storage, persistence),
            backpressure: 256
        }
    }

    pub fn with_tolerances(mut self, tolerances: Tolerances) -> Self {
        self.engine = self.engine.with_tolerances(tolerances);
        self
    }

    pub fn engine(&self) -> &LedgerEngine<TransactionStorage, P> {
        &self.engine
    }

    /// Loads the ledger CSV into storage and returns how many transactions were read.
    ///
    /// Malformed rows are logged and skipped, a missing file loads nothing.
    pub async fn load_ledger(&self, path: &str) -> anyhow::Result<usize> {
        let path = path.to_string();
        let transactions = spawn_blocking(move || read_ledger(&path)).await?;
        let count = transactions.len();

        for transaction in transactions {
            self.engine.storage().save(transaction);
        }

        Ok(count)
    }

    /// Streams the operations script and applies every operation in order.
    pub async fn run(&self, path: &str) -> anyhow::Result<BatchSummary> {
        let (sender, receiver) = mpsc::channel::<Operation>(self.backpressure);
        let reader_handle = self.spawn_operation_reader(path.to_string(), sender);
        let mut summary = self.process_operations(receiver).await;

        match reader_handle.await {
            Ok(malformed) => summary.malformed = malformed,
            Err(error) => error!("Operation ingestion failed: {error}")
        }

        Ok(summary)
    }

    fn spawn_operation_reader(&self, path: String, sender: mpsc::Sender<Operation>) -> JoinHandle<usize> {
        spawn_blocking(move || {
            let file = match File::open(&path) {
                Ok(file) => file,
                Err(error) => {
                    error!("Error opening operations at path: {path} | {error}");
                    return 0;
                }
            };

            let mut malformed = 0;

            for (index, line) in BufReader::new(file).lines().enumerate() {
                let line = match line {
                    Ok(line) => line,
                    Err(error) => {
                        error!("Error reading operations at path: {path} | {error}");
                        break;
                    }
                };

                let line = line.trim();

                if line.is_empty() || line.starts_with('#') {
                    continue;
                }

                match serde_json::from_str::<Operation>(line) {
                    Ok(operation) => {
                        if sender.blocking_send(operation).is_err() {
                            break;
                        }
                    }
                    Err(error) => {
                        malformed += 1;
                        error!("Operation deserialization error on line [{}]: {error}", index + 1);
                    }
                }
            }

            malformed
        })
    }

    async fn process_operations(&self, mut receiver: mpsc::Receiver<Operation>) -> BatchSummary {
        let mut summary = BatchSummary::default();

        while let Some(operation) = receiver.recv().await {
            let name = operation.name();

            match self.execute(operation).await {
                Ok(()) => {
                    debug!("Operation [{name}] applied");
                    summary.applied += 1;
                },
                Err(EngineError::Rejected(error)) => {
                    warn!("Operation [{name}] rejected: {error}");
                    summary.rejected += 1;
                },
                Err(error) => {
                    warn!("Operation [{name}] not fully persisted: {error}");
                    summary.unpersisted += 1;
                }
            }
        }

        summary
    }

    async fn execute(&self, operation: Operation) -> Result<(), EngineError> {
        match operation {
            Operation::LinkRefund { child, parent } => {
                self.engine.link_refund(&child, &parent).await?;
            },
            Operation::UnlinkRefund { child } => {
                self.engine.unlink_refund(&child).await?;
            },
            Operation::Group { transactions } => {
                self.engine.group(&transactions).await?;
            },
            Operation::AddToGroup { member, transactions } => {
                let group_id = self.group_of(&member)?;
                self.engine.add_to_group(&group_id, &transactions).await?;
            },
            Operation::RemoveFromGroup { transaction } => {
                self.engine.remove_from_group(&transaction).await?;
            },
            Operation::Ungroup { member } => match self.group_of(&member) {
                Ok(group_id) => {
                    self.engine.ungroup(&group_id).await?;
                },
                Err(EngineError::Rejected(RelationshipError::NotGrouped { .. })) => {
                    debug!("Transaction [{member}] is already ungrouped");
                },
                Err(error) => return Err(error)
            },
            Operation::Split { transaction, parts, delete_original } => {
                self.engine.split(&transaction, &parts, delete_original).await?;
            },
            Operation::Share { transaction, breakdown } => {
                self.engine.save_share(&transaction, &breakdown).await?;
            },
            Operation::ClearShare { transaction } => {
                self.engine.clear_share(&transaction).await?;
            }
        }

        Ok(())
    }

    fn group_of(&self, member: &str) -> Result<GroupId, EngineError> {
        let transaction = self.engine.storage().load(member)
            .ok_or_else(|| RelationshipError::not_found(member))?;

        let group_id = transaction.transaction_group_id
            .ok_or_else(|| RelationshipError::NotGrouped { transaction_id: member.to_string() })?;

        Ok(group_id)
    }
}

fn read_ledger(path: &str) -> Vec<Transaction> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(error) => {
            error!("Error opening ledger CSV at path: {path} | {error}");
            return Vec::new();
        }
    };

    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(BufReader::new(file));

    let mut transactions = Vec::new();

    for result in reader.deserialize::<LedgerRecord>() {
        match result {
            Ok(record) => transactions.push(Transaction::from(record)),
            Err(error) => error!("Ledger CSV deserialization error: {error}")
        }
    }

    transactions
}
