mod batch_runner;
mod errors;
mod ledger_engine;
mod operation;

pub use batch_runner::{BatchRunner, BatchSummary};
pub use errors::{EngineError, FailedWrite, SyncReport};
pub use ledger_engine::LedgerEngine;
pub use operation::{LedgerRecord, Operation};
