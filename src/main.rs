use std::io::{stderr, stdout, BufWriter, Write};
use std::process::exit;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use tracing::info;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, Layer};

use ledger_relations::engine::BatchRunner;
use ledger_relations::gateway::MemoryPersistence;
use ledger_relations::models::Transaction;
use ledger_relations::storage::TransactionStorage;

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 3 {
        eprintln!("Usage: ledger-relations [ledger].csv [operations].jsonl [log_level:optional] > [output].csv");
        eprintln!("Available log levels: off, error, warn, info, debug, trace (default: error)");
        exit(1);
    }

    let ledger_path = &args[1];
    let operations_path = &args[2];
    let log_level = args.get(3)
        .map(|s| parse_log_level(s)).unwrap_or(LevelFilter::ERROR);

    setup_logging(log_level);

    let storage = Arc::new(TransactionStorage::new());
    let persistence = Arc::new(MemoryPersistence::new());
    let runner = BatchRunner::new(storage.clone(), persistence.clone());

    let timer = Instant::now();
    let loaded = runner.load_ledger(ledger_path).await?;
    persistence.seed(storage.snapshot());

    let summary = runner.run(operations_path).await?;
    let duration = timer.elapsed();

    info!("Loaded [{loaded}] transactions and processed operations in: {duration:?}");
    info!(
        "Operations applied: [{}], rejected: [{}], not persisted: [{}], malformed: [{}]",
        summary.applied, summary.rejected, summary.unpersisted, summary.malformed
    );

    write_results_to_stdout(&storage)?;

    Ok(())
}

/// Accepts any level name `LevelFilter` understands, falling back to `error`.
fn parse_log_level(level: &str) -> LevelFilter {
    level.trim().parse().unwrap_or_else(|_| {
        eprintln!("Invalid log level '{level}', defaulting to 'error'");
        LevelFilter::ERROR
    })
}

fn setup_logging(level: LevelFilter) {
    //NOTE: stdout carries the resulting CSV, so every log line goes to stderr
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(stderr).with_filter(level))
        .init();
}

fn write_results_to_stdout(storage: &TransactionStorage) -> Result<()> {
    let mut output = BufWriter::new(stdout().lock());

    writeln!(output, "id,direction,amount,net_amount,group,is_split,link_parent,is_refund,is_shared,share_amount")?;

    for transaction in storage.snapshot() {
        write_row(&mut output, &transaction)?;
    }

    output.flush()?;

    Ok(())
}

fn write_row(output: &mut impl Write, transaction: &Transaction) -> Result<()> {
    writeln!(
        output,
        "{},{},{},{},{},{},{},{},{},{}",
        transaction.id,
        transaction.direction,
        transaction.amount,
        optional(transaction.net_amount.as_ref()),
        optional(transaction.transaction_group_id.as_ref()),
        transaction.is_split,
        optional(transaction.link_parent_id.as_ref()),
        transaction.is_refund,
        transaction.is_shared,
        optional(transaction.split_share_amount.as_ref())
    )?;

    Ok(())
}

fn optional<T: ToString>(value: Option<&T>) -> String {
    value.map(ToString::to_string).unwrap_or_default()
}
