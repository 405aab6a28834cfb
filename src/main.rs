use cardledger::application::balance::BalanceService;
use cardledger::application::cards::CardService;
use cardledger::crypto::NumberCipher;
use cardledger::domain::ports::{CardSort, PageRequest, SharedCardStore, SharedUserStore, UserStore};
use cardledger::domain::user::User;
use cardledger::error::LedgerError;
use cardledger::infrastructure::in_memory::{InMemoryCardStore, InMemoryUserStore};
#[cfg(feature = "storage-rocksdb")]
use cardledger::infrastructure::rocksdb::RocksDbStore;
use cardledger::interfaces::csv::card_writer::CardWriter;
use cardledger::interfaces::csv::op_reader::{OpKind, OpReader, OpRecord};
use clap::Parser;
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

const PAGE_SIZE: usize = 256;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input operations CSV file
    input: PathBuf,

    /// 16-byte secret used to encrypt card numbers at rest
    #[arg(long, env = "CARD_SECRET")]
    secret: String,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[cfg(feature = "storage-rocksdb")]
    #[arg(long)]
    db_path: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let cipher = Arc::new(NumberCipher::new(&cli.secret).into_diagnostic()?);
    let (card_store, user_store) = build_stores(&cli).into_diagnostic()?;

    let cards = CardService::new(card_store.clone(), user_store.clone(), cipher);
    let balance = BalanceService::new(card_store);

    // Apply the batch. A failing row is reported and skipped; the batch
    // itself keeps going.
    let file = File::open(&cli.input).into_diagnostic()?;
    for record in OpReader::new(file).records() {
        match record {
            Ok(op) => {
                if let Err(err) = apply(&cards, &balance, &user_store, &op).await {
                    tracing::warn!(op = ?op.op, error = %err, "skipping operation");
                }
            }
            Err(err) => tracing::warn!(error = %err, "skipping unreadable row"),
        }
    }

    // Emit the final state of every card, numbers masked.
    let mut all = Vec::new();
    let mut number = 0;
    loop {
        let page = PageRequest::new(number, PAGE_SIZE, CardSort::IdAsc)
            .ok_or_else(|| miette::miette!("invalid page size"))?;
        let batch = cards.list_all(page).await.into_diagnostic()?;
        let done = batch.len() < PAGE_SIZE;
        all.extend(batch);
        number += 1;
        if done {
            break;
        }
    }

    let stdout = io::stdout();
    let mut writer = CardWriter::new(stdout.lock());
    writer.write_cards(all).into_diagnostic()?;

    Ok(())
}

#[cfg(feature = "storage-rocksdb")]
fn build_stores(cli: &Cli) -> cardledger::error::Result<(SharedCardStore, SharedUserStore)> {
    if let Some(db_path) = &cli.db_path {
        let store = RocksDbStore::open(db_path)?;
        return Ok((Arc::new(store.clone()), Arc::new(store)));
    }
    Ok(in_memory_stores())
}

#[cfg(not(feature = "storage-rocksdb"))]
fn build_stores(_cli: &Cli) -> cardledger::error::Result<(SharedCardStore, SharedUserStore)> {
    Ok(in_memory_stores())
}

fn in_memory_stores() -> (SharedCardStore, SharedUserStore) {
    (
        Arc::new(InMemoryCardStore::new()),
        Arc::new(InMemoryUserStore::new()),
    )
}

async fn apply(
    cards: &CardService,
    balance: &BalanceService,
    users: &SharedUserStore,
    op: &OpRecord,
) -> cardledger::error::Result<()> {
    match op.op {
        OpKind::Enroll => users.insert(User::new(required(op.owner, "owner")?)).await,
        OpKind::Create => {
            let owner = required(op.owner, "owner")?;
            let id = cards.create(owner, required(op.expires, "expires")?).await?;
            tracing::info!(card = id, owner, "issued card");
            Ok(())
        }
        OpKind::Activate => {
            cards
                .activate(required(op.card, "card")?, required(op.owner, "owner")?)
                .await
        }
        OpKind::Block => {
            cards
                .block(required(op.card, "card")?, required(op.owner, "owner")?)
                .await
        }
        OpKind::Delete => cards.delete(required(op.card, "card")?).await,
        OpKind::Deposit => {
            balance
                .deposit(
                    required(op.card, "card")?,
                    required(op.amount, "amount")?,
                    required(op.owner, "owner")?,
                )
                .await
        }
        OpKind::Transfer => {
            balance
                .transfer(
                    required(op.owner, "owner")?,
                    required(op.card, "card")?,
                    required(op.to_card, "to_card")?,
                    required(op.amount, "amount")?,
                )
                .await
        }
    }
}

fn required<T>(value: Option<T>, column: &str) -> cardledger::error::Result<T> {
    value.ok_or_else(|| LedgerError::Malformed(format!("missing required column: {column}")))
}
