use crate::domain::card::{CardId, OwnerId};
use crate::domain::expiry::Expiry;
use crate::error::{LedgerError, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;

#[derive(Debug, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum OpKind {
    Enroll,
    Create,
    Activate,
    Block,
    Delete,
    Deposit,
    Transfer,
}

/// One row of an operations file. Columns unused by an op stay empty.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct OpRecord {
    pub op: OpKind,
    pub owner: Option<OwnerId>,
    pub card: Option<CardId>,
    pub to_card: Option<CardId>,
    pub amount: Option<Decimal>,
    pub expires: Option<Expiry>,
}

/// Reads ledger operations from a CSV source.
///
/// Wraps `csv::Reader` and provides an iterator over `Result<OpRecord>`,
/// trimming whitespace and tolerating short rows so large files stream
/// without loading everything into memory.
pub struct OpReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> OpReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// An iterator that lazily reads and deserializes operations.
    pub fn records(self) -> impl Iterator<Item = Result<OpRecord>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(LedgerError::from))
    }
}
