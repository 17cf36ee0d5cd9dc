//! Reading historical transactions from CSV

use crate::types::transaction::TransactionRecord;
use anyhow::{Context, Result};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::info;

/// Read every transaction from a CSV file with a header row.
///
/// Columns other than `trans_date_trans_time`, `cc_num`, `amt`, `category`
/// and `is_fraud` are ignored; empty cells are missing values.
pub fn read_transactions<P: AsRef<Path>>(path: P) -> Result<Vec<TransactionRecord>> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let transactions =
        read_transactions_from(file).with_context(|| format!("Failed to read {}", path.display()))?;

    info!(
        path = %path.display(),
        rows = transactions.len(),
        "Loaded transactions"
    );

    Ok(transactions)
}

pub fn read_transactions_from<R: Read>(reader: R) -> Result<Vec<TransactionRecord>> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let transactions = rdr
        .deserialize()
        .collect::<Result<Vec<TransactionRecord>, csv::Error>>()?;

    Ok(transactions)
}
