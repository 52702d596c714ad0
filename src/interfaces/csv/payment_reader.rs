use crate::domain::payment::{Amount, PaymentRow};
use crate::error::{DispatchError, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;

/// One CSV record as written in the source file, before validation.
#[derive(Debug, Deserialize)]
struct RawPaymentRecord {
    id_type: String,
    id_value: String,
    currency: String,
    amount: Decimal,
    payee_name: String,
}

impl RawPaymentRecord {
    fn into_row(self, original_index: usize) -> Result<PaymentRow> {
        if self.id_type.is_empty() || self.id_value.is_empty() {
            return Err(DispatchError::Validation(format!(
                "row {}: recipient identifier is required",
                original_index
            )));
        }
        if self.currency.is_empty() {
            return Err(DispatchError::Validation(format!(
                "row {}: currency is required",
                original_index
            )));
        }
        let amount = Amount::new(self.amount).map_err(|e| {
            DispatchError::Validation(format!("row {}: {}", original_index, e))
        })?;
        Ok(PaymentRow {
            original_index,
            recipient_id_type: self.id_type,
            recipient_id_value: self.id_value,
            amount,
            currency: self.currency,
            payee_name: self.payee_name,
        })
    }
}

/// Reads payment rows from a CSV source.
///
/// Wraps `csv::Reader` and provides an iterator over `Result<PaymentRow>`,
/// assigning each row its `original_index` from its position in the file.
/// Malformed rows are yielded as errors and never reach the work queue.
pub struct PaymentReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> PaymentReader<R> {
    /// Creates a new `PaymentReader` from any `Read` source (e.g., File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Returns an iterator that lazily reads and validates payment rows,
    /// streaming large files without loading the whole dataset into memory.
    pub fn rows(self) -> impl Iterator<Item = Result<PaymentRow>> {
        self.reader
            .into_deserialize::<RawPaymentRecord>()
            .enumerate()
            .map(|(index, record)| {
                record
                    .map_err(DispatchError::from)
                    .and_then(|raw| raw.into_row(index))
            })
    }
}
