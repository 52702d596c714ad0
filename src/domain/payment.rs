use crate::error::DispatchError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A positive monetary amount for a transfer instruction.
///
/// Wraps `rust_decimal::Decimal` so that non-positive amounts are rejected at
/// ingestion time rather than discovered by the downstream service.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self, DispatchError> {
        if value > Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(DispatchError::Validation(
                "amount must be positive".to_string(),
            ))
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = DispatchError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl std::fmt::Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// The party funding every transfer in a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayerIdentity {
    pub id_type: String,
    pub id_value: String,
    pub display_name: String,
}

/// One payment instruction.
///
/// `original_index` is assigned once, from the row's position in the source
/// dataset, and is never renumbered — resume and retry both key off it, so a
/// subset dispatched later still carries the indices of the full dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRow {
    pub original_index: usize,
    pub recipient_id_type: String,
    pub recipient_id_value: String,
    pub amount: Amount,
    pub currency: String,
    pub payee_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_amount_rejects_non_positive() {
        assert!(Amount::new(dec!(0.0)).is_err());
        assert!(Amount::new(dec!(-5.0)).is_err());
        assert!(Amount::new(dec!(0.01)).is_ok());
    }

    #[test]
    fn test_amount_serializes_as_plain_decimal() {
        let amount = Amount::new(dec!(125.50)).unwrap();
        let json = serde_json::to_string(&amount).unwrap();
        assert_eq!(json, "\"125.50\"");
    }
}
