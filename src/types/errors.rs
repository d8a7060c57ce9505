use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AmountError {
    #[error("Amount error: {0}")]
    InvalidFormat(String),
    #[error("Amount error: {0}")]
    Parse(#[from] rust_decimal::Error),
    #[error("Amount error: [{0}] must be greater than zero")]
    NonPositive(Decimal),
    #[error("Amount error: [{0}] exceeds the largest accepted amount")]
    TooLarge(Decimal)
}
