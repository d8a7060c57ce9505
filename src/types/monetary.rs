use crate::types::errors::AmountError;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{de, Deserialize, Deserializer};
use std::str::FromStr;

const DECIMAL_PLACES: u32 = 2;

/// Largest ledger amount accepted, one trillion currency units.
const MAX_AMOUNT_UNITS: i64 = 1_000_000_000_000;

pub fn max_amount() -> Decimal {
    Decimal::from(MAX_AMOUNT_UNITS)
}

/// Parses a ledger amount.
///
/// Ledger amounts are always strictly positive, the sign of a transaction is
/// carried by its direction rather than by the amount. Amounts above [`max_amount`]
/// are rejected so that ledger totals stay far from the `Decimal` range.
pub fn parse_amount(value: &str) -> Result<Decimal, AmountError> {
    let value = value.trim();

    if value.is_empty() {
        return Err(AmountError::InvalidFormat("Value is an empty string".to_string()));
    }

    let amount = Decimal::from_str(value)?;

    if amount <= Decimal::ZERO {
        return Err(AmountError::NonPositive(amount));
    }

    if amount > max_amount() {
        return Err(AmountError::TooLarge(amount));
    }

    Ok(amount)
}

/// Rounds to whole cents, half away from zero.
pub fn round_to_cents(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

/// Divides `total` into `count` cent-rounded shares.
///
/// Every share but the last is `total / count` rounded to cents; the last share absorbs
/// the rounding remainder so that the shares always add back up to `total`.
pub fn distribute_evenly(total: Decimal, count: usize) -> Vec<Decimal> {
    if count == 0 {
        return Vec::new();
    }

    let share = round_to_cents(total / Decimal::from(count));
    let mut shares = vec![share; count - 1];
    let allocated: Decimal = shares.iter().sum();

    shares.push(total - allocated);
    shares
}

/// Sum of `amounts`, `None` on overflow.
pub fn checked_total(amounts: impl IntoIterator<Item = Decimal>) -> Option<Decimal> {
    amounts.into_iter().try_fold(Decimal::ZERO, |total, amount| total.checked_add(amount))
}

/// True when `left` and `right` differ by strictly less than `epsilon`.
pub fn within(left: Decimal, right: Decimal, epsilon: Decimal) -> bool {
    left.checked_sub(right).is_some_and(|difference| difference.abs() < epsilon)
}

pub fn deserialize_amount<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    parse_amount(&value).map_err(de::Error::custom)
}
