use super::{checked_total, distribute_evenly, max_amount, parse_amount, round_to_cents, within, AmountError, Tolerances};
use anyhow::Result;
use rust_decimal::Decimal;
use std::str::FromStr;

#[test]
fn test_amount_successfully_parses_valid_strings() -> Result<()> {
    let test_cases = vec![
        ("1.0", "1.0"),
        ("1.1234", "1.1234"),
        ("  1200.00  ", "1200.00"),
        ("0.01", "0.01"),
        ("100", "100"),
    ];

    for (input_string, expected_output) in test_cases {
        assert_eq!(parse_amount(input_string)?, Decimal::from_str(expected_output)?);
    }

    Ok(())
}

#[test]
fn test_amount_fails_to_parse_invalid_strings() {
    assert!(matches!(parse_amount(""), Err(AmountError::InvalidFormat(_))));
    assert!(matches!(parse_amount("abc"), Err(AmountError::Parse(_))));
    assert!(matches!(parse_amount("1.2.3"), Err(AmountError::Parse(_))));
    assert!(matches!(parse_amount("0"), Err(AmountError::NonPositive(_))));
    assert!(matches!(parse_amount("-5.00"), Err(AmountError::NonPositive(_))));
    assert!(matches!(parse_amount("79228162514264337593543950335"), Err(AmountError::TooLarge(_))));
    assert!(matches!(parse_amount("1000000000000.01"), Err(AmountError::TooLarge(_))));
}

#[test]
fn test_largest_amount_is_accepted() -> Result<()> {
    assert_eq!(parse_amount("1000000000000")?, max_amount());

    Ok(())
}

#[test]
fn test_checked_total_reports_overflow() -> Result<()> {
    let amounts = vec![Decimal::from_str("10.25")?, Decimal::from_str("-0.25")?, Decimal::ONE];

    assert_eq!(checked_total(amounts), Some(Decimal::from(11)));
    assert_eq!(checked_total(Vec::new()), Some(Decimal::ZERO));
    assert_eq!(checked_total(vec![Decimal::MAX, Decimal::MAX]), None);
    assert_eq!(checked_total(vec![Decimal::MIN, -Decimal::ONE]), None);
    assert!(!within(Decimal::MAX, Decimal::MIN, Decimal::ONE));

    Ok(())
}

#[test]
fn test_round_to_cents_rounds_half_away_from_zero() -> Result<()> {
    assert_eq!(round_to_cents(Decimal::from_str("33.335")?), Decimal::from_str("33.34")?);
    assert_eq!(round_to_cents(Decimal::from_str("33.334")?), Decimal::from_str("33.33")?);
    assert_eq!(round_to_cents(Decimal::from_str("-0.005")?), Decimal::from_str("-0.01")?);

    Ok(())
}

#[test]
fn test_distribute_evenly_assigns_remainder_to_last_share() -> Result<()> {
    let shares = distribute_evenly(Decimal::from_str("100.00")?, 3);

    assert_eq!(shares, vec![
        Decimal::from_str("33.33")?,
        Decimal::from_str("33.33")?,
        Decimal::from_str("33.34")?
    ]);
    assert_eq!(shares.iter().sum::<Decimal>(), Decimal::from_str("100.00")?);

    Ok(())
}

#[test]
fn test_distribute_evenly_handles_exact_and_empty_divisions() -> Result<()> {
    let shares = distribute_evenly(Decimal::from_str("900.00")?, 3);

    assert!(shares.iter().all(|share| *share == Decimal::from_str("300.00").unwrap_or_default()));
    assert!(distribute_evenly(Decimal::from_str("900.00")?, 0).is_empty());
    assert_eq!(distribute_evenly(Decimal::from_str("12.34")?, 1), vec![Decimal::from_str("12.34")?]);

    Ok(())
}

#[test]
fn test_within_is_exclusive_of_epsilon() -> Result<()> {
    let epsilon = Tolerances::default().epsilon;

    assert!(within(Decimal::from_str("500.00")?, Decimal::from_str("500.009")?, epsilon));
    assert!(!within(Decimal::from_str("500.00")?, Decimal::from_str("500.01")?, epsilon));
    assert!(!within(Decimal::from_str("500.00")?, Decimal::from_str("450.00")?, epsilon));

    Ok(())
}

#[test]
fn test_tolerances_builders_override_defaults() -> Result<()> {
    let tolerances = Tolerances::default()
        .with_epsilon(Decimal::from_str("0.5")?)
        .with_transfer_thresholds(Decimal::ONE, Decimal::TEN);

    assert_eq!(tolerances.epsilon, Decimal::from_str("0.5")?);
    assert_eq!(tolerances.transfer_balanced_below, Decimal::ONE);
    assert_eq!(tolerances.transfer_warning_below, Decimal::TEN);
    assert_eq!(Tolerances::default().epsilon, Decimal::from_str("0.01")?);

    Ok(())
}
