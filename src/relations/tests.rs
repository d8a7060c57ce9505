use super::{
    BalanceStatus, ExpenseShareCalculator, GroupStatus, OriginalDisposition, RefundLinkManager, SplitEngine, SplitPart,
    TransferGroupManager
};

use std::str::FromStr;

use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::models::{Direction, FieldPatch, RelationshipError, SplitBreakdown, SplitMode, Transaction, ME};
use crate::storage::{Storage, TransactionStorage};

fn amount(value: &str) -> Result<Decimal> {
    Ok(Decimal::from_str(value)?)
}

fn create_transaction(id: &str, direction: Direction, value: &str) -> Result<Transaction> {
    let date = NaiveDate::from_ymd_opt(2024, 5, 20).ok_or_else(|| anyhow!("invalid date"))?;
    Ok(Transaction::new(id, direction, amount(value)?, date))
}

fn seeded_storage(transactions: &[(&str, Direction, &str)]) -> Result<TransactionStorage> {
    let storage = TransactionStorage::new();

    for (id, direction, value) in transactions {
        storage.save(create_transaction(id, *direction, value)?);
    }

    Ok(storage)
}

fn load(storage: &TransactionStorage, id: &str) -> Result<Transaction> {
    storage.load(id).ok_or_else(|| anyhow!("transaction [{id}] missing from storage"))
}

fn ids(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

// Refund links

#[test]
fn test_refunds_reduce_parent_net_amount_until_fully_refunded() -> Result<()> {
    let storage = seeded_storage(&[
        ("a", Direction::Debit, "1200.00"),
        ("b", Direction::Credit, "300.00"),
        ("c", Direction::Credit, "900.00")
    ])?;
    let manager = RefundLinkManager::new();

    let result = manager.link(&storage, "b", "a")?;

    assert_eq!(result.parent_net_amount, amount("900.00")?);
    assert_eq!(load(&storage, "a")?.net_amount, Some(amount("900.00")?));

    let child = load(&storage, "b")?;
    assert_eq!(child.link_parent_id.as_deref(), Some("a"));
    assert!(child.is_refund);

    let result = manager.link(&storage, "c", "a")?;

    assert_eq!(result.parent_net_amount, Decimal::ZERO);
    assert_eq!(load(&storage, "a")?.net_amount, None);
    assert_eq!(manager.net_amount_of(&storage, "a")?, Decimal::ZERO);

    Ok(())
}

#[test]
fn test_link_then_unlink_restores_parent_net_amount() -> Result<()> {
    let storage = seeded_storage(&[
        ("a", Direction::Debit, "1200.00"),
        ("b", Direction::Credit, "300.00"),
        ("c", Direction::Credit, "100.00")
    ])?;
    let manager = RefundLinkManager::new();

    manager.link(&storage, "b", "a")?;
    let before = load(&storage, "a")?.net_amount;

    manager.link(&storage, "c", "a")?;
    assert_eq!(load(&storage, "a")?.net_amount, Some(amount("800.00")?));

    let result = manager.unlink(&storage, "c")?;

    assert!(result.was_linked());
    assert_eq!(result.previous_parent_net_amount, Some(amount("900.00")?));
    assert_eq!(load(&storage, "a")?.net_amount, before);

    let child = load(&storage, "c")?;
    assert_eq!(child.link_parent_id, None);
    assert!(!child.is_refund);

    manager.unlink(&storage, "b")?;
    assert_eq!(load(&storage, "a")?.net_amount, None);

    Ok(())
}

#[test]
fn test_unlink_of_unlinked_refund_is_idempotent() -> Result<()> {
    let storage = seeded_storage(&[("b", Direction::Credit, "300.00")])?;
    let result = RefundLinkManager::new().unlink(&storage, "b")?;

    assert!(!result.was_linked());
    assert!(result.patches.is_empty());

    Ok(())
}

#[test]
fn test_link_rejects_invalid_directions_and_self_reference() -> Result<()> {
    let storage = seeded_storage(&[
        ("debit-1", Direction::Debit, "50.00"),
        ("debit-2", Direction::Debit, "50.00"),
        ("credit-1", Direction::Credit, "10.00"),
        ("credit-2", Direction::Credit, "10.00")
    ])?;
    let manager = RefundLinkManager::new();

    assert!(matches!(
        manager.link(&storage, "debit-1", "debit-2"),
        Err(RelationshipError::InvalidDirection { expected: Direction::Credit, .. })
    ));
    assert!(matches!(
        manager.link(&storage, "credit-1", "credit-2"),
        Err(RelationshipError::InvalidDirection { expected: Direction::Debit, .. })
    ));
    assert!(matches!(manager.link(&storage, "credit-1", "credit-1"), Err(RelationshipError::SelfReference { .. })));
    assert!(matches!(manager.link(&storage, "credit-1", "missing"), Err(RelationshipError::TransactionNotFound { .. })));

    assert_eq!(load(&storage, "credit-1")?.link_parent_id, None);

    Ok(())
}

#[test]
fn test_relink_moves_refund_and_recomputes_both_parents() -> Result<()> {
    let storage = seeded_storage(&[
        ("old", Direction::Debit, "100.00"),
        ("new", Direction::Debit, "200.00"),
        ("refund", Direction::Credit, "40.00")
    ])?;
    let manager = RefundLinkManager::new();

    manager.link(&storage, "refund", "old")?;
    assert_eq!(load(&storage, "old")?.net_amount, Some(amount("60.00")?));

    let result = manager.link(&storage, "refund", "new")?;

    assert_eq!(result.previous_parent_id.as_deref(), Some("old"));
    assert_eq!(load(&storage, "old")?.net_amount, None);
    assert_eq!(load(&storage, "new")?.net_amount, Some(amount("160.00")?));
    assert_eq!(result.patches.len(), 3);

    let repeated = manager.link(&storage, "refund", "new")?;

    assert!(repeated.patches.is_empty());
    assert_eq!(repeated.previous_parent_id, None);

    Ok(())
}

#[test]
fn test_refund_larger_than_parent_never_inverts_net_amount() -> Result<()> {
    let storage = seeded_storage(&[
        ("a", Direction::Debit, "50.00"),
        ("b", Direction::Credit, "80.00")
    ])?;

    let result = RefundLinkManager::new().link(&storage, "b", "a")?;

    assert_eq!(result.parent_net_amount, Decimal::ZERO);
    assert_eq!(load(&storage, "a")?.net_amount, None);

    Ok(())
}

#[test]
fn test_refunds_beyond_the_decimal_range_clamp_net_amount_to_zero() -> Result<()> {
    let storage = seeded_storage(&[
        ("a", Direction::Debit, "1200.00"),
        ("b", Direction::Credit, "79228162514264337593543950335"),
        ("c", Direction::Credit, "79228162514264337593543950335")
    ])?;
    let manager = RefundLinkManager::new();

    manager.link(&storage, "b", "a")?;
    let result = manager.link(&storage, "c", "a")?;

    assert_eq!(result.parent_net_amount, Decimal::ZERO);
    assert_eq!(manager.net_amount_of(&storage, "a")?, Decimal::ZERO);
    assert_eq!(load(&storage, "a")?.net_amount, None);

    Ok(())
}

#[test]
fn test_refund_candidate_filters_apply_direction_rules() -> Result<()> {
    let child = create_transaction("refund", Direction::Credit, "10.00")?;
    let candidates = vec![
        create_transaction("refund", Direction::Credit, "10.00")?,
        create_transaction("other-credit", Direction::Credit, "10.00")?,
        create_transaction("purchase", Direction::Debit, "10.00")?
    ];
    let manager = RefundLinkManager::new();

    let parents = manager.filter_parent_candidates(&child, candidates.clone());
    assert_eq!(parents.len(), 1);
    assert_eq!(parents[0].id, "purchase");

    let parent = create_transaction("purchase", Direction::Debit, "10.00")?;
    let refunds = manager.filter_refund_candidates(&parent, candidates);
    assert_eq!(refunds.len(), 2);

    Ok(())
}

// Transfer groups

#[test]
fn test_group_assigns_shared_id_and_classifies_balanced_transfer() -> Result<()> {
    let storage = seeded_storage(&[
        ("x", Direction::Debit, "5000.00"),
        ("y", Direction::Credit, "5000.00")
    ])?;
    let manager = TransferGroupManager::new();

    let result = manager.group(&storage, &ids(&["x", "y"]))?;

    assert_eq!(result.status, GroupStatus::Grouped);
    assert!(load(&storage, "x")?.in_group(&result.group_id));
    assert!(load(&storage, "y")?.in_group(&result.group_id));

    let balance = manager.balance(&storage, &result.group_id)?;

    assert_eq!(balance.net, Decimal::ZERO);
    assert_eq!(balance.status, BalanceStatus::Balanced);

    Ok(())
}

#[test]
fn test_group_balance_thresholds() -> Result<()> {
    let manager = TransferGroupManager::new();

    assert_eq!(manager.classify(amount("9.99")?), BalanceStatus::Balanced);
    assert_eq!(manager.classify(amount("-10.00")?), BalanceStatus::Warning);
    assert_eq!(manager.classify(amount("99.99")?), BalanceStatus::Warning);
    assert_eq!(manager.classify(amount("100.00")?), BalanceStatus::Imbalanced);
    assert_eq!(manager.classify(amount("-250.00")?), BalanceStatus::Imbalanced);

    Ok(())
}

#[test]
fn test_balance_of_oversized_legs_is_an_overflow_error() -> Result<()> {
    let storage = seeded_storage(&[
        ("x", Direction::Debit, "79228162514264337593543950335"),
        ("y", Direction::Debit, "79228162514264337593543950335")
    ])?;
    let manager = TransferGroupManager::new();

    let result = manager.group(&storage, &ids(&["x", "y"]))?;

    assert_eq!(
        manager.balance(&storage, &result.group_id),
        Err(RelationshipError::AmountOverflow { id: result.group_id.clone() })
    );

    Ok(())
}

#[test]
fn test_group_requires_two_distinct_transactions() -> Result<()> {
    let storage = seeded_storage(&[("x", Direction::Debit, "10.00")])?;
    let manager = TransferGroupManager::new();

    assert!(matches!(manager.group(&storage, &ids(&["x"])), Err(RelationshipError::TooFewMembers { count: 1 })));
    assert!(matches!(manager.group(&storage, &ids(&["x", "x"])), Err(RelationshipError::TooFewMembers { count: 1 })));
    assert!(matches!(manager.group(&storage, &ids(&["x", "missing"])), Err(RelationshipError::TransactionNotFound { .. })));
    assert_eq!(load(&storage, "x")?.transaction_group_id, None);

    Ok(())
}

#[test]
fn test_ungroup_clears_members_and_is_idempotent() -> Result<()> {
    let storage = seeded_storage(&[
        ("a", Direction::Debit, "20.00"),
        ("b", Direction::Credit, "20.00")
    ])?;
    let manager = TransferGroupManager::new();
    let group = manager.group(&storage, &ids(&["a", "b"]))?;

    let first = manager.ungroup(&storage, &group.group_id)?;

    assert_eq!(first.status, GroupStatus::Dissolved);
    assert_eq!(first.patches.len(), 2);
    assert_eq!(load(&storage, "a")?.transaction_group_id, None);
    assert_eq!(load(&storage, "b")?.transaction_group_id, None);

    let second = manager.ungroup(&storage, &group.group_id)?;

    assert_eq!(second.status, GroupStatus::AlreadyUngrouped);
    assert!(second.patches.is_empty());

    Ok(())
}

#[test]
fn test_remove_from_group_dissolves_group_of_one() -> Result<()> {
    let storage = seeded_storage(&[
        ("a", Direction::Debit, "20.00"),
        ("b", Direction::Credit, "15.00"),
        ("c", Direction::Credit, "5.00")
    ])?;
    let manager = TransferGroupManager::new();
    let group = manager.group(&storage, &ids(&["a", "b", "c"]))?;

    let removal = manager.remove_from_group(&storage, "c")?;

    assert_eq!(removal.status, GroupStatus::Removed);
    assert_eq!(storage.members_of(&group.group_id).len(), 2);

    let removal = manager.remove_from_group(&storage, "b")?;

    assert_eq!(removal.status, GroupStatus::Dissolved);
    assert!(storage.members_of(&group.group_id).is_empty());
    assert_eq!(load(&storage, "a")?.transaction_group_id, None);

    let removal = manager.remove_from_group(&storage, "b")?;

    assert_eq!(removal.status, GroupStatus::AlreadyUngrouped);
    assert_eq!(removal.group_id, None);

    Ok(())
}

#[test]
fn test_add_to_group_extends_and_dissolves_previous_group() -> Result<()> {
    let storage = seeded_storage(&[
        ("a", Direction::Debit, "100.00"),
        ("b", Direction::Credit, "60.00"),
        ("c", Direction::Credit, "40.00"),
        ("d", Direction::Debit, "40.00")
    ])?;
    let manager = TransferGroupManager::new();
    let target = manager.group(&storage, &ids(&["a", "b"]))?;
    let previous = manager.group(&storage, &ids(&["c", "d"]))?;

    assert_eq!(manager.balance(&storage, &target.group_id)?.status, BalanceStatus::Warning);

    let result = manager.add_to_group(&storage, &target.group_id, &ids(&["c", "a"]))?;

    assert_eq!(result.status, GroupStatus::Extended);
    assert_eq!(result.members, ids(&["a", "b", "c"]));
    assert_eq!(result.dissolved_groups, vec![previous.group_id.clone()]);
    assert_eq!(load(&storage, "d")?.transaction_group_id, None);
    assert_eq!(manager.balance(&storage, &target.group_id)?.status, BalanceStatus::Balanced);

    assert!(matches!(
        manager.add_to_group(&storage, "no-such-group", &ids(&["d"])),
        Err(RelationshipError::GroupNotFound { .. })
    ));

    Ok(())
}

#[test]
fn test_split_parts_cannot_become_transfer_legs() -> Result<()> {
    let storage = seeded_storage(&[
        ("rent", Direction::Debit, "500.00"),
        ("x", Direction::Credit, "500.00")
    ])?;
    let split = SplitEngine::new().apply(&storage, "rent", &[
        SplitPart::new("Me", amount("250.00")?),
        SplitPart::new("Flatmate", amount("250.00")?)
    ], false)?;
    let manager = TransferGroupManager::new();
    let part_id = split.parts[0].id.clone();

    assert!(matches!(
        manager.group(&storage, &[part_id.clone(), "x".to_string()]),
        Err(RelationshipError::SplitPartExcluded { .. })
    ));
    assert!(matches!(
        manager.group(&storage, &ids(&["rent", "x"])),
        Err(RelationshipError::SplitPartExcluded { .. })
    ));
    assert!(matches!(manager.ungroup(&storage, &split.group_id), Err(RelationshipError::SplitPartExcluded { .. })));
    assert!(matches!(manager.remove_from_group(&storage, &part_id), Err(RelationshipError::SplitPartExcluded { .. })));

    let candidates = manager.filter_candidates(&storage, storage.snapshot());
    assert_eq!(candidates.iter().map(|candidate| candidate.id.as_str()).collect::<Vec<_>>(), vec!["x"]);

    Ok(())
}

// Transaction splits

#[test]
fn test_validate_parts_reports_remaining_amount() -> Result<()> {
    let engine = SplitEngine::new();
    let parts = [
        SplitPart::new("Groceries", amount("300.00")?),
        SplitPart::new("Household", amount("150.00")?)
    ];

    let result = engine.validate_parts(amount("500.00")?, &parts);

    assert_eq!(result, Err(RelationshipError::UnbalancedParts {
        expected: amount("500.00")?,
        allocated: amount("450.00")?,
        remaining: amount("50.00")?
    }));
    assert_eq!(engine.remaining(amount("500.00")?, &parts)?, amount("50.00")?);

    Ok(())
}

#[test]
fn test_validate_parts_rejects_malformed_parts() -> Result<()> {
    let engine = SplitEngine::new();
    let total = amount("100.00")?;

    assert_eq!(
        engine.validate_parts(total, &[SplitPart::new("Only", total)]),
        Err(RelationshipError::MinimumParts { count: 1 })
    );
    assert_eq!(
        engine.validate_parts(total, &[SplitPart::new("A", amount("50.00")?), SplitPart::new("   ", amount("50.00")?)]),
        Err(RelationshipError::EmptyDescription { index: 1 })
    );
    assert_eq!(
        engine.validate_parts(total, &[SplitPart::new("A", amount("100.00")?), SplitPart::new("B", Decimal::ZERO)]),
        Err(RelationshipError::NonPositiveAmount { index: 1, amount: Decimal::ZERO })
    );
    assert!(engine.validate_parts(total, &[SplitPart::new("A", amount("60.005")?), SplitPart::new("B", amount("40.00")?)]).is_ok());

    Ok(())
}

#[test]
fn test_apply_keeps_original_as_anchor() -> Result<()> {
    let storage = seeded_storage(&[("shop", Direction::Debit, "500.00")])?;
    let mut original = load(&storage, "shop")?
        .with_account("checking")
        .with_tags(vec!["monthly".to_string()]);
    original.description = "Supermarket".to_string();
    storage.save(original);

    let mut household = SplitPart::new("Household", amount("200.00")?);
    household.account_id = Some("joint".to_string());

    let result = SplitEngine::new().apply(&storage, "shop", &[
        SplitPart::new("Groceries", amount("300.00")?),
        household
    ], false)?;

    assert_eq!(result.parts.len(), 2);
    assert!(result.parts.iter().all(|part| part.is_split && part.in_group(&result.group_id)));
    assert!(result.parts.iter().all(|part| part.direction == Direction::Debit));
    assert_eq!(result.parts[0].account_id.as_deref(), Some("checking"));
    assert_eq!(result.parts[0].tags, vec!["monthly".to_string()]);
    assert_eq!(result.parts[1].account_id.as_deref(), Some("joint"));
    assert!(matches!(result.original, OriginalDisposition::Retained(_)));

    let anchor = load(&storage, "shop")?;

    assert!(!anchor.is_split);
    assert!(anchor.in_group(&result.group_id));
    assert_eq!(storage.members_of(&result.group_id).len(), 3);

    Ok(())
}

#[test]
fn test_apply_with_delete_removes_original() -> Result<()> {
    let storage = seeded_storage(&[("shop", Direction::Debit, "90.00")])?;

    let result = SplitEngine::new().apply(&storage, "shop", &[
        SplitPart::new("A", amount("30.00")?),
        SplitPart::new("B", amount("30.00")?),
        SplitPart::new("C", amount("30.00")?)
    ], true)?;

    assert!(storage.load("shop").is_none());
    assert!(matches!(result.original, OriginalDisposition::Deleted(ref original) if original.id == "shop"));
    assert_eq!(storage.members_of(&result.group_id).len(), 3);

    Ok(())
}

#[test]
fn test_deleting_a_linked_refund_recomputes_its_parent() -> Result<()> {
    let storage = seeded_storage(&[
        ("a", Direction::Debit, "1200.00"),
        ("b", Direction::Credit, "300.00")
    ])?;
    RefundLinkManager::new().link(&storage, "b", "a")?;

    let result = SplitEngine::new().apply(&storage, "b", &[
        SplitPart::new("Store credit", amount("100.00")?),
        SplitPart::new("Card refund", amount("200.00")?)
    ], true)?;

    let parent = load(&storage, "a")?;

    assert!(storage.load("b").is_none());
    assert_eq!(parent.net_amount, None);
    assert!(storage.refunds_of("a").is_empty());

    let patch = result.refund_parent_patch.ok_or_else(|| anyhow!("parent patch missing"))?;

    assert_eq!(patch.id, "a");
    assert_eq!(patch.net_amount, FieldPatch::Clear);

    Ok(())
}

#[test]
fn test_keeping_originals_preserves_refund_links() -> Result<()> {
    let storage = seeded_storage(&[
        ("a", Direction::Debit, "1200.00"),
        ("b", Direction::Credit, "300.00")
    ])?;
    let refunds = RefundLinkManager::new();
    let engine = SplitEngine::new();

    refunds.link(&storage, "b", "a")?;

    let parent_split = engine.apply(&storage, "a", &[
        SplitPart::new("Laptop", amount("1000.00")?),
        SplitPart::new("Warranty", amount("200.00")?)
    ], false)?;

    assert!(parent_split.refund_parent_patch.is_none());
    assert_eq!(load(&storage, "a")?.net_amount, Some(amount("900.00")?));
    assert!(parent_split.parts.iter().all(|part| part.net_amount.is_none() && part.link_parent_id.is_none()));

    let child_split = engine.apply(&storage, "b", &[
        SplitPart::new("Store credit", amount("100.00")?),
        SplitPart::new("Card refund", amount("200.00")?)
    ], false)?;

    assert!(child_split.refund_parent_patch.is_none());
    assert_eq!(load(&storage, "b")?.link_parent_id.as_deref(), Some("a"));
    assert_eq!(load(&storage, "a")?.net_amount, Some(amount("900.00")?));
    assert_eq!(refunds.net_amount_of(&storage, "a")?, amount("900.00")?);

    Ok(())
}

#[test]
fn test_validate_parts_reports_overflow() -> Result<()> {
    let engine = SplitEngine::new();
    let parts = [SplitPart::new("A", Decimal::MAX), SplitPart::new("B", Decimal::MAX)];

    assert!(matches!(engine.validate_parts(Decimal::MAX, &parts), Err(RelationshipError::AmountOverflow { .. })));
    assert!(matches!(engine.remaining(Decimal::MAX, &parts), Err(RelationshipError::AmountOverflow { .. })));

    Ok(())
}

#[test]
fn test_apply_rejects_without_side_effects() -> Result<()> {
    let storage = seeded_storage(&[
        ("shop", Direction::Debit, "500.00"),
        ("refund", Direction::Credit, "20.00")
    ])?;
    let engine = SplitEngine::new();
    let unbalanced = [SplitPart::new("A", amount("300.00")?), SplitPart::new("B", amount("150.00")?)];
    let balanced = [SplitPart::new("A", amount("300.00")?), SplitPart::new("B", amount("200.00")?)];

    assert!(matches!(engine.apply(&storage, "shop", &unbalanced, false), Err(RelationshipError::UnbalancedParts { .. })));

    RefundLinkManager::new().link(&storage, "refund", "shop")?;

    assert!(matches!(
        engine.apply(&storage, "shop", &balanced, true),
        Err(RelationshipError::LinkedRefunds { count: 1, .. })
    ));
    assert_eq!(storage.snapshot().len(), 2);

    engine.apply(&storage, "shop", &balanced, false)?;

    assert!(matches!(engine.apply(&storage, "shop", &balanced, false), Err(RelationshipError::AlreadyGrouped { .. })));

    Ok(())
}

#[test]
fn test_auto_distribute_balances_uneven_amounts() -> Result<()> {
    let engine = SplitEngine::new();
    let amounts = engine.auto_distribute(amount("100.00")?, 3);
    let parts: Vec<SplitPart> = amounts.iter()
        .enumerate()
        .map(|(index, value)| SplitPart::new(format!("Part {}", index + 1), *value))
        .collect();

    assert_eq!(amounts[0], amount("33.33")?);
    assert_eq!(amounts[2], amount("33.34")?);
    assert!(engine.validate_parts(amount("100.00")?, &parts).is_ok());

    Ok(())
}

// Expense shares

#[test]
fn test_equal_split_gives_each_participant_the_same_share() -> Result<()> {
    let transaction = create_transaction("dinner", Direction::Debit, "900.00")?;
    let breakdown = SplitBreakdown::equal(&[ME, "alice", "bob"], ME);
    let calculator = ExpenseShareCalculator::new();

    let result = calculator.compute_shares(&transaction, &breakdown)?;

    assert!(result.balanced);
    assert!(result.shares.iter().all(|share| share.share == Decimal::from(300)));
    assert_eq!(calculator.my_share(&transaction, &breakdown)?, Decimal::from(300));

    let without_me = SplitBreakdown::equal(&["alice", "bob", "carol"], "alice");

    assert_eq!(calculator.my_share(&transaction, &without_me)?, Decimal::ZERO);

    Ok(())
}

#[test]
fn test_custom_split_reports_remaining_and_balance() -> Result<()> {
    let transaction = create_transaction("trip", Direction::Debit, "100.00")?;
    let calculator = ExpenseShareCalculator::new();

    let short = SplitBreakdown::custom(&[(ME, amount("30.00")?), ("alice", amount("60.00")?)], ME);
    let result = calculator.compute_shares(&transaction, &short)?;

    assert!(!result.balanced);
    assert_eq!(result.remaining, amount("10.00")?);
    assert!(matches!(
        calculator.save(&transaction, &short),
        Err(RelationshipError::UnbalancedSplit { .. })
    ));

    let exact = SplitBreakdown::custom(&[(ME, amount("40.00")?), ("alice", amount("60.00")?)], ME);
    let saved = calculator.save(&transaction, &exact)?;

    assert_eq!(saved.my_share, amount("40.00")?);
    assert_eq!(saved.patch.is_shared, Some(true));
    assert_eq!(saved.patch.split_share_amount, FieldPatch::Set(amount("40.00")?));

    let allocated: Decimal = saved.breakdown.entries.iter().filter_map(|entry| entry.amount).sum();
    assert!((allocated - transaction.amount).abs() < amount("0.01")?);

    Ok(())
}

#[test]
fn test_save_finalizes_paid_shares_and_balances() -> Result<()> {
    let transaction = create_transaction("dinner", Direction::Debit, "900.00")?;
    let breakdown = SplitBreakdown::equal(&[ME, "alice", "bob"], ME);

    let saved = ExpenseShareCalculator::new().save(&transaction, &breakdown)?;
    let me = saved.breakdown.entry(ME).ok_or_else(|| anyhow!("me missing"))?;
    let alice = saved.breakdown.entry("alice").ok_or_else(|| anyhow!("alice missing"))?;

    assert_eq!(saved.breakdown.total_participants, 3);
    assert_eq!(me.amount, None);
    assert_eq!(me.paid_share, Some(amount("900.00")?));
    assert_eq!(me.net_balance, Some(amount("600.00")?));
    assert_eq!(alice.paid_share, Some(Decimal::ZERO));
    assert_eq!(alice.net_balance, Some(amount("-300.00")?));

    let mut shared = transaction.clone();
    saved.patch.apply_to(&mut shared);

    assert!(shared.is_shared);
    assert_eq!(shared.split_share_amount, Some(Decimal::from(300)));

    Ok(())
}

#[test]
fn test_save_rejects_invalid_breakdowns() -> Result<()> {
    let transaction = create_transaction("dinner", Direction::Debit, "90.00")?;
    let calculator = ExpenseShareCalculator::new();

    let empty = SplitBreakdown::equal(&[], ME);
    assert_eq!(calculator.save(&transaction, &empty), Err(RelationshipError::NoParticipants));

    let duplicated = SplitBreakdown::equal(&["alice", "alice"], "alice");
    assert!(matches!(calculator.save(&transaction, &duplicated), Err(RelationshipError::DuplicateParticipant { .. })));

    let stranger_paid = SplitBreakdown::equal(&["alice", "bob"], ME);
    assert!(matches!(calculator.save(&transaction, &stranger_paid), Err(RelationshipError::InvalidPayer { .. })));

    Ok(())
}

#[test]
fn test_save_rejects_negative_custom_shares() -> Result<()> {
    let transaction = create_transaction("dinner", Direction::Debit, "900.00")?;
    let calculator = ExpenseShareCalculator::new();

    let negative = SplitBreakdown::custom(&[(ME, amount("1000.00")?), ("bob", amount("-100.00")?)], ME);

    assert_eq!(
        calculator.save(&transaction, &negative),
        Err(RelationshipError::NegativeShare { participant: "bob".to_string(), amount: amount("-100.00")? })
    );

    let overflowing = SplitBreakdown::custom(&[(ME, Decimal::MAX), ("bob", Decimal::MAX)], ME);

    assert!(matches!(calculator.compute_shares(&transaction, &overflowing), Err(RelationshipError::AmountOverflow { .. })));
    assert!(matches!(calculator.save(&transaction, &overflowing), Err(RelationshipError::AmountOverflow { .. })));

    let zero_share = SplitBreakdown::custom(&[(ME, amount("900.00")?), ("bob", Decimal::ZERO)], ME);

    assert_eq!(calculator.save(&transaction, &zero_share)?.my_share, amount("900.00")?);

    Ok(())
}

#[test]
fn test_removing_me_requires_a_new_payer() -> Result<()> {
    let transaction = create_transaction("dinner", Direction::Debit, "900.00")?;
    let breakdown = SplitBreakdown::equal(&[ME, "alice", "bob"], ME);
    let calculator = ExpenseShareCalculator::new();

    assert_eq!(calculator.toggle_include_me(&breakdown, false, None), Err(RelationshipError::PayerRequired));
    assert!(matches!(
        calculator.toggle_include_me(&breakdown, false, Some("carol")),
        Err(RelationshipError::InvalidPayer { .. })
    ));

    let mut removed_by_hand = breakdown.clone();
    removed_by_hand.entries.retain(|entry| !entry.is_me());
    removed_by_hand.include_me = false;

    assert!(matches!(calculator.save(&transaction, &removed_by_hand), Err(RelationshipError::InvalidPayer { .. })));

    let toggled = calculator.toggle_include_me(&breakdown, false, Some("alice"))?;

    assert!(!toggled.include_me);
    assert_eq!(toggled.paid_by, "alice");
    assert_eq!(toggled.total_participants, 2);

    let saved = calculator.save(&transaction, &toggled)?;

    assert_eq!(saved.my_share, Decimal::ZERO);
    assert_eq!(saved.breakdown.entry("alice").and_then(|entry| entry.net_balance), Some(amount("450.00")?));

    Ok(())
}

#[test]
fn test_adding_me_inserts_first_entry_per_mode() -> Result<()> {
    let calculator = ExpenseShareCalculator::new();

    let equal = calculator.toggle_include_me(&SplitBreakdown::equal(&["alice"], "alice"), true, None)?;

    assert!(equal.include_me);
    assert_eq!(equal.entries[0].participant, ME);
    assert_eq!(equal.entries[0].amount, None);

    let custom = calculator.toggle_include_me(&SplitBreakdown::custom(&[("alice", amount("10.00")?)], "alice"), true, None)?;

    assert_eq!(custom.mode, SplitMode::Custom);
    assert_eq!(custom.entries[0].amount, Some(Decimal::ZERO));
    assert_eq!(custom.total_participants, 2);

    let again = calculator.toggle_include_me(&custom, true, None)?;

    assert_eq!(again, custom);

    Ok(())
}

#[test]
fn test_clear_removes_sharing_fields() -> Result<()> {
    let mut transaction = create_transaction("dinner", Direction::Debit, "60.00")?;
    let calculator = ExpenseShareCalculator::new();

    let saved = calculator.save(&transaction, &SplitBreakdown::equal(&[ME, "alice"], ME))?;
    saved.patch.apply_to(&mut transaction);

    calculator.clear(&transaction).apply_to(&mut transaction);

    assert!(!transaction.is_shared);
    assert_eq!(transaction.split_breakdown, None);
    assert_eq!(transaction.split_share_amount, None);

    Ok(())
}
