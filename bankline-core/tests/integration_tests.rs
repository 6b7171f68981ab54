//! End-to-end tests through BanklineContext against a real database file
//!
//! Run with: cargo test --test integration_tests

use rust_decimal::Decimal;
use tempfile::TempDir;

use bankline_core::api::{AccountView, ErrorCategory, ErrorResponse, TransferFundsRequest};
use bankline_core::{AccountId, BanklineContext, Error, TransactionKind};

fn dollars(value: i64) -> Decimal {
    Decimal::new(value, 0)
}

fn setup() -> (TempDir, BanklineContext) {
    let temp_dir = TempDir::new().unwrap();
    let ctx = BanklineContext::new(temp_dir.path()).unwrap();
    (temp_dir, ctx)
}

/// Accounts open with a positive balance, so an empty one is drained afterwards
fn open_empty(ctx: &BanklineContext, name: &str) -> AccountId {
    let account = ctx.account_service.create_account(name, Decimal::ONE).unwrap();
    ctx.balance_service.withdraw(account.id, Decimal::ONE).unwrap();
    account.id
}

fn balance(ctx: &BanklineContext, id: AccountId) -> Decimal {
    ctx.account_service.get_account(id).unwrap().balance
}

fn record_count(ctx: &BanklineContext, id: AccountId) -> usize {
    ctx.account_service.transaction_history(id).unwrap().len()
}

#[test]
fn test_deposit_withdraw_scenario() {
    let (_dir, ctx) = setup();
    let account = ctx.account_service.create_account("Ada", dollars(10)).unwrap();

    ctx.balance_service.deposit(account.id, dollars(5)).unwrap();
    assert_eq!(balance(&ctx, account.id), dollars(15));

    ctx.balance_service.withdraw(account.id, dollars(15)).unwrap();
    assert_eq!(balance(&ctx, account.id), Decimal::ZERO);

    let err = ctx.balance_service.withdraw(account.id, dollars(1)).unwrap_err();
    assert!(matches!(err, Error::InsufficientFunds { .. }));
    assert_eq!(balance(&ctx, account.id), Decimal::ZERO);

    let kinds: Vec<_> = ctx
        .account_service
        .transaction_history(account.id)
        .unwrap()
        .iter()
        .map(|record| record.kind)
        .collect();
    assert_eq!(kinds, vec![TransactionKind::Deposit, TransactionKind::Withdraw]);
}

#[test]
fn test_transfer_whole_balance() {
    let (_dir, ctx) = setup();
    let a = ctx.account_service.create_account("A", dollars(10)).unwrap().id;
    let b = open_empty(&ctx, "B");
    let b_records_before = record_count(&ctx, b);

    let record = ctx.balance_service.transfer(a, b, dollars(10)).unwrap();

    assert_eq!(balance(&ctx, a), Decimal::ZERO);
    assert_eq!(balance(&ctx, b), dollars(10));
    assert_eq!(record.kind, TransactionKind::Transfer);
    assert_eq!(record.source_account_id, a);
    assert_eq!(record.target_account_id, Some(b));
    assert_eq!(record.amount, dollars(10));
    assert_eq!(record_count(&ctx, a), 1);
    assert_eq!(record_count(&ctx, b), b_records_before + 1);
}

#[test]
fn test_transfer_insufficient_funds_leaves_no_trace() {
    let (_dir, ctx) = setup();
    let a = ctx.account_service.create_account("A", dollars(5)).unwrap().id;
    let b = open_empty(&ctx, "B");
    let b_records_before = record_count(&ctx, b);

    let err = ctx.balance_service.transfer(a, b, dollars(10)).unwrap_err();

    assert!(matches!(err, Error::InsufficientFunds { .. }));
    assert_eq!(balance(&ctx, a), dollars(5));
    assert_eq!(balance(&ctx, b), Decimal::ZERO);
    assert_eq!(record_count(&ctx, a), 0);
    assert_eq!(record_count(&ctx, b), b_records_before);
}

#[test]
fn test_deposit_then_withdraw_is_identity() {
    let (_dir, ctx) = setup();
    let id = ctx
        .account_service
        .create_account("Ada", Decimal::new(4242, 2))
        .unwrap()
        .id;

    for cents in [1, 99, 1000, 123_456] {
        let amount = Decimal::new(cents, 2);
        ctx.balance_service.deposit(id, amount).unwrap();
        ctx.balance_service.withdraw(id, amount).unwrap();
        assert_eq!(balance(&ctx, id), Decimal::new(4242, 2));
    }
}

#[test]
fn test_transfers_conserve_total() {
    let (_dir, ctx) = setup();
    let a = ctx.account_service.create_account("A", dollars(100)).unwrap().id;
    let b = ctx.account_service.create_account("B", dollars(50)).unwrap().id;

    let moves = [(a, b, 30, true), (b, a, 75, true), (a, b, 1, true), (b, a, 500, false)];
    for (from, to, amount, covered) in moves {
        let result = ctx.balance_service.transfer(from, to, dollars(amount));
        if covered {
            assert!(result.is_ok(), "transfer of {} failed: {:?}", amount, result);
        } else {
            assert!(matches!(
                result,
                Err(Error::InsufficientFunds { account_id, .. }) if account_id == from
            ));
        }
        assert_eq!(balance(&ctx, a) + balance(&ctx, b), dollars(150));
        assert!(balance(&ctx, a) >= Decimal::ZERO);
        assert!(balance(&ctx, b) >= Decimal::ZERO);
    }
    assert_eq!(balance(&ctx, a), dollars(144));
    assert_eq!(balance(&ctx, b), dollars(6));
}

#[test]
fn test_unknown_accounts_create_no_records() {
    let (_dir, ctx) = setup();
    let a = ctx.account_service.create_account("A", dollars(10)).unwrap().id;
    let missing = a + 1000;

    assert!(matches!(
        ctx.balance_service.deposit(missing, dollars(1)),
        Err(Error::AccountNotFound(id)) if id == missing
    ));
    assert!(matches!(
        ctx.balance_service.withdraw(missing, dollars(1)),
        Err(Error::AccountNotFound(_))
    ));
    assert!(matches!(
        ctx.balance_service.transfer(a, missing, dollars(1)),
        Err(Error::AccountNotFound(id)) if id == missing
    ));
    assert!(matches!(
        ctx.account_service.transaction_history(missing),
        Err(Error::AccountNotFound(_))
    ));

    assert_eq!(balance(&ctx, a), dollars(10));
    assert_eq!(record_count(&ctx, a), 0);
}

#[test]
fn test_history_is_ordered_and_scoped() {
    let (_dir, ctx) = setup();
    let a = ctx.account_service.create_account("A", dollars(10)).unwrap().id;
    let b = ctx.account_service.create_account("B", dollars(10)).unwrap().id;
    let c = ctx.account_service.create_account("C", dollars(10)).unwrap().id;

    ctx.balance_service.deposit(a, dollars(1)).unwrap();
    ctx.balance_service.transfer(b, a, dollars(2)).unwrap();
    ctx.balance_service.withdraw(c, dollars(3)).unwrap();
    ctx.balance_service.transfer(a, c, dollars(4)).unwrap();

    let history = ctx.account_service.transaction_history(a).unwrap();
    assert_eq!(history.len(), 3);
    assert!(history.windows(2).all(|pair| pair[0].id < pair[1].id));
    assert!(history.iter().all(|record| record.involves(a)));

    // replaying the log reproduces the balance
    let replayed: Decimal = history.iter().map(|r| r.balance_effect(a)).sum();
    assert_eq!(dollars(10) + replayed, balance(&ctx, a));
}

#[test]
fn test_data_survives_reopen() {
    let temp_dir = TempDir::new().unwrap();

    let (a, b) = {
        let ctx = BanklineContext::new(temp_dir.path()).unwrap();
        let a = ctx.account_service.create_account("A", dollars(20)).unwrap().id;
        let b = ctx.account_service.create_account("B", dollars(1)).unwrap().id;
        ctx.balance_service.transfer(a, b, dollars(5)).unwrap();
        (a, b)
    };

    let ctx = BanklineContext::new(temp_dir.path()).unwrap();
    assert_eq!(balance(&ctx, a), dollars(15));
    assert_eq!(balance(&ctx, b), dollars(6));
    assert_eq!(record_count(&ctx, b), 1);

    let c = ctx.account_service.create_account("C", dollars(1)).unwrap().id;
    assert!(c > b);
}

#[test]
fn test_settings_file_selects_database() {
    let temp_dir = TempDir::new().unwrap();
    std::fs::write(
        temp_dir.path().join("settings.json"),
        r#"{"databaseFile": "custom.duckdb", "lockTimeoutMs": 1234}"#,
    )
    .unwrap();

    let ctx = BanklineContext::new(temp_dir.path()).unwrap();
    assert_eq!(ctx.config.lock_timeout_ms, 1234);
    assert_eq!(
        ctx.repository.db_path(),
        Some(temp_dir.path().join("custom.duckdb").as_path())
    );
    assert!(temp_dir.path().join("custom.duckdb").exists());
}

#[test]
fn test_request_and_response_shapes() {
    let (_dir, ctx) = setup();
    let a = ctx.account_service.create_account("Ada", dollars(10)).unwrap();
    let b = ctx.account_service.create_account("Bob", dollars(1)).unwrap();

    let request: TransferFundsRequest = serde_json::from_str(&format!(
        r#"{{"sourceAccountId": {}, "targetAccountId": {}, "funds": "2.50"}}"#,
        a.id, b.id
    ))
    .unwrap();
    request.validate().unwrap();
    ctx.balance_service
        .transfer(request.source_account_id, request.target_account_id, request.funds)
        .unwrap();

    let view = AccountView::from(&ctx.account_service.get_account(b.id).unwrap());
    assert_eq!(view.account_number, b.id);
    assert_eq!(view.balance, Decimal::new(350, 2));

    let err = ctx.balance_service.withdraw(b.id, dollars(100)).unwrap_err();
    let response = ErrorResponse::from(&err);
    assert_eq!(response.category, Some(ErrorCategory::InsufficientFunds));
    assert!(response.error_message.starts_with("Insufficient funds"));
}
