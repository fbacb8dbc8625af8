//! 积分账户并发提现测试

use std::sync::Arc;

use gophermart::LoyaltyError;
use gophermart::models::OrderStatus;
use gophermart::repository::{MemoryStorage, OrderRepositoryTrait, Storage, UserRepositoryTrait};
use gophermart::service::LedgerService;
use gophermart_shared::test_utils::with_luhn_check_digit;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

async fn user_with_points(storage: &MemoryStorage, login: &str, points: Decimal) -> i64 {
    let user = storage.create_user(login, "hash").await.unwrap();
    let number = with_luhn_check_digit(&format!("9{}", user.id));
    let order = storage.create_order(user.id, &number).await.unwrap().unwrap();
    let processed = order.transitioned(OrderStatus::Processed, points).unwrap();
    assert!(storage.update_order(&processed).await.unwrap());
    user.id
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_withdrawals_never_overdraw() {
    let storage = MemoryStorage::new();
    let user_id = user_with_points(&storage, "alice", dec!(100)).await;
    let ledger = Arc::new(LedgerService::new(Arc::new(storage.clone())));

    let tasks: Vec<_> = (0..8)
        .map(|i| {
            let ledger = ledger.clone();
            let number = with_luhn_check_digit(&format!("5000{}", i));
            tokio::spawn(async move { ledger.withdraw(user_id, &number, dec!(60)).await })
        })
        .collect();

    let mut succeeded = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => succeeded += 1,
            Err(LoyaltyError::InsufficientFunds { .. }) => {}
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
    assert_eq!(succeeded, 1);

    let balance = ledger.balance(user_id).await.unwrap();
    assert_eq!(balance.current, dec!(40));
    assert_eq!(balance.withdrawn, dec!(60));
}

#[tokio::test]
async fn test_balance_is_recomputed_from_ledger() {
    let storage = MemoryStorage::new();
    let alice = user_with_points(&storage, "alice", dec!(729.98)).await;
    let bob = user_with_points(&storage, "bob", dec!(10)).await;
    let ledger = LedgerService::new(Arc::new(storage.clone()));

    ledger
        .withdraw(alice, &with_luhn_check_digit("2377225"), dec!(229.98))
        .await
        .unwrap();

    let balance = ledger.balance(alice).await.unwrap();
    assert_eq!(balance.current, dec!(500));
    assert_eq!(balance.withdrawn, dec!(229.98));

    // 其他用户不受影响
    assert_eq!(ledger.balance(bob).await.unwrap().current, dec!(10));

    // 未结算的订单不计入余额
    let pending = with_luhn_check_digit("31337");
    storage.create_order(alice, &pending).await.unwrap().unwrap();
    assert_eq!(storage.get_user_balance(alice).await.unwrap().current, dec!(500));
}

#[tokio::test]
async fn test_withdrawal_history_in_processing_order() {
    let storage = MemoryStorage::new();
    let user_id = user_with_points(&storage, "alice", dec!(100)).await;
    let ledger = LedgerService::new(Arc::new(storage));

    assert!(ledger.withdrawals(user_id).await.unwrap().is_empty());

    let first = with_luhn_check_digit("111");
    let second = with_luhn_check_digit("222");
    ledger.withdraw(user_id, &first, dec!(10)).await.unwrap();
    ledger.withdraw(user_id, &second, dec!(20.5)).await.unwrap();

    let history = ledger.withdrawals(user_id).await.unwrap();
    let numbers: Vec<_> = history.iter().map(|w| w.order_number.as_str()).collect();
    assert_eq!(numbers, vec![first.as_str(), second.as_str()]);

    let err = ledger.withdraw(user_id, &first, dec!(1)).await.unwrap_err();
    assert!(matches!(err, LoyaltyError::DuplicateWithdrawal(_)));
    assert_eq!(ledger.balance(user_id).await.unwrap().current, dec!(69.5));
}
