//! PostgreSQL 存储集成测试
//!
//! 需要数据库连接：`DATABASE_URL=... cargo test -- --ignored`

use std::sync::Arc;

use gophermart::LoyaltyError;
use gophermart::models::OrderStatus;
use gophermart::repository::{
    OrderRepository, OrderRepositoryTrait, PgStorage, Storage, UserRepository,
    UserRepositoryTrait,
};
use gophermart_shared::database::Database;
use gophermart_shared::test_utils::{test_database_config, test_login, test_order_number};
use rust_decimal_macros::dec;

struct Fixture {
    storage: PgStorage,
    orders: OrderRepository,
    users: UserRepository,
}

async fn fixture() -> Fixture {
    let db = Database::connect(&test_database_config()).await.unwrap();
    db.run_migrations().await.unwrap();
    let pool = db.pool().clone();
    Fixture {
        storage: PgStorage::new(pool.clone()),
        orders: OrderRepository::new(pool.clone()),
        users: UserRepository::new(pool),
    }
}

impl Fixture {
    async fn user_with_points(&self, points: rust_decimal::Decimal) -> i64 {
        let user = self.users.create_user(&test_login(), "hash").await.unwrap();
        let order = self
            .orders
            .create_order(user.id, &test_order_number())
            .await
            .unwrap()
            .unwrap();
        let processed = order.transitioned(OrderStatus::Processed, points).unwrap();
        assert!(self.storage.update_order(&processed).await.unwrap());
        user.id
    }
}

#[tokio::test]
#[ignore] // 需要数据库连接
async fn test_order_lifecycle() {
    let f = fixture().await;
    let user = f.users.create_user(&test_login(), "hash").await.unwrap();
    let number = test_order_number();

    let order = f.orders.create_order(user.id, &number).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::New);
    assert!(f.orders.create_order(user.id, &number).await.unwrap().is_none());

    let pending = f.storage.get_unprocessed_orders().await.unwrap();
    assert!(pending.iter().any(|o| o.number == number));

    let invalid = order.transitioned(OrderStatus::Invalid, dec!(0)).unwrap();
    assert!(f.storage.update_order(&invalid).await.unwrap());

    // 终态之后不再回写
    let mut regressed = invalid.clone();
    regressed.status = OrderStatus::Processing;
    assert!(!f.storage.update_order(&regressed).await.unwrap());
    let stored = f.orders.get_order_by_number(&number).await.unwrap().unwrap();
    assert_eq!(stored.status, OrderStatus::Invalid);

    let pending = f.storage.get_unprocessed_orders().await.unwrap();
    assert!(!pending.iter().any(|o| o.number == number));
}

#[tokio::test]
#[ignore] // 需要数据库连接
async fn test_duplicate_login() {
    let f = fixture().await;
    let login = test_login();
    f.users.create_user(&login, "hash").await.unwrap();
    assert!(matches!(
        f.users.create_user(&login, "hash").await,
        Err(LoyaltyError::LoginTaken(_))
    ));
    assert!(f.users.get_user_by_login(&login).await.unwrap().is_some());
}

#[tokio::test]
#[ignore] // 需要数据库连接
async fn test_concurrent_withdrawals_are_serialized() {
    let f = fixture().await;
    let user_id = f.user_with_points(dec!(100)).await;
    let storage = Arc::new(f.storage.clone());

    let tasks: Vec<_> = (0..6)
        .map(|_| {
            let storage = storage.clone();
            let number = test_order_number();
            tokio::spawn(async move { storage.create_withdrawal(user_id, &number, dec!(60)).await })
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

    let balance = f.storage.get_user_balance(user_id).await.unwrap();
    assert_eq!(balance.current, dec!(40));
    assert_eq!(balance.withdrawn, dec!(60));
    assert_eq!(f.storage.get_withdrawals(user_id).await.unwrap().len(), 1);
}

#[tokio::test]
#[ignore] // 需要数据库连接
async fn test_duplicate_withdrawal_number() {
    let f = fixture().await;
    let user_id = f.user_with_points(dec!(100)).await;
    let number = test_order_number();

    f.storage.create_withdrawal(user_id, &number, dec!(1)).await.unwrap();
    assert!(matches!(
        f.storage.create_withdrawal(user_id, &number, dec!(1)).await,
        Err(LoyaltyError::DuplicateWithdrawal(_))
    ));
}
