//! 积分账户模型
//!
//! 余额不落库，每次由账本（已结算订单积分与提现记录）重新计算得出。

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// 用户积分余额（派生值）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, sqlx::FromRow)]
pub struct UserBalance {
    /// 可用余额 = 已结算积分总和 − 提现总和
    pub current: Decimal,
    /// 历史提现总和
    pub withdrawn: Decimal,
}

impl UserBalance {
    /// 由账本两项合计得出余额
    pub fn from_ledger(accrued: Decimal, withdrawn: Decimal) -> Self {
        Self {
            current: accrued - withdrawn,
            withdrawn,
        }
    }
}

/// 提现记录，创建后不可修改
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Withdrawal {
    pub id: i64,
    pub user_id: i64,
    pub order_number: String,
    pub amount: Decimal,
    pub processed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_from_ledger() {
        let balance = UserBalance::from_ledger(dec!(729.98), dec!(229.98));
        assert_eq!(balance.current, dec!(500));
        assert_eq!(balance.withdrawn, dec!(229.98));
    }
}
