//! 领域错误类型定义
//!
//! 覆盖订单、账户、认证及存储层的错误

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use rust_decimal::Decimal;
use serde_json::json;
use thiserror::Error;

/// 积分服务错误类型
#[derive(Debug, Error)]
pub enum LoyaltyError {
    // 订单错误
    #[error("订单号格式错误: {0}")]
    InvalidOrderNumber(String),
    #[error("订单号已被其他用户登记: {0}")]
    OrderOwnedByAnotherUser(String),

    // 账户错误
    #[error("积分余额不足: 需要 {required}, 可用 {available}")]
    InsufficientFunds { required: Decimal, available: Decimal },
    #[error("该订单号已用于提现: {0}")]
    DuplicateWithdrawal(String),
    #[error("提现金额不合法: {0}")]
    InvalidAmount(Decimal),

    // 用户与认证
    #[error("用户名已被占用: {0}")]
    LoginTaken(String),
    #[error("用户不存在: {0}")]
    UserNotFound(String),
    #[error("用户名或密码错误")]
    InvalidCredentials,
    #[error("参数验证失败: {0}")]
    Validation(String),

    // 系统错误
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),
    #[error("内部错误: {0}")]
    Internal(String),
}

impl LoyaltyError {
    /// 返回错误码
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidOrderNumber(_) => "INVALID_ORDER_NUMBER",
            Self::OrderOwnedByAnotherUser(_) => "ORDER_CONFLICT",
            Self::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            Self::DuplicateWithdrawal(_) => "DUPLICATE_WITHDRAWAL",
            Self::InvalidAmount(_) => "INVALID_AMOUNT",
            Self::LoginTaken(_) => "LOGIN_TAKEN",
            Self::UserNotFound(_) => "USER_NOT_FOUND",
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// 是否为可重试错误（存储层瞬时故障）
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Database(e) => matches!(
                e,
                sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) | sqlx::Error::PoolClosed
            ),
            _ => false,
        }
    }

    /// 对应的 HTTP 状态码
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidOrderNumber(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::OrderOwnedByAnotherUser(_)
            | Self::DuplicateWithdrawal(_)
            | Self::LoginTaken(_) => StatusCode::CONFLICT,
            Self::InsufficientFunds { .. } => StatusCode::PAYMENT_REQUIRED,
            Self::InvalidAmount(_) | Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::UserNotFound(_) | Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 是否为业务错误（应原样反馈给调用方，而非记录为系统故障）
    pub fn is_business_error(&self) -> bool {
        !matches!(self, Self::Database(_) | Self::Internal(_))
    }
}

impl IntoResponse for LoyaltyError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // 系统级错误只返回通用提示，详细信息仅记录日志
        let message = match &self {
            Self::Database(e) => {
                tracing::error!(error = %e, "数据库操作失败");
                "服务内部错误，请稍后重试".to_string()
            }
            Self::Internal(e) => {
                tracing::error!(error = %e, "内部错误");
                "服务内部错误，请稍后重试".to_string()
            }
            other => other.to_string(),
        };

        let body = json!({
            "code": self.error_code(),
            "message": message,
        });

        (status, axum::Json(body)).into_response()
    }
}

impl From<validator::ValidationErrors> for LoyaltyError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Validation(errors.to_string())
    }
}

/// 服务层 Result 类型别名
pub type Result<T> = std::result::Result<T, LoyaltyError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_error_codes() {
        let err = LoyaltyError::InsufficientFunds {
            required: dec!(100),
            available: dec!(50.5),
        };
        assert_eq!(err.error_code(), "INSUFFICIENT_FUNDS");
        assert!(err.is_business_error());
        assert!(err.to_string().contains("50.5"));

        let err = LoyaltyError::OrderOwnedByAnotherUser("12345678903".to_string());
        assert_eq!(err.error_code(), "ORDER_CONFLICT");
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            LoyaltyError::InvalidOrderNumber("1".into()).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            LoyaltyError::InsufficientFunds {
                required: dec!(1),
                available: dec!(0),
            }
            .status_code(),
            StatusCode::PAYMENT_REQUIRED
        );
        assert_eq!(
            LoyaltyError::DuplicateWithdrawal("1".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            LoyaltyError::Database(sqlx::Error::PoolTimedOut).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_retryable() {
        assert!(LoyaltyError::Database(sqlx::Error::PoolTimedOut).is_retryable());
        assert!(!LoyaltyError::Database(sqlx::Error::RowNotFound).is_retryable());
        assert!(!LoyaltyError::InvalidCredentials.is_retryable());
        assert!(!LoyaltyError::Internal("x".to_string()).is_business_error());
    }
}
