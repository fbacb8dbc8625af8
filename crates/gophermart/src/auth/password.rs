//! 密码处理

use bcrypt::{hash, verify};

use crate::error::{LoyaltyError, Result};

/// 使用 bcrypt 生成密码哈希
pub fn hash_password(password: &str, cost: u32) -> Result<String> {
    hash(password, cost).map_err(|e| LoyaltyError::Internal(format!("密码哈希失败: {}", e)))
}

/// 比较明文密码与存储的哈希值
pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    verify(password, hash).map_err(|e| LoyaltyError::Internal(format!("密码验证失败: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hashed = hash_password("test_password_123", 4).unwrap();

        assert!(verify_password("test_password_123", &hashed).unwrap());
        assert!(!verify_password("wrong_password", &hashed).unwrap());
    }
}
