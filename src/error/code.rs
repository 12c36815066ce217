//! 错误代码和错误类别定义

use serde::{Deserialize, Serialize};
use std::fmt;

/// 错误代码枚举
///
/// 错误代码按类别分组，每个类别占用1000个代码范围：
/// - 1000-1999: 地址相关错误
/// - 2000-2999: 注册相关错误
/// - 3000-3999: 发现相关错误
/// - 4000-4999: 后端相关错误
/// - 5000-5999: 连接相关错误
/// - 6000-6999: 配置相关错误
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u32)]
pub enum ErrorCode {
    // ============================================================
    // 地址相关错误 (1000-1999)
    // ============================================================
    InvalidAddress = 1000,
    InvalidPort = 1001,

    // ============================================================
    // 注册相关错误 (2000-2999)
    // ============================================================
    NotRegistered = 2000,

    // ============================================================
    // 发现相关错误 (3000-3999)
    // ============================================================
    NoInstances = 3000,

    // ============================================================
    // 后端相关错误 (4000-4999)
    // ============================================================
    BackendUnavailable = 4000,

    // ============================================================
    // 连接相关错误 (5000-5999)
    // ============================================================
    ConnectionFailed = 5000,
    ConnectionTimeout = 5001,

    // ============================================================
    // 配置相关错误 (6000-6999)
    // ============================================================
    ConfigurationError = 6000,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl ErrorCode {
    /// 获取错误代码的数字值
    #[inline]
    pub fn as_u32(&self) -> u32 {
        *self as u32
    }

    /// 从数字值创建错误代码
    pub fn from_u32(code: u32) -> Option<Self> {
        match code {
            1000 => Some(ErrorCode::InvalidAddress),
            1001 => Some(ErrorCode::InvalidPort),
            2000 => Some(ErrorCode::NotRegistered),
            3000 => Some(ErrorCode::NoInstances),
            4000 => Some(ErrorCode::BackendUnavailable),
            5000 => Some(ErrorCode::ConnectionFailed),
            5001 => Some(ErrorCode::ConnectionTimeout),
            6000 => Some(ErrorCode::ConfigurationError),
            _ => None,
        }
    }

    /// 获取错误代码的英文标识符
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InvalidAddress => "INVALID_ADDRESS",
            ErrorCode::InvalidPort => "INVALID_PORT",
            ErrorCode::NotRegistered => "NOT_REGISTERED",
            ErrorCode::NoInstances => "NO_INSTANCES",
            ErrorCode::BackendUnavailable => "BACKEND_UNAVAILABLE",
            ErrorCode::ConnectionFailed => "CONNECTION_FAILED",
            ErrorCode::ConnectionTimeout => "CONNECTION_TIMEOUT",
            ErrorCode::ConfigurationError => "CONFIGURATION_ERROR",
        }
    }

    /// 获取错误代码的类别
    pub fn category(&self) -> ErrorCategory {
        match self.as_u32() {
            1000..=1999 => ErrorCategory::Address,
            2000..=2999 => ErrorCategory::Registration,
            3000..=3999 => ErrorCategory::Discovery,
            4000..=4999 => ErrorCategory::Backend,
            5000..=5999 => ErrorCategory::Connection,
            _ => ErrorCategory::Configuration,
        }
    }

    /// 判断是否为可重试的错误
    ///
    /// 本模块自身从不重试，这里只是给上层调用方的提示
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorCode::NoInstances
                | ErrorCode::BackendUnavailable
                | ErrorCode::ConnectionFailed
                | ErrorCode::ConnectionTimeout
        )
    }
}

/// 错误类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCategory {
    Address,
    Registration,
    Discovery,
    Backend,
    Connection,
    Configuration,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Address => write!(f, "ADDRESS"),
            ErrorCategory::Registration => write!(f, "REGISTRATION"),
            ErrorCategory::Discovery => write!(f, "DISCOVERY"),
            ErrorCategory::Backend => write!(f, "BACKEND"),
            ErrorCategory::Connection => write!(f, "CONNECTION"),
            ErrorCategory::Configuration => write!(f, "CONFIGURATION"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_roundtrip_and_category() {
        for code in [
            ErrorCode::InvalidAddress,
            ErrorCode::InvalidPort,
            ErrorCode::NotRegistered,
            ErrorCode::NoInstances,
            ErrorCode::BackendUnavailable,
            ErrorCode::ConnectionFailed,
            ErrorCode::ConnectionTimeout,
            ErrorCode::ConfigurationError,
        ] {
            assert_eq!(ErrorCode::from_u32(code.as_u32()), Some(code));
        }
        assert_eq!(ErrorCode::from_u32(42), None);
        assert_eq!(ErrorCode::InvalidPort.category(), ErrorCategory::Address);
        assert_eq!(ErrorCode::NoInstances.category(), ErrorCategory::Discovery);
        assert_eq!(ErrorCode::ConfigurationError.to_string(), "CONFIGURATION_ERROR");
    }

    #[test]
    fn test_retryable_codes() {
        assert!(ErrorCode::NoInstances.is_retryable());
        assert!(ErrorCode::BackendUnavailable.is_retryable());
        assert!(!ErrorCode::InvalidAddress.is_retryable());
        assert!(!ErrorCode::NotRegistered.is_retryable());
    }
}
