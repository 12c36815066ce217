//! 服务注册发现统一错误类型

use super::code::ErrorCode;
use std::time::Duration;
use thiserror::Error;

/// 底层错误的装箱类型
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// 服务注册发现错误
#[derive(Error, Debug)]
pub enum RegistryError {
    /// 地址缺少 `:` 分隔符
    #[error("invalid host:port address `{0}`: missing ':' separator")]
    InvalidAddress(String),

    /// 端口不是合法数字
    #[error("invalid port `{port}` in address `{address}`")]
    InvalidPort { address: String, port: String },

    /// 对未注册的实例做健康检查（通常说明调用方生命周期顺序有误）
    #[error("instance `{instance_id}` of service `{service_name}` is not registered")]
    NotRegistered {
        service_name: String,
        instance_id: String,
    },

    /// 没有发现任何可用实例
    #[error("no instances found for service `{0}`")]
    NoInstances(String),

    /// 外部注册中心不可达或返回错误
    #[error("registry backend unavailable: {message}")]
    BackendUnavailable {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// 建立到实例的传输层连接失败
    #[error("failed to connect to `{address}`: {source}")]
    Connect {
        address: String,
        #[source]
        source: BoxError,
    },

    /// 调用方设置的超时已到
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    /// 配置错误
    #[error("configuration error: {0}")]
    Config(String),
}

impl RegistryError {
    /// 创建后端不可用错误（带底层错误）
    pub fn backend_unavailable(
        message: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        RegistryError::BackendUnavailable {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// 创建后端不可用错误（无底层错误，如非 2xx 响应）
    pub fn backend_status(message: impl Into<String>) -> Self {
        RegistryError::BackendUnavailable {
            message: message.into(),
            source: None,
        }
    }

    /// 创建未注册错误
    pub fn not_registered(service_name: impl Into<String>, instance_id: impl Into<String>) -> Self {
        RegistryError::NotRegistered {
            service_name: service_name.into(),
            instance_id: instance_id.into(),
        }
    }

    /// 创建配置错误
    pub fn config(msg: impl Into<String>) -> Self {
        RegistryError::Config(msg.into())
    }

    /// 对应的错误代码
    pub fn code(&self) -> ErrorCode {
        match self {
            RegistryError::InvalidAddress(_) => ErrorCode::InvalidAddress,
            RegistryError::InvalidPort { .. } => ErrorCode::InvalidPort,
            RegistryError::NotRegistered { .. } => ErrorCode::NotRegistered,
            RegistryError::NoInstances(_) => ErrorCode::NoInstances,
            RegistryError::BackendUnavailable { .. } => ErrorCode::BackendUnavailable,
            RegistryError::Connect { .. } => ErrorCode::ConnectionFailed,
            RegistryError::Timeout(_) => ErrorCode::ConnectionTimeout,
            RegistryError::Config(_) => ErrorCode::ConfigurationError,
        }
    }

    /// 是否值得由上层按退避策略重试
    pub fn is_retryable(&self) -> bool {
        self.code().is_retryable()
    }
}
