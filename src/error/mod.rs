//! 服务注册发现错误处理模块
//!
//! 提供统一的错误类型、错误代码分类以及到 gRPC Status 的转换

pub mod code;
pub mod grpc;
pub mod registry_error;

pub use code::{ErrorCategory, ErrorCode};
pub use registry_error::{BoxError, RegistryError};

/// 服务注册发现结果类型
pub type Result<T> = std::result::Result<T, RegistryError>;
