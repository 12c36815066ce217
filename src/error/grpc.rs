//! gRPC 错误处理
//!
//! 提供 RegistryError 到 tonic::Status 的转换，供 gRPC 处理器直接返回

use super::{ErrorCode, RegistryError};
use tonic::{Code, Status};

impl From<RegistryError> for Status {
    fn from(err: RegistryError) -> Self {
        let code = err.code();
        let mut status = Status::new(map_error_code_to_grpc(code), err.to_string());

        // 添加错误代码到 metadata
        if let Ok(value) = code.as_u32().to_string().parse() {
            status.metadata_mut().insert("error-code", value);
        }

        status
    }
}

/// 将错误代码映射到 gRPC 状态码
fn map_error_code_to_grpc(code: ErrorCode) -> Code {
    match code {
        ErrorCode::InvalidAddress | ErrorCode::InvalidPort => Code::InvalidArgument,
        ErrorCode::NotRegistered => Code::FailedPrecondition,
        ErrorCode::NoInstances
        | ErrorCode::BackendUnavailable
        | ErrorCode::ConnectionFailed => Code::Unavailable,
        ErrorCode::ConnectionTimeout => Code::DeadlineExceeded,
        ErrorCode::ConfigurationError => Code::Internal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_carries_error_code() {
        let status: Status = RegistryError::NoInstances("product-service".into()).into();
        assert_eq!(status.code(), Code::Unavailable);
        assert!(status.message().contains("product-service"));
        let meta = status
            .metadata()
            .get("error-code")
            .and_then(|v| v.to_str().ok());
        assert_eq!(meta, Some("3000"));
    }

    #[test]
    fn test_invalid_address_maps_to_invalid_argument() {
        let status: Status = RegistryError::InvalidAddress("abc".into()).into();
        assert_eq!(status.code(), Code::InvalidArgument);
    }
}
