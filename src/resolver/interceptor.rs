//! 客户端追踪拦截器

use std::sync::Arc;
use tonic::service::interceptor::Interceptor;
use tonic::{Request, Status};
use tracing::debug;
use uuid::Uuid;

/// 追踪 ID 元数据键
pub const TRACE_ID_HEADER: &str = "x-trace-id";
/// 请求 ID 元数据键
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// 追踪拦截器
///
/// 为每个发出的请求补齐 `x-trace-id`（已有则保留）并生成新的 `x-request-id`，
/// 同时记录目标服务和地址。
#[derive(Debug, Clone)]
pub struct TraceInterceptor {
    service_name: Arc<str>,
    address: Arc<str>,
}

impl TraceInterceptor {
    pub fn new(service_name: &str, address: &str) -> Self {
        Self {
            service_name: Arc::from(service_name),
            address: Arc::from(address),
        }
    }
}

impl Interceptor for TraceInterceptor {
    fn call(&mut self, mut req: Request<()>) -> Result<Request<()>, Status> {
        let metadata = req.metadata_mut();

        let existing = metadata
            .get(TRACE_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(str::to_string);
        let trace_id = match existing {
            Some(id) => id,
            None => {
                let id = Uuid::new_v4().to_string();
                metadata.insert(
                    TRACE_ID_HEADER,
                    id.parse().map_err(|_| Status::internal("Invalid trace_id"))?,
                );
                id
            }
        };

        let request_id = Uuid::new_v4().to_string();
        metadata.insert(
            REQUEST_ID_HEADER,
            request_id
                .parse()
                .map_err(|_| Status::internal("Invalid request_id"))?,
        );

        debug!(
            service_name = %self.service_name,
            address = %self.address,
            trace_id = %trace_id,
            request_id = %request_id,
            "Outgoing gRPC request"
        );
        Ok(req)
    }
}
