//! 服务注册发现 Trait 定义

use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// 服务注册发现 Trait
///
/// 内存后端与 Consul 后端都实现这个 trait，调用方只依赖 `Arc<dyn Registry>`，
/// 具体后端在构造时注入（见 [`crate::registry::create_registry`]）。
///
/// 取消语义：丢弃返回的 future 即取消本次调用；需要超时的调用方用
/// `tokio::time::timeout` 包装。
#[async_trait]
pub trait Registry: Send + Sync {
    /// 注册服务实例
    ///
    /// `host_port` 必须是 `host:port` 形式。重复注册同一个 `instance_id` 会覆盖旧状态。
    async fn register(&self, instance_id: &str, service_name: &str, host_port: &str) -> Result<()>;

    /// 注销服务实例，实例或服务不存在时视为成功
    async fn deregister(&self, instance_id: &str, service_name: &str) -> Result<()>;

    /// 上报实例存活
    async fn health_check(&self, instance_id: &str, service_name: &str) -> Result<()>;

    /// 发现服务的所有实例地址（`host:port`），结果为空时返回 `NoInstances`
    async fn discover(&self, service_name: &str) -> Result<Vec<String>>;
}

/// 共享的注册中心句柄
pub type SharedRegistry = Arc<dyn Registry>;
