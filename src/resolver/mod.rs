//! 基于服务发现的连接解析
//!
//! 把服务名解析成一条可直接使用的 gRPC Channel：先向注册中心发现实例，
//! 随机选出一个，再建立明文、带追踪拦截器的 Channel。
//!
//! 这里没有任何重试：发现失败或连接失败都直接返回给调用方，由调用方决定重试策略。

pub mod interceptor;
pub mod select;

pub use interceptor::{REQUEST_ID_HEADER, TRACE_ID_HEADER, TraceInterceptor};
pub use select::{InstanceSelector, RandomSelector};

use crate::error::{RegistryError, Result};
use crate::registry::Registry;
use std::sync::Arc;
use std::time::Duration;
use tonic::service::interceptor::InterceptedService;
use tonic::transport::{Channel, Endpoint};
use tracing::{debug, warn};

/// 带追踪拦截器的 Channel，可直接传给生成的 gRPC 客户端
pub type TracedChannel = InterceptedService<Channel, TraceInterceptor>;

/// 建立连接的方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectMode {
    /// 只构建 Channel，首次请求时才建立连接
    #[default]
    Lazy,
    /// 返回前完成连接，连接失败直接返回 `Connect` 错误
    Eager,
}

/// 连接解析选项
#[derive(Debug, Clone)]
pub struct ResolverOptions {
    pub connect_mode: ConnectMode,
    pub connect_timeout: Duration,
    /// 单个请求超时，None 表示不限制
    pub request_timeout: Option<Duration>,
    /// 服务发现超时，None 表示不限制
    pub discover_timeout: Option<Duration>,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            connect_mode: ConnectMode::Lazy,
            connect_timeout: Duration::from_secs(5),
            request_timeout: None,
            discover_timeout: None,
        }
    }
}

/// 解析得到的服务连接
///
/// 要么完整可用，要么根本不会被构造出来。
#[derive(Debug, Clone)]
pub struct ServiceConnection {
    service_name: String,
    address: String,
    channel: Channel,
    interceptor: TraceInterceptor,
}

impl ServiceConnection {
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// 被选中实例的 `host:port`
    pub fn address(&self) -> &str {
        &self.address
    }

    /// 未经拦截的底层 Channel
    pub fn channel(&self) -> Channel {
        self.channel.clone()
    }

    /// 带追踪拦截器的 Channel
    pub fn traced_channel(&self) -> TracedChannel {
        InterceptedService::new(self.channel.clone(), self.interceptor.clone())
    }

    pub fn into_traced_channel(self) -> TracedChannel {
        InterceptedService::new(self.channel, self.interceptor)
    }
}

/// 连接解析器
#[derive(Clone)]
pub struct ConnectionResolver {
    options: ResolverOptions,
    selector: Arc<dyn InstanceSelector>,
}

impl ConnectionResolver {
    pub fn new() -> Self {
        Self::with_options(ResolverOptions::default())
    }

    pub fn with_options(options: ResolverOptions) -> Self {
        Self {
            options,
            selector: Arc::new(RandomSelector),
        }
    }

    /// 替换实例选择策略
    pub fn with_selector(mut self, selector: Arc<dyn InstanceSelector>) -> Self {
        self.selector = selector;
        self
    }

    pub fn options(&self) -> &ResolverOptions {
        &self.options
    }

    /// 发现服务实例并连接到其中一个
    pub async fn connect(
        &self,
        service_name: &str,
        registry: &dyn Registry,
    ) -> Result<ServiceConnection> {
        let addrs = self.discover(service_name, registry).await?;

        // 后端约定空结果返回 NoInstances，这里仍在选择前显式检查
        if addrs.is_empty() {
            return Err(RegistryError::NoInstances(service_name.to_string()));
        }

        debug!(
            service_name = %service_name,
            count = addrs.len(),
            "Discovered service instances"
        );

        let address = self
            .selector
            .select(&addrs)
            .cloned()
            .ok_or_else(|| RegistryError::NoInstances(service_name.to_string()))?;

        let channel = self.open_channel(&address).await.inspect_err(|e| {
            warn!(
                service_name = %service_name,
                address = %address,
                error = %e,
                "Failed to connect to service instance"
            );
        })?;

        Ok(ServiceConnection {
            service_name: service_name.to_string(),
            interceptor: TraceInterceptor::new(service_name, &address),
            address,
            channel,
        })
    }

    async fn discover(&self, service_name: &str, registry: &dyn Registry) -> Result<Vec<String>> {
        match self.options.discover_timeout {
            Some(limit) => tokio::time::timeout(limit, registry.discover(service_name))
                .await
                .map_err(|_| RegistryError::Timeout(limit))?,
            None => registry.discover(service_name).await,
        }
    }

    async fn open_channel(&self, address: &str) -> Result<Channel> {
        let connect_err = |source: tonic::transport::Error| RegistryError::Connect {
            address: address.to_string(),
            source: source.into(),
        };

        let mut endpoint = Endpoint::from_shared(format!("http://{}", address))
            .map_err(connect_err)?
            .connect_timeout(self.options.connect_timeout);
        if let Some(timeout) = self.options.request_timeout {
            endpoint = endpoint.timeout(timeout);
        }

        match self.options.connect_mode {
            ConnectMode::Lazy => Ok(endpoint.connect_lazy()),
            ConnectMode::Eager => endpoint.connect().await.map_err(connect_err),
        }
    }
}

impl Default for ConnectionResolver {
    fn default() -> Self {
        Self::new()
    }
}

/// 使用默认选项把服务名解析为连接
pub async fn connect_to_service(
    service_name: &str,
    registry: &dyn Registry,
) -> Result<ServiceConnection> {
    ConnectionResolver::new().connect(service_name, registry).await
}
