//! Flare Service Registry
//!
//! 服务实例注册与发现：
//! - 统一的 [`Registry`] 抽象，提供内存和 Consul 两种后端
//! - [`ServiceRegistration`] 负责注册、心跳续期和注销
//! - [`ConnectionResolver`] 把服务名解析为带追踪拦截器的 gRPC Channel
//!
//! ```rust,no_run
//! use flare_service_registry::{MemoryRegistry, Registry, connect_to_service};
//!
//! # async fn demo() -> flare_service_registry::Result<()> {
//! let registry = MemoryRegistry::new();
//! registry.register("products-1", "products", "127.0.0.1:8086").await?;
//!
//! let conn = connect_to_service("products", &registry).await?;
//! let channel = conn.into_traced_channel();
//! # let _ = channel;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod instance_id;
pub mod registration;
pub mod registry;
pub mod resolver;
pub mod telemetry;

// Re-exports
pub use config::{
    BackendType, Config, ConsulConfig, LogConfig, RegistryConfig, ServiceConfig, TtlCheckConfig,
};
pub use error::{ErrorCategory, ErrorCode, RegistryError, Result};
pub use instance_id::generate_instance_id;
pub use registration::ServiceRegistration;
pub use registry::{
    HostPort, MemoryRegistry, Registry, ServiceInstance, SharedRegistry, create_registry,
};
#[cfg(feature = "consul")]
pub use registry::ConsulRegistry;
pub use resolver::{
    ConnectMode, ConnectionResolver, ResolverOptions, ServiceConnection, TraceInterceptor,
    TracedChannel, connect_to_service,
};
pub use telemetry::init_tracing;
