//! 服务注册发现模块
//!
//! 支持两种后端：进程内的内存表和外部的 Consul agent。
//! 调用方只依赖 [`Registry`] trait，后端在构造时通过 [`create_registry`] 选定。

pub mod address;
#[cfg(feature = "consul")]
pub mod consul;
pub mod memory;
pub mod trait_def;

use crate::config::{BackendType, RegistryConfig};
use crate::error::Result;
use std::sync::Arc;

pub use address::HostPort;
#[cfg(feature = "consul")]
pub use consul::ConsulRegistry;
pub use memory::{DEFAULT_LIVENESS_WINDOW, MemoryRegistry, ServiceInstance};
pub use trait_def::{Registry, SharedRegistry};

/// 按配置创建服务注册发现实例
pub fn create_registry(config: &RegistryConfig) -> Result<SharedRegistry> {
    match config.backend {
        BackendType::Memory => {
            let registry = MemoryRegistry::new().with_liveness_window(config.liveness_window());
            Ok(Arc::new(registry))
        }
        #[cfg(feature = "consul")]
        BackendType::Consul => {
            let registry = ConsulRegistry::new(&config.consul)?;
            Ok(Arc::new(registry))
        }
        #[cfg(not(feature = "consul"))]
        BackendType::Consul => Err(crate::error::RegistryError::config(
            "consul backend requires the `consul` feature",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_memory_registry() {
        let config = RegistryConfig {
            backend: BackendType::Memory,
            ..RegistryConfig::default()
        };
        let registry = create_registry(&config).unwrap();
        registry.register("a-1", "a", "h:1").await.unwrap();
        assert_eq!(registry.discover("a").await.unwrap(), vec!["h:1".to_string()]);
    }

    #[cfg(feature = "consul")]
    #[test]
    fn test_create_consul_registry() {
        let config = RegistryConfig::default();
        assert!(create_registry(&config).is_ok());
    }
}
