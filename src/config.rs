//! 配置模块
//!
//! 支持 TOML 文件加载，并可用环境变量覆盖注册中心相关配置

use crate::error::{RegistryError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub service: ServiceConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
    pub name: String,
    pub address: String, // host:port
}

/// 注册中心后端类型
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendType {
    Memory,
    #[default]
    Consul,
}

impl std::str::FromStr for BackendType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" | "inmemory" | "in-memory" => Ok(BackendType::Memory),
            "consul" => Ok(BackendType::Consul),
            _ => Err(format!("Unknown registry backend: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RegistryConfig {
    #[serde(default)]
    pub backend: BackendType,
    #[serde(default)]
    pub consul: ConsulConfig,
    /// 内存后端 `discover_live` 的存活窗口（秒）
    #[serde(default = "default_liveness_window_secs")]
    pub liveness_window_secs: u64,
    /// 心跳间隔（秒），必须小于 TTL
    #[serde(default = "default_heartbeat_interval_secs")]
    pub heartbeat_interval_secs: u64,
}

fn default_liveness_window_secs() -> u64 {
    5
}

fn default_heartbeat_interval_secs() -> u64 {
    2
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            backend: BackendType::default(),
            consul: ConsulConfig::default(),
            liveness_window_secs: default_liveness_window_secs(),
            heartbeat_interval_secs: default_heartbeat_interval_secs(),
        }
    }
}

impl RegistryConfig {
    pub fn liveness_window(&self) -> Duration {
        Duration::from_secs(self.liveness_window_secs)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    /// 用进程环境变量覆盖配置
    ///
    /// - `REGISTRY_BACKEND`: memory / consul
    /// - `CONSUL_ADDR`: Consul agent 地址
    /// - `CONSUL_TOKEN`: ACL token
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_with(|key| std::env::var(key).ok())
    }

    /// 用给定的查找函数覆盖配置（空值视为未设置）
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(backend) = get("REGISTRY_BACKEND") {
            self.backend = backend
                .parse()
                .map_err(|e: String| RegistryError::config(e))?;
        }
        if let Some(addr) = get("CONSUL_ADDR") {
            self.consul.address = addr;
        }
        if let Some(token) = get("CONSUL_TOKEN") {
            self.consul.token = Some(token);
        }
        Ok(())
    }

    /// 校验心跳间隔与 TTL 的关系
    pub fn validate(&self) -> Result<()> {
        if self.heartbeat_interval_secs == 0 {
            return Err(RegistryError::config("heartbeat_interval_secs must be > 0"));
        }
        if self.backend == BackendType::Consul
            && self.heartbeat_interval_secs >= self.consul.check.ttl_secs
        {
            return Err(RegistryError::config(format!(
                "heartbeat interval {}s must be shorter than consul check TTL {}s",
                self.heartbeat_interval_secs, self.consul.check.ttl_secs
            )));
        }
        if self.backend == BackendType::Memory
            && self.heartbeat_interval_secs >= self.liveness_window_secs
        {
            return Err(RegistryError::config(format!(
                "heartbeat interval {}s must be shorter than liveness window {}s",
                self.heartbeat_interval_secs, self.liveness_window_secs
            )));
        }
        Ok(())
    }
}

/// Consul agent 配置
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConsulConfig {
    #[serde(default = "default_consul_address")]
    pub address: String,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub check: TtlCheckConfig,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_consul_address() -> String {
    "localhost:8500".to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

impl Default for ConsulConfig {
    fn default() -> Self {
        Self {
            address: default_consul_address(),
            token: None,
            tags: Vec::new(),
            check: TtlCheckConfig::default(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl ConsulConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// TTL 健康检查配置
///
/// 实例必须在 `ttl_secs` 内上报一次存活，每次上报 `timeout_secs` 超时；
/// 进入 critical 状态 `deregister_critical_after_secs` 后由 agent 注销。
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TtlCheckConfig {
    pub ttl_secs: u64,
    pub timeout_secs: u64,
    pub deregister_critical_after_secs: u64,
}

impl Default for TtlCheckConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 5,
            timeout_secs: 1,
            deregister_critical_after_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LogConfig {
    /// EnvFilter 指令，如 "info" 或 "flare_service_registry=debug"
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Config {
    pub fn load_from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| RegistryError::config(format!("failed to read {}: {}", path, e)))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)
            .map_err(|e| RegistryError::config(format!("invalid config: {}", e)))?;
        config.registry.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_from_minimal_toml() {
        let config = Config::from_toml_str(
            r#"
            [service]
            name = "product-service-grpc"
            address = "localhost:8086"
            "#,
        )
        .unwrap();

        assert_eq!(config.registry.backend, BackendType::Consul);
        assert_eq!(config.registry.consul.address, "localhost:8500");
        assert_eq!(config.registry.consul.check.ttl_secs, 5);
        assert_eq!(config.registry.consul.check.timeout_secs, 1);
        assert_eq!(config.registry.consul.check.deregister_critical_after_secs, 10);
        assert_eq!(config.registry.liveness_window(), Duration::from_secs(5));
        assert_eq!(config.log.level, "info");
        assert!(!config.log.json);
    }

    #[test]
    fn test_full_toml() {
        let config = Config::from_toml_str(
            r#"
            [service]
            name = "orders"
            address = "0.0.0.0:9000"

            [registry]
            backend = "memory"
            liveness_window_secs = 8
            heartbeat_interval_secs = 3

            [registry.consul]
            address = "http://consul:8500"
            tags = ["grpc", "v1"]

            [log]
            level = "debug"
            json = true
            "#,
        )
        .unwrap();

        assert_eq!(config.registry.backend, BackendType::Memory);
        assert_eq!(config.registry.heartbeat_interval(), Duration::from_secs(3));
        assert_eq!(config.registry.consul.tags, vec!["grpc", "v1"]);
        assert!(config.log.json);
    }

    #[test]
    fn test_rejects_heartbeat_longer_than_ttl() {
        let err = Config::from_toml_str(
            r#"
            [service]
            name = "orders"
            address = "0.0.0.0:9000"

            [registry]
            heartbeat_interval_secs = 5
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, RegistryError::Config(_)));
    }

    #[test]
    fn test_apply_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("REGISTRY_BACKEND", "memory"),
            ("CONSUL_ADDR", "consul.internal:8500"),
            ("CONSUL_TOKEN", ""),
        ]
        .into_iter()
        .collect();

        let mut registry = RegistryConfig::default();
        registry
            .apply_env_with(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(registry.backend, BackendType::Memory);
        assert_eq!(registry.consul.address, "consul.internal:8500");
        assert_eq!(registry.consul.token, None);
    }

    #[test]
    fn test_apply_env_rejects_unknown_backend() {
        let mut registry = RegistryConfig::default();
        let err = registry
            .apply_env_with(|key| (key == "REGISTRY_BACKEND").then(|| "zookeeper".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("zookeeper"));
    }

    #[test]
    fn test_backend_type_from_str() {
        assert_eq!("Consul".parse::<BackendType>(), Ok(BackendType::Consul));
        assert_eq!("in-memory".parse::<BackendType>(), Ok(BackendType::Memory));
        assert!("etcd".parse::<BackendType>().is_err());
    }
}
