//! 内存服务注册发现实现
//!
//! 进程内的 service → instance → 存活时间 表，用于单进程测试或演示拓扑，
//! 不依赖任何外部注册中心。

use super::address::HostPort;
use super::trait_def::Registry;
use crate::error::{RegistryError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, info};

/// 默认存活窗口：超过 5 秒未续期的实例不会出现在 `discover_live` 结果中
pub const DEFAULT_LIVENESS_WINDOW: Duration = Duration::from_secs(5);

/// 内存中的服务实例
#[derive(Debug, Clone)]
pub struct ServiceInstance {
    instance_id: String,
    host_port: String,
    last_active: Instant,
}

impl ServiceInstance {
    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    pub fn host_port(&self) -> &str {
        &self.host_port
    }

    /// 最近一次注册或健康检查的时间
    pub fn last_active(&self) -> Instant {
        self.last_active
    }

    fn is_live(&self, now: Instant, window: Duration) -> bool {
        now.saturating_duration_since(self.last_active) <= window
    }
}

/// service_name -> instance_id -> 实例
type ServiceTable = HashMap<String, HashMap<String, ServiceInstance>>;

/// 内存服务注册发现
///
/// 整张表由一把读写锁保护：`register`/`deregister`/`health_check` 取写锁，
/// `discover`/`discover_live` 取读锁。没有后台过期清理，`health_check` 是唯一的续期方式。
///
/// 提供两种读取策略，二者并不等价：
/// - [`discover`](Registry::discover)：返回所有已注册实例，不看是否过期
/// - [`discover_live`](MemoryRegistry::discover_live)：只返回存活窗口内续期过的实例
#[derive(Debug)]
pub struct MemoryRegistry {
    table: RwLock<ServiceTable>,
    liveness_window: Duration,
}

impl MemoryRegistry {
    /// 创建空的内存注册中心
    pub fn new() -> Self {
        Self {
            table: RwLock::new(HashMap::new()),
            liveness_window: DEFAULT_LIVENESS_WINDOW,
        }
    }

    /// 设置存活窗口
    pub fn with_liveness_window(mut self, window: Duration) -> Self {
        self.liveness_window = window;
        self
    }

    pub fn liveness_window(&self) -> Duration {
        self.liveness_window
    }

    /// 发现存活窗口内续期过的实例地址
    ///
    /// 服务不存在、没有实例或所有实例都已过期时返回 `NoInstances`。
    pub async fn discover_live(&self, service_name: &str) -> Result<Vec<String>> {
        let table = self.table.read().await;
        let instances = table
            .get(service_name)
            .filter(|instances| !instances.is_empty())
            .ok_or_else(|| RegistryError::NoInstances(service_name.to_string()))?;

        let now = Instant::now();
        let addrs: Vec<String> = instances
            .values()
            .filter(|inst| inst.is_live(now, self.liveness_window))
            .map(|inst| inst.host_port.clone())
            .collect();

        if addrs.is_empty() {
            debug!(
                service_name = %service_name,
                registered = instances.len(),
                "All registered instances are stale"
            );
            return Err(RegistryError::NoInstances(service_name.to_string()));
        }

        Ok(addrs)
    }

    /// 当前至少有一个实例的服务名
    pub async fn services(&self) -> Vec<String> {
        let table = self.table.read().await;
        table
            .iter()
            .filter(|(_, instances)| !instances.is_empty())
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// 服务下已注册（不论是否过期）的实例数量
    pub async fn instance_count(&self, service_name: &str) -> usize {
        let table = self.table.read().await;
        table.get(service_name).map_or(0, HashMap::len)
    }

    /// 服务下所有实例的快照
    pub async fn instances(&self, service_name: &str) -> Vec<ServiceInstance> {
        let table = self.table.read().await;
        table
            .get(service_name)
            .map(|instances| instances.values().cloned().collect())
            .unwrap_or_default()
    }
}

impl Default for MemoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Registry for MemoryRegistry {
    async fn register(&self, instance_id: &str, service_name: &str, host_port: &str) -> Result<()> {
        HostPort::parse(host_port)?;

        let mut table = self.table.write().await;
        table.entry(service_name.to_string()).or_default().insert(
            instance_id.to_string(),
            ServiceInstance {
                instance_id: instance_id.to_string(),
                host_port: host_port.to_string(),
                last_active: Instant::now(),
            },
        );

        info!(
            service_name = %service_name,
            instance_id = %instance_id,
            address = %host_port,
            "Service registered in memory"
        );
        Ok(())
    }

    async fn deregister(&self, instance_id: &str, service_name: &str) -> Result<()> {
        let mut table = self.table.write().await;
        let Some(instances) = table.get_mut(service_name) else {
            return Ok(());
        };

        if instances.remove(instance_id).is_some() {
            info!(
                service_name = %service_name,
                instance_id = %instance_id,
                "Service deregistered from memory"
            );
        }
        if instances.is_empty() {
            table.remove(service_name);
        }
        Ok(())
    }

    async fn health_check(&self, instance_id: &str, service_name: &str) -> Result<()> {
        let mut table = self.table.write().await;
        let instance = table
            .get_mut(service_name)
            .and_then(|instances| instances.get_mut(instance_id))
            .ok_or_else(|| RegistryError::not_registered(service_name, instance_id))?;

        instance.last_active = Instant::now();
        debug!(
            service_name = %service_name,
            instance_id = %instance_id,
            "Health check renewed"
        );
        Ok(())
    }

    async fn discover(&self, service_name: &str) -> Result<Vec<String>> {
        let table = self.table.read().await;
        match table.get(service_name) {
            Some(instances) if !instances.is_empty() => {
                Ok(instances.values().map(|inst| inst.host_port.clone()).collect())
            }
            _ => Err(RegistryError::NoInstances(service_name.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_register_then_discover() {
        let registry = MemoryRegistry::new();
        registry
            .register("orders-1", "orders", "localhost:8080")
            .await
            .unwrap();

        let addrs = registry.discover("orders").await.unwrap();
        assert_eq!(addrs, vec!["localhost:8080".to_string()]);
        assert_eq!(registry.instance_count("orders").await, 1);
        assert_eq!(registry.services().await, vec!["orders".to_string()]);
    }

    #[tokio::test]
    async fn test_register_is_idempotent_and_overwrites() {
        let registry = MemoryRegistry::new();
        registry.register("orders-1", "orders", "10.0.0.1:80").await.unwrap();
        registry.register("orders-1", "orders", "10.0.0.2:81").await.unwrap();

        assert_eq!(registry.instance_count("orders").await, 1);
        assert_eq!(
            registry.discover("orders").await.unwrap(),
            vec!["10.0.0.2:81".to_string()]
        );
    }

    #[tokio::test]
    async fn test_register_rejects_malformed_address() {
        let registry = MemoryRegistry::new();
        assert!(matches!(
            registry.register("a-1", "a", "abc").await,
            Err(RegistryError::InvalidAddress(_))
        ));
        assert!(matches!(
            registry.register("a-1", "a", "host:abc").await,
            Err(RegistryError::InvalidPort { .. })
        ));
        // 失败的注册不会留下任何状态
        assert_eq!(registry.instance_count("a").await, 0);
    }

    #[tokio::test]
    async fn test_deregister_last_instance() {
        let registry = MemoryRegistry::new();
        registry.register("a-1", "a", "h1:1").await.unwrap();
        registry.register("a-2", "a", "h2:2").await.unwrap();

        registry.deregister("a-1", "a").await.unwrap();
        assert_eq!(registry.discover("a").await.unwrap(), vec!["h2:2".to_string()]);

        registry.deregister("a-2", "a").await.unwrap();
        assert!(matches!(
            registry.discover("a").await,
            Err(RegistryError::NoInstances(name)) if name == "a"
        ));
        assert!(registry.services().await.is_empty());
    }

    #[tokio::test]
    async fn test_deregister_unknown_is_noop() {
        let registry = MemoryRegistry::new();
        registry.deregister("ghost-1", "ghost").await.unwrap();
        registry.register("a-1", "a", "h:1").await.unwrap();
        registry.deregister("ghost-1", "a").await.unwrap();
        assert_eq!(registry.instance_count("a").await, 1);
    }

    #[tokio::test]
    async fn test_health_check_unknown() {
        let registry = MemoryRegistry::new();
        assert!(matches!(
            registry.health_check("a-1", "a").await,
            Err(RegistryError::NotRegistered { .. })
        ));

        registry.register("a-1", "a", "h:1").await.unwrap();
        assert!(matches!(
            registry.health_check("a-2", "a").await,
            Err(RegistryError::NotRegistered { instance_id, .. }) if instance_id == "a-2"
        ));
        registry.health_check("a-1", "a").await.unwrap();
    }

    #[tokio::test]
    async fn test_discover_unknown_service() {
        let registry = MemoryRegistry::new();
        assert!(matches!(
            registry.discover("nope").await,
            Err(RegistryError::NoInstances(_))
        ));
        assert!(matches!(
            registry.discover_live("nope").await,
            Err(RegistryError::NoInstances(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_policies_diverge_after_window() {
        let registry = MemoryRegistry::new();
        registry.register("p-1", "products", "127.0.0.1:8086").await.unwrap();
        registry.health_check("p-1", "products").await.unwrap();

        tokio::time::advance(Duration::from_secs(4)).await;
        assert_eq!(
            registry.discover_live("products").await.unwrap(),
            vec!["127.0.0.1:8086".to_string()]
        );

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(matches!(
            registry.discover_live("products").await,
            Err(RegistryError::NoInstances(_))
        ));
        assert_eq!(
            registry.discover("products").await.unwrap(),
            vec!["127.0.0.1:8086".to_string()]
        );

        // 再次续期后重新出现在过滤结果中
        registry.health_check("p-1", "products").await.unwrap();
        assert_eq!(registry.discover_live("products").await.unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_discover_live_filters_only_stale_instances() {
        let registry = MemoryRegistry::new().with_liveness_window(Duration::from_secs(2));
        registry.register("p-1", "products", "h1:1").await.unwrap();
        tokio::time::advance(Duration::from_secs(3)).await;
        registry.register("p-2", "products", "h2:2").await.unwrap();

        assert_eq!(
            registry.discover_live("products").await.unwrap(),
            vec!["h2:2".to_string()]
        );
        assert_eq!(registry.discover("products").await.unwrap().len(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_mutation_keeps_table_consistent() {
        let registry = Arc::new(MemoryRegistry::new());
        let expected: HashSet<String> = (0..16)
            .map(|i| format!("10.0.0.{i}:{}", 9000 + i))
            .collect();
        let expected = Arc::new(expected);

        let mut tasks = tokio::task::JoinSet::new();
        for i in 0..16u16 {
            let registry = registry.clone();
            tasks.spawn(async move {
                let id = format!("stress-{i}");
                let addr = format!("10.0.0.{i}:{}", 9000 + i);
                for _ in 0..50 {
                    registry.register(&id, "stress", &addr).await.unwrap();
                    registry.health_check(&id, "stress").await.unwrap();
                    registry.deregister(&id, "stress").await.unwrap();
                }
                registry.register(&id, "stress", &addr).await.unwrap();
            });
        }
        for _ in 0..8 {
            let registry = registry.clone();
            let expected = expected.clone();
            tasks.spawn(async move {
                for _ in 0..200 {
                    if let Ok(addrs) = registry.discover("stress").await {
                        let unique: HashSet<&String> = addrs.iter().collect();
                        assert_eq!(unique.len(), addrs.len(), "duplicate entry in snapshot");
                        assert!(addrs.iter().all(|a| expected.contains(a)), "torn entry");
                    }
                    tokio::task::yield_now().await;
                }
            });
        }
        while let Some(res) = tasks.join_next().await {
            res.unwrap();
        }

        let addrs: HashSet<String> = registry
            .discover("stress")
            .await
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(&addrs, expected.as_ref());
    }
}
