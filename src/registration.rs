//! 服务注册器
//!
//! 启动时注册实例，后台按间隔调用 `health_check` 续期，关闭时注销。

use crate::error::{RegistryError, Result};
use crate::instance_id::generate_instance_id;
use crate::registry::SharedRegistry;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, error, info, warn};

/// 服务注册器
///
/// 持有注册中心句柄和本实例的身份，后台心跳任务负责续期。
/// 应该在服务关闭前显式调用 [`shutdown`](ServiceRegistration::shutdown)，
/// `Drop` 只做尽力而为的注销。
pub struct ServiceRegistration {
    registry: SharedRegistry,
    instance_id: String,
    service_name: String,
    host_port: String,
    shutdown_tx: Option<oneshot::Sender<()>>,
    heartbeat: Option<JoinHandle<()>>,
}

impl ServiceRegistration {
    /// 生成实例 ID、注册并启动心跳任务
    ///
    /// 心跳间隔为零或注册失败时直接返回错误，不会启动心跳。
    pub async fn start(
        registry: SharedRegistry,
        service_name: &str,
        host_port: &str,
        heartbeat_interval: Duration,
    ) -> Result<Self> {
        let instance_id = generate_instance_id(service_name);
        Self::start_with_id(registry, instance_id, service_name, host_port, heartbeat_interval)
            .await
    }

    /// 使用给定的实例 ID 注册并启动心跳任务
    pub async fn start_with_id(
        registry: SharedRegistry,
        instance_id: impl Into<String>,
        service_name: &str,
        host_port: &str,
        heartbeat_interval: Duration,
    ) -> Result<Self> {
        if heartbeat_interval.is_zero() {
            return Err(RegistryError::config("heartbeat interval must be > 0"));
        }

        let instance_id = instance_id.into();
        registry
            .register(&instance_id, service_name, host_port)
            .await?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let heartbeat = tokio::spawn(heartbeat_loop(
            registry.clone(),
            instance_id.clone(),
            service_name.to_string(),
            heartbeat_interval,
            shutdown_rx,
        ));

        info!(
            service_name = %service_name,
            instance_id = %instance_id,
            address = %host_port,
            interval_ms = heartbeat_interval.as_millis() as u64,
            "Service registration started"
        );

        Ok(Self {
            registry,
            instance_id,
            service_name: service_name.to_string(),
            host_port: host_port.to_string(),
            shutdown_tx: Some(shutdown_tx),
            heartbeat: Some(heartbeat),
        })
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub fn host_port(&self) -> &str {
        &self.host_port
    }

    /// 手动发送一次心跳（通常不需要，后台任务会处理）
    pub async fn heartbeat(&self) -> Result<()> {
        self.registry
            .health_check(&self.instance_id, &self.service_name)
            .await
    }

    /// 优雅关闭：停止心跳并注销实例
    ///
    /// 重复调用是安全的，第二次起直接返回 Ok。
    pub async fn shutdown(&mut self) -> Result<()> {
        let Some(shutdown_tx) = self.shutdown_tx.take() else {
            return Ok(());
        };
        let _ = shutdown_tx.send(());
        if let Some(handle) = self.heartbeat.take() {
            let _ = handle.await;
        }

        match self
            .registry
            .deregister(&self.instance_id, &self.service_name)
            .await
        {
            Ok(()) => {
                info!(
                    service_name = %self.service_name,
                    instance_id = %self.instance_id,
                    "Service unregistered"
                );
                Ok(())
            }
            Err(e) => {
                warn!(
                    service_name = %self.service_name,
                    instance_id = %self.instance_id,
                    error = %e,
                    "Failed to unregister service"
                );
                Err(e)
            }
        }
    }
}

async fn heartbeat_loop(
    registry: SharedRegistry,
    instance_id: String,
    service_name: String,
    period: Duration,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match registry.health_check(&instance_id, &service_name).await {
                    Ok(()) => debug!(instance_id = %instance_id, "Heartbeat sent"),
                    Err(e) => error!(
                        instance_id = %instance_id,
                        error = %e,
                        "Failed to send heartbeat"
                    ),
                }
            }
            _ = &mut shutdown_rx => {
                debug!(instance_id = %instance_id, "Heartbeat task stopped");
                break;
            }
        }
    }
}

impl Drop for ServiceRegistration {
    fn drop(&mut self) {
        let Some(shutdown_tx) = self.shutdown_tx.take() else {
            return;
        };
        let _ = shutdown_tx.send(());

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let registry = self.registry.clone();
                let instance_id = self.instance_id.clone();
                let service_name = self.service_name.clone();
                let heartbeat = self.heartbeat.take();
                handle.spawn(async move {
                    if let Some(heartbeat) = heartbeat {
                        let _ = heartbeat.await;
                    }
                    if let Err(e) = registry.deregister(&instance_id, &service_name).await {
                        warn!(
                            instance_id = %instance_id,
                            error = %e,
                            "Failed to unregister service (from Drop)"
                        );
                    }
                });
            }
            Err(_) => {
                warn!(
                    instance_id = %self.instance_id,
                    "Cannot unregister service: tokio runtime not available"
                );
            }
        }
    }
}
