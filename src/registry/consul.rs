//! Consul 服务注册发现实现
//!
//! 本进程不持有任何注册状态，所有簿记都交给 Consul agent，这里只保存一个 HTTP 客户端句柄。
//! 实例通过 TTL 检查保持健康：必须在 TTL 内调用 `health_check` 上报 passing。

use super::address::HostPort;
use super::trait_def::Registry;
use crate::config::{ConsulConfig, TtlCheckConfig};
use crate::error::{RegistryError, Result};
use async_trait::async_trait;
use reqwest::{Client as HttpClient, Method, RequestBuilder, StatusCode, Url};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Consul 服务注册发现
pub struct ConsulRegistry {
    http_client: HttpClient,
    consul_url: Url,
    token: Option<String>,
    tags: Vec<String>,
    check: TtlCheckConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct AgentServiceRegistration<'a> {
    #[serde(rename = "ID")]
    id: &'a str,
    name: &'a str,
    tags: &'a [String],
    address: &'a str,
    port: u16,
    check: TtlCheck<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct TtlCheck<'a> {
    #[serde(rename = "CheckID")]
    check_id: &'a str,
    #[serde(rename = "TTL")]
    ttl: String,
    timeout: String,
    deregister_critical_service_after: String,
    #[serde(rename = "TLSSkipVerify")]
    tls_skip_verify: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct CheckUpdate<'a> {
    status: &'a str,
    output: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct HealthEntry {
    #[serde(default)]
    node: Option<HealthNode>,
    service: HealthService,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct HealthNode {
    #[serde(default)]
    address: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct HealthService {
    #[serde(default)]
    address: String,
    port: u16,
}

impl HealthEntry {
    /// 服务地址为空时回退到节点地址（与 Consul 自身的语义一致）
    fn host_port(&self) -> String {
        let host = if self.service.address.is_empty() {
            self.node.as_ref().map(|n| n.address.as_str()).unwrap_or_default()
        } else {
            self.service.address.as_str()
        };
        format!("{}:{}", host, self.service.port)
    }
}

impl ConsulRegistry {
    /// 创建新的 Consul 注册中心客户端
    ///
    /// 地址没有 scheme 时按 `http://` 处理，如 `localhost:8500`。
    pub fn new(config: &ConsulConfig) -> Result<Self> {
        let http_client = HttpClient::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| RegistryError::backend_unavailable("failed to build consul client", e))?;

        let address = normalize_url(&config.address);
        let consul_url = Url::parse(&address).map_err(|e| {
            RegistryError::config(format!("invalid consul address '{}': {}", address, e))
        })?;
        if consul_url.cannot_be_a_base() {
            return Err(RegistryError::config(format!(
                "invalid consul address '{}'",
                address
            )));
        }

        Ok(Self {
            http_client,
            consul_url,
            token: config.token.clone(),
            tags: config.tags.clone(),
            check: config.check.clone(),
        })
    }

    /// 设置注册时附带的标签
    pub fn with_tags(mut self, tags: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn consul_url(&self) -> &Url {
        &self.consul_url
    }

    /// 按路径段拼接 URL，每一段都会被百分号编码
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.consul_url.clone();
        // 构造时已排除 cannot-be-a-base 的地址
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: Method, segments: &[&str]) -> RequestBuilder {
        let req = self.http_client.request(method, self.endpoint(segments));
        match &self.token {
            Some(token) => req.header("X-Consul-Token", token),
            None => req,
        }
    }

    async fn send(&self, req: RequestBuilder, action: &str) -> Result<reqwest::Response> {
        req.send()
            .await
            .map_err(|e| RegistryError::backend_unavailable(format!("consul {} failed", action), e))
    }
}

fn normalize_url(address: &str) -> String {
    let address = address.trim_end_matches('/');
    if address.starts_with("http://") || address.starts_with("https://") {
        address.to_string()
    } else {
        format!("http://{}", address)
    }
}

async fn status_error(resp: reqwest::Response, action: &str) -> RegistryError {
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    RegistryError::backend_status(format!(
        "consul {} returned {}: {}",
        action,
        status,
        body.trim()
    ))
}

#[async_trait]
impl Registry for ConsulRegistry {
    async fn register(&self, instance_id: &str, service_name: &str, host_port: &str) -> Result<()> {
        let addr = HostPort::parse(host_port)?;

        let payload = AgentServiceRegistration {
            id: instance_id,
            name: service_name,
            tags: &self.tags,
            address: &addr.host,
            port: addr.port,
            check: TtlCheck {
                check_id: instance_id,
                ttl: format!("{}s", self.check.ttl_secs),
                timeout: format!("{}s", self.check.timeout_secs),
                deregister_critical_service_after: format!(
                    "{}s",
                    self.check.deregister_critical_after_secs
                ),
                tls_skip_verify: true,
            },
        };

        let req = self
            .request(Method::PUT, &["v1", "agent", "service", "register"])
            .json(&payload);
        let resp = self.send(req, "register").await?;
        if !resp.status().is_success() {
            return Err(status_error(resp, "register").await);
        }

        info!(
            service_name = %service_name,
            instance_id = %instance_id,
            address = %addr,
            "Service registered with Consul"
        );
        Ok(())
    }

    async fn deregister(&self, instance_id: &str, service_name: &str) -> Result<()> {
        let req = self.request(
            Method::PUT,
            &["v1", "agent", "service", "deregister", instance_id],
        );
        let resp = self.send(req, "deregister").await?;

        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            warn!(
                service_name = %service_name,
                instance_id = %instance_id,
                "Instance already absent from Consul"
            );
            return Ok(());
        }
        if !status.is_success() {
            return Err(status_error(resp, "deregister").await);
        }

        info!(
            service_name = %service_name,
            instance_id = %instance_id,
            "Service deregistered from Consul"
        );
        Ok(())
    }

    async fn health_check(&self, instance_id: &str, service_name: &str) -> Result<()> {
        let req = self
            .request(Method::PUT, &["v1", "agent", "check", "update", instance_id])
            .json(&CheckUpdate {
                status: "passing",
                output: "online",
            });
        let resp = self.send(req, "health check").await?;

        let status = resp.status();
        if status.is_success() {
            debug!(instance_id = %instance_id, "TTL check passed");
            return Ok(());
        }

        let body = resp.text().await.unwrap_or_default();
        // 旧版本 agent 对未知 check 返回 500 + "Unknown check"
        if status == StatusCode::NOT_FOUND || body.contains("Unknown check") {
            return Err(RegistryError::not_registered(service_name, instance_id));
        }
        Err(RegistryError::backend_status(format!(
            "consul health check returned {}: {}",
            status,
            body.trim()
        )))
    }

    async fn discover(&self, service_name: &str) -> Result<Vec<String>> {
        let req = self
            .request(Method::GET, &["v1", "health", "service", service_name])
            .query(&[("passing", "true")]);
        let resp = self.send(req, "discover").await?;
        if !resp.status().is_success() {
            return Err(status_error(resp, "discover").await);
        }

        let entries: Vec<HealthEntry> = resp.json().await.map_err(|e| {
            RegistryError::backend_unavailable("failed to parse consul health response", e)
        })?;

        let addrs: Vec<String> = entries.iter().map(HealthEntry::host_port).collect();
        debug!(
            service_name = %service_name,
            count = addrs.len(),
            "Discovered passing instances from Consul"
        );

        if addrs.is_empty() {
            return Err(RegistryError::NoInstances(service_name.to_string()));
        }
        Ok(addrs)
    }
}
