//! `host:port` 地址解析

use crate::error::{RegistryError, Result};

/// 解析后的实例地址
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostPort {
    pub host: String,
    pub port: u16,
}

impl HostPort {
    /// 按第一个 `:` 拆分 `host:port`
    ///
    /// 没有 `:` 返回 `InvalidAddress`，端口不是 0-65535 之间的数字返回 `InvalidPort`。
    pub fn parse(host_port: &str) -> Result<Self> {
        let (host, port) = host_port
            .split_once(':')
            .ok_or_else(|| RegistryError::InvalidAddress(host_port.to_string()))?;

        let port = port.parse::<u16>().map_err(|_| RegistryError::InvalidPort {
            address: host_port.to_string(),
            port: port.to_string(),
        })?;

        Ok(Self {
            host: host.to_string(),
            port,
        })
    }
}

impl std::fmt::Display for HostPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}
