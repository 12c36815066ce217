//! 日志初始化
//!
//! 进程级别只能安装一次全局订阅者，重复初始化返回 `Config` 错误。

use crate::config::LogConfig;
use crate::error::{RegistryError, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// 构建日志过滤器
///
/// 设置了 `RUST_LOG` 时优先使用，否则使用配置中的 `level`。
pub fn build_filter(config: &LogConfig) -> Result<EnvFilter> {
    let directives = std::env::var("RUST_LOG")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| config.level.clone());
    parse_filter(&directives)
}

fn parse_filter(directives: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(directives).map_err(|e| {
        RegistryError::config(format!("invalid log filter '{}': {}", directives, e))
    })
}

/// 安装全局 tracing 订阅者
pub fn init_tracing(config: &LogConfig) -> Result<()> {
    let filter = build_filter(config)?;
    let registry = tracing_subscriber::registry().with(filter);

    let result = if config.json {
        registry
            .with(fmt::layer().json().with_target(true))
            .try_init()
    } else {
        registry.with(fmt::layer().with_target(true)).try_init()
    };

    result.map_err(|e| {
        RegistryError::config(format!("failed to install tracing subscriber: {}", e))
    })
}
