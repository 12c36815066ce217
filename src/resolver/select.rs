//! 实例选择策略
//!
//! 默认策略是均匀随机，不按负载或延迟加权，只是一个占位的流量分散手段。

use rand::seq::SliceRandom;

/// 实例选择器
pub trait InstanceSelector: Send + Sync {
    /// 从候选地址中选出一个，候选为空时返回 None
    fn select<'a>(&self, addrs: &'a [String]) -> Option<&'a String>;
}

/// 随机选择（Random）
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomSelector;

impl InstanceSelector for RandomSelector {
    fn select<'a>(&self, addrs: &'a [String]) -> Option<&'a String> {
        addrs.choose(&mut rand::thread_rng())
    }
}
