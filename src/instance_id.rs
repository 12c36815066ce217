//! 实例 ID 生成

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::{SystemTime, UNIX_EPOCH};

/// 生成注册用的实例 ID：`<service_name>-<随机数>`
///
/// 随机数来自以当前纳秒时间为种子的 RNG。只保证碰撞概率低，
/// 既不是密码学安全的也不单调，不能用于排序。
pub fn generate_instance_id(service_name: &str) -> String {
    let seed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or_default();
    let mut rng = StdRng::seed_from_u64(seed);
    format!("{}-{}", service_name, rng.gen_range(0..i64::MAX))
}
