use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// 通道在注册表与指标汇中的进程内稳定标识。
///
/// ## 契约（What）
/// - 由进程级原子计数器分配，单调递增、不复用；
/// - 仅在进程内有意义，不跨进程、不持久化。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelId(u64);

static NEXT_CHANNEL_ID: AtomicU64 = AtomicU64::new(1);

impl ChannelId {
    /// 分配下一个通道标识。
    pub fn next() -> Self {
        Self(NEXT_CHANNEL_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// 以整数形式读取标识。
    #[inline]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "channel-{}", self.0)
    }
}
