use std::sync::atomic::{AtomicBool, Ordering};

/// 单次赋值闩：保障某个副作用在并发触发下恰好执行一次。
///
/// ## 设计背景（Why）
/// - “已关闭”通知可以从多条路径进入（显式关闭、I/O 出错、半部关停），
///   且可能来自不同线程；通知必须恰好派发一次；
/// - 以比较交换实现的单次赋值闩在不引入外部锁的前提下保持该契约——
///   首个触发者赢得派发权，其余触发者各自继续自己的资源清理。
///
/// ## 契约（What）
/// - `try_fire()`：首次调用返回 `true`（赢得副作用执行权），此后永远
///   返回 `false`；
/// - `is_fired()`：查询闩是否已翻转。
#[derive(Debug, Default)]
pub struct CloseLatch {
    fired: AtomicBool,
}

impl CloseLatch {
    /// 构造一个未触发的闩。
    pub const fn new() -> Self {
        Self {
            fired: AtomicBool::new(false),
        }
    }

    /// 尝试为本次调用者赢得副作用执行权。
    pub fn try_fire(&self) -> bool {
        self.fired
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// 闩是否已翻转。
    pub fn is_fired(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }
}
