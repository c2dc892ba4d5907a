use std::sync::Arc;
use std::time::Duration;

use flint_core::error::Result;
use flint_core::event::Registration;
use flint_core::ready::Interest;

/// 单个 (资源, 方向) 的就绪句柄。
///
/// # 设计背景（Why）
/// - 底层登记可能被另一线程上的关闭异步作废；挂起/恢复必须能从处理器
///   代码里直接调用而无需与并发关闭同步——这是整层的核心并发契约；
/// - 事件源以命名结果 [`InterestUpdate::Cancelled`] 报告该竞态，本句柄
///   是统一吸收它的地方：调用方看到的挂起/恢复永不失败。
///
/// # 契约说明（What）
/// - `suspend()`：移除兴趣；撞上已取消的登记按正常结果静默收下；
/// - `resume()`：以句柄自身的兴趣位重新武装；同样容忍已取消，且绝不
///   重新武装已取消的登记（由 [`Registration`] 契约保证）;
/// - `cancel()`：永久解除登记，幂等；
/// - `await_ready(timeout)`：同步逃生口，阻塞调用线程至就绪或超时；
/// - 以上操作都不执行 I/O，只改变未来的触发计划。
///
/// [`InterestUpdate::Cancelled`]: flint_core::event::InterestUpdate::Cancelled
pub struct ReadinessHandle {
    registration: Arc<dyn Registration>,
    interest: Interest,
}

impl ReadinessHandle {
    /// 以登记句柄与重武装兴趣位构造就绪句柄。
    pub fn new(registration: Arc<dyn Registration>, interest: Interest) -> Self {
        Self {
            registration,
            interest,
        }
    }

    /// 移除本句柄的兴趣；“登记已取消”被静默吸收。
    pub fn suspend(&self) {
        let _ = self.registration.suspend();
    }

    /// 以本句柄的兴趣位重新武装；“登记已取消”被静默吸收。
    pub fn resume(&self) {
        let _ = self.registration.resume(self.interest);
    }

    /// 永久解除登记；幂等。
    pub fn cancel(&self) {
        self.registration.cancel();
    }

    /// 登记是否已被取消。
    pub fn is_cancelled(&self) -> bool {
        self.registration.is_cancelled()
    }

    /// 阻塞调用线程直到资源就绪或超时；取消与超时都返回 `Ok(false)`。
    pub fn await_ready(&self, timeout: Option<Duration>) -> Result<bool> {
        self.registration.await_ready(timeout)
    }
}

impl std::fmt::Debug for ReadinessHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadinessHandle")
            .field("interest", &self.interest)
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
