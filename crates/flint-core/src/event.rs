use std::os::fd::RawFd;
use std::sync::Arc;
use std::time::Duration;

use crate::error::Result;
use crate::ready::Interest;

/// 事件源在资源就绪时回调的对象。
///
/// ## 契约（What）
/// - `ready()` 在事件源自己的线程上被调用；同一 (资源, 方向) 在回调返回或
///   重新武装之前不会再次触发；
/// - 实现必须自带故障隔离：任何从 `ready()` 泄漏的恐慌都会破坏为所有通道
///   服务的派发循环，因此适配层以派发垫片（shim）实现本 trait，而不是
///   直接暴露用户处理器。
pub trait ReadinessCallback: Send + Sync {
    /// 资源按登记兴趣变为就绪。
    fn ready(&self);
}

/// 挂起/恢复操作的命名结果。
///
/// ## 设计目的（Why）
/// - 通道关闭可以与处理器线程上的挂起/恢复并发发生，登记随之失效；
///   这是本层的承重不变量：该竞态是常态，不是错误；
/// - 与其在每个调用点捕获偶然的异常类型，不如把“已取消”提升为显式结果，
///   调用方的容忍行为由此可以直接断言。
///
/// ## 契约定义（What）
/// - `Applied`：兴趣变更已生效；
/// - `Cancelled`：登记已被取消，变更未发生。**这是正常结果**：调用方必须
///   当作成功静默收下，绝不重试、绝不重新武装已取消的登记。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InterestUpdate {
    Applied,
    Cancelled,
}

impl InterestUpdate {
    /// 判断本次变更是否因登记已取消而未生效。
    #[inline]
    pub const fn is_cancelled(self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// 一条活跃登记：把 (资源, 方向) 与事件源关联起来，可挂起、恢复、取消。
///
/// ## 契约（What）
/// - `suspend()`：从事件源移除本登记的兴趣，之后不再触发回调；
/// - `resume(interest)`：重新登记兴趣位；
/// - 两者都**不得**因并发取消而报错：登记已取消时返回
///   [`InterestUpdate::Cancelled`]，实现不得抛出其他失败；
/// - `cancel()`：永久解除登记，幂等；取消后 `suspend`/`resume` 一律返回
///   `Cancelled`；
/// - `await_ready(timeout)`：阻塞**调用方**线程直到事件源报告就绪或超时；
///   `Ok(true)` 表示就绪，`Ok(false)` 表示超时或登记已取消（取消在此边界
///   同样不是错误）；
/// - 以上操作都不执行 I/O，只改变未来的触发计划。
pub trait Registration: Send + Sync {
    /// 移除兴趣；已取消时返回 [`InterestUpdate::Cancelled`]。
    fn suspend(&self) -> InterestUpdate;

    /// 重新登记兴趣；已取消时返回 [`InterestUpdate::Cancelled`]。
    fn resume(&self, interest: Interest) -> InterestUpdate;

    /// 永久解除登记，幂等。
    fn cancel(&self);

    /// 查询登记是否已被取消。
    fn is_cancelled(&self) -> bool;

    /// 阻塞调用线程直到就绪或超时；`None` 表示无限等待。
    fn await_ready(&self, timeout: Option<Duration>) -> Result<bool>;
}

/// 事件源协作接口：本层仅消费，不实现。
///
/// ## 设计背景（Why）
/// - 真正的 selector 线程池（阻塞等待、回调派发、线程配比）在本层之外；
///   通道适配器只通过本接口登记兴趣并取回 [`Registration`] 句柄；
/// - 事件源对回调对象仅保留弱关联语义：通道关闭后残余触发由垫片吸收。
///
/// ## 契约（What）
/// - `register`：为 `fd` 上的 `interest` 登记回调，返回活跃登记句柄；
/// - **前置条件**：`fd` 指向已置于非阻塞模式的打开资源；
/// - **后置条件**：同一 (通道, 方向) 至多一个回调在途——事件源在回调返回
///   或重新武装之前不重复触发。
pub trait EventSource: Send + Sync {
    /// 登记读/写兴趣并返回可挂起、恢复、取消的句柄。
    fn register(
        &self,
        fd: RawFd,
        interest: Interest,
        callback: Arc<dyn ReadinessCallback>,
    ) -> Result<Arc<dyn Registration>>;
}
