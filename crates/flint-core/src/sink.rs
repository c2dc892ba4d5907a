use std::any::Any;

use crate::ids::ChannelId;
use crate::ready::Direction;

/// 通道自身持有的注册表协作面（连接/通道管理器）。
///
/// ## 契约（What）
/// - `remove` 在关闭清理路径上被调用；签名不可失败——注册表一侧的
///   异常不得阻断关闭流程的完成。
pub trait ChannelRegistry: Send + Sync {
    /// 把通道从管理器中摘除。
    fn remove(&self, id: ChannelId);
}

/// 管理/指标协作面；全部尽力而为、非阻塞、失败被本层忽略。
pub trait MetricsSink: Send + Sync {
    /// 累计读入字节数。
    fn bytes_read(&self, n: u64);

    /// 累计写出字节数。
    fn bytes_written(&self, n: u64);

    /// 注销该通道的管理记录。
    fn unregister(&self, id: ChannelId);
}

/// 不落任何指标的默认汇。
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopMetrics;

impl MetricsSink for NoopMetrics {
    fn bytes_read(&self, _n: u64) {}

    fn bytes_written(&self, _n: u64) {}

    fn unregister(&self, _id: ChannelId) {}
}

/// 处理器恐慌的载荷类型（`catch_unwind` 的产物）。
pub type Fault = Box<dyn Any + Send + 'static>;

/// 诊断汇：仅被派发垫片的故障隔离路径使用。
///
/// ## 设计背景（Why）
/// - 处理器恐慌绝不允许传播进事件源的派发循环；捕获之后总要有个去处，
///   诊断汇就是那个去处——记录现场并就地丢弃；
/// - 以 trait 呈现而非直接写日志，测试桩可以断言“故障确实被上报了”。
///
/// ## 契约（What）
/// - `handler_fault`：`channel` 为通道的人类可读描述，`event` 为触发回调
///   的事件方向（关闭通知为 `None`），`fault` 为恐慌载荷；
/// - 实现必须自身无恐慌、非阻塞。
pub trait DiagnosticSink: Send + Sync {
    /// 上报一次被隔离的处理器故障。
    fn handler_fault(&self, channel: &str, event: Option<Direction>, fault: &Fault);
}

/// 从恐慌载荷中提取人类可读消息。
///
/// `panic!("...")` 的载荷是 `&str` 或 `String`，其余类型给出占位描述。
pub fn panic_message(fault: &Fault) -> &str {
    if let Some(message) = fault.downcast_ref::<&str>() {
        message
    } else if let Some(message) = fault.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}

/// 默认诊断汇：把故障落到 `tracing`。
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingDiagnostics;

impl DiagnosticSink for TracingDiagnostics {
    fn handler_fault(&self, channel: &str, event: Option<Direction>, fault: &Fault) {
        match event {
            Some(direction) => tracing::error!(
                target: "flint::dispatch",
                channel,
                direction = direction.as_str(),
                fault = panic_message(fault),
                "通道处理器在就绪回调中恐慌，已隔离"
            ),
            None => tracing::error!(
                target: "flint::dispatch",
                channel,
                fault = panic_message(fault),
                "通道处理器在关闭通知中恐慌，已隔离"
            ),
        }
    }
}
