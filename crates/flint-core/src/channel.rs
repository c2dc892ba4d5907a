use crate::error::Result;
use crate::ids::ChannelId;

/// 所有通道变体共享的生命周期契约。
///
/// ## 设计背景（Why）
/// - 流式复合通道与无连接多点通道在读写形态上差异很大，但“开/关状态 +
///   幂等关闭”是统一的：注册表、指标汇按此契约管理任意变体；
/// - `close` 取 `&self`：关闭可以从处理器线程或任意应用线程并发进入，
///   竞态安全由实现内部的闩与取消容忍保障。
///
/// ## 契约（What）
/// - `is_open()`：当且仅当全部组成资源仍打开时为真；
/// - `close()`：幂等；“已关闭”通知对处理器恰好派发一次，无论关闭路径被
///   进入多少次（显式关闭、I/O 出错、半部关停）。
pub trait Channel: Send + Sync {
    /// 该通道在注册表与指标汇中的稳定标识。
    fn id(&self) -> ChannelId;

    /// 全部组成资源是否仍处于打开状态。
    fn is_open(&self) -> bool;

    /// 关闭通道并释放全部登记；幂等。
    fn close(&self) -> Result<()>;
}

/// 用户处理器契约，按通道元素类型泛化。
///
/// ## 设计背景（Why）
/// - 就绪事件最终要变成**恰好一次**的用户回调；本 trait 是那次调用的落点；
/// - 回调在事件源线程上执行：一个失控处理器不得拖垮为无关通道服务的
///   共享派发循环，因此故障隔离由派发垫片统一完成，而不是摊给每个实现。
///
/// ## 契约（What）
/// - `on_readable` / `on_writable`：对应方向就绪时调用；回调内部可读写
///   通道、调整挂起/恢复，或直接发起关闭；
/// - `on_closed`：通道关闭时恰好调用一次；
/// - **实现不得恐慌**；若恐慌，垫片会捕获并上报诊断汇，绝不向事件源
///   派发循环传播。
///
/// ## 注意事项（Trade-offs）
/// - 处理器在构造时绑定，此后不可更换：免去派发路径上的读写竞态；
/// - 同方向回调串行（事件源在回调返回前不重触发），跨方向与跨通道无序。
pub trait ChannelHandler<C: ?Sized>: Send + Sync {
    /// 通道变为可读。
    fn on_readable(&self, channel: &C);

    /// 通道变为可写。
    fn on_writable(&self, channel: &C);

    /// 通道已关闭；每个通道实例至多收到一次。
    fn on_closed(&self, channel: &C);
}
