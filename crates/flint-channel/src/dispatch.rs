use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use flint_core::channel::ChannelHandler;
use flint_core::event::ReadinessCallback;
use flint_core::ready::Direction;
use flint_core::sink::DiagnosticSink;

/// 派发垫片向处理器转译的事件。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelEvent {
    /// 资源变为可读。
    Readable,
    /// 资源变为可写。
    Writable,
    /// 通道已关闭（恰好一次，由关闭闩保证）。
    Closed,
}

impl ChannelEvent {
    /// 事件对应的就绪方向；关闭通知没有方向。
    pub fn direction(self) -> Option<Direction> {
        match self {
            Self::Readable => Some(Direction::Read),
            Self::Writable => Some(Direction::Write),
            Self::Closed => None,
        }
    }
}

/// 每 (通道, 方向) 一个的派发垫片：把原始就绪事件变成恰好一次的
/// 处理器调用，并隔离处理器故障。
///
/// # 设计背景（Why）
/// - 回调在事件源线程上执行；一个失控处理器不得饿死或杀死为无关通道
///   服务的共享派发循环，故障隔离必须收敛在单一包装层，而不是在每个
///   调用点重复内联；
/// - 通道可能在事件在途时被关闭并丢弃；垫片对通道仅保留弱关联，
///   升级失败是预期内的竞态，静默吸收。
///
/// # 契约说明（What）
/// - 触发时：捕获当前处理器引用（处理器构造期绑定、此后不变，无需
///   解决更换竞态）→ 升级通道引用 → 调用方向对应的回调；
/// - 任何从回调逃逸的恐慌被捕获并上报诊断汇，**绝不**重新抛出；
/// - 关闭通知复用同一条隔离路径（[`ChannelEvent::Closed`]）。
pub struct DispatchShim<C> {
    channel: Box<dyn Fn() -> Option<C> + Send + Sync>,
    handler: Arc<dyn ChannelHandler<C>>,
    diagnostics: Arc<dyn DiagnosticSink>,
    direction: Direction,
    label: String,
}

impl<C> DispatchShim<C> {
    /// 构造垫片。
    ///
    /// - `channel`：升级闭包，通常捕获 `Weak<Inner>` 并重建公开通道包装；
    ///   返回 `None` 表示通道已丢弃，事件被吸收；
    /// - `direction`：本垫片服务的就绪方向；
    /// - `label`：通道的人类可读描述，进入诊断上下文。
    pub fn new(
        channel: Box<dyn Fn() -> Option<C> + Send + Sync>,
        handler: Arc<dyn ChannelHandler<C>>,
        diagnostics: Arc<dyn DiagnosticSink>,
        direction: Direction,
        label: String,
    ) -> Self {
        Self {
            channel,
            handler,
            diagnostics,
            direction,
            label,
        }
    }

    /// 派发一个事件：升级通道引用、调用处理器、隔离故障。
    pub fn dispatch(&self, event: ChannelEvent) {
        // 通道已丢弃：关闭与在途事件的竞态，按正常情况吸收。
        let Some(channel) = (self.channel)() else {
            return;
        };
        let outcome = catch_unwind(AssertUnwindSafe(|| match event {
            ChannelEvent::Readable => self.handler.on_readable(&channel),
            ChannelEvent::Writable => self.handler.on_writable(&channel),
            ChannelEvent::Closed => self.handler.on_closed(&channel),
        }));
        if let Err(fault) = outcome {
            self.diagnostics
                .handler_fault(&self.label, event.direction(), &fault);
        }
    }
}

impl<C> ReadinessCallback for DispatchShim<C> {
    fn ready(&self) {
        let event = match self.direction {
            Direction::Read => ChannelEvent::Readable,
            Direction::Write => ChannelEvent::Writable,
        };
        self.dispatch(event);
    }
}
