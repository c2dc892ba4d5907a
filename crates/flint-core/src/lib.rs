#![doc = r#"
# flint-core

## 模块使命（Why）
- **统一就绪语义**：为构建在非阻塞传输底座（流套接字、管道、报文套接字）之上的
  通道适配层提供一套稳定契约，使应用代码可以对资源登记读/写兴趣，并在资源
  变为可读或可写时按状态迁移恰好收到一次回调，而无需为每个连接占用线程。
- **收敛外部协作面**：事件源（selector 线程池）、通道注册表、指标汇与诊断汇
  都以窄接口出现在本 crate，实现层与测试桩可以各自替换而互不感知。
- **契约先行**：取消竞态（挂起/恢复撞上并发关闭）在这里被提升为显式的命名
  结果 [`event::InterestUpdate::Cancelled`]，而不是散落在各调用点的异常吞咽。

## 核心契约（What）
- [`error::ChannelError`]：跨适配层共享的错误域，稳定错误码 `channel.*`；
- [`ready::Interest`] / [`ready::Direction`]：读写兴趣位集与方向；
- [`event::EventSource`] / [`event::Registration`]：事件源协作接口，
  所有挂起/恢复实现必须把“登记已取消”当作正常结果静默收下；
- [`channel::Channel`] / [`channel::ChannelHandler`]：通道生命周期与回调契约；
- [`options::Configurable`]：各通道变体共享的最小能力协商面；
- [`sink`]：注册表 / 指标 / 诊断三类协作汇；
- [`latch::CloseLatch`]：保障“关闭通知恰好一次”的单次赋值闩。

## 实现策略（How）
- 契约一律以对象安全 trait 表达，适配层持有 `Arc<dyn ...>`，事件源只保留
  弱关联用于派发；
- 错误枚举用 `thiserror` 派生并映射稳定错误码，便于日志与告警精确分支；
- 默认诊断汇直接落到 `tracing`，指标汇提供空实现，协作方均为尽力而为。

## 风险与取舍（Trade-offs）
- 本 crate 不包含任何事件循环或套接字构造逻辑；阻塞等待由事件源协作方完成；
- 契约面向 Unix 文件描述符（`RawFd`）登记资源，非 Unix 平台需自备适配层。
"#]

pub mod channel;
pub mod error;
pub mod event;
pub mod ids;
pub mod latch;
pub mod options;
pub mod ready;
pub mod resource;
pub mod sink;

#[cfg(any(test, feature = "test-stubs"))]
pub mod test_stubs;

pub use channel::{Channel, ChannelHandler};
pub use error::{ChannelError, Result};
pub use event::{EventSource, InterestUpdate, ReadinessCallback, Registration};
pub use ids::ChannelId;
pub use latch::CloseLatch;
pub use options::{Configurable, ConfigurableFactory, OptionKey, OptionValue};
pub use ready::{Direction, Interest};
pub use sink::{ChannelRegistry, DiagnosticSink, MetricsSink, NoopMetrics, TracingDiagnostics};
