#![doc = r#"
# flint-channel

## 模块使命（Why）
- **落地通道适配器**：在 `flint-core` 的契约之上实现流式复合通道与
  无连接多点通道，把原始就绪事件变成恰好一次的用户回调；
- **统一取消容忍**：所有挂起/恢复路径通过就绪句柄吸收“登记已取消”，
  处理器代码无需针对并发关闭做任何显式同步；
- **隔离处理器故障**：派发垫片是处理器恐慌唯一的出口——捕获、上报
  诊断汇、就地丢弃，绝不回传事件源的派发循环。

## 核心契约（What）
- [`handle::ReadinessHandle`]：单个 (资源, 方向) 的就绪句柄，
  挂起/恢复/取消与同步等待；
- [`dispatch::DispatchShim`]：每 (通道, 方向) 一个的派发垫片；
- [`stream::StreamChannel`]：由独立读/写半部组成的双向流通道，
  非对称关闭策略（读半部尽力而为、写半部失败传播）；
- [`multipoint::MultipointChannel`]：数据报通道，按调用携带对端地址，
  聚合发送以仿真方式提供并前置尺寸闸门；
- [`config::EventSourceConfig`]：事件源协作方的装配配置。

## 实现策略（How）
- 通道以 `Arc<Inner>` 形态对外，克隆即共享；内部以标准库互斥量守护
  半部资源，毒化恢复一律 `into_inner`；
- 构造采用两阶段：先建内部结构，垫片持弱引用，登记完成后把句柄落入
  `OnceLock`——垫片早触发或晚触发都被静默吸收；
- 关闭通知一律经由 [`flint_core::CloseLatch`]，首个关闭者赢得派发权。

## 风险与取舍（Trade-offs）
- 聚合发送存在一次显式的暂存拷贝：底层资源没有真正的多缓冲发送，
  这是文档化的已知低效路径，尺寸闸门先于任何分配执行；
- 本 crate 不提供事件源实现；集成方自带 selector 并实现
  `flint_core::EventSource`。
"#]

pub mod config;
pub mod dispatch;
pub mod handle;
pub mod multipoint;
pub mod stream;
pub mod sys;

mod util;

pub use config::{EventSourceConfig, EventSourceConfigFactory};
pub use dispatch::{ChannelEvent, DispatchShim};
pub use handle::ReadinessHandle;
pub use multipoint::{InboundDatagram, MultipointChannel};
pub use stream::StreamChannel;
