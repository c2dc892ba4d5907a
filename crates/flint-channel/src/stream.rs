use std::fmt;
use std::io::{IoSlice, IoSliceMut};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use flint_core::channel::{Channel, ChannelHandler};
use flint_core::error::Result;
use flint_core::event::EventSource;
use flint_core::ids::ChannelId;
use flint_core::latch::CloseLatch;
use flint_core::options::{Configurable, OptionKey, OptionValue, unsupported_option};
use flint_core::ready::{Direction, Interest};
use flint_core::resource::{SinkHalf, SourceHalf};
use flint_core::sink::{ChannelRegistry, DiagnosticSink};

use crate::dispatch::{ChannelEvent, DispatchShim};
use crate::handle::ReadinessHandle;
use crate::util::{half_closed, lock};

struct StreamInner {
    id: ChannelId,
    source: Mutex<Option<Box<dyn SourceHalf>>>,
    sink: Mutex<Option<Box<dyn SinkHalf>>>,
    read_handle: OnceLock<ReadinessHandle>,
    write_handle: OnceLock<ReadinessHandle>,
    closed_dispatch: OnceLock<Arc<DispatchShim<StreamChannel>>>,
    closed: CloseLatch,
    registry: Arc<dyn ChannelRegistry>,
}

/// 由两个独立持有的单向半部组成的双向流通道。
///
/// # 设计背景（Why）
/// - 把一个只读资源（管道源端）与一个只写资源（管道汇端）呈现为单个
///   具备统一生命周期的双向通道；
/// - 两个半部各持一个就绪句柄、各接一个派发垫片，读写互不干扰；
/// - 适配器自身不做任何缓冲：读写的返回值与阻塞语义与底层资源完全一致。
///
/// # 契约说明（What）
/// - `read`/`write`（单缓冲与散布/聚集多缓冲形态）直通底层资源；
/// - `suspend_*`/`resume_*` 委托对应就绪句柄，各自容忍“登记已取消”；
/// - `shutdown_reads`/`shutdown_writes` 只关停命名的半部，互相独立；
/// - `await_readable`/`await_writable` 阻塞调用线程至就绪或超时，
///   是不走处理器路径时的同步逃生口；
/// - `close()` 执行**非对称失败策略**（见方法文档），幂等，“已关闭”
///   通知恰好派发一次；
/// - 选项面：不声明任何键，`get_option`/`set_option` 以
///   `channel.option_unsupported` 失败，`options()` 为空集。
///
/// # 注意事项（Trade-offs）
/// - 克隆即共享（内部 `Arc`）；任一克隆发起关闭对全体生效；
/// - 每个半部由互斥量守护：同方向并发读（或并发写）会串行化。
#[derive(Clone)]
pub struct StreamChannel {
    inner: Arc<StreamInner>,
}

impl StreamChannel {
    /// 以已打开的读/写半部装配通道，并向事件源登记两个方向的兴趣。
    ///
    /// # 契约（What）
    /// - **前置条件**：两个半部均已打开并置于非阻塞模式；
    /// - **后置条件**：读兴趣登记在源半部、写兴趣登记在汇半部上，各自
    ///   经由独立的派发垫片驱动 `handler`；处理器构造期绑定，此后不变；
    /// - 任一登记失败时，已完成的登记被取消，资源随错误一并丢弃。
    ///
    /// # 执行步骤（How）
    /// 1. 先构造内部结构，垫片只持弱引用——取代“构造函数泄漏自身”的
    ///    旧模式，垫片早触发或通道已丢弃都被静默吸收；
    /// 2. 依次登记读、写兴趣，句柄落入 `OnceLock`；
    /// 3. 读方向的垫片同时承担“已关闭”通知的派发（同一条故障隔离路径）。
    pub fn register(
        source: Box<dyn SourceHalf>,
        sink: Box<dyn SinkHalf>,
        handler: Arc<dyn ChannelHandler<StreamChannel>>,
        event_source: &dyn EventSource,
        registry: Arc<dyn ChannelRegistry>,
        diagnostics: Arc<dyn DiagnosticSink>,
    ) -> Result<StreamChannel> {
        let source_fd = source.as_raw_fd();
        let sink_fd = sink.as_raw_fd();
        let id = ChannelId::next();
        let inner = Arc::new(StreamInner {
            id,
            source: Mutex::new(Some(source)),
            sink: Mutex::new(Some(sink)),
            read_handle: OnceLock::new(),
            write_handle: OnceLock::new(),
            closed_dispatch: OnceLock::new(),
            closed: CloseLatch::new(),
            registry,
        });
        let label = format!("stream channel <{id}>");

        let read_shim = {
            let weak = Arc::downgrade(&inner);
            Arc::new(DispatchShim::new(
                Box::new(move || weak.upgrade().map(|inner| StreamChannel { inner })),
                Arc::clone(&handler),
                Arc::clone(&diagnostics),
                Direction::Read,
                label.clone(),
            ))
        };
        let write_shim = {
            let weak = Arc::downgrade(&inner);
            Arc::new(DispatchShim::new(
                Box::new(move || weak.upgrade().map(|inner| StreamChannel { inner })),
                Arc::clone(&handler),
                Arc::clone(&diagnostics),
                Direction::Write,
                label,
            ))
        };

        let read_registration =
            event_source.register(source_fd, Interest::READ, read_shim.clone())?;
        let write_registration =
            match event_source.register(sink_fd, Interest::WRITE, write_shim.clone()) {
                Ok(registration) => registration,
                Err(err) => {
                    read_registration.cancel();
                    return Err(err);
                }
            };

        let _ = inner
            .read_handle
            .set(ReadinessHandle::new(read_registration, Interest::READ));
        let _ = inner
            .write_handle
            .set(ReadinessHandle::new(write_registration, Interest::WRITE));
        let _ = inner.closed_dispatch.set(read_shim);

        Ok(StreamChannel { inner })
    }

    /// 从源半部读取一次；无数据时按非阻塞惯例返回 `WouldBlock`，EOF 为 `Ok(0)`。
    pub fn read(&self, buf: &mut [u8]) -> Result<usize> {
        let mut guard = lock(&self.inner.source);
        match guard.as_mut() {
            Some(source) => Ok(source.read(buf)?),
            None => Err(half_closed(Direction::Read).into()),
        }
    }

    /// 散布读：按顺序填充多段缓冲。
    pub fn read_vectored(&self, bufs: &mut [IoSliceMut<'_>]) -> Result<usize> {
        let mut guard = lock(&self.inner.source);
        match guard.as_mut() {
            Some(source) => Ok(source.read_vectored(bufs)?),
            None => Err(half_closed(Direction::Read).into()),
        }
    }

    /// 向汇半部写入一次，返回实际接受的字节数。
    pub fn write(&self, buf: &[u8]) -> Result<usize> {
        let mut guard = lock(&self.inner.sink);
        match guard.as_mut() {
            Some(sink) => Ok(sink.write(buf)?),
            None => Err(half_closed(Direction::Write).into()),
        }
    }

    /// 聚集写：一次提交多段缓冲。
    pub fn write_vectored(&self, bufs: &[IoSlice<'_>]) -> Result<usize> {
        let mut guard = lock(&self.inner.sink);
        match guard.as_mut() {
            Some(sink) => Ok(sink.write_vectored(bufs)?),
            None => Err(half_closed(Direction::Write).into()),
        }
    }

    /// 冲刷汇半部。
    pub fn flush(&self) -> Result<()> {
        let mut guard = lock(&self.inner.sink);
        match guard.as_mut() {
            Some(sink) => Ok(sink.flush()?),
            None => Err(half_closed(Direction::Write).into()),
        }
    }

    /// 挂起读就绪回调；容忍“登记已取消”。
    pub fn suspend_reads(&self) {
        if let Some(handle) = self.inner.read_handle.get() {
            handle.suspend();
        }
    }

    /// 挂起写就绪回调；容忍“登记已取消”。
    pub fn suspend_writes(&self) {
        if let Some(handle) = self.inner.write_handle.get() {
            handle.suspend();
        }
    }

    /// 恢复读就绪回调；容忍“登记已取消”。
    pub fn resume_reads(&self) {
        if let Some(handle) = self.inner.read_handle.get() {
            handle.resume();
        }
    }

    /// 恢复写就绪回调；容忍“登记已取消”。
    pub fn resume_writes(&self) {
        if let Some(handle) = self.inner.write_handle.get() {
            handle.resume();
        }
    }

    /// 只关停读半部；失败传播给调用方，写半部不受影响。
    pub fn shutdown_reads(&self) -> Result<()> {
        match lock(&self.inner.source).take() {
            Some(mut source) => Ok(source.close()?),
            None => Ok(()),
        }
    }

    /// 只关停写半部；失败传播给调用方，读半部不受影响。
    pub fn shutdown_writes(&self) -> Result<()> {
        match lock(&self.inner.sink).take() {
            Some(mut sink) => Ok(sink.close()?),
            None => Ok(()),
        }
    }

    /// 阻塞调用线程直到源半部可读或超时；`None` 为无限等待。
    pub fn await_readable(&self, timeout: Option<Duration>) -> Result<bool> {
        match self.inner.read_handle.get() {
            Some(handle) => handle.await_ready(timeout),
            None => Ok(false),
        }
    }

    /// 阻塞调用线程直到汇半部可写或超时；`None` 为无限等待。
    pub fn await_writable(&self, timeout: Option<Duration>) -> Result<bool> {
        match self.inner.write_handle.get() {
            Some(handle) => handle.await_ready(timeout),
            None => Ok(false),
        }
    }

    fn close_source_best_effort(&self) {
        let closed = match lock(&self.inner.source).take() {
            Some(mut source) => source.close(),
            None => Ok(()),
        };
        if let Err(err) = closed {
            // 读半部没有可丢失的未冲刷数据，失败只留痕、不传播。
            tracing::debug!(
                target: "flint::stream",
                channel = %self.inner.id,
                error = %err,
                "suppressing read-half close failure"
            );
        }
    }

    fn close_sink(&self) -> std::io::Result<()> {
        match lock(&self.inner.sink).take() {
            Some(mut sink) => sink.close(),
            None => Ok(()),
        }
    }
}

impl Channel for StreamChannel {
    fn id(&self) -> ChannelId {
        self.inner.id
    }

    fn is_open(&self) -> bool {
        lock(&self.inner.source).is_some() && lock(&self.inner.sink).is_some()
    }

    /// 关闭通道。**非对称失败策略**，逐字保持：
    ///
    /// 1. 先尽力关闭读半部并**抑制**其失败（仅 `debug` 留痕）；
    /// 2. 再关闭写半部并记下结果——未冲刷的、有后果的数据可能在这一侧
    ///    丢失，只有这一步的失败会传播；
    /// 3. 无论前两步结果如何（等价于 `finally`）：从注册表摘除、经关闭
    ///    闩恰好一次地派发“已关闭”通知、取消写句柄再取消读句柄；
    /// 4. 返回第 2 步的结果。
    ///
    /// 幂等：再次调用时两个半部已空，清理路径重跑无副作用，通知不重发。
    fn close(&self) -> Result<()> {
        self.close_source_best_effort();
        let sink_result = self.close_sink();

        self.inner.registry.remove(self.inner.id);
        if self.inner.closed.try_fire()
            && let Some(dispatch) = self.inner.closed_dispatch.get()
        {
            dispatch.dispatch(ChannelEvent::Closed);
        }
        if let Some(handle) = self.inner.write_handle.get() {
            handle.cancel();
        }
        if let Some(handle) = self.inner.read_handle.get() {
            handle.cancel();
        }

        Ok(sink_result?)
    }
}

impl Configurable for StreamChannel {
    fn get_option(&self, key: &OptionKey) -> Result<OptionValue> {
        Err(unsupported_option(key))
    }

    fn set_option(&self, key: &OptionKey, _value: OptionValue) -> Result<()> {
        Err(unsupported_option(key))
    }

    fn options(&self) -> &[OptionKey] {
        &[]
    }
}

impl fmt::Debug for StreamChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stream channel <{}>", self.inner.id)
    }
}
