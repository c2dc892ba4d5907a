use std::fmt;
use std::io::{self, IoSlice};
use std::net::{IpAddr, SocketAddr};
use std::sync::{Arc, OnceLock, RwLock};
use std::time::Duration;

use bytes::BytesMut;
use flint_core::channel::{Channel, ChannelHandler};
use flint_core::error::{ChannelError, MAX_DATAGRAM_PAYLOAD, Result};
use flint_core::event::EventSource;
use flint_core::ids::ChannelId;
use flint_core::latch::CloseLatch;
use flint_core::options::{Configurable, OptionKey, OptionValue, unsupported_option};
use flint_core::ready::{Direction, Interest};
use flint_core::resource::DatagramResource;
use flint_core::sink::{ChannelRegistry, DiagnosticSink, MetricsSink};

use crate::dispatch::{ChannelEvent, DispatchShim};
use crate::handle::ReadinessHandle;
use crate::util::{read_lock, write_lock};

/// 一次成功接收的结果：载荷长度与对端地址的配对。
///
/// ## 契约（What）
/// - `len`：写入调用方缓冲的字节数，超出缓冲的报文尾部按数据报语义截断；
/// - `source_addr`：发送方地址，每个报文各自携带；
/// - `destination_addr`：普通单播监听套接字无从得知目的地址，恒为 `None`；
///   保留该字段是为了多播/多宿主变体未来能填上它。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InboundDatagram {
    len: usize,
    source: SocketAddr,
    destination: Option<SocketAddr>,
}

impl InboundDatagram {
    /// 写入调用方缓冲的字节数。
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// 报文是否为空（零长度数据报是合法的）。
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// 发送方地址。
    #[inline]
    pub fn source_addr(&self) -> SocketAddr {
        self.source
    }

    /// 目的地址；单播监听套接字上为 `None`。
    #[inline]
    pub fn destination_addr(&self) -> Option<SocketAddr> {
        self.destination
    }
}

struct MultipointInner {
    id: ChannelId,
    resource: RwLock<Option<Box<dyn DatagramResource>>>,
    read_handle: OnceLock<ReadinessHandle>,
    write_handle: OnceLock<ReadinessHandle>,
    closed_dispatch: OnceLock<Arc<DispatchShim<MultipointChannel>>>,
    closed: CloseLatch,
    registry: Arc<dyn ChannelRegistry>,
    metrics: Arc<dyn MetricsSink>,
}

/// 无连接的多点通道：单个数据报资源加按调用携带的对端地址。
///
/// # 设计背景（Why）
/// - 数据报套接字没有“连接”，每次收发各自携带对端地址；
/// - 底层资源不支持真正的多缓冲聚合发送，聚合形态以“前置尺寸闸门 +
///   一次显式暂存拷贝 + 单次发送”仿真，低效但文档化（见
///   [`MultipointChannel::send_vectored`]）；
/// - 读、写各持一个就绪句柄，挂起/恢复的取消容忍与流式通道一致。
///
/// # 契约说明（What）
/// - `receive`：一次非阻塞接收；无报文可收返回 `Ok(None)` 而非错误；
/// - `send`：一次非阻塞发送；0 字节入队报告“未发送”（`false`）——单个
///   报文不存在部分接受；
/// - 组播加入与半部关停显式以 `channel.operation_unsupported` 拒绝；
/// - `close()` 整体由关闭闩门控：仅首个调用者执行关闭与清理，
///   后续调用是静默空操作；
/// - 选项面：与流式通道一致的空集拒绝。
#[derive(Clone)]
pub struct MultipointChannel {
    inner: Arc<MultipointInner>,
}

impl MultipointChannel {
    /// 以已绑定的数据报资源装配通道，并登记读写两个方向的兴趣。
    ///
    /// # 契约（What）
    /// - **前置条件**：资源已绑定且处于非阻塞模式；
    /// - **后置条件**：两条登记落在同一个文件描述符上（方向不同），
    ///   指标汇开始累计该通道的读写字节；
    /// - 任一登记失败时已完成的登记被取消，资源随错误一并丢弃。
    pub fn register(
        resource: Box<dyn DatagramResource>,
        handler: Arc<dyn ChannelHandler<MultipointChannel>>,
        event_source: &dyn EventSource,
        registry: Arc<dyn ChannelRegistry>,
        metrics: Arc<dyn MetricsSink>,
        diagnostics: Arc<dyn DiagnosticSink>,
    ) -> Result<MultipointChannel> {
        let fd = resource.as_raw_fd();
        let id = ChannelId::next();
        let inner = Arc::new(MultipointInner {
            id,
            resource: RwLock::new(Some(resource)),
            read_handle: OnceLock::new(),
            write_handle: OnceLock::new(),
            closed_dispatch: OnceLock::new(),
            closed: CloseLatch::new(),
            registry,
            metrics,
        });
        let label = format!("multipoint channel <{id}>");

        let read_shim = {
            let weak = Arc::downgrade(&inner);
            Arc::new(DispatchShim::new(
                Box::new(move || weak.upgrade().map(|inner| MultipointChannel { inner })),
                Arc::clone(&handler),
                Arc::clone(&diagnostics),
                Direction::Read,
                label.clone(),
            ))
        };
        let write_shim = {
            let weak = Arc::downgrade(&inner);
            Arc::new(DispatchShim::new(
                Box::new(move || weak.upgrade().map(|inner| MultipointChannel { inner })),
                Arc::clone(&handler),
                Arc::clone(&diagnostics),
                Direction::Write,
                label,
            ))
        };

        let read_registration = event_source.register(fd, Interest::READ, read_shim.clone())?;
        let write_registration = match event_source.register(fd, Interest::WRITE, write_shim) {
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

        Ok(MultipointChannel { inner })
    }

    /// 尝试一次非阻塞接收。
    ///
    /// # 契约（What）
    /// - `Ok(None)`：当前没有报文可收——正常结果，不是失败；
    /// - `Ok(Some(..))`：载荷已写入 `buf` 前部，结果携带长度与发送方地址；
    /// - 副作用：按实际接收字节数累计指标汇的读计数。
    pub fn receive(&self, buf: &mut [u8]) -> Result<Option<InboundDatagram>> {
        let guard = read_lock(&self.inner.resource);
        let resource = guard.as_ref().ok_or_else(|| closed_resource())?;
        match resource.recv_from(buf) {
            Ok((len, source)) => {
                self.inner.metrics.bytes_read(len as u64);
                Ok(Some(InboundDatagram {
                    len,
                    source,
                    destination: None,
                }))
            }
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// 向 `target` 非阻塞发送一个报文。
    ///
    /// # 契约（What）
    /// - `Ok(true)`：报文整体入队；
    /// - `Ok(false)`：发送缓冲当前无空间，0 字节入队——单个报文不存在
    ///   部分接受，0 字节即“未发送”，可稍后重试；
    /// - 副作用：按实际写出字节数累计指标汇的写计数。
    pub fn send(&self, target: SocketAddr, buf: &[u8]) -> Result<bool> {
        let guard = read_lock(&self.inner.resource);
        let resource = guard.as_ref().ok_or_else(|| closed_resource())?;
        match resource.send_to(buf, target) {
            Ok(written) => {
                self.inner.metrics.bytes_written(written as u64);
                Ok(written != 0)
            }
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    /// 聚合发送的仿真形态：多段缓冲合并为单个报文发往 `target`。
    ///
    /// # 执行步骤（How）
    /// 1. 以 `u64` 累加各段长度，总量超过
    ///    [`MAX_DATAGRAM_PAYLOAD`] 时在**任何拷贝发生之前**以
    ///    [`ChannelError::MessageTooLarge`] 拒绝；
    /// 2. 把全部缓冲段拷入一块连续暂存缓冲；
    /// 3. 执行一次普通 [`send`](Self::send)。
    ///
    /// # 注意事项（Trade-offs）
    /// - 底层资源没有真正的多缓冲发送，这次拷贝是有意为之、文档化的
    ///   低效路径；尺寸闸门必须保持在拷贝之前。
    /// - 缓冲子区间以切片表达：`(offset, length)` 即 `&bufs[offset..offset + length]`。
    pub fn send_vectored(&self, target: SocketAddr, bufs: &[IoSlice<'_>]) -> Result<bool> {
        let total: u64 = bufs.iter().map(|buf| buf.len() as u64).sum();
        if total > MAX_DATAGRAM_PAYLOAD as u64 {
            return Err(ChannelError::MessageTooLarge {
                total,
                max: MAX_DATAGRAM_PAYLOAD,
            });
        }
        let mut staging = BytesMut::with_capacity(total as usize);
        for buf in bufs {
            staging.extend_from_slice(buf);
        }
        self.send(target, &staging)
    }

    /// 组播加入：本变体显式不支持，而非静默空操作。
    pub fn join_group(&self, _group: IpAddr, _interface: Option<IpAddr>) -> Result<()> {
        Err(ChannelError::unsupported_operation("multicast join"))
    }

    /// 无连接通道没有半关闭概念；显式拒绝。
    pub fn shutdown_reads(&self) -> Result<()> {
        Err(ChannelError::unsupported_operation("shutdown reads"))
    }

    /// 无连接通道没有半关闭概念；显式拒绝。
    pub fn shutdown_writes(&self) -> Result<()> {
        Err(ChannelError::unsupported_operation("shutdown writes"))
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

    /// 阻塞调用线程直到可读或超时。
    pub fn await_readable(&self, timeout: Option<Duration>) -> Result<bool> {
        match self.inner.read_handle.get() {
            Some(handle) => handle.await_ready(timeout),
            None => Ok(false),
        }
    }

    /// 阻塞调用线程直到可写或超时。
    pub fn await_writable(&self, timeout: Option<Duration>) -> Result<bool> {
        match self.inner.write_handle.get() {
            Some(handle) => handle.await_ready(timeout),
            None => Ok(false),
        }
    }

    /// 本地绑定地址。
    pub fn local_addr(&self) -> Result<SocketAddr> {
        let guard = read_lock(&self.inner.resource);
        let resource = guard.as_ref().ok_or_else(|| closed_resource())?;
        Ok(resource.local_addr()?)
    }
}

fn closed_resource() -> ChannelError {
    io::Error::new(io::ErrorKind::NotConnected, "multipoint channel is closed").into()
}

impl Channel for MultipointChannel {
    fn id(&self) -> ChannelId {
        self.inner.id
    }

    fn is_open(&self) -> bool {
        read_lock(&self.inner.resource).is_some()
    }

    /// 关闭通道。整体由关闭闩门控：
    ///
    /// 1. 仅首个调用者进入关闭体，后续调用是静默空操作；
    /// 2. 关闭底层资源并记下结果；
    /// 3. 无论资源关闭成败（等价于 `finally`）：从注册表摘除、取消读写
    ///    两个就绪句柄、恰好一次地派发“已关闭”通知、注销指标记录；
    /// 4. 返回第 2 步的结果。
    fn close(&self) -> Result<()> {
        if !self.inner.closed.try_fire() {
            return Ok(());
        }
        let close_result = match write_lock(&self.inner.resource).take() {
            Some(resource) => resource.close(),
            None => Ok(()),
        };

        self.inner.registry.remove(self.inner.id);
        if let Some(handle) = self.inner.read_handle.get() {
            handle.cancel();
        }
        if let Some(handle) = self.inner.write_handle.get() {
            handle.cancel();
        }
        if let Some(dispatch) = self.inner.closed_dispatch.get() {
            dispatch.dispatch(ChannelEvent::Closed);
        }
        self.inner.metrics.unregister(self.inner.id);

        Ok(close_result?)
    }
}

impl Configurable for MultipointChannel {
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

impl fmt::Debug for MultipointChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "multipoint channel <{}>", self.inner.id)
    }
}
