//! 面向下游适配层与集成测试的可脚本化桩实现。
//!
//! # 教案式说明
//! - **Why**：事件源与三类协作汇在本层都是窄接口；要验证通道适配器的
//!   契约（恰好一次通知、取消容忍、清理顺序），需要能手动触发就绪、
//!   记录每次协作调用的桩；
//! - **How**：`ManualEventSource` 维护登记列表，`fire` 按方向触发回调，
//!   `set_ready` 配合条件变量支撑 `await_ready`；三个 `Recording*` 桩
//!   把协作调用原样记账供断言；
//! - **What**：全部实现仅用于测试，不出现在默认特性中。

use std::os::fd::RawFd;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::channel::ChannelHandler;
use crate::error::Result;
use crate::event::{EventSource, InterestUpdate, ReadinessCallback, Registration};
use crate::ids::ChannelId;
use crate::ready::{Direction, Interest};
use crate::sink::{ChannelRegistry, DiagnosticSink, Fault, MetricsSink, panic_message};

fn lock<'a, T>(mutex: &'a Mutex<T>) -> MutexGuard<'a, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// 手动事件源的一条登记。
pub struct ManualRegistration {
    fd: RawFd,
    base_interest: Interest,
    armed: Mutex<Option<Interest>>,
    cancelled: AtomicBool,
    callback: Arc<dyn ReadinessCallback>,
    ready: Mutex<ReadyFlags>,
    readiness_changed: Condvar,
}

#[derive(Default)]
struct ReadyFlags {
    readable: bool,
    writable: bool,
}

impl ReadyFlags {
    fn matches(&self, interest: Interest) -> bool {
        (interest.is_readable() && self.readable) || (interest.is_writable() && self.writable)
    }
}

impl ManualRegistration {
    /// 登记的文件描述符。
    pub fn fd(&self) -> RawFd {
        self.fd
    }

    /// 当前武装的兴趣位；挂起或取消后为 `None`。
    pub fn armed_interest(&self) -> Option<Interest> {
        if self.cancelled.load(Ordering::Acquire) {
            None
        } else {
            *lock(&self.armed)
        }
    }

    fn mark_ready(&self, direction: Direction) {
        let mut flags = lock(&self.ready);
        match direction {
            Direction::Read => flags.readable = true,
            Direction::Write => flags.writable = true,
        }
        self.readiness_changed.notify_all();
    }
}

impl Registration for ManualRegistration {
    fn suspend(&self) -> InterestUpdate {
        if self.cancelled.load(Ordering::Acquire) {
            return InterestUpdate::Cancelled;
        }
        *lock(&self.armed) = None;
        InterestUpdate::Applied
    }

    fn resume(&self, interest: Interest) -> InterestUpdate {
        if self.cancelled.load(Ordering::Acquire) {
            return InterestUpdate::Cancelled;
        }
        *lock(&self.armed) = Some(interest);
        InterestUpdate::Applied
    }

    fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
        // 叫醒可能阻塞在 await_ready 上的线程，让它观察到取消。
        self.readiness_changed.notify_all();
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    fn await_ready(&self, timeout: Option<Duration>) -> Result<bool> {
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut flags = lock(&self.ready);
        loop {
            if self.cancelled.load(Ordering::Acquire) {
                return Ok(false);
            }
            if flags.matches(self.base_interest) {
                return Ok(true);
            }
            match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Ok(false);
                    }
                    let (guard, _timed_out) = self
                        .readiness_changed
                        .wait_timeout(flags, deadline - now)
                        .unwrap_or_else(|poisoned| poisoned.into_inner());
                    flags = guard;
                }
                None => {
                    flags = self
                        .readiness_changed
                        .wait(flags)
                        .unwrap_or_else(|poisoned| poisoned.into_inner());
                }
            }
        }
    }
}

/// 手动驱动的事件源：测试线程扮演 selector。
#[derive(Default)]
pub struct ManualEventSource {
    registrations: Mutex<Vec<Arc<ManualRegistration>>>,
}

impl ManualEventSource {
    /// 构造空事件源。
    pub fn new() -> Self {
        Self::default()
    }

    /// 返回迄今的全部登记（含已取消），供断言使用。
    pub fn registrations(&self) -> Vec<Arc<ManualRegistration>> {
        lock(&self.registrations).clone()
    }

    /// 按 (fd, 方向) 触发一次就绪派发：对每条武装兴趣匹配、未取消的
    /// 登记调用其回调，行为与真实事件源一致。
    pub fn fire(&self, fd: RawFd, direction: Direction) {
        let interest = Interest::from(direction);
        let targets: Vec<_> = lock(&self.registrations)
            .iter()
            .filter(|reg| {
                reg.fd == fd
                    && reg.base_interest.contains(interest)
                    && reg.armed_interest().is_some_and(|armed| armed.contains(interest))
            })
            .cloned()
            .collect();
        for registration in targets {
            registration.callback.ready();
        }
    }

    /// 标记 (fd, 方向) 为就绪，解除 `await_ready` 的阻塞。
    pub fn set_ready(&self, fd: RawFd, direction: Direction) {
        for registration in lock(&self.registrations).iter() {
            if registration.fd == fd && registration.base_interest.contains(direction.into()) {
                registration.mark_ready(direction);
            }
        }
    }
}

impl EventSource for ManualEventSource {
    fn register(
        &self,
        fd: RawFd,
        interest: Interest,
        callback: Arc<dyn ReadinessCallback>,
    ) -> Result<Arc<dyn Registration>> {
        let registration = Arc::new(ManualRegistration {
            fd,
            base_interest: interest,
            armed: Mutex::new(Some(interest)),
            cancelled: AtomicBool::new(false),
            callback,
            ready: Mutex::new(ReadyFlags::default()),
            readiness_changed: Condvar::new(),
        });
        lock(&self.registrations).push(Arc::clone(&registration));
        Ok(registration)
    }
}

/// 记录每次摘除调用的注册表桩。
#[derive(Default)]
pub struct RecordingRegistry {
    removed: Mutex<Vec<ChannelId>>,
}

impl RecordingRegistry {
    /// 构造空注册表。
    pub fn new() -> Self {
        Self::default()
    }

    /// 返回被摘除的通道标识序列。
    pub fn removed(&self) -> Vec<ChannelId> {
        lock(&self.removed).clone()
    }
}

impl ChannelRegistry for RecordingRegistry {
    fn remove(&self, id: ChannelId) {
        lock(&self.removed).push(id);
    }
}

/// 记账式指标汇。
#[derive(Default)]
pub struct RecordingMetrics {
    bytes_read: AtomicU64,
    bytes_written: AtomicU64,
    unregistered: Mutex<Vec<ChannelId>>,
}

impl RecordingMetrics {
    /// 构造零值指标汇。
    pub fn new() -> Self {
        Self::default()
    }

    /// 累计读入字节数。
    pub fn total_read(&self) -> u64 {
        self.bytes_read.load(Ordering::SeqCst)
    }

    /// 累计写出字节数。
    pub fn total_written(&self) -> u64 {
        self.bytes_written.load(Ordering::SeqCst)
    }

    /// 已注销的通道标识序列。
    pub fn unregistered(&self) -> Vec<ChannelId> {
        lock(&self.unregistered).clone()
    }
}

impl MetricsSink for RecordingMetrics {
    fn bytes_read(&self, n: u64) {
        self.bytes_read.fetch_add(n, Ordering::SeqCst);
    }

    fn bytes_written(&self, n: u64) {
        self.bytes_written.fetch_add(n, Ordering::SeqCst);
    }

    fn unregister(&self, id: ChannelId) {
        lock(&self.unregistered).push(id);
    }
}

/// 捕获处理器故障上报的诊断汇桩。
#[derive(Default)]
pub struct RecordingDiagnostics {
    faults: Mutex<Vec<CapturedFault>>,
}

/// 一次被隔离的故障现场。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CapturedFault {
    /// 通道描述。
    pub channel: String,
    /// 触发事件方向；关闭通知为 `None`。
    pub event: Option<Direction>,
    /// 恐慌消息。
    pub message: String,
}

impl RecordingDiagnostics {
    /// 构造空诊断汇。
    pub fn new() -> Self {
        Self::default()
    }

    /// 返回捕获的故障序列。
    pub fn faults(&self) -> Vec<CapturedFault> {
        lock(&self.faults).clone()
    }
}

impl DiagnosticSink for RecordingDiagnostics {
    fn handler_fault(&self, channel: &str, event: Option<Direction>, fault: &Fault) {
        lock(&self.faults).push(CapturedFault {
            channel: channel.to_string(),
            event,
            message: panic_message(fault).to_string(),
        });
    }
}

/// 什么都不做的处理器，供只关心生命周期的测试使用。
#[derive(Clone, Copy, Debug, Default)]
pub struct NullHandler;

impl<C: ?Sized> ChannelHandler<C> for NullHandler {
    fn on_readable(&self, _channel: &C) {}

    fn on_writable(&self, _channel: &C) {}

    fn on_closed(&self, _channel: &C) {}
}
