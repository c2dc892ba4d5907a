//! 多点通道的端到端行为：非阻塞收发、聚合发送仿真、不支持操作的
//! 显式拒绝、闩门控的关闭与真实 UDP 回环。

use std::collections::VecDeque;
use std::io::{self, IoSlice};
use std::net::{SocketAddr, UdpSocket};
use std::os::fd::RawFd;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use flint_channel::MultipointChannel;
use flint_channel::sys::{UdpResource, udp_resource};
use flint_core::channel::{Channel, ChannelHandler};
use flint_core::event::Registration;
use flint_core::resource::DatagramResource;
use flint_core::test_stubs::{
    ManualEventSource, NullHandler, RecordingDiagnostics, RecordingMetrics, RecordingRegistry,
};
use proptest::prelude::*;

/// 脚本化数据报资源：入站报文来自预置队列，出站报文被记录。
struct ScriptedDatagram {
    inbound: Mutex<VecDeque<(Vec<u8>, SocketAddr)>>,
    outbound: Mutex<Vec<(Vec<u8>, SocketAddr)>>,
    send_buffer_full: AtomicBool,
    close_calls: AtomicUsize,
    fail_close: bool,
}

impl ScriptedDatagram {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            inbound: Mutex::new(VecDeque::new()),
            outbound: Mutex::new(Vec::new()),
            send_buffer_full: AtomicBool::new(false),
            close_calls: AtomicUsize::new(0),
            fail_close: false,
        })
    }

    fn failing_close() -> Arc<Self> {
        Arc::new(Self {
            inbound: Mutex::new(VecDeque::new()),
            outbound: Mutex::new(Vec::new()),
            send_buffer_full: AtomicBool::new(false),
            close_calls: AtomicUsize::new(0),
            fail_close: true,
        })
    }

    fn push_inbound(&self, payload: &[u8], source: SocketAddr) {
        self.inbound
            .lock()
            .unwrap()
            .push_back((payload.to_vec(), source));
    }

    fn sent(&self) -> Vec<(Vec<u8>, SocketAddr)> {
        self.outbound.lock().unwrap().clone()
    }
}

/// 转发包装：通道拿走 `Box`，测试侧仍经 `Arc` 观察资源状态。
struct SharedResource {
    inner: Arc<ScriptedDatagram>,
}

impl DatagramResource for SharedResource {
    fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        match self.inner.inbound.lock().unwrap().pop_front() {
            Some((payload, source)) => {
                let len = payload.len().min(buf.len());
                buf[..len].copy_from_slice(&payload[..len]);
                Ok((len, source))
            }
            None => Err(io::ErrorKind::WouldBlock.into()),
        }
    }

    fn send_to(&self, buf: &[u8], target: SocketAddr) -> io::Result<usize> {
        if self.inner.send_buffer_full.load(Ordering::SeqCst) {
            return Err(io::ErrorKind::WouldBlock.into());
        }
        self.inner
            .outbound
            .lock()
            .unwrap()
            .push((buf.to_vec(), target));
        Ok(buf.len())
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        Ok("127.0.0.1:7100".parse().expect("static address"))
    }

    fn close(&self) -> io::Result<()> {
        self.inner.close_calls.fetch_add(1, Ordering::SeqCst);
        if self.inner.fail_close {
            Err(io::Error::other("socket close failed"))
        } else {
            Ok(())
        }
    }

    fn as_raw_fd(&self) -> RawFd {
        71
    }
}

#[derive(Default)]
struct CountingHandler {
    closed: AtomicUsize,
}

impl ChannelHandler<MultipointChannel> for CountingHandler {
    fn on_readable(&self, _channel: &MultipointChannel) {}

    fn on_writable(&self, _channel: &MultipointChannel) {}

    fn on_closed(&self, _channel: &MultipointChannel) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

struct Fixture {
    events: ManualEventSource,
    registry: Arc<RecordingRegistry>,
    metrics: Arc<RecordingMetrics>,
    diagnostics: Arc<RecordingDiagnostics>,
}

impl Fixture {
    fn new() -> Self {
        Self {
            events: ManualEventSource::new(),
            registry: Arc::new(RecordingRegistry::new()),
            metrics: Arc::new(RecordingMetrics::new()),
            diagnostics: Arc::new(RecordingDiagnostics::new()),
        }
    }

    fn channel(
        &self,
        resource: Arc<ScriptedDatagram>,
        handler: Arc<dyn ChannelHandler<MultipointChannel>>,
    ) -> MultipointChannel {
        MultipointChannel::register(
            Box::new(SharedResource { inner: resource }),
            handler,
            &self.events,
            self.registry.clone(),
            self.metrics.clone(),
            self.diagnostics.clone(),
        )
        .unwrap()
    }

    fn channel_from_udp(&self, socket: UdpResource) -> MultipointChannel {
        MultipointChannel::register(
            Box::new(socket),
            Arc::new(NullHandler),
            &self.events,
            self.registry.clone(),
            self.metrics.clone(),
            self.diagnostics.clone(),
        )
        .unwrap()
    }
}

fn peer(port: u16) -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], port))
}

#[test]
fn receive_without_pending_datagram_is_none() {
    let fixture = Fixture::new();
    let channel = fixture.channel(ScriptedDatagram::new(), Arc::new(NullHandler));

    let mut buf = [0u8; 16];
    assert_eq!(channel.receive(&mut buf).unwrap(), None);
    assert_eq!(fixture.metrics.total_read(), 0);
}

#[test]
fn receive_reports_length_source_and_metrics() {
    let fixture = Fixture::new();
    let resource = ScriptedDatagram::new();
    resource.push_inbound(&[10, 20, 30], peer(9001));
    let channel = fixture.channel(resource, Arc::new(NullHandler));

    let mut buf = [0u8; 16];
    let datagram = channel.receive(&mut buf).unwrap().expect("one datagram");
    assert_eq!(datagram.len(), 3);
    assert_eq!(datagram.source_addr(), peer(9001));
    assert_eq!(datagram.destination_addr(), None);
    assert_eq!(&buf[..3], &[10, 20, 30]);
    assert_eq!(fixture.metrics.total_read(), 3);
}

#[test]
fn oversized_datagram_truncates_to_buffer() {
    let fixture = Fixture::new();
    let resource = ScriptedDatagram::new();
    resource.push_inbound(&[1, 2, 3, 4, 5], peer(9002));
    let channel = fixture.channel(resource, Arc::new(NullHandler));

    let mut buf = [0u8; 3];
    let datagram = channel.receive(&mut buf).unwrap().expect("one datagram");
    assert_eq!(datagram.len(), 3);
    assert_eq!(buf, [1, 2, 3]);
}

#[test]
fn send_queues_whole_datagram() {
    let fixture = Fixture::new();
    let resource = ScriptedDatagram::new();
    let channel = fixture.channel(resource.clone(), Arc::new(NullHandler));

    assert!(channel.send(peer(9003), &[7, 8]).unwrap());
    assert_eq!(resource.sent(), vec![(vec![7, 8], peer(9003))]);
    assert_eq!(fixture.metrics.total_written(), 2);
}

#[test]
fn full_send_buffer_reports_not_sent() {
    let fixture = Fixture::new();
    let resource = ScriptedDatagram::new();
    resource.send_buffer_full.store(true, Ordering::SeqCst);
    let channel = fixture.channel(resource.clone(), Arc::new(NullHandler));

    assert!(!channel.send(peer(9004), &[1]).unwrap());
    assert!(resource.sent().is_empty());
    assert_eq!(fixture.metrics.total_written(), 0);
}

#[test]
fn oversized_gather_rejected_before_any_send() {
    let fixture = Fixture::new();
    let resource = ScriptedDatagram::new();
    let channel = fixture.channel(resource.clone(), Arc::new(NullHandler));

    let chunk = vec![0u8; 40_000];
    let bufs = [IoSlice::new(&chunk), IoSlice::new(&chunk)];
    let err = channel.send_vectored(peer(9005), &bufs).unwrap_err();
    assert_eq!(err.code(), "channel.message_too_large");
    assert!(resource.sent().is_empty());
}

#[test]
fn unsupported_operations_are_named_rejections() {
    let fixture = Fixture::new();
    let channel = fixture.channel(ScriptedDatagram::new(), Arc::new(NullHandler));

    let join = channel
        .join_group("239.0.0.1".parse().unwrap(), None)
        .unwrap_err();
    assert_eq!(join.code(), "channel.operation_unsupported");
    assert_eq!(
        channel.shutdown_reads().unwrap_err().code(),
        "channel.operation_unsupported"
    );
    assert_eq!(
        channel.shutdown_writes().unwrap_err().code(),
        "channel.operation_unsupported"
    );
}

#[test]
fn concurrent_close_runs_cleanup_exactly_once() {
    let fixture = Fixture::new();
    let resource = ScriptedDatagram::new();
    let handler = Arc::new(CountingHandler::default());
    let channel = fixture.channel(resource.clone(), handler.clone());

    let mut workers = Vec::new();
    for _ in 0..8 {
        let channel = channel.clone();
        workers.push(thread::spawn(move || channel.close().unwrap()));
    }
    for worker in workers {
        worker.join().unwrap();
    }

    assert!(!channel.is_open());
    assert_eq!(resource.close_calls.load(Ordering::SeqCst), 1);
    assert_eq!(handler.closed.load(Ordering::SeqCst), 1);
    assert_eq!(fixture.registry.removed(), vec![channel.id()]);
    assert_eq!(fixture.metrics.unregistered(), vec![channel.id()]);
    for registration in fixture.events.registrations() {
        assert!(registration.is_cancelled());
    }
}

#[test]
fn close_failure_propagates_but_only_to_first_caller() {
    let fixture = Fixture::new();
    let resource = ScriptedDatagram::failing_close();
    let channel = fixture.channel(resource.clone(), Arc::new(NullHandler));

    let err = channel.close().unwrap_err();
    assert_eq!(err.code(), "channel.io");
    // 清理已经完成，后续关闭是静默空操作。
    assert_eq!(fixture.registry.removed(), vec![channel.id()]);
    channel.close().unwrap();
    assert_eq!(resource.close_calls.load(Ordering::SeqCst), 1);
}

#[test]
fn udp_loopback_round_trip() {
    let fixture = Fixture::new();
    let socket = udp_resource(peer(0)).unwrap();
    let channel = fixture.channel_from_udp(socket);
    let channel_addr = channel.local_addr().unwrap();

    let sender = UdpSocket::bind(peer(0)).unwrap();
    let sender_addr = sender.local_addr().unwrap();
    sender.send_to(&[0xAA, 0xBB], channel_addr).unwrap();

    // 非阻塞接收：报文在回环上就绪需要片刻。
    let mut buf = [0u8; 32];
    let mut received = None;
    for _ in 0..100 {
        if let Some(datagram) = channel.receive(&mut buf).unwrap() {
            received = Some(datagram);
            break;
        }
        thread::sleep(Duration::from_millis(5));
    }
    let datagram = received.expect("datagram within the retry window");
    assert_eq!(datagram.len(), 2);
    assert_eq!(datagram.source_addr(), sender_addr);
    assert_eq!(&buf[..2], &[0xAA, 0xBB]);

    assert!(channel.send(sender_addr, &[0xCC]).unwrap());
    sender
        .set_read_timeout(Some(Duration::from_secs(2)))
        .unwrap();
    let mut echo = [0u8; 4];
    let (len, from) = sender.recv_from(&mut echo).unwrap();
    assert_eq!(len, 1);
    assert_eq!(from, channel_addr);
    assert_eq!(echo[0], 0xCC);

    channel.close().unwrap();
}

proptest! {
    /// 聚合发送与等价的连续单次发送必须产生同一报文。
    #[test]
    fn gather_send_matches_contiguous_send(
        segments in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..64), 0..8),
    ) {
        let fixture = Fixture::new();
        let resource = ScriptedDatagram::new();
        let channel = fixture.channel(resource.clone(), Arc::new(NullHandler));
        let target = peer(9100);

        let slices: Vec<IoSlice<'_>> = segments.iter().map(|s| IoSlice::new(s)).collect();
        channel.send_vectored(target, &slices).unwrap();

        let contiguous: Vec<u8> = segments.concat();
        channel.send(target, &contiguous).unwrap();

        let sent = resource.sent();
        prop_assert_eq!(sent.len(), 2);
        prop_assert_eq!(&sent[0], &sent[1]);
    }
}
