//! 两类通道适配器的选项面：空支持集加显式的“不支持该选项”拒绝，
//! 与 I/O 失败可以按错误码区分。

use std::sync::Arc;

use flint_channel::sys::{pipe_halves, udp_resource};
use flint_channel::{MultipointChannel, StreamChannel};
use flint_core::channel::Channel;
use flint_core::options::{Configurable, OptionKey, OptionValue};
use flint_core::test_stubs::{
    ManualEventSource, NullHandler, RecordingDiagnostics, RecordingMetrics, RecordingRegistry,
};

fn probe_key() -> OptionKey {
    OptionKey::new("socket", "receive_buffer", "receive buffer size in bytes")
}

fn assert_rejects_all_options(channel: &dyn Configurable) {
    let key = probe_key();

    assert!(channel.options().is_empty());

    let get = channel.get_option(&key).unwrap_err();
    assert!(get.is_unsupported());
    assert_eq!(get.code(), "channel.option_unsupported");

    let set = channel
        .set_option(&key, OptionValue::U64(65_536))
        .unwrap_err();
    assert!(set.is_unsupported());
    assert_eq!(set.code(), "channel.option_unsupported");
}

#[test]
fn stream_channel_has_empty_option_surface() {
    let events = ManualEventSource::new();
    let (reader, writer) = pipe_halves().unwrap();
    let channel = StreamChannel::register(
        Box::new(reader),
        Box::new(writer),
        Arc::new(NullHandler),
        &events,
        Arc::new(RecordingRegistry::new()),
        Arc::new(RecordingDiagnostics::new()),
    )
    .unwrap();

    assert_rejects_all_options(&channel);
    channel.close().unwrap();
}

#[test]
fn multipoint_channel_has_empty_option_surface() {
    let events = ManualEventSource::new();
    let socket = udp_resource("127.0.0.1:0".parse().unwrap()).unwrap();
    let channel = MultipointChannel::register(
        Box::new(socket),
        Arc::new(NullHandler),
        &events,
        Arc::new(RecordingRegistry::new()),
        Arc::new(RecordingMetrics::new()),
        Arc::new(RecordingDiagnostics::new()),
    )
    .unwrap();

    assert_rejects_all_options(&channel);
    channel.close().unwrap();
}
