//! Integration tests for the audio transport pipeline:
//! Event → AppService → transport Fsm → TransportPort calls.

use std::sync::Arc;

use btserver::app::ports::StackError;
use btserver::app::service::AppService;
use btserver::config::DeviceConfig;
use btserver::events::{
    AckStatus, AudioState, ConnectionState, Event, MediaCtrl, PeerAddress, TransportEvent,
};
use btserver::fsm::StateId;
use btserver::fsm::context::{MediaState, ScanMode};
use btserver::oscillator::{Oscillator, SampleSource};
use btserver::shared::SharedState;

use crate::mock_stack::{Call, MockStack};

const SINK: PeerAddress = PeerAddress([0x00, 0x1b, 0x66, 0x01, 0x02, 0x03]);

fn make_app(config: DeviceConfig) -> (AppService<MockStack>, Arc<SampleSource>) {
    let source = Arc::new(SampleSource::new(Oscillator::new(440, 44_100, 8_000)));
    let mut app = AppService::new(
        &config,
        Arc::new(SharedState::new()),
        Arc::clone(&source),
        MockStack::new(),
    );
    app.start();
    (app, source)
}

fn link(state: ConnectionState) -> Event {
    Event::Transport(TransportEvent::ConnectionState { state, peer: SINK })
}

fn ack(cmd: MediaCtrl, status: AckStatus) -> Event {
    Event::Transport(TransportEvent::MediaCtrlAck { cmd, status })
}

fn connected_app(config: DeviceConfig) -> (AppService<MockStack>, Arc<SampleSource>) {
    let (mut app, source) = make_app(config);
    app.handle_event(Event::StackUp);
    app.handle_event(link(ConnectionState::Connecting));
    app.handle_event(link(ConnectionState::Connected));
    assert_eq!(app.transport_state(), StateId::Connected);
    app.port_mut().clear();
    (app, source)
}

// ── Bring-up ──────────────────────────────────────────────────

#[test]
fn stack_up_initialises_source_and_becomes_discoverable() {
    let (mut app, _) = make_app(DeviceConfig::default());
    assert_eq!(app.transport_state(), StateId::Idle);

    app.handle_event(Event::StackUp);

    assert_eq!(app.transport_state(), StateId::Unconnected);
    assert_eq!(
        app.port().calls,
        vec![
            Call::InitSource,
            Call::SetScanMode(ScanMode::ConnectableDiscoverable)
        ]
    );
}

#[test]
fn heartbeat_without_outbound_peer_does_nothing() {
    let (mut app, _) = make_app(DeviceConfig::default());
    app.handle_event(Event::StackUp);
    app.port_mut().clear();

    for _ in 0..5 {
        app.handle_event(Event::Heartbeat);
    }
    assert_eq!(app.transport_state(), StateId::Unconnected);
    assert!(app.port().calls.is_empty());
}

// ── Connection ────────────────────────────────────────────────

#[test]
fn inbound_connection_hides_the_device() {
    let (mut app, _) = make_app(DeviceConfig::default());
    app.handle_event(Event::StackUp);
    app.handle_event(link(ConnectionState::Connected));

    assert_eq!(app.transport_state(), StateId::Connected);
    assert_eq!(app.media_state(), MediaState::Idle);
    assert_eq!(app.port().last_scan_mode(), Some(ScanMode::None));
}

#[test]
fn outbound_connect_times_out_and_retries() {
    let config = DeviceConfig {
        outbound_peer: Some(SINK.0),
        ..DeviceConfig::default()
    };
    let (mut app, _) = make_app(config);
    app.handle_event(Event::StackUp);
    app.port_mut().clear();

    app.handle_event(Event::Heartbeat);
    assert_eq!(app.transport_state(), StateId::Connecting);
    assert_eq!(app.port().calls, vec![Call::Connect(SINK)]);

    // Default timeout is two heartbeats.
    app.handle_event(Event::Heartbeat);
    assert_eq!(app.transport_state(), StateId::Connecting);
    app.handle_event(Event::Heartbeat);
    assert_eq!(app.transport_state(), StateId::Unconnected);

    app.handle_event(Event::Heartbeat);
    assert_eq!(app.transport_state(), StateId::Connecting);
    assert_eq!(app.port().count(|c| matches!(c, Call::Connect(_))), 2);
}

#[test]
fn link_loss_makes_device_discoverable_again() {
    let (mut app, _) = connected_app(DeviceConfig::default());
    app.handle_event(link(ConnectionState::Disconnected));
    assert_eq!(app.transport_state(), StateId::Unconnected);
    assert_eq!(
        app.port().last_scan_mode(),
        Some(ScanMode::ConnectableDiscoverable)
    );
}

// ── Media ─────────────────────────────────────────────────────

#[test]
fn media_start_handshake_reaches_streaming() {
    let (mut app, source) = connected_app(DeviceConfig::default());

    app.handle_event(Event::Heartbeat);
    assert_eq!(app.port().media_cmds(), vec![MediaCtrl::CheckSrcReady]);

    app.handle_event(ack(MediaCtrl::CheckSrcReady, AckStatus::Success));
    assert_eq!(app.media_state(), MediaState::Starting);
    assert_eq!(
        app.port().media_cmds(),
        vec![MediaCtrl::CheckSrcReady, MediaCtrl::Start]
    );

    let mut buf = [0u8; 64];
    source.on_data_request(&mut buf);
    assert_eq!(source.packets(), 1);

    app.handle_event(ack(MediaCtrl::Start, AckStatus::Success));
    assert_eq!(app.media_state(), MediaState::Started);
    assert!(app.shared().is_streaming());
    assert_eq!(source.packets(), 0, "counters reset when streaming starts");
}

#[test]
fn failed_readiness_check_is_retried_on_next_heartbeat() {
    let (mut app, _) = connected_app(DeviceConfig::default());
    app.handle_event(Event::Heartbeat);
    app.handle_event(ack(MediaCtrl::CheckSrcReady, AckStatus::Failure));
    assert_eq!(app.media_state(), MediaState::Idle);

    app.handle_event(Event::Heartbeat);
    assert_eq!(
        app.port().media_cmds(),
        vec![MediaCtrl::CheckSrcReady, MediaCtrl::CheckSrcReady]
    );
}

#[test]
fn bounded_stream_stops_then_disconnects() {
    let config = DeviceConfig {
        stream_max_beats: Some(2),
        ..DeviceConfig::default()
    };
    let (mut app, _) = connected_app(config);
    app.handle_event(Event::Heartbeat);
    app.handle_event(ack(MediaCtrl::CheckSrcReady, AckStatus::Success));
    app.handle_event(ack(MediaCtrl::Start, AckStatus::Success));

    app.handle_event(Event::Heartbeat);
    assert_eq!(app.media_state(), MediaState::Started);
    app.handle_event(Event::Heartbeat);
    assert_eq!(app.media_state(), MediaState::Stopping);
    assert!(!app.shared().is_streaming());

    app.handle_event(ack(MediaCtrl::Stop, AckStatus::Success));
    assert_eq!(app.transport_state(), StateId::Disconnecting);
    assert_eq!(app.port().calls.last(), Some(&Call::Disconnect(SINK)));

    app.handle_event(link(ConnectionState::Disconnected));
    assert_eq!(app.transport_state(), StateId::Unconnected);
    assert_eq!(
        app.port().last_scan_mode(),
        Some(ScanMode::ConnectableDiscoverable)
    );
}

#[test]
fn remote_audio_start_resets_stream_counters() {
    let (mut app, source) = connected_app(DeviceConfig::default());
    let mut buf = [0u8; 32];
    source.on_data_request(&mut buf);
    source.on_data_request(&mut buf);
    assert_eq!(source.bytes(), 64);

    app.handle_event(Event::Transport(TransportEvent::AudioState(AudioState::Started)));
    assert_eq!(source.bytes(), 0);
    assert_eq!(app.transport_state(), StateId::Connected);
}

#[test]
fn rejected_media_command_leaves_machine_consistent() {
    let (mut app, _) = connected_app(DeviceConfig::default());
    app.port_mut().fail_media = Some(StackError::Busy);

    app.handle_event(Event::Heartbeat);
    assert_eq!(app.media_state(), MediaState::Idle);
    assert_eq!(app.transport_state(), StateId::Connected);
    assert_eq!(app.events_handled(), 4);
}

#[test]
fn busy_stack_on_start_falls_back_to_idle_and_retries() {
    let (mut app, _) = connected_app(DeviceConfig::default());
    app.handle_event(Event::Heartbeat);
    app.port_mut().fail_media = Some(StackError::Busy);
    app.handle_event(ack(MediaCtrl::CheckSrcReady, AckStatus::Success));
    assert_eq!(app.media_state(), MediaState::Idle);
    assert_eq!(
        app.port().media_cmds(),
        vec![MediaCtrl::CheckSrcReady, MediaCtrl::Start]
    );

    app.port_mut().fail_media = None;
    app.handle_event(Event::Heartbeat);
    app.handle_event(ack(MediaCtrl::CheckSrcReady, AckStatus::Success));
    assert_eq!(app.media_state(), MediaState::Starting);
    app.handle_event(ack(MediaCtrl::Start, AckStatus::Success));
    assert_eq!(app.media_state(), MediaState::Started);
    assert!(app.shared().is_streaming());
}

#[test]
fn busy_stack_on_stop_keeps_streaming_until_next_heartbeat() {
    let config = DeviceConfig {
        stream_max_beats: Some(1),
        ..DeviceConfig::default()
    };
    let (mut app, _) = connected_app(config);
    app.handle_event(Event::Heartbeat);
    app.handle_event(ack(MediaCtrl::CheckSrcReady, AckStatus::Success));
    app.handle_event(ack(MediaCtrl::Start, AckStatus::Success));

    app.port_mut().fail_media = Some(StackError::Busy);
    app.handle_event(Event::Heartbeat);
    assert_eq!(app.media_state(), MediaState::Started);
    assert!(app.shared().is_streaming());

    app.port_mut().fail_media = None;
    app.port_mut().clear();
    app.handle_event(Event::Heartbeat);
    assert_eq!(app.media_state(), MediaState::Stopping);
    assert_eq!(app.port().media_cmds(), vec![MediaCtrl::Stop]);

    app.handle_event(ack(MediaCtrl::Stop, AckStatus::Success));
    assert_eq!(app.transport_state(), StateId::Disconnecting);
}

#[test]
fn auth_result_does_not_touch_the_machine() {
    let (mut app, _) = connected_app(DeviceConfig::default());
    app.handle_event(Event::Transport(TransportEvent::AuthComplete {
        success: false,
        peer: SINK,
    }));
    assert_eq!(app.transport_state(), StateId::Connected);
    assert!(app.port().calls.is_empty());
}
