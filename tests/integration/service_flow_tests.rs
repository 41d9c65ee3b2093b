//! Integration tests for the RMS service pipeline:
//! GATTS/GAP events → AppService → GattProfile → port calls, and the
//! producer's notifications gated on the shared flags.

use std::sync::Arc;

use btserver::app::service::AppService;
use btserver::config::DeviceConfig;
use btserver::events::{Event, GapEvent, GattIf, GattsEvent, PeerAddress, Status};
use btserver::gatt::ServiceConnectionState;
use btserver::gatt::table::ATTR_COUNT;
use btserver::oscillator::{Oscillator, SampleSource};
use btserver::producer::RmsProducer;
use btserver::shared::SharedState;

use crate::mock_stack::{Call, MockStack};

const IF: GattIf = 3;
const CENTRAL: PeerAddress = PeerAddress([0xc0, 0xff, 0xee, 0x00, 0x00, 0x01]);

fn make_app() -> (AppService<MockStack>, Arc<SharedState>) {
    let shared = Arc::new(SharedState::new());
    let source = Arc::new(SampleSource::new(Oscillator::new(440, 44_100, 8_000)));
    let mut app = AppService::new(
        &DeviceConfig::default(),
        Arc::clone(&shared),
        source,
        MockStack::new(),
    );
    app.start();
    (app, shared)
}

fn gatts(event: GattsEvent) -> Event {
    Event::Gatts {
        interface: IF,
        event,
    }
}

fn table_created(handles: &[u16]) -> Event {
    gatts(GattsEvent::AttrTableCreated {
        status: Status::OK,
        handles: heapless::Vec::from_slice(handles).unwrap(),
    })
}

/// Register and confirm both advertising payloads.
fn registered_app() -> (AppService<MockStack>, Arc<SharedState>) {
    let (mut app, shared) = make_app();
    app.handle_event(gatts(GattsEvent::Register {
        status: Status::OK,
        app_id: 0x55,
    }));
    app.handle_event(Event::Gap(GapEvent::AdvDataSet { status: Status::OK }));
    app.handle_event(Event::Gap(GapEvent::ScanRspDataSet { status: Status::OK }));
    (app, shared)
}

fn active_app() -> (AppService<MockStack>, Arc<SharedState>) {
    let (mut app, shared) = registered_app();
    app.handle_event(table_created(&[40, 41, 42, 43]));
    app.handle_event(gatts(GattsEvent::Start {
        status: Status::OK,
        service_handle: 40,
    }));
    assert_eq!(app.service_state(), ServiceConnectionState::TableActive);
    app.port_mut().clear();
    (app, shared)
}

// ── Bring-up ──────────────────────────────────────────────────

#[test]
fn full_bring_up_issues_commands_in_order() {
    let (mut app, shared) = registered_app();
    app.handle_event(table_created(&[40, 41, 42, 43]));
    app.handle_event(gatts(GattsEvent::Start {
        status: Status::OK,
        service_handle: 40,
    }));

    assert_eq!(
        app.port().calls,
        vec![
            Call::SetDeviceName("SERVER".into()),
            Call::ConfigAdvData { scan_rsp: false },
            Call::ConfigAdvData { scan_rsp: true },
            Call::StartAdvertising,
            Call::CreateAttrTable {
                interface: IF,
                len: ATTR_COUNT
            },
            Call::StartService(40),
        ]
    );
    assert_eq!(app.service_state(), ServiceConnectionState::TableActive);
    assert!(shared.is_table_active());
    assert_eq!(shared.handles().map(|h| h.value()), Some(42));
    assert_eq!(shared.interface(), IF);
}

#[test]
fn table_waits_for_both_payload_confirmations() {
    let (mut app, _) = make_app();
    app.handle_event(gatts(GattsEvent::Register {
        status: Status::OK,
        app_id: 0x55,
    }));
    app.handle_event(Event::Gap(GapEvent::ScanRspDataSet { status: Status::OK }));
    assert_eq!(app.port().count(|c| matches!(c, Call::CreateAttrTable { .. })), 0);
    assert_eq!(
        app.service_state(),
        ServiceConnectionState::RegisteredAwaitingTable
    );

    app.handle_event(Event::Gap(GapEvent::AdvDataSet { status: Status::OK }));
    assert_eq!(app.port().count(|c| matches!(c, Call::CreateAttrTable { .. })), 1);
}

#[test]
fn handle_count_mismatch_fails_without_starting_service() {
    let (mut app, shared) = registered_app();
    app.handle_event(table_created(&[40, 41, 42]));

    assert_eq!(app.service_state(), ServiceConnectionState::Failed);
    assert_eq!(app.port().count(|c| matches!(c, Call::StartService(_))), 0);
    assert!(shared.handles().is_none());
    assert!(!shared.can_notify());
}

#[test]
fn failed_registration_never_advertises() {
    let (mut app, _) = make_app();
    app.handle_event(gatts(GattsEvent::Register {
        status: Status(0x85),
        app_id: 0x55,
    }));
    assert_eq!(app.service_state(), ServiceConnectionState::Failed);
    assert!(app.port().calls.is_empty());
}

#[test]
fn failed_registration_of_another_app_is_not_ours() {
    let (mut app, shared) = make_app();
    app.handle_event(gatts(GattsEvent::Register {
        status: Status(0x85),
        app_id: 0x77,
    }));
    assert_eq!(app.service_state(), ServiceConnectionState::NotRegistered);

    app.handle_event(gatts(GattsEvent::Register {
        status: Status::OK,
        app_id: 0x55,
    }));
    assert_eq!(
        app.service_state(),
        ServiceConnectionState::RegisteredAwaitingTable
    );
    assert_eq!(shared.interface(), IF);
}

#[test]
fn failed_payload_confirmation_stops_bring_up() {
    let (mut app, shared) = make_app();
    app.handle_event(gatts(GattsEvent::Register {
        status: Status::OK,
        app_id: 0x55,
    }));
    app.handle_event(Event::Gap(GapEvent::AdvDataSet { status: Status(1) }));
    app.handle_event(Event::Gap(GapEvent::ScanRspDataSet { status: Status::OK }));

    assert_eq!(app.service_state(), ServiceConnectionState::Failed);
    assert_eq!(app.port().count(|c| matches!(c, Call::StartAdvertising)), 0);
    assert_eq!(app.port().count(|c| matches!(c, Call::CreateAttrTable { .. })), 0);
    assert!(!shared.is_table_active());
}

#[test]
fn events_for_another_interface_are_ignored() {
    let (mut app, shared) = active_app();
    app.handle_event(Event::Gatts {
        interface: IF + 1,
        event: GattsEvent::Connect {
            conn_id: 9,
            peer: CENTRAL,
        },
    });
    assert!(!shared.is_connected());
    assert!(app.port().calls.is_empty());
}

// ── Client connection ─────────────────────────────────────────

#[test]
fn client_connect_and_disconnect_cycle() {
    let (mut app, shared) = active_app();

    app.handle_event(gatts(GattsEvent::Connect {
        conn_id: 1,
        peer: CENTRAL,
    }));
    assert_eq!(app.service_state(), ServiceConnectionState::ClientConnected);
    assert!(shared.can_notify());
    assert_eq!(
        app.port().calls,
        vec![Call::UpdateConnParams(CENTRAL), Call::StopAdvertising]
    );

    app.handle_event(gatts(GattsEvent::Mtu { conn_id: 1, mtu: 247 }));
    assert_eq!(app.profile().mtu(), 247);

    app.handle_event(gatts(GattsEvent::Disconnect {
        reason: 0x13,
        peer: CENTRAL,
    }));
    assert_eq!(app.service_state(), ServiceConnectionState::TableActive);
    assert!(!shared.can_notify());
    assert_eq!(app.profile().mtu(), 23);
    assert_eq!(app.port().calls.last(), Some(&Call::StartAdvertising));
}

// ── Telemetry ─────────────────────────────────────────────────

#[test]
fn producer_notifies_only_a_connected_client() {
    let (mut app, shared) = active_app();
    let mut producer = RmsProducer::new(
        &DeviceConfig::default(),
        Arc::clone(&shared),
        MockStack::new(),
        1234,
    );

    for _ in 0..20 {
        producer.step();
    }
    assert!(producer.port().notifications().is_empty());

    app.handle_event(gatts(GattsEvent::Connect {
        conn_id: 5,
        peer: CENTRAL,
    }));
    let produced: Vec<u8> = (0..50).map(|_| producer.step()).collect();
    let expected: Vec<u8> = produced.into_iter().filter(|&v| v > 2).collect();
    assert_eq!(producer.port().notifications(), expected);
    assert!(producer.port().calls.iter().all(|c| matches!(
        c,
        Call::Notify {
            interface: IF,
            conn_id: 5,
            handle: 42,
            ..
        }
    )));
}

#[test]
fn failed_notification_is_dropped_and_next_period_retries() {
    let (mut app, shared) = active_app();
    app.handle_event(gatts(GattsEvent::Connect {
        conn_id: 2,
        peer: CENTRAL,
    }));

    let mut port = MockStack::new();
    port.fail_notify = true;
    assert!(!shared.notify(&mut port, 7));
    port.fail_notify = false;
    assert!(shared.notify(&mut port, 8));
    assert_eq!(port.notifications(), vec![7, 8]);
}
