//! Fuzz target: `AppService::handle_event`
//!
//! Decodes arbitrary bytes into a stream of stack events and drives both
//! state machines with them through the simulation adapter.  The service
//! must never panic, never reach a discovery state, and never report a
//! media sub-state outside Connected.
//!
//! cargo fuzz run fuzz_event_stream

#![no_main]

use std::sync::Arc;

use btserver::adapters::bluedroid::BluedroidAdapter;
use btserver::app::service::AppService;
use btserver::config::DeviceConfig;
use btserver::events::{
    AckStatus, AudioState, ConnectionState, Event, GapEvent, GattsEvent, MediaCtrl, PeerAddress,
    Status, TransportEvent,
};
use btserver::fsm::StateId;
use btserver::fsm::context::MediaState;
use btserver::oscillator::{Oscillator, SampleSource};
use btserver::shared::SharedState;
use libfuzzer_sys::fuzz_target;

fn decode(chunk: &[u8]) -> Event {
    let [kind, a, b] = [chunk[0], chunk[1], chunk[2]];
    let peer = PeerAddress([a; 6]);
    let status = Status(b & 1);
    match kind % 12 {
        0 => Event::StackUp,
        1 => Event::Heartbeat,
        2 => Event::Transport(TransportEvent::ConnectionState {
            state: match a % 4 {
                0 => ConnectionState::Disconnected,
                1 => ConnectionState::Connecting,
                2 => ConnectionState::Connected,
                _ => ConnectionState::Disconnecting,
            },
            peer,
        }),
        3 => Event::Transport(TransportEvent::AudioState(if a & 1 == 0 {
            AudioState::Started
        } else {
            AudioState::Stopped
        })),
        4 => Event::Transport(TransportEvent::MediaCtrlAck {
            cmd: match a % 4 {
                0 => MediaCtrl::CheckSrcReady,
                1 => MediaCtrl::Start,
                2 => MediaCtrl::Stop,
                _ => MediaCtrl::Suspend,
            },
            status: if b & 1 == 0 {
                AckStatus::Success
            } else {
                AckStatus::Failure
            },
        }),
        5 => Event::Gap(GapEvent::AdvDataSet { status }),
        6 => Event::Gap(GapEvent::ScanRspDataSet { status }),
        7 => Event::Gatts {
            interface: a % 4,
            event: GattsEvent::Register {
                status,
                app_id: if b & 2 == 0 { 0x55 } else { u16::from(b) },
            },
        },
        8 => Event::Gatts {
            interface: a % 4,
            event: GattsEvent::AttrTableCreated {
                status,
                handles: (0..u16::from(b % 6)).map(|h| 40 + h).collect(),
            },
        },
        9 => Event::Gatts {
            interface: a % 4,
            event: GattsEvent::Start {
                status,
                service_handle: 40,
            },
        },
        10 => Event::Gatts {
            interface: a % 4,
            event: GattsEvent::Connect {
                conn_id: u16::from(b),
                peer,
            },
        },
        _ => Event::Gatts {
            interface: a % 4,
            event: GattsEvent::Disconnect {
                reason: u16::from(b),
                peer,
            },
        },
    }
}

fuzz_target!(|data: &[u8]| {
    let config = DeviceConfig {
        stream_max_beats: Some(3),
        ..DeviceConfig::default()
    };
    let source = Arc::new(SampleSource::new(Oscillator::new(440, 44_100, 8_000)));
    let mut app = AppService::new(
        &config,
        Arc::new(SharedState::new()),
        source,
        BluedroidAdapter::new(&config.device_name),
    );
    app.start();

    for chunk in data.chunks_exact(3) {
        app.handle_event(decode(chunk));
        let state = app.transport_state();
        assert!(!matches!(state, StateId::Discovering | StateId::Discovered));
        if state != StateId::Connected {
            assert_eq!(app.media_state(), MediaState::Idle);
        }
        if app.shared().can_notify() {
            assert!(app.shared().is_table_active());
        }
    }
});
