//! Bluetooth stack events, as seen by the application.
//!
//! Stack callbacks run on a stack-owned task with a small stack and tight
//! timing.  They never act on an event directly: they copy the transient
//! callback parameters into an owned [`Event`] and hand it to the
//! [dispatcher](crate::dispatcher), which runs the state machines on the
//! worker task.
//!
//! ```text
//! ┌──────────────────┐     ┌──────────────┐     ┌──────────────────┐
//! │ A2DP callback    │────▶│              │     │                  │
//! │ GAP callback     │────▶│  EventQueue  │────▶│  Worker task     │
//! │ GATTS callback   │────▶│  (bounded)   │     │  AppService      │
//! │ Heartbeat timer  │────▶│              │     │                  │
//! └──────────────────┘     └──────────────┘     └──────────────────┘
//! ```
//!
//! The event set is closed: every handler matches exhaustively, so adding a
//! variant forces every consumer to decide what to do with it.

use core::fmt;

/// GATT interface identifier assigned by the stack at registration.
pub type GattIf = u8;

/// Wildcard interface: the event is addressed to every registered profile.
pub const GATT_IF_NONE: GattIf = 0xFF;

// ───────────────────────────────────────────────────────────────
// Small value types
// ───────────────────────────────────────────────────────────────

/// 6-byte Bluetooth device address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PeerAddress(pub [u8; 6]);

impl fmt::Display for PeerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

/// Raw completion status reported by the stack.  Zero means success for
/// both GAP (`esp_bt_status_t`) and GATT (`esp_gatt_status_t`) callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Status(pub u8);

impl Status {
    pub const OK: Self = Self(0);

    pub fn is_ok(self) -> bool {
        self == Self::OK
    }
}

// ───────────────────────────────────────────────────────────────
// Audio transport (A2DP source)
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Disconnecting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioState {
    Stopped,
    Started,
}

/// Media control commands, as issued and as acknowledged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaCtrl {
    CheckSrcReady,
    Start,
    Stop,
    Suspend,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckStatus {
    Success,
    Failure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportEvent {
    ConnectionState {
        state: ConnectionState,
        peer: PeerAddress,
    },
    AudioState(AudioState),
    /// Codec configuration from the peer; not expected for a source.
    AudioConfig,
    MediaCtrlAck {
        cmd: MediaCtrl,
        status: AckStatus,
    },
    /// Classic GAP authentication result.
    AuthComplete {
        success: bool,
        peer: PeerAddress,
    },
}

// ───────────────────────────────────────────────────────────────
// Low-energy GAP
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GapEvent {
    AdvDataSet { status: Status },
    ScanRspDataSet { status: Status },
    AdvStartComplete { status: Status },
    AdvStopComplete { status: Status },
    ConnParamsUpdated {
        status: Status,
        conn_int: u16,
        latency: u16,
        timeout: u16,
    },
}

// ───────────────────────────────────────────────────────────────
// GATT server
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GattsEvent {
    Register {
        status: Status,
        app_id: u16,
    },
    Read {
        conn_id: u16,
        handle: u16,
    },
    Mtu {
        conn_id: u16,
        mtu: u16,
    },
    /// Confirmation of an indication/notification.
    Conf {
        status: Status,
    },
    Start {
        status: Status,
        service_handle: u16,
    },
    Connect {
        conn_id: u16,
        peer: PeerAddress,
    },
    Disconnect {
        reason: u16,
        peer: PeerAddress,
    },
    /// Attribute table creation finished.  `handles` holds one handle per
    /// submitted descriptor, in submission order.
    AttrTableCreated {
        status: Status,
        handles: heapless::Vec<u16, 8>,
    },
}

// ───────────────────────────────────────────────────────────────
// Top-level event
// ───────────────────────────────────────────────────────────────

/// Heartbeat event id, kept from the stack's user-event range.
pub const HEARTBEAT_EVT: u16 = 0xFF00;
/// Stack-up event id.
pub const STACK_UP_EVT: u16 = 0xFF01;
/// Id logged when the stack refuses a media command outright.
pub const MEDIA_REJECTED_EVT: u16 = 0xFF02;

/// Every event the worker can receive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Bluedroid is enabled; register the audio transport.
    StackUp,
    /// Periodic heartbeat timer tick.
    Heartbeat,
    Transport(TransportEvent),
    Gap(GapEvent),
    Gatts {
        interface: GattIf,
        event: GattsEvent,
    },
}

impl Event {
    /// Numeric event id, matching the stack's callback event numbering.
    /// Used for diagnostics only.
    pub fn id(&self) -> u16 {
        match self {
            Self::StackUp => STACK_UP_EVT,
            Self::Heartbeat => HEARTBEAT_EVT,
            Self::Transport(t) => match t {
                TransportEvent::ConnectionState { .. } => 0,
                TransportEvent::AudioState(_) => 1,
                TransportEvent::AudioConfig => 2,
                TransportEvent::MediaCtrlAck { .. } => 3,
                TransportEvent::AuthComplete { .. } => 0x100,
            },
            Self::Gap(g) => match g {
                GapEvent::AdvDataSet { .. } => 0,
                GapEvent::ScanRspDataSet { .. } => 1,
                GapEvent::AdvStartComplete { .. } => 6,
                GapEvent::AdvStopComplete { .. } => 17,
                GapEvent::ConnParamsUpdated { .. } => 20,
            },
            Self::Gatts { event, .. } => match event {
                GattsEvent::Register { .. } => 0,
                GattsEvent::Read { .. } => 1,
                GattsEvent::Mtu { .. } => 4,
                GattsEvent::Conf { .. } => 5,
                GattsEvent::Start { .. } => 12,
                GattsEvent::Connect { .. } => 14,
                GattsEvent::Disconnect { .. } => 15,
                GattsEvent::AttrTableCreated { .. } => 22,
            },
        }
    }

    /// Short name for log lines.
    pub fn name(&self) -> &'static str {
        match self {
            Self::StackUp => "StackUp",
            Self::Heartbeat => "Heartbeat",
            Self::Transport(t) => match t {
                TransportEvent::ConnectionState { .. } => "A2dpConnectionState",
                TransportEvent::AudioState(_) => "A2dpAudioState",
                TransportEvent::AudioConfig => "A2dpAudioConfig",
                TransportEvent::MediaCtrlAck { .. } => "A2dpMediaCtrlAck",
                TransportEvent::AuthComplete { .. } => "GapAuthComplete",
            },
            Self::Gap(g) => match g {
                GapEvent::AdvDataSet { .. } => "AdvDataSet",
                GapEvent::ScanRspDataSet { .. } => "ScanRspDataSet",
                GapEvent::AdvStartComplete { .. } => "AdvStartComplete",
                GapEvent::AdvStopComplete { .. } => "AdvStopComplete",
                GapEvent::ConnParamsUpdated { .. } => "ConnParamsUpdated",
            },
            Self::Gatts { event, .. } => match event {
                GattsEvent::Register { .. } => "GattsRegister",
                GattsEvent::Read { .. } => "GattsRead",
                GattsEvent::Mtu { .. } => "GattsMtu",
                GattsEvent::Conf { .. } => "GattsConf",
                GattsEvent::Start { .. } => "GattsStart",
                GattsEvent::Connect { .. } => "GattsConnect",
                GattsEvent::Disconnect { .. } => "GattsDisconnect",
                GattsEvent::AttrTableCreated { .. } => "GattsAttrTableCreated",
            },
        }
    }
}
