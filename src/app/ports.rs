//! Port traits: the hexagonal boundary between the state machines and the
//! Bluetooth stack.
//!
//! ```text
//!   AppService (domain) ──▶ Port trait ──▶ Adapter ──▶ Bluedroid
//! ```
//!
//! The [`AppService`](super::service::AppService) issues every outbound stack
//! command through these traits, so the state machines never touch the
//! radio directly and run unchanged against the recording mocks in the
//! integration tests.
//!
//! Every command is asynchronous on the stack side: `Ok(())` means the stack
//! accepted the request, and the outcome arrives later as an
//! [`Event`](crate::events::Event).

use crate::events::{GattIf, MediaCtrl, PeerAddress};
use crate::fsm::context::ScanMode;
use crate::gatt::table::AttrDescriptor;
use crate::gatt::{AdvData, AdvParams, ConnParams};

// ───────────────────────────────────────────────────────────────
// Audio transport port (classic A2DP source + GAP scan mode)
// ───────────────────────────────────────────────────────────────

pub trait TransportPort {
    /// Register transport callbacks and initialise the audio source.
    fn init_source(&mut self) -> Result<(), StackError>;

    /// Set classic connectable/discoverable visibility.
    fn set_scan_mode(&mut self, mode: ScanMode) -> Result<(), StackError>;

    /// Issue a media control command; the result arrives as an ack event.
    fn media_ctrl(&mut self, cmd: MediaCtrl) -> Result<(), StackError>;

    fn connect(&mut self, peer: PeerAddress) -> Result<(), StackError>;

    fn disconnect(&mut self, peer: PeerAddress) -> Result<(), StackError>;
}

// ───────────────────────────────────────────────────────────────
// Low-energy GAP port (advertising, connection parameters)
// ───────────────────────────────────────────────────────────────

pub trait GapPort {
    fn set_device_name(&mut self, name: &str) -> Result<(), StackError>;

    /// Configure the advertising payload or, when `data.set_scan_rsp` is
    /// set, the scan response.  Completion arrives as a "data set" event.
    fn config_adv_data(&mut self, data: &AdvData) -> Result<(), StackError>;

    fn start_advertising(&mut self, params: &AdvParams) -> Result<(), StackError>;

    fn stop_advertising(&mut self) -> Result<(), StackError>;

    fn update_conn_params(&mut self, params: &ConnParams) -> Result<(), StackError>;
}

// ───────────────────────────────────────────────────────────────
// GATT server port (registration, attribute table)
// ───────────────────────────────────────────────────────────────

pub trait GattsPort {
    fn register_app(&mut self, app_id: u16) -> Result<(), StackError>;

    fn set_local_mtu(&mut self, mtu: u16) -> Result<(), StackError>;

    /// Submit the whole descriptor set as one unit.
    fn create_attr_table(
        &mut self,
        interface: GattIf,
        table: &[AttrDescriptor],
    ) -> Result<(), StackError>;

    fn start_service(&mut self, service_handle: u16) -> Result<(), StackError>;
}

// ───────────────────────────────────────────────────────────────
// Notification port (used from the producer task, not the worker)
// ───────────────────────────────────────────────────────────────

pub trait NotifyPort {
    /// Send an unconfirmed notification of `value` at `handle`.
    fn send_notification(
        &mut self,
        interface: GattIf,
        conn_id: u16,
        handle: u16,
        value: &[u8],
    ) -> Result<(), StackError>;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from stack commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackError {
    /// The stack could not accept the command right now; retrying later
    /// is expected to succeed.
    Busy,
    /// The command is not valid in the stack's current state.
    InvalidState,
    /// Any other failure, with the raw `esp_err_t`.
    Failed(i32),
}

impl core::fmt::Display for StackError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Busy => write!(f, "stack busy"),
            Self::InvalidState => write!(f, "invalid stack state"),
            Self::Failed(code) => write!(f, "stack error 0x{:x}", code),
        }
    }
}
