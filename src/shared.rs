//! Process-wide readiness flags and the telemetry byte.
//!
//! Shared between the dispatcher worker (which owns the service state
//! machine) and the RMS producer task.  Every field has a single writer:
//!
//! | Field          | Writer            | Readers          |
//! |----------------|-------------------|------------------|
//! | `telemetry`    | producer          | worker, notify   |
//! | `connected`    | service profile   | producer         |
//! | `table_active` | service profile   | producer         |
//! | `conn_id`      | service profile   | producer         |
//! | `interface`    | service profile   | producer         |
//! | `handles`      | service profile (once) | producer    |
//! | `streaming`    | transport machine | diagnostics      |
//!
//! A stale flag for one scheduling quantum is harmless, so plain `Relaxed`
//! atomics suffice.  The handle table is write-once.

use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU16, Ordering};

use log::{debug, warn};

use crate::app::ports::NotifyPort;
use crate::events::{GATT_IF_NONE, GattIf};
use crate::gatt::table::AttrHandles;

pub struct SharedState {
    telemetry: AtomicU8,
    connected: AtomicBool,
    table_active: AtomicBool,
    conn_id: AtomicU16,
    interface: AtomicU8,
    handles: OnceLock<AttrHandles>,
    streaming: AtomicBool,
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedState {
    pub fn new() -> Self {
        Self {
            telemetry: AtomicU8::new(0),
            connected: AtomicBool::new(false),
            table_active: AtomicBool::new(false),
            conn_id: AtomicU16::new(0),
            interface: AtomicU8::new(GATT_IF_NONE),
            handles: OnceLock::new(),
            streaming: AtomicBool::new(false),
        }
    }

    // ── Telemetry ────────────────────────────────────────────

    pub fn telemetry(&self) -> u8 {
        self.telemetry.load(Ordering::Relaxed)
    }

    pub fn set_telemetry(&self, value: u8) {
        self.telemetry.store(value, Ordering::Relaxed);
    }

    // ── Link flags ───────────────────────────────────────────

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    pub fn set_connected(&self, conn_id: u16) {
        self.conn_id.store(conn_id, Ordering::Relaxed);
        self.connected.store(true, Ordering::Relaxed);
    }

    pub fn clear_connected(&self) {
        self.connected.store(false, Ordering::Relaxed);
    }

    pub fn conn_id(&self) -> u16 {
        self.conn_id.load(Ordering::Relaxed)
    }

    pub fn is_table_active(&self) -> bool {
        self.table_active.load(Ordering::Relaxed)
    }

    pub fn set_table_active(&self, active: bool) {
        self.table_active.store(active, Ordering::Relaxed);
    }

    pub fn interface(&self) -> GattIf {
        self.interface.load(Ordering::Relaxed)
    }

    pub fn set_interface(&self, interface: GattIf) {
        self.interface.store(interface, Ordering::Relaxed);
    }

    /// Store the attribute handles.  Returns `false` if they were already set.
    pub fn set_handles(&self, handles: AttrHandles) -> bool {
        self.handles.set(handles).is_ok()
    }

    pub fn handles(&self) -> Option<AttrHandles> {
        self.handles.get().copied()
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming.load(Ordering::Relaxed)
    }

    pub fn set_streaming(&self, streaming: bool) {
        self.streaming.store(streaming, Ordering::Relaxed);
    }

    // ── Notification ─────────────────────────────────────────

    /// Whether a notification would be sent right now.
    pub fn can_notify(&self) -> bool {
        self.is_connected() && self.is_table_active() && self.handles.get().is_some()
    }

    /// Notify the connected client of `value`.
    ///
    /// Does nothing unless a client is connected and the table is active.
    /// A failed send is logged and dropped; the next period retries.
    /// Returns whether the stack accepted the notification.
    pub fn notify(&self, port: &mut impl NotifyPort, value: u8) -> bool {
        if !self.is_connected() || !self.is_table_active() {
            debug!("GATT: notify skipped, no active client");
            return false;
        }
        let Some(handles) = self.handles() else {
            return false;
        };
        match port.send_notification(self.interface(), self.conn_id(), handles.value(), &[value]) {
            Ok(()) => true,
            Err(e) => {
                warn!("GATT: notify of {} failed: {}", value, e);
                false
            }
        }
    }
}
