//! RMS GATT service profile: registration, advertising, attribute table
//! bring-up and the single-client connection lifecycle.
//!
//! ```text
//!  NotRegistered ──[Register ok]──▶ AwaitingAdvData{ADV|SCAN_RSP}
//!        │                                │  both "data set" events ok
//!   [Register fail,                       ▼
//!    data set fail]                       │
//!        │                     CreatingTable (advertising started)
//!        ▼                                │  AttrTableCreated, 4 handles
//!      Failed ◀──[count mismatch]─────────┤
//!        ▲                                ▼
//!        └───────[start fail]──── StartingService ──[Start ok]──▶ Active
//! ```
//!
//! Connection tracking runs alongside bring-up: a connect event captures the
//! link, requests new connection parameters and stops advertising; a
//! disconnect restarts advertising.

pub mod table;

use std::sync::Arc;

use log::{debug, error, info, warn};

use crate::app::ports::{GapPort, GattsPort};
use crate::config::DeviceConfig;
use crate::events::{GATT_IF_NONE, GapEvent, GattIf, GattsEvent, PeerAddress, Status};
use crate::shared::SharedState;
use table::{AttrHandles, RMS_SERVICE};

// ───────────────────────────────────────────────────────────────
// Advertising and connection parameters
// ───────────────────────────────────────────────────────────────

pub const ADV_CONFIG_FLAG: u8 = 1 << 0;
pub const SCAN_RSP_CONFIG_FLAG: u8 = 1 << 1;

/// `ESP_BLE_ADV_FLAG_GEN_DISC`
pub const ADV_FLAG_GEN_DISC: u8 = 0x02;
/// `ESP_BLE_ADV_FLAG_BREDR_NOT_SPT`
pub const ADV_FLAG_BREDR_NOT_SPT: u8 = 0x04;

/// 128-bit form of the 16-bit service UUID, least significant byte first.
pub const SERVICE_UUID128: [u8; 16] = [
    0xfb, 0x34, 0x9b, 0x5f, 0x80, 0x00, 0x00, 0x80, 0x00, 0x10, 0x00, 0x00, 0xFF, 0x00, 0x00, 0x00,
];

/// Advertising or scan-response payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdvData {
    pub set_scan_rsp: bool,
    pub include_name: bool,
    pub include_txpower: bool,
    /// Preferred connection interval advertised to centrals (1.25 ms units).
    pub min_interval: u16,
    pub max_interval: u16,
    pub service_uuid: [u8; 16],
    pub flag: u8,
}

impl AdvData {
    fn new(config: &DeviceConfig, set_scan_rsp: bool) -> Self {
        Self {
            set_scan_rsp,
            include_name: true,
            include_txpower: true,
            min_interval: config.conn_int_min,
            max_interval: config.conn_int_max,
            service_uuid: SERVICE_UUID128,
            flag: ADV_FLAG_GEN_DISC | ADV_FLAG_BREDR_NOT_SPT,
        }
    }
}

/// Connectable undirected advertising on all channels, any scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdvParams {
    pub adv_int_min: u16,
    pub adv_int_max: u16,
}

/// Connection parameter update request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnParams {
    pub peer: PeerAddress,
    pub min_int: u16,
    pub max_int: u16,
    pub latency: u16,
    /// Supervision timeout, 10 ms units.
    pub timeout: u16,
}

// ───────────────────────────────────────────────────────────────
// States
// ───────────────────────────────────────────────────────────────

/// Externally visible service state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceConnectionState {
    NotRegistered,
    RegisteredAwaitingTable,
    TableActive,
    ClientConnected,
    /// A one-time bring-up step failed; the service will never start.
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BringUp {
    NotRegistered,
    /// Waiting for the "data set" confirmations still flagged in `pending`.
    AwaitingAdvData { pending: u8 },
    CreatingTable,
    StartingService,
    Active,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Connection {
    conn_id: u16,
    peer: PeerAddress,
}

// ───────────────────────────────────────────────────────────────
// GattProfile
// ───────────────────────────────────────────────────────────────

pub struct GattProfile {
    app_id: u16,
    device_name: heapless::String<{ crate::config::DEVICE_NAME_LEN }>,
    adv_data: AdvData,
    scan_rsp_data: AdvData,
    adv_params: AdvParams,
    conn_int_min: u16,
    conn_int_max: u16,
    conn_latency: u16,
    conn_timeout: u16,

    /// Assigned once on successful registration.
    interface: Option<GattIf>,
    bring_up: BringUp,
    connection: Option<Connection>,
    mtu: u16,
    shared: Arc<SharedState>,
}

impl GattProfile {
    pub fn new(config: &DeviceConfig, shared: Arc<SharedState>) -> Self {
        Self {
            app_id: config.app_id,
            device_name: config.device_name.clone(),
            adv_data: AdvData::new(config, false),
            scan_rsp_data: AdvData::new(config, true),
            adv_params: AdvParams {
                adv_int_min: config.adv_int_min,
                adv_int_max: config.adv_int_max,
            },
            conn_int_min: config.conn_int_min,
            conn_int_max: config.conn_int_max,
            conn_latency: config.conn_latency,
            conn_timeout: config.conn_timeout,
            interface: None,
            bring_up: BringUp::NotRegistered,
            connection: None,
            mtu: 23,
            shared,
        }
    }

    pub fn state(&self) -> ServiceConnectionState {
        match self.bring_up {
            BringUp::Failed => ServiceConnectionState::Failed,
            BringUp::NotRegistered => ServiceConnectionState::NotRegistered,
            BringUp::Active if self.connection.is_some() => ServiceConnectionState::ClientConnected,
            BringUp::Active => ServiceConnectionState::TableActive,
            BringUp::AwaitingAdvData { .. } | BringUp::CreatingTable | BringUp::StartingService => {
                ServiceConnectionState::RegisteredAwaitingTable
            }
        }
    }

    pub fn interface(&self) -> Option<GattIf> {
        self.interface
    }

    pub fn peer(&self) -> Option<PeerAddress> {
        self.connection.map(|c| c.peer)
    }

    pub fn mtu(&self) -> u16 {
        self.mtu
    }

    /// Whether an event tagged with `interface` is addressed to this profile.
    pub fn accepts(&self, interface: GattIf) -> bool {
        interface == GATT_IF_NONE || self.interface == Some(interface)
    }

    // ── GATTS events ─────────────────────────────────────────

    pub fn handle_gatts(
        &mut self,
        interface: GattIf,
        event: &GattsEvent,
        port: &mut (impl GapPort + GattsPort),
    ) {
        if let GattsEvent::Register { status, app_id } = event {
            self.on_register(interface, *status, *app_id, port);
            return;
        }
        if !self.accepts(interface) {
            debug!("GATT: event for if={} ignored (ours={:?})", interface, self.interface);
            return;
        }

        match event {
            GattsEvent::Register { .. } => {}
            GattsEvent::Read { conn_id, handle } => {
                info!("GATT: read (conn_id={}, handle={})", conn_id, handle);
            }
            GattsEvent::Mtu { conn_id, mtu } => {
                info!("GATT: MTU {} (conn_id={})", mtu, conn_id);
                self.mtu = *mtu;
            }
            GattsEvent::Conf { status } => {
                info!("GATT: confirm, status={}", status.0);
            }
            GattsEvent::AttrTableCreated { status, handles } => {
                self.on_table_created(*status, handles, port);
            }
            GattsEvent::Start {
                status,
                service_handle,
            } => self.on_service_started(*status, *service_handle),
            GattsEvent::Connect { conn_id, peer } => self.on_connect(*conn_id, *peer, port),
            GattsEvent::Disconnect { reason, peer } => self.on_disconnect(*reason, *peer, port),
        }
    }

    fn on_register(
        &mut self,
        interface: GattIf,
        status: Status,
        app_id: u16,
        port: &mut (impl GapPort + GattsPort),
    ) {
        if app_id != self.app_id {
            debug!("GATT: registration for app {:04x} is not ours", app_id);
            return;
        }
        if let Some(ours) = self.interface {
            warn!("GATT: duplicate registration (if={}, ours={}) ignored", interface, ours);
            return;
        }
        if !status.is_ok() {
            error!("GATT: register app failed, app_id {:04x}, status {}", app_id, status.0);
            self.bring_up = BringUp::Failed;
            return;
        }

        info!("GATT: app {:04x} registered (if={})", app_id, interface);
        self.interface = Some(interface);
        self.shared.set_interface(interface);

        if let Err(e) = port.set_device_name(&self.device_name) {
            error!("GATT: set device name failed: {}", e);
        }
        if let Err(e) = port.config_adv_data(&self.adv_data) {
            error!("GATT: config adv data failed: {}", e);
        }
        if let Err(e) = port.config_adv_data(&self.scan_rsp_data) {
            error!("GATT: config scan response data failed: {}", e);
        }
        self.bring_up = BringUp::AwaitingAdvData {
            pending: ADV_CONFIG_FLAG | SCAN_RSP_CONFIG_FLAG,
        };
    }

    fn on_table_created(
        &mut self,
        status: Status,
        handles: &[u16],
        port: &mut (impl GapPort + GattsPort),
    ) {
        if self.bring_up != BringUp::CreatingTable {
            warn!("GATT: unexpected table-created event in {:?}", self.bring_up);
            return;
        }
        if !status.is_ok() {
            error!("GATT: create attribute table failed, status 0x{:x}", status.0);
            self.bring_up = BringUp::Failed;
            return;
        }
        let table = match AttrHandles::from_created(handles) {
            Ok(t) => t,
            Err(e) => {
                error!(
                    "GATT: {} (got {}, expected {})",
                    e,
                    handles.len(),
                    table::ATTR_COUNT
                );
                self.bring_up = BringUp::Failed;
                return;
            }
        };
        if !self.shared.set_handles(table) {
            error!("GATT: attribute handles already stored");
            self.bring_up = BringUp::Failed;
            return;
        }
        info!("GATT: attribute table created, {} handles", handles.len());

        match port.start_service(table.service()) {
            Ok(()) => self.bring_up = BringUp::StartingService,
            Err(e) => {
                error!("GATT: start service failed: {}", e);
                self.bring_up = BringUp::Failed;
            }
        }
    }

    fn on_service_started(&mut self, status: Status, service_handle: u16) {
        info!(
            "GATT: service start, status {}, service_handle {}",
            status.0, service_handle
        );
        if self.bring_up != BringUp::StartingService {
            warn!("GATT: unexpected service start in {:?}", self.bring_up);
            return;
        }
        if status.is_ok() {
            self.bring_up = BringUp::Active;
            self.shared.set_table_active(true);
        } else {
            error!("GATT: service failed to start");
            self.bring_up = BringUp::Failed;
        }
    }

    fn on_connect(&mut self, conn_id: u16, peer: PeerAddress, port: &mut impl GapPort) {
        info!("GATT: client {} connected (conn_id={})", peer, conn_id);
        self.connection = Some(Connection { conn_id, peer });
        self.shared.set_connected(conn_id);

        let params = ConnParams {
            peer,
            min_int: self.conn_int_min,
            max_int: self.conn_int_max,
            latency: self.conn_latency,
            timeout: self.conn_timeout,
        };
        if let Err(e) = port.update_conn_params(&params) {
            warn!("GATT: connection parameter update failed: {}", e);
        }
        // Single client: no further connections while this one is up.
        if let Err(e) = port.stop_advertising() {
            warn!("GATT: stop advertising failed: {}", e);
        }
    }

    fn on_disconnect(&mut self, reason: u16, peer: PeerAddress, port: &mut impl GapPort) {
        info!("GATT: client {} disconnected, reason 0x{:x}", peer, reason);
        self.connection = None;
        self.shared.clear_connected();
        self.mtu = 23;

        if self.bring_up == BringUp::Failed {
            return;
        }
        if let Err(e) = port.start_advertising(&self.adv_params) {
            warn!("GATT: restart advertising failed: {}", e);
        }
    }

    // ── GAP events ───────────────────────────────────────────

    pub fn handle_gap(&mut self, event: &GapEvent, port: &mut (impl GapPort + GattsPort)) {
        match event {
            GapEvent::AdvDataSet { status } => self.on_adv_data_set(ADV_CONFIG_FLAG, *status, port),
            GapEvent::ScanRspDataSet { status } => {
                self.on_adv_data_set(SCAN_RSP_CONFIG_FLAG, *status, port);
            }
            GapEvent::AdvStartComplete { status } => {
                if status.is_ok() {
                    info!("GAP: advertising started");
                } else {
                    error!("GAP: advertising start failed, status {}", status.0);
                }
            }
            GapEvent::AdvStopComplete { status } => {
                if status.is_ok() {
                    info!("GAP: advertising stopped");
                } else {
                    error!("GAP: advertising stop failed, status {}", status.0);
                }
            }
            GapEvent::ConnParamsUpdated {
                status,
                conn_int,
                latency,
                timeout,
            } => {
                info!(
                    "GAP: conn params updated, status {}, conn_int {}, latency {}, timeout {}",
                    status.0, conn_int, latency, timeout
                );
            }
        }
    }

    fn on_adv_data_set(&mut self, flag: u8, status: Status, port: &mut (impl GapPort + GattsPort)) {
        let BringUp::AwaitingAdvData { pending } = self.bring_up else {
            debug!("GAP: adv data set (flag {}) outside bring-up", flag);
            return;
        };
        if !status.is_ok() {
            error!("GAP: adv data set (flag {}) failed, status {}", flag, status.0);
            self.bring_up = BringUp::Failed;
            return;
        }
        let pending = pending & !flag;
        if pending != 0 {
            self.bring_up = BringUp::AwaitingAdvData { pending };
            return;
        }

        if let Err(e) = port.start_advertising(&self.adv_params) {
            error!("GAP: start advertising failed: {}", e);
        }
        let Some(interface) = self.interface else {
            self.bring_up = BringUp::Failed;
            return;
        };
        match port.create_attr_table(interface, &RMS_SERVICE) {
            Ok(()) => self.bring_up = BringUp::CreatingTable,
            Err(e) => {
                error!("GATT: create attribute table request failed: {}", e);
                self.bring_up = BringUp::Failed;
            }
        }
    }
}
