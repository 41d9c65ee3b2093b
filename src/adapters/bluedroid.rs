//! Bluedroid adapter.
//!
//! Implements [`TransportPort`], [`GapPort`], [`GattsPort`] and
//! [`NotifyPort`] on top of the ESP-IDF Bluedroid host, and bridges the
//! stack's C callbacks into the dispatcher.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: raw `esp_idf_svc::sys` calls.  Callbacks
//!   copy their parameters into an [`Event`] and dispatch it; they never
//!   touch the state machines directly.
//! - **all other targets**: simulation stubs that log and succeed.
//!
//! ## Callback bridging
//!
//! Bluedroid callbacks are plain `extern "C"` functions with no user
//! pointer, so the dispatch handle and the sample source are installed once
//! into statics by [`install`] before any callback is registered.

use std::sync::{Arc, OnceLock};

use log::{info, warn};

use crate::app::ports::{GapPort, GattsPort, NotifyPort, StackError, TransportPort};
use crate::config::DEVICE_NAME_LEN;
use crate::dispatcher::DispatchHandle;
use crate::error::Error;
use crate::events::{Event, GattIf, MediaCtrl, PeerAddress};
use crate::fsm::context::ScanMode;
use crate::gatt::table::AttrDescriptor;
use crate::gatt::{AdvData, AdvParams, ConnParams};
use crate::oscillator::SampleSource;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

// ───────────────────────────────────────────────────────────────
// Callback statics
// ───────────────────────────────────────────────────────────────

static DISPATCH: OnceLock<DispatchHandle> = OnceLock::new();
static SOURCE: OnceLock<Arc<SampleSource>> = OnceLock::new();

/// Install the dispatch handle and sample source used by the stack
/// callbacks.  Must run before the callbacks are registered; a second call
/// is rejected.
pub fn install(handle: DispatchHandle, source: Arc<SampleSource>) -> Result<(), Error> {
    DISPATCH
        .set(handle)
        .map_err(|_| Error::Init("dispatch handle already installed"))?;
    SOURCE
        .set(source)
        .map_err(|_| Error::Init("sample source already installed"))?;
    Ok(())
}

/// Forward a stack event to the worker.  Failures are logged; the event is
/// lost and the callback returns normally.
fn forward(event: Event) {
    match DISPATCH.get() {
        Some(handle) => {
            if let Err(e) = handle.dispatch(event) {
                warn!("Bluedroid: event dropped ({})", e);
            }
        }
        None => warn!("Bluedroid: {} before dispatcher install", event.name()),
    }
}

// ───────────────────────────────────────────────────────────────
// Adapter
// ───────────────────────────────────────────────────────────────

/// Stateless handle onto the Bluetooth host.  Cloned for each task that
/// issues commands.
#[derive(Debug, Clone)]
pub struct BluedroidAdapter {
    device_name: heapless::String<DEVICE_NAME_LEN>,
}

impl BluedroidAdapter {
    pub fn new(device_name: &heapless::String<DEVICE_NAME_LEN>) -> Self {
        Self {
            device_name: device_name.clone(),
        }
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }
}

/// Map an `esp_err_t` onto [`StackError`].
pub fn check(ret: i32) -> Result<(), StackError> {
    const ESP_OK: i32 = 0;
    const ESP_ERR_NO_MEM: i32 = 0x101;
    const ESP_ERR_INVALID_STATE: i32 = 0x103;
    const ESP_ERR_TIMEOUT: i32 = 0x107;
    match ret {
        ESP_OK => Ok(()),
        ESP_ERR_INVALID_STATE => Err(StackError::InvalidState),
        ESP_ERR_NO_MEM | ESP_ERR_TIMEOUT => Err(StackError::Busy),
        other => Err(StackError::Failed(other)),
    }
}

// ───────────────────────────────────────────────────────────────
// Stack bring-up
// ───────────────────────────────────────────────────────────────

/// Initialise and enable the dual-mode controller and the Bluedroid host.
#[cfg(target_os = "espidf")]
pub fn init_stack() -> Result<(), Error> {
    // SAFETY: called once from the main task after NVS is up and before
    // any other Bluetooth API.
    unsafe {
        let mut bt_cfg = esp_bt_controller_config_t::default();
        let ret = esp_bt_controller_init(&mut bt_cfg);
        if ret != ESP_OK {
            log::error!("Bluedroid: controller init failed ({})", ret);
            return Err(Error::Init("bt controller init"));
        }
        let ret = esp_bt_controller_enable(esp_bt_mode_t_ESP_BT_MODE_BTDM);
        if ret != ESP_OK {
            log::error!("Bluedroid: controller enable failed ({})", ret);
            return Err(Error::Init("bt controller enable"));
        }
        let ret = esp_bluedroid_init();
        if ret != ESP_OK {
            log::error!("Bluedroid: host init failed ({})", ret);
            return Err(Error::Init("bluedroid init"));
        }
        let ret = esp_bluedroid_enable();
        if ret != ESP_OK {
            log::error!("Bluedroid: host enable failed ({})", ret);
            return Err(Error::Init("bluedroid enable"));
        }
    }
    info!("Bluedroid: controller (dual mode) and host enabled");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_stack() -> Result<(), Error> {
    info!("Bluedroid(sim): controller and host enabled");
    Ok(())
}

/// Register the low-energy GAP and GATT server callbacks.
#[cfg(target_os = "espidf")]
pub fn register_le_callbacks() -> Result<(), Error> {
    // SAFETY: plain registration calls; the callbacks only read `param`
    // for the duration of the call.
    unsafe {
        if esp_ble_gatts_register_callback(Some(gatts_cb)) != ESP_OK {
            return Err(Error::Init("gatts callback register"));
        }
        if esp_ble_gap_register_callback(Some(ble_gap_cb)) != ESP_OK {
            return Err(Error::Init("gap callback register"));
        }
    }
    info!("Bluedroid: GATTS and GAP callbacks registered");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn register_le_callbacks() -> Result<(), Error> {
    info!("Bluedroid(sim): GATTS and GAP callbacks registered");
    Ok(())
}

// ───────────────────────────────────────────────────────────────
// ESP-IDF callbacks
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
mod callbacks {
    use super::*;
    use crate::events::{
        AckStatus, AudioState, ConnectionState, GapEvent, GattsEvent, Status, TransportEvent,
    };

    fn connection_state(raw: esp_a2d_connection_state_t) -> Option<ConnectionState> {
        match raw {
            esp_a2d_connection_state_t_ESP_A2D_CONNECTION_STATE_DISCONNECTED => {
                Some(ConnectionState::Disconnected)
            }
            esp_a2d_connection_state_t_ESP_A2D_CONNECTION_STATE_CONNECTING => {
                Some(ConnectionState::Connecting)
            }
            esp_a2d_connection_state_t_ESP_A2D_CONNECTION_STATE_CONNECTED => {
                Some(ConnectionState::Connected)
            }
            esp_a2d_connection_state_t_ESP_A2D_CONNECTION_STATE_DISCONNECTING => {
                Some(ConnectionState::Disconnecting)
            }
            _ => None,
        }
    }

    fn media_ctrl(raw: esp_a2d_media_ctrl_t) -> Option<MediaCtrl> {
        match raw {
            esp_a2d_media_ctrl_t_ESP_A2D_MEDIA_CTRL_CHECK_SRC_RDY => Some(MediaCtrl::CheckSrcReady),
            esp_a2d_media_ctrl_t_ESP_A2D_MEDIA_CTRL_START => Some(MediaCtrl::Start),
            esp_a2d_media_ctrl_t_ESP_A2D_MEDIA_CTRL_STOP => Some(MediaCtrl::Stop),
            esp_a2d_media_ctrl_t_ESP_A2D_MEDIA_CTRL_SUSPEND => Some(MediaCtrl::Suspend),
            _ => None,
        }
    }

    pub(super) unsafe extern "C" fn a2d_cb(event: esp_a2d_cb_event_t, param: *mut esp_a2d_cb_param_t) {
        if param.is_null() {
            return;
        }
        // SAFETY: Bluedroid passes a valid parameter block for the
        // duration of the callback; each arm reads the union member that
        // matches `event`.
        let ev = unsafe {
            match event {
                esp_a2d_cb_event_t_ESP_A2D_CONNECTION_STATE_EVT => {
                    let p = &(*param).conn_stat;
                    connection_state(p.state).map(|state| TransportEvent::ConnectionState {
                        state,
                        peer: PeerAddress(p.remote_bda),
                    })
                }
                esp_a2d_cb_event_t_ESP_A2D_AUDIO_STATE_EVT => {
                    let p = &(*param).audio_stat;
                    let state = if p.state == esp_a2d_audio_state_t_ESP_A2D_AUDIO_STATE_STARTED {
                        AudioState::Started
                    } else {
                        AudioState::Stopped
                    };
                    Some(TransportEvent::AudioState(state))
                }
                esp_a2d_cb_event_t_ESP_A2D_AUDIO_CFG_EVT => Some(TransportEvent::AudioConfig),
                esp_a2d_cb_event_t_ESP_A2D_MEDIA_CTRL_ACK_EVT => {
                    let p = &(*param).media_ctrl_stat;
                    let status = if p.status == esp_a2d_media_ctrl_ack_t_ESP_A2D_MEDIA_CTRL_ACK_SUCCESS {
                        AckStatus::Success
                    } else {
                        AckStatus::Failure
                    };
                    media_ctrl(p.cmd).map(|cmd| TransportEvent::MediaCtrlAck { cmd, status })
                }
                _ => None,
            }
        };
        match ev {
            Some(ev) => forward(Event::Transport(ev)),
            None => log::debug!("Bluedroid: unhandled A2DP evt {}", event),
        }
    }

    pub(super) unsafe extern "C" fn a2d_data_cb(data: *mut u8, len: i32) -> i32 {
        if data.is_null() || len <= 0 {
            return 0;
        }
        let Some(source) = SOURCE.get() else {
            return 0;
        };
        // SAFETY: the stack hands us a writable buffer of `len` bytes.
        let buf = unsafe { core::slice::from_raw_parts_mut(data, len as usize) };
        source.on_data_request(buf) as i32
    }

    pub(super) unsafe extern "C" fn bt_gap_cb(
        event: esp_bt_gap_cb_event_t,
        param: *mut esp_bt_gap_cb_param_t,
    ) {
        if param.is_null() || event != esp_bt_gap_cb_event_t_ESP_BT_GAP_AUTH_CMPL_EVT {
            return;
        }
        // SAFETY: `auth_cmpl` is the active member for AUTH_CMPL_EVT.
        let p = unsafe { &(*param).auth_cmpl };
        forward(Event::Transport(TransportEvent::AuthComplete {
            success: p.stat == esp_bt_status_t_ESP_BT_STATUS_SUCCESS,
            peer: PeerAddress(p.bda),
        }));
    }

    pub(super) unsafe extern "C" fn ble_gap_cb(
        event: esp_gap_ble_cb_event_t,
        param: *mut esp_ble_gap_cb_param_t,
    ) {
        if param.is_null() {
            return;
        }
        // SAFETY: as in `a2d_cb`, one union member per event.
        let ev = unsafe {
            match event {
                esp_gap_ble_cb_event_t_ESP_GAP_BLE_ADV_DATA_SET_COMPLETE_EVT => {
                    Some(GapEvent::AdvDataSet {
                        status: Status((*param).adv_data_cmpl.status as u8),
                    })
                }
                esp_gap_ble_cb_event_t_ESP_GAP_BLE_SCAN_RSP_DATA_SET_COMPLETE_EVT => {
                    Some(GapEvent::ScanRspDataSet {
                        status: Status((*param).scan_rsp_data_cmpl.status as u8),
                    })
                }
                esp_gap_ble_cb_event_t_ESP_GAP_BLE_ADV_START_COMPLETE_EVT => {
                    Some(GapEvent::AdvStartComplete {
                        status: Status((*param).adv_start_cmpl.status as u8),
                    })
                }
                esp_gap_ble_cb_event_t_ESP_GAP_BLE_ADV_STOP_COMPLETE_EVT => {
                    Some(GapEvent::AdvStopComplete {
                        status: Status((*param).adv_stop_cmpl.status as u8),
                    })
                }
                esp_gap_ble_cb_event_t_ESP_GAP_BLE_UPDATE_CONN_PARAMS_EVT => {
                    let p = &(*param).update_conn_params;
                    Some(GapEvent::ConnParamsUpdated {
                        status: Status(p.status as u8),
                        conn_int: p.conn_int,
                        latency: p.latency,
                        timeout: p.timeout,
                    })
                }
                _ => None,
            }
        };
        if let Some(ev) = ev {
            forward(Event::Gap(ev));
        }
    }

    pub(super) unsafe extern "C" fn gatts_cb(
        event: esp_gatts_cb_event_t,
        gatts_if: esp_gatt_if_t,
        param: *mut esp_ble_gatts_cb_param_t,
    ) {
        if param.is_null() {
            return;
        }
        // SAFETY: as in `a2d_cb`; `handles` points at `num_handle` entries.
        let ev = unsafe {
            match event {
                esp_gatts_cb_event_t_ESP_GATTS_REG_EVT => {
                    let p = &(*param).reg;
                    Some(GattsEvent::Register {
                        status: Status(p.status as u8),
                        app_id: p.app_id,
                    })
                }
                esp_gatts_cb_event_t_ESP_GATTS_READ_EVT => {
                    let p = &(*param).read;
                    Some(GattsEvent::Read {
                        conn_id: p.conn_id,
                        handle: p.handle,
                    })
                }
                esp_gatts_cb_event_t_ESP_GATTS_MTU_EVT => {
                    let p = &(*param).mtu;
                    Some(GattsEvent::Mtu {
                        conn_id: p.conn_id,
                        mtu: p.mtu,
                    })
                }
                esp_gatts_cb_event_t_ESP_GATTS_CONF_EVT => Some(GattsEvent::Conf {
                    status: Status((*param).conf.status as u8),
                }),
                esp_gatts_cb_event_t_ESP_GATTS_START_EVT => {
                    let p = &(*param).start;
                    Some(GattsEvent::Start {
                        status: Status(p.status as u8),
                        service_handle: p.service_handle,
                    })
                }
                esp_gatts_cb_event_t_ESP_GATTS_CONNECT_EVT => {
                    let p = &(*param).connect;
                    Some(GattsEvent::Connect {
                        conn_id: p.conn_id,
                        peer: PeerAddress(p.remote_bda),
                    })
                }
                esp_gatts_cb_event_t_ESP_GATTS_DISCONNECT_EVT => {
                    let p = &(*param).disconnect;
                    Some(GattsEvent::Disconnect {
                        reason: p.reason as u16,
                        peer: PeerAddress(p.remote_bda),
                    })
                }
                esp_gatts_cb_event_t_ESP_GATTS_CREAT_ATTR_TAB_EVT => {
                    let p = &(*param).add_attr_tab;
                    let mut handles = heapless::Vec::new();
                    if !p.handles.is_null() {
                        let raw = core::slice::from_raw_parts(p.handles, p.num_handle as usize);
                        // Overflow keeps the count wrong, which is reported downstream.
                        for &h in raw.iter().take(handles.capacity()) {
                            let _ = handles.push(h);
                        }
                    }
                    Some(GattsEvent::AttrTableCreated {
                        status: Status(p.status as u8),
                        handles,
                    })
                }
                _ => None,
            }
        };
        match ev {
            Some(event) => forward(Event::Gatts {
                interface: gatts_if,
                event,
            }),
            None => log::debug!("Bluedroid: unhandled GATTS evt {}", event),
        }
    }
}

#[cfg(target_os = "espidf")]
use callbacks::{a2d_cb, a2d_data_cb, ble_gap_cb, bt_gap_cb, gatts_cb};

// ───────────────────────────────────────────────────────────────
// Port implementations (ESP-IDF)
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
fn c_name(name: &str) -> Result<std::ffi::CString, StackError> {
    std::ffi::CString::new(name).map_err(|_| StackError::Failed(ESP_ERR_INVALID_ARG as i32))
}

#[cfg(target_os = "espidf")]
impl TransportPort for BluedroidAdapter {
    fn init_source(&mut self) -> Result<(), StackError> {
        let name = c_name(&self.device_name)?;
        // SAFETY: `name` outlives the call; the callbacks are `'static`.
        unsafe {
            check(esp_bt_dev_set_device_name(name.as_ptr()))?;
            check(esp_bt_gap_register_callback(Some(bt_gap_cb)))?;
            check(esp_a2d_register_callback(Some(a2d_cb)))?;
            check(esp_a2d_source_register_data_callback(Some(a2d_data_cb)))?;
            check(esp_a2d_source_init())?;
        }
        info!("Bluedroid: A2DP source initialised as '{}'", self.device_name);
        Ok(())
    }

    fn set_scan_mode(&mut self, mode: ScanMode) -> Result<(), StackError> {
        let (conn, disc) = match mode {
            ScanMode::None => (
                esp_bt_connection_mode_t_ESP_BT_NON_CONNECTABLE,
                esp_bt_discovery_mode_t_ESP_BT_NON_DISCOVERABLE,
            ),
            ScanMode::ConnectableDiscoverable => (
                esp_bt_connection_mode_t_ESP_BT_CONNECTABLE,
                esp_bt_discovery_mode_t_ESP_BT_GENERAL_DISCOVERABLE,
            ),
        };
        // SAFETY: value-only arguments.
        check(unsafe { esp_bt_gap_set_scan_mode(conn, disc) })
    }

    fn media_ctrl(&mut self, cmd: MediaCtrl) -> Result<(), StackError> {
        let raw = match cmd {
            MediaCtrl::CheckSrcReady => esp_a2d_media_ctrl_t_ESP_A2D_MEDIA_CTRL_CHECK_SRC_RDY,
            MediaCtrl::Start => esp_a2d_media_ctrl_t_ESP_A2D_MEDIA_CTRL_START,
            MediaCtrl::Stop => esp_a2d_media_ctrl_t_ESP_A2D_MEDIA_CTRL_STOP,
            MediaCtrl::Suspend => esp_a2d_media_ctrl_t_ESP_A2D_MEDIA_CTRL_SUSPEND,
        };
        // SAFETY: value-only argument.
        check(unsafe { esp_a2d_media_ctrl(raw) })
    }

    fn connect(&mut self, peer: PeerAddress) -> Result<(), StackError> {
        let mut bda = peer.0;
        // SAFETY: the stack copies the address before returning.
        check(unsafe { esp_a2d_source_connect(bda.as_mut_ptr()) })
    }

    fn disconnect(&mut self, peer: PeerAddress) -> Result<(), StackError> {
        let mut bda = peer.0;
        // SAFETY: as for `connect`.
        check(unsafe { esp_a2d_source_disconnect(bda.as_mut_ptr()) })
    }
}

#[cfg(target_os = "espidf")]
impl GapPort for BluedroidAdapter {
    fn set_device_name(&mut self, name: &str) -> Result<(), StackError> {
        let name = c_name(name)?;
        // SAFETY: `name` outlives the call.
        check(unsafe { esp_ble_gap_set_device_name(name.as_ptr()) })
    }

    fn config_adv_data(&mut self, data: &AdvData) -> Result<(), StackError> {
        let mut uuid = data.service_uuid;
        // SAFETY: zeroed is a valid "no manufacturer/service data" payload;
        // the stack deep-copies `uuid` before returning.
        unsafe {
            let mut adv = esp_ble_adv_data_t {
                set_scan_rsp: data.set_scan_rsp,
                include_name: data.include_name,
                include_txpower: data.include_txpower,
                min_interval: i32::from(data.min_interval),
                max_interval: i32::from(data.max_interval),
                appearance: 0,
                service_uuid_len: uuid.len() as u16,
                p_service_uuid: uuid.as_mut_ptr(),
                flag: data.flag,
                ..core::mem::zeroed()
            };
            check(esp_ble_gap_config_adv_data(&mut adv))
        }
    }

    fn start_advertising(&mut self, params: &AdvParams) -> Result<(), StackError> {
        // SAFETY: the stack copies the parameter block.
        unsafe {
            let mut adv_params = esp_ble_adv_params_t {
                adv_int_min: params.adv_int_min,
                adv_int_max: params.adv_int_max,
                adv_type: esp_ble_adv_type_t_ADV_TYPE_IND,
                own_addr_type: esp_ble_addr_type_t_BLE_ADDR_TYPE_PUBLIC,
                channel_map: esp_ble_adv_channel_t_ADV_CHNL_ALL,
                adv_filter_policy: esp_ble_adv_filter_t_ADV_FILTER_ALLOW_SCAN_ANY_CON_ANY,
                ..core::mem::zeroed()
            };
            check(esp_ble_gap_start_advertising(&mut adv_params))
        }
    }

    fn stop_advertising(&mut self) -> Result<(), StackError> {
        // SAFETY: no arguments.
        check(unsafe { esp_ble_gap_stop_advertising() })
    }

    fn update_conn_params(&mut self, params: &ConnParams) -> Result<(), StackError> {
        let mut update = esp_ble_conn_update_params_t {
            bda: params.peer.0,
            min_int: params.min_int,
            max_int: params.max_int,
            latency: params.latency,
            timeout: params.timeout,
        };
        // SAFETY: the stack copies the parameter block.
        check(unsafe { esp_ble_gap_update_conn_params(&mut update) })
    }
}

#[cfg(target_os = "espidf")]
impl GattsPort for BluedroidAdapter {
    fn register_app(&mut self, app_id: u16) -> Result<(), StackError> {
        // SAFETY: value-only argument.
        check(unsafe { esp_ble_gatts_app_register(app_id) })
    }

    fn set_local_mtu(&mut self, mtu: u16) -> Result<(), StackError> {
        // SAFETY: value-only argument.
        check(unsafe { esp_ble_gatt_set_local_mtu(mtu) })
    }

    fn create_attr_table(
        &mut self,
        interface: GattIf,
        table: &[AttrDescriptor],
    ) -> Result<(), StackError> {
        // The stack wants mutable pointers; it deep-copies everything
        // before returning, so locals are enough.
        let mut uuids: Vec<[u8; 2]> = table.iter().map(|a| a.uuid.to_le_bytes()).collect();
        let mut values: Vec<Vec<u8>> = table.iter().map(|a| a.value.to_vec()).collect();
        let db: Vec<esp_gatts_attr_db_t> = table
            .iter()
            .zip(uuids.iter_mut())
            .zip(values.iter_mut())
            .map(|((attr, uuid), value)| esp_gatts_attr_db_t {
                attr_control: esp_attr_control_t {
                    auto_rsp: ESP_GATT_AUTO_RSP as u8,
                },
                att_desc: esp_attr_desc_t {
                    uuid_length: ESP_UUID_LEN_16 as u16,
                    uuid_p: uuid.as_mut_ptr(),
                    perm: attr.perm,
                    max_length: attr.max_len,
                    length: value.len() as u16,
                    value: value.as_mut_ptr(),
                },
            })
            .collect();
        // SAFETY: `db`, `uuids` and `values` outlive the call.
        check(unsafe {
            esp_ble_gatts_create_attr_tab(
                db.as_ptr(),
                interface,
                db.len() as _,
                crate::gatt::table::SERVICE_INST_ID,
            )
        })
    }

    fn start_service(&mut self, service_handle: u16) -> Result<(), StackError> {
        // SAFETY: value-only argument.
        check(unsafe { esp_ble_gatts_start_service(service_handle) })
    }
}

#[cfg(target_os = "espidf")]
impl NotifyPort for BluedroidAdapter {
    fn send_notification(
        &mut self,
        interface: GattIf,
        conn_id: u16,
        handle: u16,
        value: &[u8],
    ) -> Result<(), StackError> {
        let mut buf = value.to_vec();
        // SAFETY: `buf` outlives the call; the stack copies it.
        check(unsafe {
            esp_ble_gatts_send_indicate(
                interface,
                conn_id,
                handle,
                buf.len() as u16,
                buf.as_mut_ptr(),
                false,
            )
        })
    }
}

// ───────────────────────────────────────────────────────────────
// Port implementations (simulation)
// ───────────────────────────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
impl TransportPort for BluedroidAdapter {
    fn init_source(&mut self) -> Result<(), StackError> {
        info!("Bluedroid(sim): A2DP source initialised as '{}'", self.device_name);
        Ok(())
    }

    fn set_scan_mode(&mut self, mode: ScanMode) -> Result<(), StackError> {
        info!("Bluedroid(sim): scan mode {:?}", mode);
        Ok(())
    }

    fn media_ctrl(&mut self, cmd: MediaCtrl) -> Result<(), StackError> {
        info!("Bluedroid(sim): media ctrl {:?}", cmd);
        Ok(())
    }

    fn connect(&mut self, peer: PeerAddress) -> Result<(), StackError> {
        info!("Bluedroid(sim): connect {}", peer);
        Ok(())
    }

    fn disconnect(&mut self, peer: PeerAddress) -> Result<(), StackError> {
        info!("Bluedroid(sim): disconnect {}", peer);
        Ok(())
    }
}

#[cfg(not(target_os = "espidf"))]
impl GapPort for BluedroidAdapter {
    fn set_device_name(&mut self, name: &str) -> Result<(), StackError> {
        info!("Bluedroid(sim): LE name '{}'", name);
        Ok(())
    }

    fn config_adv_data(&mut self, data: &AdvData) -> Result<(), StackError> {
        info!("Bluedroid(sim): adv data (scan_rsp={})", data.set_scan_rsp);
        Ok(())
    }

    fn start_advertising(&mut self, params: &AdvParams) -> Result<(), StackError> {
        info!(
            "Bluedroid(sim): advertising 0x{:x}-0x{:x}",
            params.adv_int_min, params.adv_int_max
        );
        Ok(())
    }

    fn stop_advertising(&mut self) -> Result<(), StackError> {
        info!("Bluedroid(sim): advertising stopped");
        Ok(())
    }

    fn update_conn_params(&mut self, params: &ConnParams) -> Result<(), StackError> {
        info!("Bluedroid(sim): conn params for {}", params.peer);
        Ok(())
    }
}

#[cfg(not(target_os = "espidf"))]
impl GattsPort for BluedroidAdapter {
    fn register_app(&mut self, app_id: u16) -> Result<(), StackError> {
        info!("Bluedroid(sim): register app 0x{:x}", app_id);
        Ok(())
    }

    fn set_local_mtu(&mut self, mtu: u16) -> Result<(), StackError> {
        info!("Bluedroid(sim): local MTU {}", mtu);
        Ok(())
    }

    fn create_attr_table(
        &mut self,
        interface: GattIf,
        table: &[AttrDescriptor],
    ) -> Result<(), StackError> {
        info!("Bluedroid(sim): attr table of {} on if {}", table.len(), interface);
        Ok(())
    }

    fn start_service(&mut self, service_handle: u16) -> Result<(), StackError> {
        info!("Bluedroid(sim): start service {}", service_handle);
        Ok(())
    }
}

#[cfg(not(target_os = "espidf"))]
impl NotifyPort for BluedroidAdapter {
    fn send_notification(
        &mut self,
        interface: GattIf,
        conn_id: u16,
        handle: u16,
        value: &[u8],
    ) -> Result<(), StackError> {
        log::debug!(
            "Bluedroid(sim): notify {:?} on if {} conn {} handle {}",
            value, interface, conn_id, handle
        );
        Ok(())
    }
}
