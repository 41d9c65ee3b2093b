//! Mock Bluetooth stack for integration tests.
//!
//! Records every port call so tests can assert on the full command history
//! without a radio.  Individual commands can be made to fail.

use btserver::app::ports::{GapPort, GattsPort, NotifyPort, StackError, TransportPort};
use btserver::events::{GattIf, MediaCtrl, PeerAddress};
use btserver::fsm::context::ScanMode;
use btserver::gatt::table::AttrDescriptor;
use btserver::gatt::{AdvData, AdvParams, ConnParams};

// ── Call record ───────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    InitSource,
    SetScanMode(ScanMode),
    MediaCtrl(MediaCtrl),
    Connect(PeerAddress),
    Disconnect(PeerAddress),
    SetDeviceName(String),
    ConfigAdvData { scan_rsp: bool },
    StartAdvertising,
    StopAdvertising,
    UpdateConnParams(PeerAddress),
    RegisterApp(u16),
    SetLocalMtu(u16),
    CreateAttrTable { interface: GattIf, len: usize },
    StartService(u16),
    Notify { interface: GattIf, conn_id: u16, handle: u16, value: Vec<u8> },
}

// ── MockStack ─────────────────────────────────────────────────

#[derive(Default)]
pub struct MockStack {
    pub calls: Vec<Call>,
    /// Every media control command fails with this error when set.
    pub fail_media: Option<StackError>,
    pub fail_notify: bool,
}

#[allow(dead_code)]
impl MockStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.iter().filter(|c| pred(c)).count()
    }

    pub fn media_cmds(&self) -> Vec<MediaCtrl> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::MediaCtrl(m) => Some(*m),
                _ => None,
            })
            .collect()
    }

    pub fn notifications(&self) -> Vec<u8> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::Notify { value, .. } => value.first().copied(),
                _ => None,
            })
            .collect()
    }

    pub fn last_scan_mode(&self) -> Option<ScanMode> {
        self.calls.iter().rev().find_map(|c| match c {
            Call::SetScanMode(m) => Some(*m),
            _ => None,
        })
    }

    pub fn clear(&mut self) {
        self.calls.clear();
    }
}

impl TransportPort for MockStack {
    fn init_source(&mut self) -> Result<(), StackError> {
        self.calls.push(Call::InitSource);
        Ok(())
    }

    fn set_scan_mode(&mut self, mode: ScanMode) -> Result<(), StackError> {
        self.calls.push(Call::SetScanMode(mode));
        Ok(())
    }

    fn media_ctrl(&mut self, cmd: MediaCtrl) -> Result<(), StackError> {
        self.calls.push(Call::MediaCtrl(cmd));
        self.fail_media.map_or(Ok(()), Err)
    }

    fn connect(&mut self, peer: PeerAddress) -> Result<(), StackError> {
        self.calls.push(Call::Connect(peer));
        Ok(())
    }

    fn disconnect(&mut self, peer: PeerAddress) -> Result<(), StackError> {
        self.calls.push(Call::Disconnect(peer));
        Ok(())
    }
}

impl GapPort for MockStack {
    fn set_device_name(&mut self, name: &str) -> Result<(), StackError> {
        self.calls.push(Call::SetDeviceName(name.to_owned()));
        Ok(())
    }

    fn config_adv_data(&mut self, data: &AdvData) -> Result<(), StackError> {
        self.calls.push(Call::ConfigAdvData {
            scan_rsp: data.set_scan_rsp,
        });
        Ok(())
    }

    fn start_advertising(&mut self, _params: &AdvParams) -> Result<(), StackError> {
        self.calls.push(Call::StartAdvertising);
        Ok(())
    }

    fn stop_advertising(&mut self) -> Result<(), StackError> {
        self.calls.push(Call::StopAdvertising);
        Ok(())
    }

    fn update_conn_params(&mut self, params: &ConnParams) -> Result<(), StackError> {
        self.calls.push(Call::UpdateConnParams(params.peer));
        Ok(())
    }
}

impl GattsPort for MockStack {
    fn register_app(&mut self, app_id: u16) -> Result<(), StackError> {
        self.calls.push(Call::RegisterApp(app_id));
        Ok(())
    }

    fn set_local_mtu(&mut self, mtu: u16) -> Result<(), StackError> {
        self.calls.push(Call::SetLocalMtu(mtu));
        Ok(())
    }

    fn create_attr_table(
        &mut self,
        interface: GattIf,
        table: &[AttrDescriptor],
    ) -> Result<(), StackError> {
        self.calls.push(Call::CreateAttrTable {
            interface,
            len: table.len(),
        });
        Ok(())
    }

    fn start_service(&mut self, service_handle: u16) -> Result<(), StackError> {
        self.calls.push(Call::StartService(service_handle));
        Ok(())
    }
}

impl NotifyPort for MockStack {
    fn send_notification(
        &mut self,
        interface: GattIf,
        conn_id: u16,
        handle: u16,
        value: &[u8],
    ) -> Result<(), StackError> {
        self.calls.push(Call::Notify {
            interface,
            conn_id,
            handle,
            value: value.to_vec(),
        });
        if self.fail_notify {
            Err(StackError::Busy)
        } else {
            Ok(())
        }
    }
}
