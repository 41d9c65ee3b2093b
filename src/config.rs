//! Device configuration parameters
//!
//! All tunable parameters for the btserver firmware. Defaults match the
//! deployed device; every value is range-checked by [`DeviceConfig::validate`]
//! before the bring-up sequence uses it.

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Maximum length of the advertised device name.
pub const DEVICE_NAME_LEN: usize = 24;

/// Core device configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceConfig {
    // --- Identity ---
    /// Name used for both classic and low-energy advertising
    pub device_name: heapless::String<DEVICE_NAME_LEN>,
    /// GATT application identifier passed at registration
    pub app_id: u16,
    /// Local ATT MTU offered to clients
    pub local_mtu: u16,

    // --- Advertising (units of 0.625 ms) ---
    pub adv_int_min: u16,
    pub adv_int_max: u16,

    // --- Connection parameter update (units of 1.25 ms / 10 ms) ---
    pub conn_int_min: u16,
    pub conn_int_max: u16,
    pub conn_latency: u16,
    pub conn_timeout: u16,

    // --- Audio transport ---
    /// Heartbeat timer period driving transport polling (milliseconds)
    pub heartbeat_period_ms: u32,
    /// Peer to dial on heartbeat while unconnected; `None` = inbound only
    pub outbound_peer: Option<[u8; 6]>,
    /// Heartbeats to wait in Connecting before giving up
    pub connect_timeout_beats: u8,
    /// Stop streaming after this many heartbeats in Started; `None` = never
    pub stream_max_beats: Option<u32>,
    /// Extra "stop" commands issued after a negative stop acknowledgment
    pub media_stop_max_retries: u8,

    // --- Tone ---
    pub tone_hz: u32,
    pub sample_rate_hz: u32,
    /// Peak sample value of the generated tone
    pub tone_amplitude: i16,

    // --- Telemetry ---
    /// Producer task period (milliseconds)
    pub telemetry_period_ms: u32,
    /// Values strictly above this are notified to the client
    pub notify_threshold: u8,

    // --- Dispatcher ---
    /// Bounded wait for a full event queue (milliseconds)
    pub dispatch_timeout_ms: u32,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        let mut device_name = heapless::String::new();
        // "SERVER" always fits in DEVICE_NAME_LEN.
        let _ = device_name.push_str("SERVER");

        Self {
            device_name,
            app_id: 0x55,
            local_mtu: 500,

            adv_int_min: 0x20, // 20 ms
            adv_int_max: 0x40, // 40 ms

            conn_int_min: 0x20, // 40 ms
            conn_int_max: 0x40, // 80 ms
            conn_latency: 0,
            conn_timeout: 400, // 4 s

            heartbeat_period_ms: 10_000,
            outbound_peer: None,
            connect_timeout_beats: 2,
            stream_max_beats: None,
            media_stop_max_retries: 3,

            tone_hz: 440,
            sample_rate_hz: 44_100,
            tone_amplitude: 8_000,

            telemetry_period_ms: 20_000,
            notify_threshold: 2,

            dispatch_timeout_ms: 10,
        }
    }
}

impl DeviceConfig {
    /// Range-check every field.  Invalid values are rejected, never clamped.
    pub fn validate(&self) -> Result<(), Error> {
        if self.device_name.is_empty() {
            return Err(Error::Config("device_name must not be empty"));
        }
        if !(23..=517).contains(&self.local_mtu) {
            return Err(Error::Config("local_mtu must be 23–517"));
        }
        if self.adv_int_min < 0x20 || self.adv_int_min > self.adv_int_max {
            return Err(Error::Config("advertising interval bounds invalid"));
        }
        if self.conn_int_min < 6 || self.conn_int_min > self.conn_int_max {
            return Err(Error::Config("connection interval bounds invalid"));
        }
        if !(10..=3200).contains(&self.conn_timeout) {
            return Err(Error::Config("conn_timeout must be 10–3200"));
        }
        if self.heartbeat_period_ms == 0 {
            return Err(Error::Config("heartbeat_period_ms must be non-zero"));
        }
        if self.telemetry_period_ms == 0 {
            return Err(Error::Config("telemetry_period_ms must be non-zero"));
        }
        if self.sample_rate_hz == 0 || self.tone_hz == 0 || self.tone_hz >= self.sample_rate_hz / 2 {
            return Err(Error::Config("tone_hz must be below the Nyquist rate"));
        }
        if self.tone_amplitude <= 0 {
            return Err(Error::Config("tone_amplitude must be positive"));
        }
        if self.notify_threshold >= 10 {
            return Err(Error::Config("notify_threshold must be below the RMS ceiling"));
        }
        if self.dispatch_timeout_ms == 0 {
            return Err(Error::Config("dispatch_timeout_ms must be non-zero"));
        }
        Ok(())
    }
}
