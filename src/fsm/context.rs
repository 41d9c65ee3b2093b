//! Shared mutable context threaded through every transport FSM handler.
//!
//! `TransportContext` is the single struct that state handlers read from and
//! write to: the media sub-state, the current peer, beat counters, the
//! relevant configuration, and the stack commands requested by the last
//! input.  Think of it as the "blackboard" in a blackboard architecture.

use log::{info, warn};

use crate::config::DeviceConfig;
use crate::events::{MediaCtrl, PeerAddress};

/// Upper bound on commands a single input can produce.
pub const MAX_PENDING_COMMANDS: usize = 8;

// ---------------------------------------------------------------------------
// Media sub-state (meaningful only while Connected)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaState {
    Idle,
    Starting,
    Started,
    Stopping,
}

impl MediaState {
    pub fn name(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Starting => "Starting",
            Self::Started => "Started",
            Self::Stopping => "Stopping",
        }
    }
}

// ---------------------------------------------------------------------------
// Commands (written by handlers; applied by the app service)
// ---------------------------------------------------------------------------

/// Classic inquiry/page scan visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMode {
    /// Neither connectable nor discoverable.
    None,
    ConnectableDiscoverable,
}

/// A stack action requested by a state handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportCommand {
    /// Register transport callbacks and initialise the audio source.
    InitSource,
    SetScanMode(ScanMode),
    MediaCtrl(MediaCtrl),
    Connect(PeerAddress),
    Disconnect(PeerAddress),
    /// Zero the packet/byte counters of the sample source.
    ResetStreamCounters,
}

// ---------------------------------------------------------------------------
// TransportContext
// ---------------------------------------------------------------------------

/// The shared context passed to every state handler function.
pub struct TransportContext {
    // -- Link --
    /// Media sub-state; reset to `Idle` whenever Connected is entered or left.
    pub media: MediaState,
    /// Address of the current (or dialled) peer.
    pub peer: Option<PeerAddress>,
    /// Id of the input currently being handled, for log lines.
    pub last_event: u16,

    // -- Counters --
    /// Heartbeats spent in Connecting.
    pub connecting_beats: u8,
    /// Heartbeats spent with media Started.
    pub started_beats: u32,
    /// Stop commands re-issued after negative acknowledgments.
    pub stop_retries: u8,

    // -- Configuration --
    pub outbound_peer: Option<PeerAddress>,
    pub connect_timeout_beats: u8,
    pub stream_max_beats: Option<u32>,
    pub media_stop_max_retries: u8,

    // -- Outputs --
    commands: heapless::Vec<TransportCommand, MAX_PENDING_COMMANDS>,
}

impl TransportContext {
    pub fn new(config: &DeviceConfig) -> Self {
        Self {
            media: MediaState::Idle,
            peer: None,
            last_event: 0,
            connecting_beats: 0,
            started_beats: 0,
            stop_retries: 0,
            outbound_peer: config.outbound_peer.map(PeerAddress),
            connect_timeout_beats: config.connect_timeout_beats,
            stream_max_beats: config.stream_max_beats,
            media_stop_max_retries: config.media_stop_max_retries,
            commands: heapless::Vec::new(),
        }
    }

    /// Queue a stack command for the caller to apply.
    pub fn issue(&mut self, cmd: TransportCommand) {
        if self.commands.push(cmd).is_err() {
            warn!("Transport: command buffer full, dropping {:?}", cmd);
        }
    }

    /// Drain the commands produced so far.
    pub fn take_commands(&mut self) -> heapless::Vec<TransportCommand, MAX_PENDING_COMMANDS> {
        core::mem::take(&mut self.commands)
    }

    /// Change the media sub-state, logging the transition.
    pub fn set_media(&mut self, next: MediaState) {
        if self.media != next {
            info!(
                "Media: {} -> {} (evt 0x{:x})",
                self.media.name(),
                next.name(),
                self.last_event
            );
            self.media = next;
        }
    }
}
