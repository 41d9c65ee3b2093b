//! Concrete state handler functions and table builder.
//!
//! Each state is defined by plain `fn` pointers: no closures, no dynamic
//! dispatch, no heap.
//!
//! ```text
//!  IDLE ──[stack up]──▶ UNCONNECTED ◀──────────────[disconnected]──────┐
//!                         │    ▲                                       │
//!     [heartbeat + peer / │    │ [disconnected /                       │
//!      inbound connecting]│    │  connect timeout]                     │
//!                         ▼    │                                       │
//!                       CONNECTING ──[connected]──▶ CONNECTED ──[stopped]──▶ DISCONNECTING
//!
//!  CONNECTED media:  Idle ─▶ Starting ─▶ Started ─▶ Stopping ─▶ Idle
//! ```

use log::{debug, info, warn};

use super::context::{MediaState, ScanMode, TransportCommand, TransportContext};
use super::{StateDescriptor, StateId, TransportInput};
use crate::events::{AckStatus, AudioState, ConnectionState, MediaCtrl, TransportEvent};

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

/// Build the static state table.  Called once at startup.
pub fn build_state_table() -> [StateDescriptor; StateId::COUNT] {
    [
        // Index 0: Idle
        StateDescriptor {
            id: StateId::Idle,
            name: "Idle",
            on_enter: None,
            on_exit: None,
            on_event: idle_event,
        },
        // Index 1: Discovering
        StateDescriptor {
            id: StateId::Discovering,
            name: "Discovering",
            on_enter: None,
            on_exit: None,
            on_event: discovery_event,
        },
        // Index 2: Discovered
        StateDescriptor {
            id: StateId::Discovered,
            name: "Discovered",
            on_enter: None,
            on_exit: None,
            on_event: discovery_event,
        },
        // Index 3: Unconnected
        StateDescriptor {
            id: StateId::Unconnected,
            name: "Unconnected",
            on_enter: Some(unconnected_enter),
            on_exit: None,
            on_event: unconnected_event,
        },
        // Index 4: Connecting
        StateDescriptor {
            id: StateId::Connecting,
            name: "Connecting",
            on_enter: Some(connecting_enter),
            on_exit: None,
            on_event: connecting_event,
        },
        // Index 5: Connected
        StateDescriptor {
            id: StateId::Connected,
            name: "Connected",
            on_enter: Some(connected_enter),
            on_exit: Some(connected_exit),
            on_event: connected_event,
        },
        // Index 6: Disconnecting
        StateDescriptor {
            id: StateId::Disconnecting,
            name: "Disconnecting",
            on_enter: None,
            on_exit: None,
            on_event: disconnecting_event,
        },
    ]
}

fn ignored(state: &str, input: &TransportInput) -> Option<StateId> {
    debug!("Transport: {} ignores evt 0x{:x}", state, input.id());
    None
}

fn unexpected(state: &str, input: &TransportInput) -> Option<StateId> {
    warn!("Transport: {} unhandled evt 0x{:x}", state, input.id());
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  IDLE: waiting for the host stack
// ═══════════════════════════════════════════════════════════════════════════

fn idle_event(ctx: &mut TransportContext, input: &TransportInput) -> Option<StateId> {
    match input {
        TransportInput::StackUp => {
            info!("Transport: stack up, initialising audio source");
            ctx.issue(TransportCommand::InitSource);
            ctx.issue(TransportCommand::SetScanMode(ScanMode::ConnectableDiscoverable));
            Some(StateId::Unconnected)
        }
        _ => unexpected("Idle", input),
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  DISCOVERING / DISCOVERED: reserved for peer inquiry
// ═══════════════════════════════════════════════════════════════════════════

fn discovery_event(_ctx: &mut TransportContext, input: &TransportInput) -> Option<StateId> {
    ignored("Discovery", input)
}

// ═══════════════════════════════════════════════════════════════════════════
//  UNCONNECTED: discoverable, optionally dialling a known peer
// ═══════════════════════════════════════════════════════════════════════════

fn unconnected_enter(ctx: &mut TransportContext) {
    ctx.peer = None;
}

fn unconnected_event(ctx: &mut TransportContext, input: &TransportInput) -> Option<StateId> {
    match input {
        TransportInput::Heartbeat => {
            let peer = ctx.outbound_peer?;
            info!("Transport: connecting to peer {}", peer);
            ctx.peer = Some(peer);
            ctx.issue(TransportCommand::Connect(peer));
            Some(StateId::Connecting)
        }
        TransportInput::Link(TransportEvent::ConnectionState { state, peer }) => match state {
            ConnectionState::Connecting => {
                ctx.peer = Some(*peer);
                Some(StateId::Connecting)
            }
            ConnectionState::Connected => {
                info!("Transport: a2dp connected to {}", peer);
                ctx.peer = Some(*peer);
                Some(StateId::Connected)
            }
            ConnectionState::Disconnected | ConnectionState::Disconnecting => {
                ignored("Unconnected", input)
            }
        },
        TransportInput::Link(_) | TransportInput::MediaRejected(_) => {
            ignored("Unconnected", input)
        }
        TransportInput::StackUp => unexpected("Unconnected", input),
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  CONNECTING: link setup in progress
// ═══════════════════════════════════════════════════════════════════════════

fn connecting_enter(ctx: &mut TransportContext) {
    ctx.connecting_beats = 0;
}

fn connecting_event(ctx: &mut TransportContext, input: &TransportInput) -> Option<StateId> {
    match input {
        TransportInput::Link(TransportEvent::ConnectionState { state, peer }) => match state {
            ConnectionState::Connected => {
                info!("Transport: a2dp connected to {}", peer);
                ctx.peer = Some(*peer);
                Some(StateId::Connected)
            }
            ConnectionState::Disconnected => {
                info!("Transport: connection to {} failed", peer);
                Some(StateId::Unconnected)
            }
            ConnectionState::Connecting | ConnectionState::Disconnecting => {
                ignored("Connecting", input)
            }
        },
        TransportInput::Heartbeat => {
            ctx.connecting_beats = ctx.connecting_beats.saturating_add(1);
            if ctx.connecting_beats >= ctx.connect_timeout_beats {
                warn!(
                    "Transport: connect timed out after {} heartbeats",
                    ctx.connecting_beats
                );
                Some(StateId::Unconnected)
            } else {
                None
            }
        }
        TransportInput::Link(_) | TransportInput::MediaRejected(_) => {
            ignored("Connecting", input)
        }
        TransportInput::StackUp => unexpected("Connecting", input),
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  CONNECTED: link up, media sub-machine active
// ═══════════════════════════════════════════════════════════════════════════

fn connected_enter(ctx: &mut TransportContext) {
    ctx.set_media(MediaState::Idle);
    ctx.started_beats = 0;
    ctx.stop_retries = 0;
    // Single sink: stop being visible while connected.
    ctx.issue(TransportCommand::SetScanMode(ScanMode::None));
}

fn connected_exit(ctx: &mut TransportContext) {
    ctx.set_media(MediaState::Idle);
}

fn connected_event(ctx: &mut TransportContext, input: &TransportInput) -> Option<StateId> {
    match input {
        TransportInput::Link(TransportEvent::ConnectionState {
            state: ConnectionState::Disconnected,
            peer,
        }) => {
            info!("Transport: a2dp disconnected from {}", peer);
            ctx.issue(TransportCommand::SetScanMode(ScanMode::ConnectableDiscoverable));
            Some(StateId::Unconnected)
        }
        TransportInput::Link(TransportEvent::AudioState(AudioState::Started)) => {
            ctx.issue(TransportCommand::ResetStreamCounters);
            None
        }
        TransportInput::Link(TransportEvent::AudioConfig) => {
            warn!("Transport: audio config not expected for a source");
            None
        }
        TransportInput::MediaRejected(cmd) => media_rejected(ctx, *cmd),
        TransportInput::Heartbeat | TransportInput::Link(TransportEvent::MediaCtrlAck { .. }) => {
            media_event(ctx, input)
        }
        TransportInput::Link(_) => ignored("Connected", input),
        TransportInput::StackUp => unexpected("Connected", input),
    }
}

/// Media sub-machine.  Only heartbeats and media acknowledgments reach it.
fn media_event(ctx: &mut TransportContext, input: &TransportInput) -> Option<StateId> {
    let ack = match input {
        TransportInput::Link(TransportEvent::MediaCtrlAck { cmd, status }) => Some((*cmd, *status)),
        _ => None,
    };

    match ctx.media {
        MediaState::Idle => match ack {
            None => {
                info!("Media: checking source readiness");
                ctx.issue(TransportCommand::MediaCtrl(MediaCtrl::CheckSrcReady));
                None
            }
            Some((MediaCtrl::CheckSrcReady, AckStatus::Success)) => {
                info!("Media: source ready, starting");
                ctx.issue(TransportCommand::MediaCtrl(MediaCtrl::Start));
                ctx.set_media(MediaState::Starting);
                None
            }
            Some(_) => None,
        },
        MediaState::Starting => match ack {
            None => None,
            Some((MediaCtrl::Start, AckStatus::Success)) => {
                ctx.started_beats = 0;
                ctx.issue(TransportCommand::ResetStreamCounters);
                ctx.set_media(MediaState::Started);
                None
            }
            Some(_) => {
                warn!("Media: start failed");
                ctx.set_media(MediaState::Idle);
                None
            }
        },
        MediaState::Started => match ack {
            None => {
                let max = ctx.stream_max_beats?;
                ctx.started_beats += 1;
                if ctx.started_beats >= max {
                    info!("Media: stopping after {} heartbeats", ctx.started_beats);
                    ctx.stop_retries = 0;
                    ctx.issue(TransportCommand::MediaCtrl(MediaCtrl::Stop));
                    ctx.set_media(MediaState::Stopping);
                }
                None
            }
            Some((cmd, _)) => {
                warn!("Media: unexpected {:?} ack while started", cmd);
                ctx.set_media(MediaState::Idle);
                None
            }
        },
        MediaState::Stopping => match ack {
            None => None,
            Some((MediaCtrl::Stop, AckStatus::Success)) => {
                info!("Media: stopped, disconnecting");
                ctx.set_media(MediaState::Idle);
                disconnect_peer(ctx)
            }
            Some((MediaCtrl::Stop, AckStatus::Failure)) => {
                if ctx.stop_retries < ctx.media_stop_max_retries {
                    ctx.stop_retries += 1;
                    info!("Media: stop rejected, retry {}", ctx.stop_retries);
                    ctx.issue(TransportCommand::MediaCtrl(MediaCtrl::Stop));
                    None
                } else {
                    warn!("Media: stop rejected {} times, forcing disconnect", ctx.stop_retries + 1);
                    ctx.set_media(MediaState::Idle);
                    disconnect_peer(ctx)
                }
            }
            Some(_) => {
                ctx.set_media(MediaState::Idle);
                None
            }
        },
    }
}

/// A refused command never reached the peer.  Step back so the next
/// heartbeat issues it again.
fn media_rejected(ctx: &mut TransportContext, cmd: MediaCtrl) -> Option<StateId> {
    match (ctx.media, cmd) {
        (MediaState::Starting, MediaCtrl::Start) => {
            warn!("Media: start refused by stack");
            ctx.set_media(MediaState::Idle);
        }
        (MediaState::Stopping, MediaCtrl::Stop) => {
            warn!("Media: stop refused by stack");
            ctx.set_media(MediaState::Started);
        }
        (media, cmd) => debug!("Media: {:?} refused while {}", cmd, media.name()),
    }
    None
}

fn disconnect_peer(ctx: &mut TransportContext) -> Option<StateId> {
    match ctx.peer {
        Some(peer) => {
            ctx.issue(TransportCommand::Disconnect(peer));
            Some(StateId::Disconnecting)
        }
        None => {
            warn!("Transport: no peer recorded, dropping to Unconnected");
            Some(StateId::Unconnected)
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  DISCONNECTING: waiting for link teardown
// ═══════════════════════════════════════════════════════════════════════════

fn disconnecting_event(ctx: &mut TransportContext, input: &TransportInput) -> Option<StateId> {
    match input {
        TransportInput::Link(TransportEvent::ConnectionState {
            state: ConnectionState::Disconnected,
            peer,
        }) => {
            info!("Transport: a2dp disconnected from {}", peer);
            ctx.issue(TransportCommand::SetScanMode(ScanMode::ConnectableDiscoverable));
            Some(StateId::Unconnected)
        }
        TransportInput::StackUp => unexpected("Disconnecting", input),
        _ => ignored("Disconnecting", input),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_rows_match_their_index() {
        let table = build_state_table();
        for (i, row) in table.iter().enumerate() {
            assert_eq!(row.id as usize, i, "row {} is out of order", row.name);
        }
    }

    #[test]
    fn only_connected_has_exit_action() {
        let table = build_state_table();
        let with_exit: Vec<_> = table
            .iter()
            .filter(|row| row.on_exit.is_some())
            .map(|row| row.id)
            .collect();
        assert_eq!(with_exit, vec![StateId::Connected]);
    }
}
