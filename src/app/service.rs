//! Application service, the hexagonal core.
//!
//! [`AppService`] owns both state machines and the stack port.  It is the
//! dispatcher's [`EventHandler`]: every event is routed to exactly one
//! machine, on the worker task, one at a time.
//!
//! ```text
//!                 ┌──────────────────────────────┐
//!  Event ───────▶ │          AppService           │ ──▶ TransportPort
//!                 │  transport Fsm · GattProfile  │ ──▶ GapPort / GattsPort
//!                 └──────────────────────────────┘
//! ```
//!
//! The two machines never call each other.  They share only the flags in
//! [`SharedState`].

use std::sync::Arc;

use log::{error, info, warn};

use crate::config::DeviceConfig;
use crate::dispatcher::EventHandler;
use crate::events::{Event, MediaCtrl, TransportEvent};
use crate::fsm::context::{MediaState, TransportCommand, TransportContext};
use crate::fsm::states::build_state_table;
use crate::fsm::{Fsm, StateId, TransportInput};
use crate::gatt::{GattProfile, ServiceConnectionState};
use crate::oscillator::SampleSource;
use crate::shared::SharedState;

use super::ports::{GapPort, GattsPort, TransportPort};

// ───────────────────────────────────────────────────────────────
// AppService
// ───────────────────────────────────────────────────────────────

pub struct AppService<P> {
    fsm: Fsm,
    ctx: TransportContext,
    profile: GattProfile,
    shared: Arc<SharedState>,
    source: Arc<SampleSource>,
    port: P,
    handled: u64,
}

impl<P: TransportPort + GapPort + GattsPort> AppService<P> {
    /// Construct the service.
    ///
    /// Does **not** start the transport machine; call [`start`](Self::start)
    /// before the first event.
    pub fn new(
        config: &DeviceConfig,
        shared: Arc<SharedState>,
        source: Arc<SampleSource>,
        port: P,
    ) -> Self {
        Self {
            fsm: Fsm::new(build_state_table(), StateId::Idle),
            ctx: TransportContext::new(config),
            profile: GattProfile::new(config, Arc::clone(&shared)),
            shared,
            source,
            port,
            handled: 0,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    pub fn start(&mut self) {
        self.fsm.start(&mut self.ctx);
        self.apply_transport_commands();
        info!("AppService started in {:?}", self.fsm.current_state());
    }

    // ── Event routing ─────────────────────────────────────────

    /// Route one event to its state machine and apply the resulting commands.
    pub fn handle_event(&mut self, event: Event) {
        self.handled += 1;
        match event {
            Event::StackUp => self.run_transport(TransportInput::StackUp),
            Event::Heartbeat => self.run_transport(TransportInput::Heartbeat),
            Event::Transport(TransportEvent::AuthComplete { success, peer }) => {
                if success {
                    info!("GAP: authentication with {} succeeded", peer);
                } else {
                    error!("GAP: authentication with {} failed", peer);
                }
            }
            Event::Transport(ev) => self.run_transport(TransportInput::Link(ev)),
            Event::Gap(ev) => self.profile.handle_gap(&ev, &mut self.port),
            Event::Gatts { interface, event } => {
                self.profile.handle_gatts(interface, &event, &mut self.port);
            }
        }
    }

    fn run_transport(&mut self, input: TransportInput) {
        self.fsm.handle(&mut self.ctx, &input);
        if let Some(refused) = self.apply_transport_commands() {
            self.fsm
                .handle(&mut self.ctx, &TransportInput::MediaRejected(refused));
            // A refusal never queues another media command.
            let _ = self.apply_transport_commands();
        }
        self.shared
            .set_streaming(self.ctx.media == MediaState::Started);
    }

    /// Apply queued commands.  Returns the media command the stack refused,
    /// if any.
    fn apply_transport_commands(&mut self) -> Option<MediaCtrl> {
        let mut refused = None;
        for cmd in self.ctx.take_commands() {
            let result = match cmd {
                TransportCommand::InitSource => self.port.init_source(),
                TransportCommand::SetScanMode(mode) => self.port.set_scan_mode(mode),
                TransportCommand::MediaCtrl(ctrl) => self.port.media_ctrl(ctrl),
                TransportCommand::Connect(peer) => self.port.connect(peer),
                TransportCommand::Disconnect(peer) => self.port.disconnect(peer),
                TransportCommand::ResetStreamCounters => {
                    self.source.reset_counters();
                    Ok(())
                }
            };
            match (cmd, result) {
                (_, Ok(())) => {}
                (TransportCommand::InitSource, Err(e)) => {
                    error!("Transport: audio source init failed: {}", e);
                }
                (TransportCommand::MediaCtrl(ctrl), Err(e)) => {
                    warn!("Transport: media {:?} refused: {}", ctrl, e);
                    refused = Some(ctrl);
                }
                (cmd, Err(e)) => warn!("Transport: {:?} failed: {}", cmd, e),
            }
        }
        refused
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn transport_state(&self) -> StateId {
        self.fsm.current_state()
    }

    pub fn media_state(&self) -> MediaState {
        self.ctx.media
    }

    pub fn service_state(&self) -> ServiceConnectionState {
        self.profile.state()
    }

    pub fn profile(&self) -> &GattProfile {
        &self.profile
    }

    pub fn shared(&self) -> &Arc<SharedState> {
        &self.shared
    }

    pub fn events_handled(&self) -> u64 {
        self.handled
    }

    pub fn port(&self) -> &P {
        &self.port
    }

    pub fn port_mut(&mut self) -> &mut P {
        &mut self.port
    }
}

impl<P: TransportPort + GapPort + GattsPort> EventHandler for AppService<P> {
    fn handle(&mut self, event: Event) {
        self.handle_event(event);
    }
}
