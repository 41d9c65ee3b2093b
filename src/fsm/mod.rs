//! Function-pointer finite state machine for the audio transport link.
//!
//! Classic embedded FSM pattern:
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │  StateTable                                                    │
//! │  ┌───────────────┬───────────┬──────────┬──────────────────────┐│
//! │  │ StateId       │ on_enter  │ on_exit  │ on_event             ││
//! │  ├───────────────┼───────────┼──────────┼──────────────────────┤│
//! │  │ Idle          │ -         │ -        │ fn(ctx, in)->Option<>││
//! │  │ Discovering   │ -         │ -        │ fn(ctx, in)->Option<>││
//! │  │ Discovered    │ -         │ -        │ fn(ctx, in)->Option<>││
//! │  │ Unconnected   │ fn(ctx)   │ -        │ fn(ctx, in)->Option<>││
//! │  │ Connecting    │ fn(ctx)   │ -        │ fn(ctx, in)->Option<>││
//! │  │ Connected     │ fn(ctx)   │ fn(ctx)  │ fn(ctx, in)->Option<>││
//! │  │ Disconnecting │ -         │ -        │ fn(ctx, in)->Option<>││
//! │  └───────────────┴───────────┴──────────┴──────────────────────┘│
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each input is fed to `on_event` for the **current** state.  If it
//! returns `Some(next_id)`, the engine runs `on_exit` for the current state,
//! then `on_enter` for the next, and updates the current pointer.  Handlers
//! never touch the radio: they queue [`context::TransportCommand`]s in the
//! [`TransportContext`] and the caller applies them.

pub mod context;
pub mod states;

use context::TransportContext;
use log::info;

use crate::events::{HEARTBEAT_EVT, MEDIA_REJECTED_EVT, MediaCtrl, STACK_UP_EVT, TransportEvent};

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

/// Audio transport link states.
/// Must stay in sync with the state table built in [`states::build_state_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum StateId {
    Idle = 0,
    Discovering = 1,
    Discovered = 2,
    Unconnected = 3,
    Connecting = 4,
    Connected = 5,
    Disconnecting = 6,
}

impl StateId {
    /// Total number of states, used to size the table array.
    pub const COUNT: usize = 7;

    /// Convert an index back to `StateId`.  Out-of-range indices assert in
    /// debug builds and fall back to `Unconnected` in release.
    pub fn from_index(idx: usize) -> Self {
        match idx {
            0 => Self::Idle,
            1 => Self::Discovering,
            2 => Self::Discovered,
            3 => Self::Unconnected,
            4 => Self::Connecting,
            5 => Self::Connected,
            6 => Self::Disconnecting,
            _ => {
                debug_assert!(false, "invalid state index: {idx}");
                Self::Unconnected
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// Everything the transport machine reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportInput {
    /// The Bluetooth host stack finished enabling.
    StackUp,
    /// Periodic heartbeat tick.
    Heartbeat,
    /// Callback event from the audio transport.
    Link(TransportEvent),
    /// The stack refused a media command, so no acknowledgment will follow.
    MediaRejected(MediaCtrl),
}

impl TransportInput {
    /// Numeric id for log lines.
    pub fn id(&self) -> u16 {
        match self {
            Self::StackUp => STACK_UP_EVT,
            Self::Heartbeat => HEARTBEAT_EVT,
            Self::Link(ev) => crate::events::Event::Transport(*ev).id(),
            Self::MediaRejected(_) => MEDIA_REJECTED_EVT,
        }
    }
}

// ---------------------------------------------------------------------------
// Function-pointer type aliases
// ---------------------------------------------------------------------------

/// Signature for `on_enter` and `on_exit` actions.
pub type StateActionFn = fn(&mut TransportContext);

/// Signature for the per-input handler.
/// Returns `Some(next)` to trigger a transition, or `None` to stay.
pub type StateEventFn = fn(&mut TransportContext, &TransportInput) -> Option<StateId>;

// ---------------------------------------------------------------------------
// State descriptor (one row in the table)
// ---------------------------------------------------------------------------

/// Static descriptor for a single FSM state.
pub struct StateDescriptor {
    pub id: StateId,
    pub name: &'static str,
    pub on_enter: Option<StateActionFn>,
    pub on_exit: Option<StateActionFn>,
    pub on_event: StateEventFn,
}

// ---------------------------------------------------------------------------
// FSM engine
// ---------------------------------------------------------------------------

/// The finite state machine engine.
pub struct Fsm {
    /// Fixed-size table indexed by `StateId as usize`.
    table: [StateDescriptor; StateId::COUNT],
    /// Index of the currently active state.
    current: usize,
}

impl Fsm {
    /// Construct a new FSM with the given state table, starting in `initial`.
    pub fn new(table: [StateDescriptor; StateId::COUNT], initial: StateId) -> Self {
        Self {
            table,
            current: initial as usize,
        }
    }

    /// Run the initial `on_enter` for the starting state.
    /// Call once after construction, before the first input.
    pub fn start(&mut self, ctx: &mut TransportContext) {
        info!("Transport: starting in state {}", self.table[self.current].name);
        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }

    /// Feed one input to the current state and apply any transition.
    pub fn handle(&mut self, ctx: &mut TransportContext, input: &TransportInput) {
        ctx.last_event = input.id();

        let next = (self.table[self.current].on_event)(ctx, input);

        if let Some(next_id) = next {
            self.transition(next_id, ctx);
        }
    }

    /// The current state's identity.
    pub fn current_state(&self) -> StateId {
        StateId::from_index(self.current)
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    fn transition(&mut self, next_id: StateId, ctx: &mut TransportContext) {
        let next_idx = next_id as usize;

        info!(
            "Transport: {} -> {} (evt 0x{:x})",
            self.table[self.current].name, self.table[next_idx].name, ctx.last_event
        );

        if let Some(exit) = self.table[self.current].on_exit {
            exit(ctx);
        }

        self.current = next_idx;

        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }
}
