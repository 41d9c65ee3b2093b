//! Unified error types for the btserver firmware.
//!
//! A single `Error` enum that every subsystem converts into, so bring-up code
//! and the dispatcher worker report failures the same way. All variants are
//! `Copy` so they can be logged and passed around without allocation.

use core::fmt;

use crate::app::ports::StackError;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The event dispatcher rejected an event.
    Dispatch(DispatchError),
    /// A Bluetooth stack command failed.
    Stack(StackError),
    /// Configuration is invalid.
    Config(&'static str),
    /// A bring-up step failed.
    Init(&'static str),
    /// A one-time setup step failed in a way that cannot be retried.
    Fatal(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dispatch(e) => write!(f, "dispatch: {e}"),
            Self::Stack(e) => write!(f, "stack: {e}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
            Self::Fatal(msg) => write!(f, "fatal: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Dispatcher errors
// ---------------------------------------------------------------------------

/// Why an event could not be handed to the dispatcher worker.
///
/// In both cases the event has already been dropped; the producer must not
/// assume delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchError {
    /// The queue stayed full for the whole bounded send wait.
    QueueFull,
    /// The dispatcher has been shut down.
    Closed,
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::QueueFull => write!(f, "event queue full"),
            Self::Closed => write!(f, "dispatcher shut down"),
        }
    }
}

impl From<DispatchError> for Error {
    fn from(e: DispatchError) -> Self {
        Self::Dispatch(e)
    }
}

impl From<StackError> for Error {
    fn from(e: StackError) -> Self {
        Self::Stack(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_prefixed_by_subsystem() {
        assert_eq!(
            Error::from(DispatchError::QueueFull).to_string(),
            "dispatch: event queue full"
        );
        assert_eq!(
            Error::from(StackError::Busy).to_string(),
            "stack: stack busy"
        );
        assert_eq!(
            Error::Fatal("attribute table handle count mismatch").to_string(),
            "fatal: attribute table handle count mismatch"
        );
    }
}
