//! Application core: both state machines, zero direct stack calls.
//!
//! All interaction with the Bluetooth stack happens through **port traits**
//! defined in [`ports`], keeping this layer fully testable on the host.

pub mod ports;
pub mod service;
