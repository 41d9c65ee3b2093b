//! Timer drivers.

pub mod hw_timer;
