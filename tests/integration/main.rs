//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises a specific subsystem
//! against the recording mock stack.  All tests run on the host (x86_64)
//! with no radio required.

mod dispatcher_tests;
mod mock_stack;
mod service_flow_tests;
mod transport_flow_tests;
