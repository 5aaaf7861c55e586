//! Integration test driver for the `tests/integration/` submodules.
//!
//! Each `mod` below maps to a file that exercises one subsystem against
//! mock ports and a manual clock. Nothing here sleeps.

mod controller_tests;
mod mocks;
mod session_tests;
mod wire_tests;
