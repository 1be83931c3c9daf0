//! Integration test driver for `tests/integration/` submodule.
//!
//! Bridge and heater run against each other over a simulated IR link
//! (`mock_hw`). All tests run on the host with no real hardware required.

mod loopback_tests;
mod mock_hw;
mod schedule_tests;
