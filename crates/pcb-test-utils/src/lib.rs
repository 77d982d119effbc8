//! Shared helpers for netlist and schematic tests.
//!
//! - [`NetlistFixture`]: terse builder for hand-written netlists
//! - [`relabel_netlist`] / [`shuffle_netlist`]: structure-preserving
//!   perturbations for invariance tests
//! - [`init_logging`]: route `log` output through the test harness

pub mod fixture;
pub mod permute;

pub use fixture::NetlistFixture;
pub use permute::{relabel_netlist, shuffle_netlist};

/// Initialise `env_logger` in test mode. Safe to call from every test.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
