//! Testing utilities for formtree

pub mod fixtures;
pub mod poll;

pub use fixtures::*;
pub use poll::*;

/// Routes `log` output through the test harness. Safe to call from every test.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::init_logging;
    pub use crate::poll::{poll_once, TestPoller};
}
