//! Mock platform implementation for testing
//!
//! Available during test builds and when the `mock` feature is enabled.

mod flash;

pub use flash::MockFlash;
