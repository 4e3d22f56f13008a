//! Core firmware functionality
//!
//! Logging and the shared parameter store. Pure schema and protocol types
//! live in `kugle_core`.

pub mod logging;
pub mod parameters;
