//! Host communication
//!
//! The LSPC serial protocol's parameter messages.

pub mod lspc;
