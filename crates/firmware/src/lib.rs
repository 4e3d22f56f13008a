#![cfg_attr(not(test), no_std)]

//! kugle_firmware - shared parameter store for the Kugle balance controller
//!
//! Embassy-based concurrency and flash persistence around the schema in
//! `kugle_core`.
//!
//! # Layout
//!
//! - **platform**: flash trait, platform errors and the mock flash
//! - **core**: logging macros and the parameter store with its caches
//! - **communication**: LSPC parameter handler and dispatcher
//!
//! Logging macros (`log_info!`, `log_warn!`, `log_error!`, `log_debug!`,
//! `log_trace!`) are exported at the crate root.

#[cfg(all(feature = "mock", not(test)))]
extern crate std;

// Links the host critical-section implementation for CriticalSectionRawMutex in tests
#[cfg(test)]
use critical_section as _;

pub mod platform;

pub mod core;

pub mod communication;
