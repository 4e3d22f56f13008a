//! kugle_core - Pure no_std parameter logic for the Kugle balance firmware
//!
//! This crate contains the platform-agnostic parameter bank, its registry
//! and the LSPC parameter wire format. It is tested on the host without
//! feature flags or embassy dependencies.
//!
//! # Design Principles
//!
//! - **Zero cfg**: No `#[cfg(feature = ...)]` directives
//! - **Pure no_std**: No std library dependencies
//! - **Typed access**: Fields are reached through tagged descriptors, never raw addresses
//!
//! # Modules
//!
//! - [`parameters`]: Parameter bank, registry and error types
//! - [`protocol`]: LSPC parameter message codec and dump fragmentation

#![no_std]

pub mod parameters;
pub mod protocol;
