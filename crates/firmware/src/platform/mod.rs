//! Platform abstraction layer
//!
//! Hardware-facing traits and their error types. Board support crates
//! implement [`FlashInterface`]; the parameter store only sees the trait.

pub mod error;
pub mod traits;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use error::{FlashError, PlatformError, Result};
pub use traits::FlashInterface;
