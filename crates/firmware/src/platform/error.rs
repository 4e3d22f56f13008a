//! Platform error types
//!
//! This module defines error types for platform operations.

use core::fmt;

/// Result type for platform operations
pub type Result<T> = core::result::Result<T, PlatformError>;

/// Platform-level errors
///
/// All platform implementations map their HAL-specific errors to these variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformError {
    /// Flash operation failed
    Flash(FlashError),
    /// Resource not available
    ResourceUnavailable,
}

/// Flash-specific errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashError {
    /// Erase operation failed
    EraseFailed,
    /// Write operation failed
    WriteFailed,
    /// Read operation failed
    ReadFailed,
    /// Invalid address (out of bounds)
    InvalidAddress,
    /// Verify failed (data mismatch after write)
    VerifyFailed,
}

impl FlashError {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlashError::EraseFailed => "erase failed",
            FlashError::WriteFailed => "write failed",
            FlashError::ReadFailed => "read failed",
            FlashError::InvalidAddress => "invalid address",
            FlashError::VerifyFailed => "verify failed",
        }
    }
}

impl PlatformError {
    /// Short static description, usable from defmt and println alike
    pub fn as_str(&self) -> &'static str {
        match self {
            PlatformError::Flash(e) => e.as_str(),
            PlatformError::ResourceUnavailable => "resource not available",
        }
    }
}

impl fmt::Display for PlatformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlatformError::Flash(e) => write!(f, "Flash error: {}", e.as_str()),
            _ => f.write_str(self.as_str()),
        }
    }
}

impl From<FlashError> for PlatformError {
    fn from(error: FlashError) -> Self {
        PlatformError::Flash(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flash_error_conversion() {
        let err: PlatformError = FlashError::VerifyFailed.into();
        assert_eq!(err, PlatformError::Flash(FlashError::VerifyFailed));
        assert_eq!(err.as_str(), "verify failed");
    }
}
