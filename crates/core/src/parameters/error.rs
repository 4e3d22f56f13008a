//! Parameter error types
//!
//! Provides error types for parameter bank and store operations.

/// Errors from parameter bank and store operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterError {
    /// Group or id is not present in the registry
    UnknownParameter,
    /// Declared type, array length or payload length does not match the registry entry
    TypeOrLengthMismatch,
    /// No persistence backend is attached
    BackendUnavailable,
    /// The persistence backend reported a read or write failure
    StorageFailed,
}

impl ParameterError {
    /// Short static name, usable from defmt and println alike
    pub fn as_str(&self) -> &'static str {
        match self {
            ParameterError::UnknownParameter => "unknown parameter",
            ParameterError::TypeOrLengthMismatch => "type or length mismatch",
            ParameterError::BackendUnavailable => "persistence backend unavailable",
            ParameterError::StorageFailed => "persistence backend failed",
        }
    }
}

impl core::fmt::Display for ParameterError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
