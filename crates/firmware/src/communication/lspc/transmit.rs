//! LSPC transmit abstraction
//!
//! The serial link's framing and queueing live outside this crate. Handlers
//! hand over one message payload at a time through [`LspcTransmit`].

use kugle_core::protocol::{MessageTypeToHost, MAX_PACKAGE_LENGTH};

/// Transmit errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransmitError {
    /// Outbound queue is full
    QueueFull,
    /// Payload exceeds the link's maximum
    PayloadTooLong,
    /// Link is not connected
    LinkDown,
}

impl TransmitError {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransmitError::QueueFull => "transmit queue full",
            TransmitError::PayloadTooLong => "payload too long",
            TransmitError::LinkDown => "link down",
        }
    }
}

impl core::fmt::Display for TransmitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outbound side of the serial link
///
/// Each call sends one complete, ordered message of `message_type`.
#[allow(async_fn_in_trait)]
pub trait LspcTransmit {
    /// Largest payload a single message may carry
    ///
    /// Dumps are split into fragments of at most this size.
    fn max_payload_len(&self) -> usize {
        MAX_PACKAGE_LENGTH
    }

    /// Queue one message for the host
    async fn transmit(
        &mut self,
        message_type: MessageTypeToHost,
        payload: &[u8],
    ) -> Result<(), TransmitError>;
}
