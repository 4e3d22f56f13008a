//! Parameter dump fragmentation
//!
//! A dump is a header announcing the image length and fragment count,
//! followed by the raw bank image split into fragments no larger than the
//! transport's maximum payload.

use super::messages::DecodeError;

/// Dump header: `{total_len: u16, fragment_count: u16}`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DumpHeader {
    /// Total image length in bytes
    pub total_len: u16,
    /// Number of fragments that follow the header
    pub fragment_count: u16,
}

impl DumpHeader {
    pub const SIZE: usize = 4;

    /// Header for an image of `total_len` bytes sent in `max_fragment`-byte pieces
    pub fn new(total_len: usize, max_fragment: usize) -> Self {
        Self {
            total_len: total_len as u16,
            fragment_count: fragment_count(total_len, max_fragment) as u16,
        }
    }

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        buf[0..2].copy_from_slice(&self.total_len.to_le_bytes());
        buf[2..4].copy_from_slice(&self.fragment_count.to_le_bytes());
        buf
    }

    pub fn from_bytes(buf: &[u8]) -> Result<Self, DecodeError> {
        if buf.len() != Self::SIZE {
            return Err(DecodeError::WrongLength);
        }
        Ok(Self {
            total_len: u16::from_le_bytes([buf[0], buf[1]]),
            fragment_count: u16::from_le_bytes([buf[2], buf[3]]),
        })
    }
}

/// `ceil(total_len / max_fragment)`
///
/// A zero `max_fragment` is treated as 1.
pub fn fragment_count(total_len: usize, max_fragment: usize) -> usize {
    total_len.div_ceil(max_fragment.max(1))
}

/// Split `image` into dump fragments; only the last one may be shorter
pub fn fragments(image: &[u8], max_fragment: usize) -> core::slice::Chunks<'_, u8> {
    image.chunks(max_fragment.max(1))
}
