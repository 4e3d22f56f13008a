//! LSPC parameter message definitions
//!
//! Fixed-width, little-endian payloads exchanged with the host over the
//! serial link. Framing is handled by the transport; these types only cover
//! the payload of a single message.

use crate::parameters::{ParamType, MAX_VALUE_LEN};
use heapless::Vec;

/// Largest payload the serial link carries in one message
pub const MAX_PACKAGE_LENGTH: usize = 250;

/// Message types sent from the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageTypeFromHost {
    GetParameter = 0x20,
    SetParameter = 0x21,
    StoreParameters = 0x22,
    DumpParameters = 0x23,
}

impl MessageTypeFromHost {
    pub fn from_u8(id: u8) -> Option<Self> {
        match id {
            0x20 => Some(Self::GetParameter),
            0x21 => Some(Self::SetParameter),
            0x22 => Some(Self::StoreParameters),
            0x23 => Some(Self::DumpParameters),
            _ => None,
        }
    }
}

/// Message types sent to the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageTypeToHost {
    GetParameter = 0xA0,
    SetParameterAck = 0xA1,
    StoreParametersAck = 0xA2,
    DumpParameters = 0xA3,
}

impl MessageTypeToHost {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Payload decoding errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// Payload shorter than the fixed part of the message
    TooShort,
    /// Payload length differs from the fixed message size
    WrongLength,
    /// Unknown type tag
    InvalidType,
}

impl DecodeError {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecodeError::TooShort => "payload too short",
            DecodeError::WrongLength => "unexpected payload length",
            DecodeError::InvalidType => "invalid type tag",
        }
    }
}

impl core::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// GetParameter request: `{group, id}`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GetParameterRequest {
    pub group: u8,
    pub id: u8,
}

impl GetParameterRequest {
    pub const SIZE: usize = 2;

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        [self.group, self.id]
    }

    pub fn from_bytes(buf: &[u8]) -> Result<Self, DecodeError> {
        if buf.len() != Self::SIZE {
            return Err(DecodeError::WrongLength);
        }
        Ok(Self {
            group: buf[0],
            id: buf[1],
        })
    }
}

/// SetParameter request: `{group, id, type, array_len, value...}`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetParameterRequest<'a> {
    pub group: u8,
    pub id: u8,
    /// Declared wire type tag (validated against the registry, not here)
    pub value_type: u8,
    pub array_len: u8,
    pub value: &'a [u8],
}

impl<'a> SetParameterRequest<'a> {
    /// Size of the fixed header preceding the value bytes
    pub const HEADER_SIZE: usize = 4;

    /// Parameter address of a possibly truncated request
    ///
    /// Lets the handler acknowledge a malformed request it can still address.
    pub fn address(buf: &[u8]) -> Option<(u8, u8)> {
        match buf {
            [group, id, ..] => Some((*group, *id)),
            _ => None,
        }
    }

    pub fn from_bytes(buf: &'a [u8]) -> Result<Self, DecodeError> {
        if buf.len() < Self::HEADER_SIZE {
            return Err(DecodeError::TooShort);
        }
        Ok(Self {
            group: buf[0],
            id: buf[1],
            value_type: buf[2],
            array_len: buf[3],
            value: &buf[Self::HEADER_SIZE..],
        })
    }

    /// Encode into a message payload (host side)
    pub fn to_bytes(&self) -> Result<Vec<u8, MAX_PACKAGE_LENGTH>, DecodeError> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&[self.group, self.id, self.value_type, self.array_len])
            .map_err(|_| DecodeError::WrongLength)?;
        buf.extend_from_slice(self.value)
            .map_err(|_| DecodeError::WrongLength)?;
        Ok(buf)
    }
}

/// Largest GetParameter reply payload
pub const GET_REPLY_MAX: usize = GetParameterReply::HEADER_SIZE + MAX_VALUE_LEN;

const _: () = assert!(GET_REPLY_MAX <= MAX_PACKAGE_LENGTH);

/// GetParameter reply: `{group, id, type, array_len, value...}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetParameterReply {
    pub group: u8,
    pub id: u8,
    pub value_type: ParamType,
    pub array_len: u8,
    pub value: Vec<u8, MAX_VALUE_LEN>,
}

impl GetParameterReply {
    pub const HEADER_SIZE: usize = 4;

    pub fn to_bytes(&self) -> Vec<u8, GET_REPLY_MAX> {
        let mut raw = [0u8; GET_REPLY_MAX];
        raw[..Self::HEADER_SIZE].copy_from_slice(&[
            self.group,
            self.id,
            self.value_type.as_u8(),
            self.array_len,
        ]);
        let len = Self::HEADER_SIZE + self.value.len();
        raw[Self::HEADER_SIZE..len].copy_from_slice(&self.value);

        let mut buf = Vec::from_array(raw);
        buf.truncate(len);
        buf
    }

    pub fn from_bytes(buf: &[u8]) -> Result<Self, DecodeError> {
        if buf.len() < Self::HEADER_SIZE {
            return Err(DecodeError::TooShort);
        }
        let value_type = ParamType::from_u8(buf[2]).ok_or(DecodeError::InvalidType)?;
        let mut value = Vec::new();
        value
            .extend_from_slice(&buf[Self::HEADER_SIZE..])
            .map_err(|_| DecodeError::WrongLength)?;
        Ok(Self {
            group: buf[0],
            id: buf[1],
            value_type,
            array_len: buf[3],
            value,
        })
    }
}

/// SetParameter acknowledgement: `{group, id, acknowledged}`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetParameterAck {
    pub group: u8,
    pub id: u8,
    pub acknowledged: bool,
}

impl SetParameterAck {
    pub const SIZE: usize = 3;

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        [self.group, self.id, self.acknowledged as u8]
    }

    pub fn from_bytes(buf: &[u8]) -> Result<Self, DecodeError> {
        if buf.len() != Self::SIZE {
            return Err(DecodeError::WrongLength);
        }
        Ok(Self {
            group: buf[0],
            id: buf[1],
            acknowledged: buf[2] != 0,
        })
    }
}

/// StoreParameters acknowledgement: `{acknowledged}`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreParametersAck {
    pub acknowledged: bool,
}

impl StoreParametersAck {
    pub const SIZE: usize = 1;

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        [self.acknowledged as u8]
    }

    pub fn from_bytes(buf: &[u8]) -> Result<Self, DecodeError> {
        match buf {
            [ack] => Ok(Self {
                acknowledged: *ack != 0,
            }),
            _ => Err(DecodeError::WrongLength),
        }
    }
}
