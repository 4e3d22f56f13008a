//! LSPC parameter protocol
//!
//! Wire format of the four parameter messages (get, set, store, dump)
//! exchanged with the host. Transport framing is out of scope.

pub mod dump;
pub mod messages;

pub use dump::{fragment_count, fragments, DumpHeader};
pub use messages::{
    DecodeError, GetParameterReply, GetParameterRequest, MessageTypeFromHost, MessageTypeToHost,
    SetParameterAck, SetParameterRequest, StoreParametersAck, GET_REPLY_MAX, MAX_PACKAGE_LENGTH,
};
