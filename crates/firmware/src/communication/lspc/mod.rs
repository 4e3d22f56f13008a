//! LSPC (serial link) parameter protocol
//!
//! Routes the host's parameter messages to [`ParamHandler`] and sends the
//! replies through an [`LspcTransmit`] implementation.

pub mod dispatcher;
pub mod handler;
pub mod transmit;

pub use dispatcher::{DispatcherStats, InboundMessage, LspcDispatcher};
pub use handler::{ParamHandler, ParamHandlerError};
pub use transmit::{LspcTransmit, TransmitError};
