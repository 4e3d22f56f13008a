//! LSPC Message Dispatcher
//!
//! Routes inbound messages to the parameter handler by message type and
//! keeps simple statistics. Messages are handled one at a time, each to
//! completion, in the order they arrive.

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::channel::Channel;
use heapless::Vec;
use kugle_core::protocol::{MessageTypeFromHost, MAX_PACKAGE_LENGTH};

use super::handler::{ParamHandler, ParamHandlerError};
use super::transmit::LspcTransmit;
use crate::core::parameters::ParamStorage;

/// One whole message delivered by the link's framing layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub message_type: u8,
    pub payload: Vec<u8, MAX_PACKAGE_LENGTH>,
}

impl InboundMessage {
    /// Copy `payload` into a message; `None` if it exceeds the link maximum
    pub fn new(message_type: u8, payload: &[u8]) -> Option<Self> {
        Some(Self {
            message_type,
            payload: Vec::from_slice(payload).ok()?,
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatcherStats {
    pub messages_processed: u32,
    pub unhandled_messages: u32,
    pub handler_errors: u32,
}

pub struct LspcDispatcher<'a, M: RawMutex, S, T: LspcTransmit> {
    handler: ParamHandler<'a, M, S>,
    tx: T,
    stats: DispatcherStats,
}

impl<'a, M: RawMutex, S: ParamStorage, T: LspcTransmit> LspcDispatcher<'a, M, S, T> {
    pub fn new(handler: ParamHandler<'a, M, S>, tx: T) -> Self {
        Self {
            handler,
            tx,
            stats: DispatcherStats::default(),
        }
    }

    /// Handle one inbound message
    ///
    /// Returns `false` for message types that are not parameter messages;
    /// those are left for other subscribers of the link.
    pub async fn dispatch(&mut self, message_type: u8, payload: &[u8]) -> bool {
        self.stats.messages_processed += 1;

        let Some(kind) = MessageTypeFromHost::from_u8(message_type) else {
            crate::log_trace!("Ignoring LSPC message type {}", message_type);
            self.stats.unhandled_messages += 1;
            return false;
        };

        let result = match kind {
            MessageTypeFromHost::GetParameter => self.handler.handle_get(payload, &mut self.tx).await,
            MessageTypeFromHost::SetParameter => self.handler.handle_set(payload, &mut self.tx).await,
            MessageTypeFromHost::StoreParameters => self.handler.handle_store(&mut self.tx).await,
            MessageTypeFromHost::DumpParameters => self.handler.handle_dump(&mut self.tx).await,
        };

        if let Err(e) = result {
            self.stats.handler_errors += 1;
            match e {
                ParamHandlerError::Decode(e) => {
                    crate::log_warn!("LSPC type {} undecodable: {}", message_type, e.as_str())
                }
                ParamHandlerError::Transmit(e) => {
                    crate::log_warn!("LSPC type {} reply lost: {}", message_type, e.as_str())
                }
            }
        }
        true
    }

    /// Serve messages from `inbox` forever
    pub async fn run<CM: RawMutex, const N: usize>(
        &mut self,
        inbox: &Channel<CM, InboundMessage, N>,
    ) -> ! {
        crate::log_info!("LSPC parameter dispatcher started");
        loop {
            let message = inbox.receive().await;
            self.dispatch(message.message_type, &message.payload).await;
        }
    }

    pub fn stats(&self) -> DispatcherStats {
        self.stats
    }

    pub fn transmitter(&self) -> &T {
        &self.tx
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::RecordingTransmitter;
    use super::*;
    use crate::core::parameters::{param_id, FlashParamStorage, ParamGroup, ParameterStore};
    use crate::platform::mock::MockFlash;
    use embassy_futures::select::{select, Either};
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;
    use kugle_core::protocol::MessageTypeToHost;

    type TestStore = ParameterStore<NoopRawMutex, FlashParamStorage<MockFlash>>;

    const CONTROLLER: u8 = ParamGroup::Controller as u8;

    #[tokio::test]
    async fn test_routes_by_message_type() {
        let store = TestStore::new();
        let mut dispatcher =
            LspcDispatcher::new(ParamHandler::new(&store), RecordingTransmitter::new());

        assert!(dispatcher.dispatch(0x20, &[CONTROLLER, param_id::controller::MODE]).await);
        assert!(dispatcher.dispatch(0x22, &[]).await);
        assert!(!dispatcher.dispatch(0x10, &[1, 2, 3]).await);

        let sent: std::vec::Vec<_> = dispatcher.transmitter().sent.iter().map(|m| m.0).collect();
        assert_eq!(
            sent,
            [MessageTypeToHost::GetParameter, MessageTypeToHost::StoreParametersAck]
        );
        assert_eq!(
            dispatcher.stats(),
            DispatcherStats {
                messages_processed: 3,
                unhandled_messages: 1,
                handler_errors: 0,
            }
        );
    }

    #[tokio::test]
    async fn test_handler_errors_are_counted() {
        let store = TestStore::new();
        let mut dispatcher =
            LspcDispatcher::new(ParamHandler::new(&store), RecordingTransmitter::new());

        // Too short for GetParameter and SetParameter
        assert!(dispatcher.dispatch(0x20, &[CONTROLLER]).await);
        assert!(dispatcher.dispatch(0x21, &[CONTROLLER]).await);

        // Only the Set is answered, with a nack
        assert_eq!(
            dispatcher.transmitter().sent,
            [(MessageTypeToHost::SetParameterAck, std::vec![CONTROLLER, 0, 0])]
        );
        assert_eq!(dispatcher.stats().handler_errors, 2);
    }

    #[tokio::test]
    async fn test_run_serves_queued_messages_in_order() {
        let store = TestStore::new();
        let inbox: Channel<NoopRawMutex, InboundMessage, 4> = Channel::new();
        let mut dispatcher =
            LspcDispatcher::new(ParamHandler::new(&store), RecordingTransmitter::new());

        let mode = param_id::controller::MODE;
        for (ty, payload) in [
            (0x21, &[CONTROLLER, mode, 2, 1, 4][..]),
            (0x20, &[CONTROLLER, mode][..]),
            (0x23, &[][..]),
        ] {
            inbox.try_send(InboundMessage::new(ty, payload).unwrap()).unwrap();
        }

        // Once the queue is drained `run` waits, and the second future completes
        let finished = select(dispatcher.run(&inbox), async {}).await;
        assert!(matches!(finished, Either::Second(())));

        let sent = &dispatcher.transmitter().sent;
        assert_eq!(sent[0], (MessageTypeToHost::SetParameterAck, std::vec![CONTROLLER, mode, 1]));
        assert_eq!(sent[1].1[4..], [4]);
        assert_eq!(sent[2].0, MessageTypeToHost::DumpParameters);
        assert_eq!(dispatcher.stats().messages_processed, 3);
    }

    #[test]
    fn test_oversized_message_rejected() {
        assert!(InboundMessage::new(0x21, &[0u8; MAX_PACKAGE_LENGTH + 1]).is_none());
        assert!(InboundMessage::new(0x21, &[0u8; MAX_PACKAGE_LENGTH]).is_some());
    }
}
