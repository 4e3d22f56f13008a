//! LSPC Parameter Protocol Handler
//!
//! Serves the host's parameter requests against the shared store.
//!
//! # Supported Messages
//!
//! - **GetParameter**: reply with the current value; unknown addresses are
//!   dropped without a reply
//! - **SetParameter**: validate and write inside a store transaction, then
//!   acknowledge or nack
//! - **StoreParameters**: persist the canonical bank, acknowledge on success
//! - **DumpParameters**: stream the whole bank image as a header followed by
//!   fragments
//!
//! Protocol failures become nacks or silent drops. The errors returned here
//! only cover undecodable payloads and a failing link, for the dispatcher's
//! statistics.

use embassy_sync::blocking_mutex::raw::RawMutex;
use kugle_core::parameters::BANK_LENGTH;
use kugle_core::protocol::{
    fragments, DecodeError, DumpHeader, GetParameterReply, GetParameterRequest,
    MessageTypeToHost, SetParameterAck, SetParameterRequest, StoreParametersAck,
    MAX_PACKAGE_LENGTH,
};

use super::transmit::{LspcTransmit, TransmitError};
use crate::core::parameters::{ParamStorage, ParameterError, ParameterStore};

/// Parameter handler error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamHandlerError {
    /// Request payload could not be decoded
    Decode(DecodeError),
    /// Reply could not be transmitted
    Transmit(TransmitError),
}

impl From<DecodeError> for ParamHandlerError {
    fn from(err: DecodeError) -> Self {
        ParamHandlerError::Decode(err)
    }
}

impl From<TransmitError> for ParamHandlerError {
    fn from(err: TransmitError) -> Self {
        ParamHandlerError::Transmit(err)
    }
}

/// Parameter protocol handler
///
/// Borrows the store; several handlers (one per link) may share it.
pub struct ParamHandler<'a, M: RawMutex, S> {
    store: &'a ParameterStore<M, S>,
}

impl<'a, M: RawMutex, S: ParamStorage> ParamHandler<'a, M, S> {
    pub fn new(store: &'a ParameterStore<M, S>) -> Self {
        Self { store }
    }

    /// Handle GetParameter
    ///
    /// Holds the read permit only while the value is copied.
    pub async fn handle_get<T: LspcTransmit>(
        &self,
        payload: &[u8],
        tx: &mut T,
    ) -> Result<(), ParamHandlerError> {
        let request = GetParameterRequest::from_bytes(payload).inspect_err(|_| {
            crate::log_warn!("Malformed GetParameter ({} bytes)", payload.len());
        })?;

        let found = self.store.read().await.get_bytes(request.group, request.id);
        let (info, value) = match found {
            Ok(found) => found,
            Err(_) => {
                crate::log_debug!("GetParameter {}.{} unknown", request.group, request.id);
                return Ok(());
            }
        };

        let reply = GetParameterReply {
            group: request.group,
            id: request.id,
            value_type: info.param_type(),
            array_len: info.array_len(),
            value,
        };
        tx.transmit(MessageTypeToHost::GetParameter, &reply.to_bytes())
            .await
            .inspect_err(|e| crate::log_error!("GetParameter reply failed: {}", e.as_str()))?;
        Ok(())
    }

    /// Handle SetParameter
    ///
    /// The write happens inside a store transaction that is committed even
    /// when the request is rejected, so the version still advances. Every
    /// request is answered with exactly one ack. A payload too short to carry
    /// an address is nacked with the address bytes it has (missing ones as 0,
    /// which no group uses) and reported as undecodable.
    pub async fn handle_set<T: LspcTransmit>(
        &self,
        payload: &[u8],
        tx: &mut T,
    ) -> Result<(), ParamHandlerError> {
        let Some((group, id)) = SetParameterRequest::address(payload) else {
            crate::log_warn!("SetParameter without address ({} bytes)", payload.len());
            let ack = SetParameterAck {
                group: payload.first().copied().unwrap_or(0),
                id: 0,
                acknowledged: false,
            };
            self.send_set_ack(&ack, tx).await?;
            return Err(DecodeError::TooShort.into());
        };

        let mut change = self.store.begin_change().await;
        let result = SetParameterRequest::from_bytes(payload)
            .map_err(|_| ParameterError::TypeOrLengthMismatch)
            .and_then(|request| {
                change.set_bytes(
                    request.group,
                    request.id,
                    request.value_type,
                    request.array_len,
                    request.value,
                )
            });
        let version = change.commit();

        let acknowledged = match result {
            Ok(_) => {
                crate::log_debug!("SetParameter {}.{} -> version {}", group, id, version);
                true
            }
            Err(e) => {
                crate::log_warn!("SetParameter {}.{} rejected: {}", group, id, e.as_str());
                false
            }
        };

        self.send_set_ack(
            &SetParameterAck {
                group,
                id,
                acknowledged,
            },
            tx,
        )
        .await
    }

    async fn send_set_ack<T: LspcTransmit>(
        &self,
        ack: &SetParameterAck,
        tx: &mut T,
    ) -> Result<(), ParamHandlerError> {
        tx.transmit(MessageTypeToHost::SetParameterAck, &ack.to_bytes())
            .await
            .inspect_err(|e| crate::log_error!("SetParameter ack failed: {}", e.as_str()))?;
        Ok(())
    }

    /// Handle StoreParameters
    pub async fn handle_store<T: LspcTransmit>(&self, tx: &mut T) -> Result<(), ParamHandlerError> {
        let acknowledged = self.store.persist_now().await.is_ok();
        let ack = StoreParametersAck { acknowledged };
        tx.transmit(MessageTypeToHost::StoreParametersAck, &ack.to_bytes())
            .await
            .inspect_err(|e| crate::log_error!("StoreParameters ack failed: {}", e.as_str()))?;
        Ok(())
    }

    /// Handle DumpParameters
    ///
    /// Holds the read permit for the whole stream so every fragment comes
    /// from the same version.
    pub async fn handle_dump<T: LspcTransmit>(&self, tx: &mut T) -> Result<(), ParamHandlerError> {
        let max_fragment = tx.max_payload_len().clamp(1, MAX_PACKAGE_LENGTH);

        let bank = self.store.read().await;
        let image = bank.to_image();
        let header = DumpHeader::new(BANK_LENGTH, max_fragment);

        let header_bytes = header.to_bytes();
        let chunks = core::iter::once(&header_bytes[..]).chain(fragments(&image, max_fragment));
        for chunk in chunks {
            tx.transmit(MessageTypeToHost::DumpParameters, chunk)
                .await
                .inspect_err(|e| crate::log_error!("Dump aborted: {}", e.as_str()))?;
        }
        crate::log_debug!(
            "Dumped {} bytes in {} fragments",
            header.total_len,
            header.fragment_count
        );
        drop(bank);
        Ok(())
    }
}
