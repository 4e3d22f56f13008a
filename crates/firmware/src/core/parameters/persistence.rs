//! Parameter persistence
//!
//! Loads the canonical bank from non-volatile storage at startup and writes
//! it back on request.
//!
//! # Region Layout
//!
//! ```text
//! Offset  Size          Field
//! 0       2             Image length (u16 LE)
//! 2       BANK_LENGTH   Bank image
//! ```
//!
//! There is no other header. A stored length that differs from the compiled
//! [`BANK_LENGTH`] means the schema changed; the image is discarded and the
//! compiled defaults are written in its place.

use embassy_sync::blocking_mutex::raw::RawMutex;
use kugle_core::parameters::{ParameterBank, ParameterError, BANK_LENGTH};

use super::storage::ParamStorage;
use super::store::ParameterStore;

/// Size of the length tag preceding the image
const LENGTH_TAG_LEN: usize = 2;

/// Bytes reserved on the backend
pub const REGION_LEN: usize = LENGTH_TAG_LEN + BANK_LENGTH;

const _: () = assert!(BANK_LENGTH <= u16::MAX as usize);

/// How [`ParameterStore::attach_persistence`] initialized the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AttachOutcome {
    /// The stored image was loaded
    Loaded,
    /// The force-defaults flag was set; defaults were written without reading
    ForcedDefaults,
    /// The stored length differed from the compiled bank; defaults were written
    SchemaReset,
    /// The stored image could not be read or decoded; defaults were written
    Corrupt,
    /// The backend could not reserve the region and was not attached
    Unavailable,
}

fn encode_region(bank: &ParameterBank) -> [u8; REGION_LEN] {
    let mut region = [0u8; REGION_LEN];
    region[..LENGTH_TAG_LEN].copy_from_slice(&(BANK_LENGTH as u16).to_le_bytes());
    region[LENGTH_TAG_LEN..].copy_from_slice(&bank.to_image());
    region
}

fn write_region<S: ParamStorage>(
    backend: &mut S,
    bank: &ParameterBank,
) -> Result<(), ParameterError> {
    backend.write(&encode_region(bank)).map_err(|e| {
        crate::log_error!("Parameter write failed: {}", e.as_str());
        ParameterError::StorageFailed
    })
}

impl<M: RawMutex, S: ParamStorage> ParameterStore<M, S> {
    /// Bind a persistence backend and initialize the canonical bank from it
    ///
    /// If the current bank has its force-defaults flag set, the compiled
    /// defaults are installed and written without reading. Otherwise the
    /// stored region is read: a matching length loads the image as the new
    /// canonical content, anything else is replaced by the compiled defaults.
    ///
    /// Caches observe a loaded or reset bank through the usual version bump.
    /// A failure writing defaults is logged; the backend stays attached so a
    /// later store can retry.
    pub async fn attach_persistence(&self, mut backend: S) -> AttachOutcome {
        let mut gate = self.lock_exclusive().await;

        if let Err(e) = backend.reserve(REGION_LEN) {
            crate::log_error!("Parameter region unavailable: {}", e.as_str());
            return AttachOutcome::Unavailable;
        }

        let outcome = if gate.canonical.bank.force_default_parameters {
            AttachOutcome::ForcedDefaults
        } else {
            let mut region = [0u8; REGION_LEN];
            match backend.read(&mut region) {
                Err(e) => {
                    crate::log_warn!("Parameter read failed: {}", e.as_str());
                    AttachOutcome::Corrupt
                }
                Ok(()) => {
                    let declared = u16::from_le_bytes([region[0], region[1]]) as usize;
                    if declared != BANK_LENGTH {
                        crate::log_warn!(
                            "Stored parameter length {} differs from {}",
                            declared,
                            BANK_LENGTH
                        );
                        AttachOutcome::SchemaReset
                    } else {
                        match ParameterBank::from_image(&region[LENGTH_TAG_LEN..]) {
                            Ok(bank) => {
                                gate.canonical.install(bank);
                                AttachOutcome::Loaded
                            }
                            Err(_) => {
                                crate::log_warn!("Stored parameter image is not decodable");
                                AttachOutcome::Corrupt
                            }
                        }
                    }
                }
            }
        };

        if outcome != AttachOutcome::Loaded {
            gate.canonical.install(ParameterBank::DEFAULT);
            let _ = write_region(&mut backend, &gate.canonical.bank);
        }

        match outcome {
            AttachOutcome::Loaded => crate::log_info!("Parameters loaded from storage"),
            AttachOutcome::ForcedDefaults => crate::log_info!("Default parameters forced"),
            _ => crate::log_info!("Default parameters written"),
        }

        *gate.backend = Some(backend);
        outcome
    }

    /// Write the canonical bank to the attached backend
    ///
    /// Holds both permits for the whole write, so the image is never torn by
    /// a concurrent transaction.
    ///
    /// # Errors
    ///
    /// `BackendUnavailable` if no backend is attached, `StorageFailed` if the
    /// backend reports a failure.
    pub async fn persist_now(&self) -> Result<(), ParameterError> {
        let mut gate = self.lock_exclusive().await;
        let Some(backend) = gate.backend.as_mut() else {
            crate::log_warn!("No parameter backend attached");
            return Err(ParameterError::BackendUnavailable);
        };
        write_region(backend, &gate.canonical.bank)?;
        crate::log_debug!("Parameters stored at version {}", gate.canonical.version);
        Ok(())
    }

    /// Whether a backend is attached
    pub async fn has_backend(&self) -> bool {
        self.lock_exclusive().await.backend.is_some()
    }
}
