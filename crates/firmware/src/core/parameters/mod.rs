//! Shared parameter store
//!
//! The bank schema, registry and error types come from
//! `kugle_core::parameters`. This module adds the concurrent store, the
//! per-task caches and persistence through flash.

pub mod cache;
pub mod persistence;
pub mod storage;
pub mod store;

pub use cache::LocalCache;
pub use kugle_core::parameters::{
    lookup, param_id, ParamGroup, ParamType, ParamValue, ParameterBank, ParameterError,
    BANK_LENGTH,
};
pub use persistence::{AttachOutcome, REGION_LEN};
pub use storage::{FlashParamStorage, ParamStorage, StorageStats, PARAM_REGION_ADDRESS};
pub use store::{ParamChange, ParameterStore, RefreshOutcome};
