//! Per-task parameter cache
//!
//! Each control task keeps its own copy of the bank and refreshes it once per
//! cycle. Reading fields from the cache never waits on the store.

use core::ops::Deref;

use embassy_sync::blocking_mutex::raw::RawMutex;
use kugle_core::parameters::ParameterBank;

use super::store::{ParameterStore, RefreshOutcome};

/// Read-only snapshot of the canonical bank
///
/// Always holds one complete committed version (or the compiled defaults
/// before the first successful refresh).
#[derive(Debug, Clone, Copy)]
pub struct LocalCache {
    bank: ParameterBank,
    version: Option<u32>,
}

impl LocalCache {
    /// Cache seeded from `store`
    ///
    /// Tries to take a snapshot immediately; if a writer is active the cache
    /// starts detached and catches up on the first refresh.
    pub fn new<M: RawMutex, S>(store: &ParameterStore<M, S>) -> Self {
        let mut cache = Self::detached();
        let _ = store.refresh(&mut cache);
        cache
    }

    /// Cache holding the compiled defaults and no version
    pub const fn detached() -> Self {
        Self {
            bank: ParameterBank::DEFAULT,
            version: None,
        }
    }

    /// Shorthand for [`ParameterStore::refresh`]
    pub fn refresh<M: RawMutex, S>(&mut self, store: &ParameterStore<M, S>) -> RefreshOutcome {
        store.refresh(self)
    }

    /// Version last copied from the store
    pub fn version(&self) -> Option<u32> {
        self.version
    }

    pub(super) fn update(&mut self, bank: &ParameterBank, version: u32) {
        self.bank = *bank;
        self.version = Some(version);
    }
}

impl Default for LocalCache {
    fn default() -> Self {
        Self::detached()
    }
}

impl Deref for LocalCache {
    type Target = ParameterBank;

    fn deref(&self) -> &ParameterBank {
        &self.bank
    }
}
