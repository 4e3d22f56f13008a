//! Shared parameter store
//!
//! One canonical [`ParameterBank`] per device, read by every control task and
//! mutated by the remote command handler.
//!
//! # Permits
//!
//! Two async mutexes gate the canonical bank:
//!
//! - the **write permit** serializes writers and persistence (it also owns
//!   the persistence backend)
//! - the **read permit** protects the canonical bank while it is copied
//!
//! Writers take the write permit before the read permit and release them in
//! reverse order. Both permits are private; outside this crate the only ways
//! to take them are [`ParameterStore::begin_change`],
//! [`ParameterStore::snapshot`], [`ParameterStore::refresh`] and the
//! persistence operations. None of the read paths hand out a guard, so a
//! caller can never hold the read permit while waiting for the write permit.
//!
//! # Example
//!
//! ```
//! use embassy_sync::blocking_mutex::raw::NoopRawMutex;
//! use kugle_firmware::core::parameters::{LocalCache, ParameterStore, RefreshOutcome};
//!
//! let store: ParameterStore<NoopRawMutex, ()> = ParameterStore::new();
//! let mut cache = LocalCache::new(&store);
//!
//! embassy_futures::block_on(async {
//!     let mut change = store.begin_change().await;
//!     change.controller.mode = 2;
//!     change.commit();
//! });
//!
//! assert!(matches!(store.refresh(&mut cache), RefreshOutcome::Updated { .. }));
//! assert_eq!(cache.controller.mode, 2);
//! ```

use core::ops::{Deref, DerefMut};

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::mutex::{Mutex, MutexGuard};
use kugle_core::parameters::ParameterBank;

use super::cache::LocalCache;

/// Canonical bank and its version counter, guarded by the read permit
pub(super) struct Canonical {
    pub(super) bank: ParameterBank,
    pub(super) version: u32,
}

impl Canonical {
    /// Replace the bank, bumping the version if the content changed
    pub(super) fn install(&mut self, bank: ParameterBank) {
        if self.bank != bank {
            self.bank = bank;
            self.version = self.version.wrapping_add(1);
        }
    }
}

/// Both permits, held by writers and persistence
///
/// Fields drop in declaration order, so the read permit is released before
/// the write permit.
pub(super) struct Exclusive<'a, M: RawMutex, S> {
    pub(super) canonical: MutexGuard<'a, M, Canonical>,
    pub(super) backend: MutexGuard<'a, M, Option<S>>,
}

/// Result of a [`ParameterStore::refresh`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RefreshOutcome {
    /// The cache now holds `version`
    Updated { version: u32 },
    /// The cache already held the current version
    UpToDate,
    /// A writer held the read permit; the cache is unchanged
    Busy,
}

/// Shared parameter store
///
/// `M` selects the raw mutex (`CriticalSectionRawMutex` across tasks and
/// interrupt priorities, `NoopRawMutex` for a single executor). `S` is the
/// persistence backend, bound later with `attach_persistence`.
pub struct ParameterStore<M: RawMutex, S> {
    write: Mutex<M, Option<S>>,
    read: Mutex<M, Canonical>,
}

impl<M: RawMutex, S> ParameterStore<M, S> {
    /// Store holding the compiled defaults, usable in a `static`
    pub const fn new() -> Self {
        Self::with_bank(ParameterBank::DEFAULT)
    }

    /// Store holding `bank` as version 0
    pub const fn with_bank(bank: ParameterBank) -> Self {
        Self {
            write: Mutex::new(None),
            read: Mutex::new(Canonical { bank, version: 0 }),
        }
    }

    /// Take both permits in order
    pub(super) async fn lock_exclusive(&self) -> Exclusive<'_, M, S> {
        let backend = self.write.lock().await;
        let canonical = self.read.lock().await;
        Exclusive { canonical, backend }
    }

    /// Open a write transaction
    ///
    /// Waits for any other writer or persistence operation to finish, then
    /// hands out a working copy of the canonical bank. Readers are held off
    /// until the transaction ends.
    pub async fn begin_change(&self) -> ParamChange<'_, M, S> {
        let gate = self.lock_exclusive().await;
        ParamChange {
            working: gate.canonical.bank,
            gate,
        }
    }

    /// Hold the read permit and borrow the canonical bank
    ///
    /// Waits only while a writer holds the read permit. The guard must be
    /// dropped before taking the write permit.
    pub(crate) async fn read(&self) -> ParamRead<'_, M> {
        ParamRead {
            canonical: self.read.lock().await,
        }
    }

    /// Copy of the canonical bank and its version
    pub async fn snapshot(&self) -> (ParameterBank, u32) {
        let canonical = self.read().await;
        (*canonical, canonical.version())
    }

    /// Current version (waits like [`snapshot`](Self::snapshot))
    pub async fn version(&self) -> u32 {
        self.read().await.version()
    }

    /// Bring `cache` up to date without waiting
    ///
    /// Copies the whole canonical bank if the cache's version differs. If a
    /// writer currently holds the read permit, the cache is left unchanged and
    /// [`RefreshOutcome::Busy`] is returned; the next call will catch up.
    pub fn refresh(&self, cache: &mut LocalCache) -> RefreshOutcome {
        let Ok(canonical) = self.read.try_lock() else {
            return RefreshOutcome::Busy;
        };

        if cache.version() == Some(canonical.version) {
            return RefreshOutcome::UpToDate;
        }
        cache.update(&canonical.bank, canonical.version);
        RefreshOutcome::Updated {
            version: canonical.version,
        }
    }
}

impl<M: RawMutex, S> Default for ParameterStore<M, S> {
    fn default() -> Self {
        Self::new()
    }
}

/// Open write transaction
///
/// Dereferences to the working copy. [`commit`](Self::commit) publishes it;
/// dropping the transaction without committing discards it and leaves the
/// version unchanged.
#[must_use = "dropping a change without commit discards it"]
pub struct ParamChange<'a, M: RawMutex, S> {
    working: ParameterBank,
    gate: Exclusive<'a, M, S>,
}

impl<M: RawMutex, S> ParamChange<'_, M, S> {
    /// Version the working copy was seeded from
    pub fn base_version(&self) -> u32 {
        self.gate.canonical.version
    }

    /// Publish the working copy and release both permits
    ///
    /// Bumps the version by exactly one, even if nothing changed, and returns
    /// the new version.
    pub fn commit(mut self) -> u32 {
        let canonical = &mut self.gate.canonical;
        canonical.bank = self.working;
        canonical.version = canonical.version.wrapping_add(1);
        canonical.version
    }
}

impl<M: RawMutex, S> Deref for ParamChange<'_, M, S> {
    type Target = ParameterBank;

    fn deref(&self) -> &ParameterBank {
        &self.working
    }
}

impl<M: RawMutex, S> DerefMut for ParamChange<'_, M, S> {
    fn deref_mut(&mut self) -> &mut ParameterBank {
        &mut self.working
    }
}

/// Read access to the canonical bank
///
/// Holds the read permit until dropped.
pub(crate) struct ParamRead<'a, M: RawMutex> {
    canonical: MutexGuard<'a, M, Canonical>,
}

impl<M: RawMutex> ParamRead<'_, M> {
    pub(crate) fn version(&self) -> u32 {
        self.canonical.version
    }
}

impl<M: RawMutex> Deref for ParamRead<'_, M> {
    type Target = ParameterBank;

    fn deref(&self) -> &ParameterBank {
        &self.canonical.bank
    }
}
