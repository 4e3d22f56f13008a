//! Integration tests for the shared parameter store
//!
//! Exercise the store through its public API the way the firmware wires it:
//! a persistence backend, control tasks refreshing caches on other threads,
//! and the LSPC dispatcher serving host requests.

use std::sync::{Arc, Mutex};
use std::thread;

use critical_section as _;
use embassy_futures::block_on;
use embassy_sync::blocking_mutex::raw::{CriticalSectionRawMutex, NoopRawMutex};
use kugle_firmware::communication::lspc::{LspcDispatcher, LspcTransmit, ParamHandler, TransmitError};
use kugle_firmware::core::parameters::{
    lookup, param_id, AttachOutcome, LocalCache, ParamGroup, ParamStorage, ParameterBank,
    ParameterStore, RefreshOutcome, BANK_LENGTH, REGION_LEN,
};
use kugle_firmware::platform::{FlashError, PlatformError, Result as PlatformResult};
use kugle_core::protocol::MessageTypeToHost;

const CONTROLLER: u8 = ParamGroup::Controller as u8;
const TEST: u8 = ParamGroup::Test as u8;

/// Byte-addressed backend whose contents the test can inspect from any thread
#[derive(Clone, Default)]
struct SharedStorage {
    region: Arc<Mutex<Vec<u8>>>,
}

impl SharedStorage {
    fn with_contents(contents: &[u8]) -> Self {
        Self {
            region: Arc::new(Mutex::new(contents.to_vec())),
        }
    }

    fn contents(&self) -> Vec<u8> {
        self.region.lock().unwrap().clone()
    }

    fn stored_bank(&self) -> ParameterBank {
        let region = self.contents();
        assert_eq!(&region[..2], &(BANK_LENGTH as u16).to_le_bytes());
        ParameterBank::from_image(&region[2..REGION_LEN]).unwrap()
    }
}

impl ParamStorage for SharedStorage {
    fn reserve(&mut self, len: usize) -> PlatformResult<()> {
        let mut region = self.region.lock().unwrap();
        if region.len() < len {
            region.resize(len, 0xFF);
        }
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> PlatformResult<()> {
        let region = self.region.lock().unwrap();
        let stored = region
            .get(..buf.len())
            .ok_or(PlatformError::Flash(FlashError::ReadFailed))?;
        buf.copy_from_slice(stored);
        Ok(())
    }

    fn write(&mut self, data: &[u8]) -> PlatformResult<()> {
        let mut region = self.region.lock().unwrap();
        let target = region
            .get_mut(..data.len())
            .ok_or(PlatformError::Flash(FlashError::WriteFailed))?;
        target.copy_from_slice(data);
        Ok(())
    }
}

#[derive(Default)]
struct Recorder {
    sent: Vec<(MessageTypeToHost, Vec<u8>)>,
}

impl LspcTransmit for Recorder {
    async fn transmit(
        &mut self,
        message_type: MessageTypeToHost,
        payload: &[u8],
    ) -> Result<(), TransmitError> {
        self.sent.push((message_type, payload.to_vec()));
        Ok(())
    }
}

#[test]
fn test_end_to_end_set_get_store() {
    let storage = SharedStorage::default();
    let store: ParameterStore<NoopRawMutex, SharedStorage> = ParameterStore::new();
    let mut dispatcher = LspcDispatcher::new(ParamHandler::new(&store), Recorder::default());
    let mode = param_id::controller::MODE;

    block_on(async {
        assert_eq!(
            store.attach_persistence(storage.clone()).await,
            AttachOutcome::SchemaReset
        );
        dispatcher.dispatch(0x21, &[CONTROLLER, mode, 2, 1, 2]).await;
        dispatcher.dispatch(0x20, &[CONTROLLER, mode]).await;
        dispatcher.dispatch(0x22, &[]).await;
    });

    let sent = &dispatcher.transmitter().sent;
    assert_eq!(
        sent.as_slice(),
        &[
            (MessageTypeToHost::SetParameterAck, vec![CONTROLLER, mode, 1]),
            (MessageTypeToHost::GetParameter, vec![CONTROLLER, mode, 2, 1, 2]),
            (MessageTypeToHost::StoreParametersAck, vec![1]),
        ]
    );

    let offset = lookup(CONTROLLER, mode).unwrap().offset;
    assert_eq!(storage.contents()[2 + offset], 2);
    assert_eq!(storage.stored_bank().controller.mode, 2);
}

#[test]
fn test_stored_parameters_survive_restart() {
    let storage = SharedStorage::default();

    let store: ParameterStore<NoopRawMutex, SharedStorage> = ParameterStore::new();
    block_on(async {
        store.attach_persistence(storage.clone()).await;
        let mut change = store.begin_change().await;
        change.model.encoder_ticks_per_rev = 4096;
        change.behavioural.independent_heading = true;
        change.commit();
        store.persist_now().await.unwrap();
    });

    let rebooted: ParameterStore<NoopRawMutex, SharedStorage> = ParameterStore::new();
    let mut cache = LocalCache::new(&rebooted);
    assert_eq!(
        block_on(rebooted.attach_persistence(storage.clone())),
        AttachOutcome::Loaded
    );
    assert!(matches!(
        rebooted.refresh(&mut cache),
        RefreshOutcome::Updated { .. }
    ));
    assert_eq!(cache.model.encoder_ticks_per_rev, 4096);
    assert!(cache.behavioural.independent_heading);
}

#[test]
fn test_schema_change_resets_to_defaults() {
    let mut old = vec![0u8; REGION_LEN];
    old[..2].copy_from_slice(&((BANK_LENGTH + 8) as u16).to_le_bytes());
    let storage = SharedStorage::with_contents(&old);

    let store: ParameterStore<NoopRawMutex, SharedStorage> = ParameterStore::new();
    assert_eq!(
        block_on(store.attach_persistence(storage.clone())),
        AttachOutcome::SchemaReset
    );
    assert_eq!(block_on(store.snapshot()).0, ParameterBank::DEFAULT);
    assert_eq!(storage.stored_bank(), ParameterBank::DEFAULT);
}

#[test]
fn test_store_without_backend_is_nacked() {
    let store: ParameterStore<NoopRawMutex, SharedStorage> = ParameterStore::new();
    let mut dispatcher = LspcDispatcher::new(ParamHandler::new(&store), Recorder::default());

    block_on(dispatcher.dispatch(0x22, &[]));
    assert_eq!(
        dispatcher.transmitter().sent,
        vec![(MessageTypeToHost::StoreParametersAck, vec![0])]
    );
}

#[test]
fn test_rejected_set_keeps_value() {
    let store: ParameterStore<NoopRawMutex, SharedStorage> = ParameterStore::new();
    let mut dispatcher = LspcDispatcher::new(ParamHandler::new(&store), Recorder::default());
    let tmp = param_id::test::TMP;

    block_on(async {
        dispatcher.dispatch(0x21, &[TEST, tmp, 1, 1, 0, 0, 0x80, 0x3F]).await;
        // uint32 tag for a float field
        dispatcher.dispatch(0x21, &[TEST, tmp, 4, 1, 0, 0, 0, 0x40]).await;
    });

    let acks: Vec<u8> = dispatcher.transmitter().sent.iter().map(|m| m.1[2]).collect();
    assert_eq!(acks, [1, 0]);
    assert_eq!(block_on(store.snapshot()).0.test.tmp, 1.0);
}

#[test]
fn test_concurrent_readers_see_whole_transactions() {
    const TRANSACTIONS: u32 = 2000;
    let store: Arc<ParameterStore<CriticalSectionRawMutex, SharedStorage>> =
        Arc::new(ParameterStore::new());

    let writer = {
        let store = store.clone();
        thread::spawn(move || {
            for k in 1..=TRANSACTIONS {
                block_on(async {
                    let mut change = store.begin_change().await;
                    change.test.tmp = k as f32;
                    change.test.tmp2 = k as f32;
                    change.commit();
                });
            }
        })
    };

    let readers: Vec<_> = (0..3)
        .map(|_| {
            let store = store.clone();
            thread::spawn(move || {
                let mut cache = LocalCache::new(&*store);
                let mut last_version = cache.version();
                loop {
                    if let RefreshOutcome::Updated { version } = store.refresh(&mut cache) {
                        assert!(Some(version) > last_version);
                        last_version = Some(version);
                    }
                    assert_eq!(cache.test.tmp, cache.test.tmp2);
                    assert_eq!(cache.test.tmp as u32, cache.version().unwrap_or(0));
                    if cache.version() == Some(TRANSACTIONS) {
                        break;
                    }
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }
    assert_eq!(block_on(store.version()), TRANSACTIONS);
}

#[test]
fn test_persisted_image_is_never_torn() {
    const TRANSACTIONS: u32 = 500;
    let storage = SharedStorage::default();
    let store: Arc<ParameterStore<CriticalSectionRawMutex, SharedStorage>> =
        Arc::new(ParameterStore::new());
    block_on(store.attach_persistence(storage.clone()));

    let writer = {
        let store = store.clone();
        thread::spawn(move || {
            for k in 1..=TRANSACTIONS {
                block_on(async {
                    let mut change = store.begin_change().await;
                    change.test.tmp = k as f32;
                    change.test.tmp2 = k as f32;
                    change.commit();
                });
            }
        })
    };

    let persister = {
        let store = store.clone();
        let storage = storage.clone();
        thread::spawn(move || {
            let mut last = 0.0f32;
            while last < TRANSACTIONS as f32 {
                block_on(store.persist_now()).unwrap();
                let bank = storage.stored_bank();
                assert_eq!(bank.test.tmp, bank.test.tmp2);
                assert!(bank.test.tmp >= last);
                last = bank.test.tmp;
            }
        })
    };

    writer.join().unwrap();
    persister.join().unwrap();
}
