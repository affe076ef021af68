// decayed_log.rs - the decaying onion replay log
// Copyright (C) 2018  David Stainton.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use futures::stream::{BoxStream, StreamExt};
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use super::config::Config;
use super::notifier::HeightNotifier;
use super::store::{ReplayStore, SqliteStore};
use super::{Fingerprint, ReplayCache, ReplayRecord};
use crate::error::{LogError, StorageError};

/// DecayedLog stores the fingerprint of every processed onion layer along
/// with the layer's outgoing time-lock. It decays: once the chain passes a
/// record's expiry the garbage collector removes it.
///
/// Without a height notifier the collector never runs and records stay
/// until they are deleted.
///
/// `stop` releases the store for good. Restarting means opening a fresh
/// `DecayedLog` over the same database.
pub struct DecayedLog {
    collector: Collector,
    notifier: Option<Arc<dyn HeightNotifier>>,
    running: Mutex<Option<GarbageCollector>>,
    closed: AtomicBool,
}

/// The shared state both the background sweep and manual sweeps act on.
#[derive(Clone)]
struct Collector {
    store: Arc<dyn ReplayStore>,
    height: Arc<AtomicU32>,
    swept: Arc<watch::Sender<u32>>,
}

impl Collector {
    fn collect(&self, height: u32) -> Result<usize, StorageError> {
        self.height.fetch_max(height, Ordering::SeqCst);
        let removed = self.store.delete_expired(height)?;
        self.swept.send_replace(height);
        Ok(removed)
    }
}

struct GarbageCollector {
    shutdown: CancellationToken,
    handle: JoinHandle<()>,
}

impl DecayedLog {
    pub fn new(store: Arc<dyn ReplayStore>, notifier: Option<Arc<dyn HeightNotifier>>) -> DecayedLog {
        let (swept, _) = watch::channel(0);
        DecayedLog {
            collector: Collector {
                store,
                height: Arc::new(AtomicU32::new(0)),
                swept: Arc::new(swept),
            },
            notifier,
            running: Mutex::new(None),
            closed: AtomicBool::new(false),
        }
    }

    /// Open the durable log described by `config`.
    pub fn open(config: &Config, notifier: Option<Arc<dyn HeightNotifier>>) -> Result<DecayedLog, LogError> {
        let store = SqliteStore::open(&config.db_path(), config.busy_timeout)?;
        Ok(DecayedLog::new(Arc::new(store), notifier))
    }

    /// Start the garbage collector on the current tokio runtime.
    pub fn start(&self) -> Result<(), LogError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(LogError::Stopped);
        }
        let mut running = self.running.lock();
        if running.as_ref().is_some_and(|collector| !collector.handle.is_finished()) {
            return Err(LogError::AlreadyRunning);
        }
        let Some(notifier) = &self.notifier else {
            warn!("no block height notifier configured, expired replay records will not be collected");
            return Ok(());
        };
        let runtime = Handle::try_current().map_err(|_| LogError::NoRuntime)?;

        let shutdown = CancellationToken::new();
        let task = Sweeper {
            collector: self.collector.clone(),
            heights: notifier.subscribe(),
            shutdown: shutdown.clone(),
        };
        let handle = runtime.spawn(task.run());
        *running = Some(GarbageCollector { shutdown, handle });
        info!("started decayed log garbage collector");
        Ok(())
    }

    /// Stop the garbage collector, wait for a sweep in flight to commit,
    /// then release the store.
    pub async fn stop(&self) -> Result<(), LogError> {
        self.closed.store(true, Ordering::SeqCst);
        let running = self.running.lock().take();
        if let Some(collector) = running {
            collector.shutdown.cancel();
            if let Err(err) = collector.handle.await {
                error!("decayed log garbage collector did not shut down cleanly: {err}");
            }
        }
        self.collector.store.close()?;
        info!("decayed log stopped");
        Ok(())
    }

    /// False once `stop` was called or the height notifications ended.
    pub fn is_running(&self) -> bool {
        self.running
            .lock()
            .as_ref()
            .is_some_and(|collector| !collector.handle.is_finished())
    }

    /// Retrieve the expiry height stored for a fingerprint.
    pub fn get(&self, fingerprint: &Fingerprint) -> Result<Option<u32>, StorageError> {
        self.collector.store.get(fingerprint)
    }

    /// Store a fingerprint with its expiry height, replacing any existing
    /// record.
    pub fn put(&self, fingerprint: &Fingerprint, expiry: u32) -> Result<(), StorageError> {
        self.put_batch(&[ReplayRecord {
            fingerprint: *fingerprint,
            expiry,
        }])
    }

    pub fn put_batch(&self, records: &[ReplayRecord]) -> Result<(), StorageError> {
        self.collector.store.put_batch(records)
    }

    pub fn delete(&self, fingerprint: &Fingerprint) -> Result<bool, StorageError> {
        self.collector.store.delete(fingerprint)
    }

    /// The highest block height seen so far.
    pub fn current_height(&self) -> u32 {
        self.collector.height.load(Ordering::SeqCst)
    }

    /// Sweep synchronously as if `height` had just been announced.
    pub fn garbage_collect(&self, height: u32) -> Result<usize, StorageError> {
        self.collector.collect(height)
    }

    /// Observe the height of the most recent completed sweep.
    pub fn sweeps(&self) -> watch::Receiver<u32> {
        self.collector.swept.subscribe()
    }
}

impl ReplayCache for DecayedLog {
    fn check_and_record_batch(&self, records: &[ReplayRecord]) -> Result<Vec<bool>, StorageError> {
        self.collector.store.record_batch(records, self.current_height())
    }
}

struct Sweeper {
    collector: Collector,
    heights: BoxStream<'static, u32>,
    shutdown: CancellationToken,
}

async fn sweep(collector: Collector, height: u32) -> Result<usize, StorageError> {
    tokio::task::spawn_blocking(move || collector.collect(height))
        .await
        .map_err(|err| StorageError::Task(err.to_string()))?
}

impl Sweeper {
    async fn run(mut self) {
        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => {
                    trace!("decayed log garbage collector: received shutdown");
                    break;
                }
                next = self.heights.next() => {
                    let Some(height) = next else {
                        debug!("block height notifications ended");
                        break;
                    };
                    let collector = self.collector.clone();
                    match sweep(collector, height).await {
                        Ok(removed) => debug!(height, removed, "collected expired replay records"),
                        Err(err) => error!("failed to collect expired replay records at height {height}: {err}"),
                    }
                }
            }
        }
    }
}
