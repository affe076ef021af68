// mod.rs - onion packet replay protection
// Copyright (C) 2018  David Stainton.

//! Replay protection for processed onion layers.
//!
//! Every successfully unwrapped layer leaves a fingerprint of its shared
//! secret in a decaying log together with the outgoing time-lock of the
//! payment. A second packet yielding the same fingerprint is a replay and
//! is refused until the record expires. Records are collected once the
//! chain height passes their expiry, which keeps the log bounded.

use std::sync::Arc;

use super::constants::HASH_PREFIX_SIZE;
use super::error::StorageError;
use super::internal_crypto::{hash, SharedSecret};

pub mod config;
pub mod decayed_log;
pub mod notifier;
pub mod store;

pub use self::config::Config;
pub use self::decayed_log::DecayedLog;
pub use self::notifier::{ChannelNotifier, HeightNotifier};
pub use self::store::{MemoryStore, ReplayStore, SqliteStore};

/// Truncated SHA-256 of a hop's shared secret.
pub type Fingerprint = [u8; HASH_PREFIX_SIZE];

/// hashSharedSecret returns the first `HASH_PREFIX_SIZE` bytes of the
/// SHA-256 of the shared secret. Only this prefix is ever persisted.
pub fn hash_shared_secret(secret: &SharedSecret) -> Fingerprint {
    let digest = hash(&[&secret.as_bytes()[..]]);
    let mut fingerprint = [0u8; HASH_PREFIX_SIZE];
    fingerprint.copy_from_slice(&digest[..HASH_PREFIX_SIZE]);
    fingerprint
}

/// A processed layer and the block height after which it may be forgotten.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ReplayRecord {
    pub fingerprint: Fingerprint,
    pub expiry: u32,
}

/// A record is still protecting against replays until the chain height
/// moves past its expiry.
pub(crate) fn is_live(expiry: u32, height: u32) -> bool {
    expiry >= height
}

/// This trait is used to detect onion packet replays. The check and the
/// insertion of a fingerprint must be a single atomic step, so that two
/// concurrent deliveries of one layer cannot both be accepted.
pub trait ReplayCache {
    /// Record every fingerprint of the batch that is not already held,
    /// returning for each record whether it was a replay. Replays leave
    /// the stored record untouched. A fingerprint repeated within the
    /// batch is a replay from its second occurrence on.
    fn check_and_record_batch(&self, records: &[ReplayRecord]) -> Result<Vec<bool>, StorageError>;

    /// returns true if the layer has been seen before
    fn check_and_record(&self, record: &ReplayRecord) -> Result<bool, StorageError> {
        let replays = self.check_and_record_batch(std::slice::from_ref(record))?;
        Ok(replays.first().copied().unwrap_or(false))
    }
}

impl<C: ReplayCache + ?Sized> ReplayCache for Arc<C> {
    fn check_and_record_batch(&self, records: &[ReplayRecord]) -> Result<Vec<bool>, StorageError> {
        (**self).check_and_record_batch(records)
    }
}

impl<C: ReplayCache + ?Sized> ReplayCache for &C {
    fn check_and_record_batch(&self, records: &[ReplayRecord]) -> Result<Vec<bool>, StorageError> {
        (**self).check_and_record_batch(records)
    }
}
