// router.rs - a node's view of onion packet processing
// Copyright (C) 2018  David Stainton.

//! A `Router` holds a node's private key together with its replay log.
//! Packets are either processed one at a time, or collected into a
//! `Batch` whose fingerprints are committed to the log in a single
//! storage transaction.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use super::ecdh::{PrivateKey, PublicKey};
use super::error::{ProcessingError, StorageError};
use super::packet::{OnionPacket, ProcessedPacket};
use super::replay::{ReplayCache, ReplayRecord};
use super::server::{process_onion_packet, unwrap_onion_layer};

pub struct Router<C> {
    private_key: PrivateKey,
    log: C,
}

impl<C: ReplayCache> Router<C> {
    pub fn new(private_key: PrivateKey, log: C) -> Router<C> {
        Router { private_key, log }
    }

    /// The key senders use to address this node.
    pub fn public_key(&self) -> PublicKey {
        self.private_key.public_key()
    }

    pub fn log(&self) -> &C {
        &self.log
    }

    /// Unwrap one layer and record it in the replay log.
    pub fn process_onion_packet(&self, packet: &OnionPacket, assoc_data: &[u8]) -> Result<ProcessedPacket, ProcessingError> {
        process_onion_packet(packet, &self.private_key, assoc_data, &self.log)
    }

    pub fn begin_batch(&self) -> Batch<'_, C> {
        Batch {
            router: self,
            pending: BTreeMap::new(),
        }
    }
}

/// Batch accumulates processed packets keyed by a caller chosen sequence
/// number. Nothing reaches the replay log until `commit`.
pub struct Batch<'a, C> {
    router: &'a Router<C>,
    pending: BTreeMap<u16, (ReplayRecord, ProcessedPacket)>,
}

impl<'a, C: ReplayCache> Batch<'a, C> {
    /// Authenticate and decrypt a packet, holding on to its fingerprint
    /// until the batch is committed. Packets failing authentication are
    /// rejected immediately and never take part in the commit.
    ///
    /// Reusing a sequence number replaces the packet previously stored
    /// under it.
    pub fn process_onion_packet(&mut self, seq: u16, packet: &OnionPacket, assoc_data: &[u8]) -> Result<(), ProcessingError> {
        let (record, processed) = unwrap_onion_layer(packet, &self.router.private_key, assoc_data)?;
        self.pending.insert(seq, (record, processed));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Record every fingerprint of the batch at once.
    ///
    /// # Returns
    ///
    /// * one result per sequence number in ascending order. Packets whose
    ///   fingerprint was already live in the log, or that repeat an earlier
    ///   packet of the same batch, come back as `ProcessingError::ReplayDetected`.
    pub fn commit(self) -> Result<Vec<(u16, Result<ProcessedPacket, ProcessingError>)>, StorageError> {
        let records: Vec<ReplayRecord> = self.pending.values().map(|(record, _)| *record).collect();
        let replays = self.router.log.check_and_record_batch(&records)?;
        let mut num_replays = 0;
        let results = self
            .pending
            .into_iter()
            .zip(replays)
            .map(|((seq, (_, processed)), replay)| {
                if replay {
                    num_replays += 1;
                    (seq, Err(ProcessingError::ReplayDetected))
                } else {
                    (seq, Ok(processed))
                }
            })
            .collect::<Vec<_>>();
        if num_replays > 0 {
            warn!(num_replays, "rejected replayed onion packets in batch");
        }
        debug!(num_packets = results.len(), "committed onion packet batch");
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rand::rngs::OsRng;

    use super::*;
    use crate::client::new_onion_packet;
    use crate::hop_data::HopData;
    use crate::replay::{DecayedLog, MemoryStore};

    fn packet_for(node: &PublicKey) -> OnionPacket {
        let hops_data = [HopData::new([0u8; 8], 1000, 144)];
        new_onion_packet(&[*node], &PrivateKey::generate(&mut OsRng), &hops_data, b"payment hash").unwrap()
    }

    #[test]
    fn batch_commit_test() {
        let router = Router::new(PrivateKey::generate(&mut OsRng), DecayedLog::new(Arc::new(MemoryStore::new()), None));
        let first = packet_for(&router.public_key());
        let second = packet_for(&router.public_key());

        let mut batch = router.begin_batch();
        batch.process_onion_packet(2, &second, b"payment hash").unwrap();
        batch.process_onion_packet(0, &first, b"payment hash").unwrap();
        batch.process_onion_packet(1, &first, b"payment hash").unwrap();
        assert!(matches!(
            batch.process_onion_packet(3, &first, b"other hash"),
            Err(ProcessingError::IntegrityFailure)
        ));
        assert_eq!(batch.len(), 3);

        let results = batch.commit().unwrap();
        let seqs: Vec<u16> = results.iter().map(|(seq, _)| *seq).collect();
        assert_eq!(seqs, vec![0, 1, 2]);
        assert!(results[0].1.as_ref().unwrap().is_exit());
        assert!(matches!(results[1].1, Err(ProcessingError::ReplayDetected)));
        assert!(results[2].1.is_ok());

        // both fingerprints are now live
        assert!(matches!(
            router.process_onion_packet(&second, b"payment hash"),
            Err(ProcessingError::ReplayDetected)
        ));
    }

    #[test]
    fn empty_batch_test() {
        let router = Router::new(PrivateKey::generate(&mut OsRng), DecayedLog::new(Arc::new(MemoryStore::new()), None));
        let batch = router.begin_batch();
        assert!(batch.is_empty());
        assert!(batch.commit().unwrap().is_empty());
    }
}
