// server.rs - onion packet processing
// Copyright (C) 2018  David Anthony Stainton.
//
// MIT License
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
// SOFTWARE.

//! Hops process incoming packets first by authenticating the routing
//! info against the header MAC and the associated data. A packet failing
//! this check MUST be discarded with no additional processing.
//!
//! The layer is then decrypted and its fingerprint checked against the
//! replay log. A packet whose fingerprint is already recorded is a replay
//! and MUST be discarded. Otherwise the fingerprint is recorded and the
//! hop either forwards the re-randomized packet or, at the exit, delivers
//! its payload.

use subtle::ConstantTimeEq;
use tracing::{trace, warn};

use super::constants::{HOP_DATA_SIZE, NUM_STREAM_BYTES, ONION_VERSION, ROUTING_INFO_SIZE};
use super::ecdh::PrivateKey;
use super::error::ProcessingError;
use super::hop_data::HopData;
use super::internal_crypto::{blinding_factor, generate_key, hmac, KeyType, StreamCipher};
use super::packet::{OnionPacket, ProcessedPacket};
use super::replay::{hash_shared_secret, ReplayCache, ReplayRecord};

/// Authenticate and decrypt one layer without consulting the replay log.
///
/// # Returns
///
/// * the replay record to store for this layer, and the processed packet
pub fn unwrap_onion_layer(packet: &OnionPacket, private_key: &PrivateKey, assoc_data: &[u8]) -> Result<(ReplayRecord, ProcessedPacket), ProcessingError> {
    if packet.version != ONION_VERSION {
        return Err(ProcessingError::UnsupportedVersion(packet.version));
    }

    // Calculate the hop's shared secret.
    let shared_secret = private_key.exp(&packet.ephemeral_key)?;

    // Validate the header MAC in constant time.
    let mu_key = generate_key(KeyType::Mu, &shared_secret);
    let calculated_mac = hmac(&mu_key, &[&packet.routing_info[..], assoc_data]);
    if calculated_mac.ct_eq(&packet.header_mac).unwrap_u8() == 0 {
        return Err(ProcessingError::IntegrityFailure);
    }

    // Append a zero slot to preserve length invariance, decrypt the
    // (padded) routing info, and extract the section for the current hop.
    let rho_key = generate_key(KeyType::Rho, &shared_secret);
    let mut b = [0u8; NUM_STREAM_BYTES];
    b[..ROUTING_INFO_SIZE].copy_from_slice(&packet.routing_info);
    StreamCipher::new(&rho_key).xor_key_stream(&mut b);
    let (hop_slot, next_routing_info) = array_refs![&b, HOP_DATA_SIZE, ROUTING_INFO_SIZE];
    let hop_data = HopData::from_bytes(hop_slot);

    let record = ReplayRecord {
        fingerprint: hash_shared_secret(&shared_secret),
        expiry: hop_data.outgoing_cltv,
    };

    if hop_data.is_exit() {
        return Ok((record, ProcessedPacket::ExitNode { hop_data }));
    }

    let factor = blinding_factor(&packet.ephemeral_key, &shared_secret);
    let next_packet = OnionPacket::new(packet.ephemeral_key.blind(&factor)?, *next_routing_info, hop_data.hmac);
    Ok((record, ProcessedPacket::MoreHops {
        hop_data,
        next_packet: Box::new(next_packet),
    }))
}

/// Unwrap a single layer of onion packet encryption.
///
/// # Arguments
///
/// * `packet` - the packet as received
/// * `private_key` - this hop's private key
/// * `assoc_data` - the data the sender bound to the packet
/// * `replay_cache` - an implementation of the ReplayCache trait
///
/// # Errors
///
/// * `ProcessingError::UnsupportedVersion` - the version byte is unknown
/// * `ProcessingError::IntegrityFailure` - computed MAC doesn't match the header MAC
/// * `ProcessingError::ReplayDetected` - the layer's fingerprint is already in the replay cache
/// * `ProcessingError::Storage` - the replay cache could not be consulted
pub fn process_onion_packet<C>(packet: &OnionPacket, private_key: &PrivateKey, assoc_data: &[u8], replay_cache: &C) -> Result<ProcessedPacket, ProcessingError>
    where C: ReplayCache + ?Sized
{
    let (record, processed) = unwrap_onion_layer(packet, private_key, assoc_data)?;
    if replay_cache.check_and_record(&record)? {
        warn!(fingerprint = %hex::encode(record.fingerprint), "rejected replayed onion packet");
        return Err(ProcessingError::ReplayDetected);
    }
    trace!(exit = processed.is_exit(), "processed onion packet");
    Ok(processed)
}
