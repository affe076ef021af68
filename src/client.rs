// client.rs - onion packet construction
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

//! Senders build onion packets. Every hop's slot is wrapped under the
//! keys of that hop and of all hops before it, starting from the exit and
//! working back towards the first hop.

use tracing::trace;

use super::constants::{HOP_DATA_SIZE, MAX_HOPS, NUM_STREAM_BYTES, ROUTING_INFO_SIZE};
use super::ecdh::{PrivateKey, PublicKey};
use super::error::ConstructionError;
use super::hop_data::HopData;
use super::internal_crypto::{blinding_factor, generate_key, hmac, KeyType, SharedSecret, StreamCipher, HMAC_SIZE};
use super::packet::OnionPacket;
use super::utils::xor_assign;

/// Derive the secret shared with every hop of the route, blinding the
/// session key once per hop so that each hop sees a different ephemeral
/// key.
pub fn generate_shared_secrets(route: &[PublicKey], session_key: &PrivateKey) -> Result<Vec<SharedSecret>, ConstructionError> {
    let mut secrets = Vec::with_capacity(route.len());
    let mut ephemeral_key = session_key.clone();
    for (hop, public_key) in route.iter().enumerate() {
        let secret = ephemeral_key.exp(public_key).map_err(|source| ConstructionError::InvalidKey { hop, source })?;
        if hop + 1 < route.len() {
            let factor = blinding_factor(&ephemeral_key.public_key(), &secret);
            ephemeral_key = ephemeral_key.blind(&factor).map_err(|source| ConstructionError::InvalidKey { hop, source })?;
        }
        secrets.push(secret);
    }
    Ok(secrets)
}

/// Generate the filler the last hop finds at the tail of its routing
/// info: the keystream bytes the earlier hops append while peeling their
/// layers. It is `(num_hops - 1) * HOP_DATA_SIZE` bytes long.
pub fn generate_header_padding(secrets: &[SharedSecret]) -> Vec<u8> {
    let num_hops = secrets.len();
    if num_hops == 0 {
        return Vec::new();
    }
    let mut filler = vec![0u8; (num_hops - 1) * HOP_DATA_SIZE];
    for (i, secret) in secrets[..num_hops - 1].iter().enumerate() {
        let stream_key = generate_key(KeyType::Rho, secret);
        let stream_bytes = StreamCipher::new(&stream_key).generate(NUM_STREAM_BYTES);
        let filler_start = ROUTING_INFO_SIZE - i * HOP_DATA_SIZE;
        xor_assign(&mut filler[..(i + 1) * HOP_DATA_SIZE], &stream_bytes[filler_start..]);
    }
    filler
}

/// Create an onion packet for the given route.
///
/// # Arguments
///
/// * `route` - the public keys of the hops, first hop first
/// * `session_key` - a fresh ephemeral private key, never reused
/// * `hops_data` - one forwarding instruction per hop
/// * `assoc_data` - data every hop authenticates alongside its layer
///
/// # Errors
///
/// * `ConstructionError::InvalidRouteLength` - the route is empty or longer than `MAX_HOPS`
/// * `ConstructionError::PayloadCountMismatch` - `hops_data` does not match the route
/// * `ConstructionError::InvalidKey` - a hop key produced a degenerate shared secret
pub fn new_onion_packet(route: &[PublicKey], session_key: &PrivateKey, hops_data: &[HopData], assoc_data: &[u8]) -> Result<OnionPacket, ConstructionError> {
    let num_hops = route.len();
    if num_hops == 0 || num_hops > MAX_HOPS {
        return Err(ConstructionError::InvalidRouteLength(num_hops));
    }
    if hops_data.len() != num_hops {
        return Err(ConstructionError::PayloadCountMismatch {
            route: num_hops,
            payloads: hops_data.len(),
        });
    }

    let secrets = generate_shared_secrets(route, session_key)?;
    let filler = generate_header_padding(&secrets);

    // Start from keystream so the unused tail of a short route looks like
    // ciphertext.
    let mut routing_info = [0u8; ROUTING_INFO_SIZE];
    let pad_key = generate_key(KeyType::Pad, &secrets[num_hops - 1]);
    StreamCipher::new(&pad_key).xor_key_stream(&mut routing_info);

    let mut next_hmac = [0u8; HMAC_SIZE];
    for i in (0..num_hops).rev() {
        let rho_key = generate_key(KeyType::Rho, &secrets[i]);
        let mu_key = generate_key(KeyType::Mu, &secrets[i]);

        let mut hop_data = hops_data[i];
        hop_data.hmac = next_hmac;

        routing_info.copy_within(..ROUTING_INFO_SIZE - HOP_DATA_SIZE, HOP_DATA_SIZE);
        routing_info[..HOP_DATA_SIZE].copy_from_slice(&hop_data.to_bytes());
        StreamCipher::new(&rho_key).xor_key_stream(&mut routing_info);

        if i == num_hops - 1 {
            routing_info[ROUTING_INFO_SIZE - filler.len()..].copy_from_slice(&filler);
        }

        next_hmac = hmac(&mu_key, &[&routing_info[..], assoc_data]);
    }
    trace!(num_hops, "built onion packet");

    Ok(OnionPacket::new(session_key.public_key(), routing_info, next_hmac))
}
