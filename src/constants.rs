// constants.rs - onion packet format constants
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

use super::ecdh::PUBLIC_KEY_SIZE;
use super::internal_crypto::HMAC_SIZE;

/// The maximum number of hops a packet will traverse.
pub const MAX_HOPS: usize = 20;

/// The only packet version this implementation understands.
pub const ONION_VERSION: u8 = 0;

/// The size of the realm byte at the front of each hop slot.
pub const REALM_SIZE: usize = 1;

/// The size of the short routing identifier naming the next hop.
pub const ADDRESS_SIZE: usize = 8;

/// The size of the forward amount field.
pub const AMOUNT_SIZE: usize = 8;

/// The size of the outgoing time-lock field.
pub const CLTV_SIZE: usize = 4;

/// Zero padding between the per-hop fields and the next hop's HMAC.
pub const PADDING_SIZE: usize = 12;

/// The size in bytes of each routing info slot.
pub const HOP_DATA_SIZE: usize = REALM_SIZE + ADDRESS_SIZE + AMOUNT_SIZE + CLTV_SIZE + PADDING_SIZE + HMAC_SIZE;

/// The size in bytes of the routing info section of the packet.
pub const ROUTING_INFO_SIZE: usize = HOP_DATA_SIZE * MAX_HOPS;

/// Enough keystream to decrypt the routing info and extend it by one slot.
pub const NUM_STREAM_BYTES: usize = ROUTING_INFO_SIZE + HOP_DATA_SIZE;

/// The size of a serialized onion packet in bytes.
pub const ONION_PACKET_SIZE: usize = 1 + PUBLIC_KEY_SIZE + ROUTING_INFO_SIZE + HMAC_SIZE;

/// The exit sentinel: a hop whose next address is all zeros is the
/// final recipient.
pub const EXIT_ADDRESS: [u8; ADDRESS_SIZE] = [0u8; ADDRESS_SIZE];

/// The number of leading bytes of SHA-256(shared secret) kept as the
/// replay fingerprint.
pub const HASH_PREFIX_SIZE: usize = 20;
