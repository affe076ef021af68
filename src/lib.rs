// lib.rs - Lightning onion routing packets
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

//! An implementation of the Lightning onion routing packet format
//!
//! A sender wraps per hop forwarding instructions for a route of up to
//! `MAX_HOPS` nodes into a single fixed size packet. Every hop peels off
//! exactly one layer, learning only its own instructions and the packet to
//! hand to the next hop.
//!
//! # Features of the packet format
//!
//! * constant packet size regardless of route length
//! * per hop bitwise unlinkability through ephemeral key blinding
//! * hidden route length and relay position
//! * tagging attack detection via a per hop HMAC over the routing info
//!   and the associated data
//! * replay detection through a log of shared secret fingerprints that
//!   decays as the chain height passes each payment's time-lock
//!
//! **BOLT #4: Onion Routing Protocol**\
//! https://github.com/lightning/bolts/blob/master/04-onion-routing.md
//!
//! **Sphinx: A Compact and Provably Secure Mix Format**\
//! https://cypherpunks.ca/~iang/pubs/Sphinx_Oakland09.pdf

#[macro_use]
extern crate arrayref;

pub mod client;
pub mod constants;
pub mod ecdh;
pub mod error;
pub mod hop_data;
pub mod packet;
pub mod replay;
pub mod router;
pub mod server;

mod internal_crypto;
mod utils;

pub use internal_crypto::SharedSecret;
