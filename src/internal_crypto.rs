// Copyright 2016 Jeffrey Burdges and David Stainton

//! Onion packet crypto primitives

use chacha20::cipher::{KeyIvInit, StreamCipher as _};
use chacha20::{ChaCha20, Key, Nonce};
use digest::Digest;
use hmac::{Hmac, Mac};
use k256::elliptic_curve::ops::Reduce;
use k256::{FieldBytes, Scalar, U256};
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::ecdh::PublicKey;

pub const HASH_SIZE: usize = 32;
pub const HMAC_SIZE: usize = 32;
pub const KEY_SIZE: usize = 32;
pub const SHARED_SECRET_SIZE: usize = 32;
const STREAM_NONCE: [u8; 12] = [0u8; 12];

type HmacSha256 = Hmac<Sha256>;

/// The per-hop secret shared between the sender and one hop. Wiped on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SharedSecret([u8; SHARED_SECRET_SIZE]);

impl SharedSecret {
    pub(crate) fn new(raw: [u8; SHARED_SECRET_SIZE]) -> SharedSecret {
        SharedSecret(raw)
    }

    pub fn as_bytes(&self) -> &[u8; SHARED_SECRET_SIZE] {
        &self.0
    }
}

/// The purposes a shared secret is expanded for. Each tag yields an
/// independent key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyType {
    /// routing info stream cipher
    Rho,
    /// header MAC
    Mu,
    /// initial routing info fill
    Pad,
}

impl KeyType {
    fn tag(self) -> &'static [u8] {
        match self {
            KeyType::Rho => b"rho",
            KeyType::Mu => b"mu",
            KeyType::Pad => b"pad",
        }
    }
}

/// HMAC-SHA256 over the purpose tag, keyed by the shared secret.
pub fn generate_key(key_type: KeyType, secret: &SharedSecret) -> [u8; KEY_SIZE] {
    hmac(secret.as_bytes(), &[key_type.tag()])
}

pub fn hash(input: &[&[u8]]) -> [u8; HASH_SIZE] {
    let mut h = Sha256::new();
    for chunk in input {
        h.update(chunk);
    }
    let mut out = [0u8; HASH_SIZE];
    out.copy_from_slice(&h.finalize());
    out
}

pub fn hmac(key: &[u8; KEY_SIZE], data: &[&[u8]]) -> [u8; HMAC_SIZE] {
    let mut m = HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
    for chunk in data {
        m.update(chunk);
    }
    let mut out = [0u8; HMAC_SIZE];
    out.copy_from_slice(&m.finalize().into_bytes());
    out
}

/// The scalar each hop multiplies the ephemeral key by before forwarding:
/// SHA-256(ephemeral key || shared secret) reduced mod n.
pub fn blinding_factor(ephemeral_key: &PublicKey, secret: &SharedSecret) -> Scalar {
    let digest = hash(&[&ephemeral_key.to_bytes()[..], &secret.as_bytes()[..]]);
    <Scalar as Reduce<U256>>::reduce_bytes(FieldBytes::from_slice(&digest))
}

/// stream cipher for onion crypto usage
pub struct StreamCipher {
    cipher: ChaCha20,
}

impl StreamCipher {
    pub fn new(key: &[u8; KEY_SIZE]) -> StreamCipher {
        StreamCipher {
            cipher: ChaCha20::new(Key::from_slice(key), Nonce::from_slice(&STREAM_NONCE)),
        }
    }

    /// xor the next keystream bytes into `data`
    pub fn xor_key_stream(&mut self, data: &mut [u8]) {
        self.cipher.apply_keystream(data);
    }

    /// return the next n keystream bytes
    pub fn generate(&mut self, n: usize) -> Vec<u8> {
        let mut output = vec![0u8; n];
        self.cipher.apply_keystream(&mut output);
        output
    }
}
