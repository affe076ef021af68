// ecdh.rs - wrapping library for secp256k1 dh operations
// Copyright (C) 2018  David Stainton.

use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::{AffinePoint, NonZeroScalar, ProjectivePoint, Scalar};
use rand_core::{CryptoRng, RngCore};

use super::error::KeyError;
use super::internal_crypto::{hash, SharedSecret};

/// The size of a compressed SEC1 public key.
pub const PUBLIC_KEY_SIZE: usize = 33;

/// The size of a serialized private scalar.
pub const PRIVATE_KEY_SIZE: usize = 32;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PublicKey {
    key: k256::PublicKey,
}

impl PublicKey {
    /// Parse a 33 byte compressed SEC1 point, rejecting other encodings,
    /// off-curve points and the identity.
    pub fn from_bytes(b: &[u8]) -> Result<PublicKey, KeyError> {
        if b.len() != PUBLIC_KEY_SIZE || (b[0] != 0x02 && b[0] != 0x03) {
            return Err(KeyError::InvalidPublicKey);
        }
        let key = k256::PublicKey::from_sec1_bytes(b).map_err(|_| KeyError::InvalidPublicKey)?;
        Ok(PublicKey { key })
    }

    pub fn to_bytes(&self) -> [u8; PUBLIC_KEY_SIZE] {
        let mut out = [0u8; PUBLIC_KEY_SIZE];
        out.copy_from_slice(self.key.to_encoded_point(true).as_bytes());
        out
    }

    /// Multiply the point by a blinding factor.
    pub fn blind(&self, blinding_factor: &Scalar) -> Result<PublicKey, KeyError> {
        let point = self.key.to_projective() * blinding_factor;
        from_projective(point)
    }

    fn to_projective(&self) -> ProjectivePoint {
        self.key.to_projective()
    }
}

fn from_projective(point: ProjectivePoint) -> Result<PublicKey, KeyError> {
    let key = k256::PublicKey::from_affine(AffinePoint::from(point))
        .map_err(|_| KeyError::DegenerateBlinding)?;
    Ok(PublicKey { key })
}

#[derive(Clone)]
pub struct PrivateKey {
    public_key: PublicKey,
    secret: k256::SecretKey,
}

impl PrivateKey {
    pub fn generate<R: RngCore + CryptoRng>(rng: &mut R) -> PrivateKey {
        PrivateKey::from_secret(k256::SecretKey::random(rng))
    }

    pub fn from_bytes(b: &[u8]) -> Result<PrivateKey, KeyError> {
        if b.len() != PRIVATE_KEY_SIZE {
            return Err(KeyError::InvalidPrivateKey);
        }
        let secret = k256::SecretKey::from_slice(b).map_err(|_| KeyError::InvalidPrivateKey)?;
        Ok(PrivateKey::from_secret(secret))
    }

    fn from_secret(secret: k256::SecretKey) -> PrivateKey {
        PrivateKey {
            public_key: PublicKey { key: secret.public_key() },
            secret,
        }
    }

    pub fn public_key(&self) -> PublicKey {
        self.public_key
    }

    pub fn to_bytes(&self) -> [u8; PRIVATE_KEY_SIZE] {
        let mut out = [0u8; PRIVATE_KEY_SIZE];
        out.copy_from_slice(&self.secret.to_bytes());
        out
    }

    /// Multiply the scalar by a blinding factor, keeping the matching
    /// public key in step with `PublicKey::blind`.
    pub fn blind(&self, blinding_factor: &Scalar) -> Result<PrivateKey, KeyError> {
        let scalar = *self.secret.to_nonzero_scalar() * blinding_factor;
        let scalar: Option<NonZeroScalar> = NonZeroScalar::new(scalar).into();
        let scalar = scalar.ok_or(KeyError::DegenerateBlinding)?;
        Ok(PrivateKey::from_secret(k256::SecretKey::from(scalar)))
    }

    /// Exp calculates the shared secret with the provided public key:
    /// the SHA-256 of the compressed ECDH point.
    pub fn exp(&self, public_key: &PublicKey) -> Result<SharedSecret, KeyError> {
        let point = public_key.to_projective() * *self.secret.to_nonzero_scalar();
        let shared_point = from_projective(point).map_err(|_| KeyError::InvalidPublicKey)?;
        Ok(SharedSecret::new(hash(&[&shared_point.to_bytes()[..]])))
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::OsRng;

    use super::*;
    use crate::internal_crypto::blinding_factor;

    #[test]
    fn dh_ops_test() {
        let mut rng = OsRng;
        let alice = PrivateKey::generate(&mut rng);
        let bob = PrivateKey::generate(&mut rng);
        let alice_s = alice.exp(&bob.public_key()).unwrap();
        let bob_s = bob.exp(&alice.public_key()).unwrap();
        assert_eq!(alice_s.as_bytes(), bob_s.as_bytes());
    }

    #[test]
    fn public_key_round_trip_test() {
        let key = PrivateKey::generate(&mut OsRng);
        let raw = key.public_key().to_bytes();
        assert!(raw[0] == 0x02 || raw[0] == 0x03);
        assert_eq!(PublicKey::from_bytes(&raw).unwrap(), key.public_key());

        let restored = PrivateKey::from_bytes(&key.to_bytes()).unwrap();
        assert_eq!(restored.public_key(), key.public_key());
    }

    #[test]
    fn invalid_keys_test() {
        assert_eq!(PublicKey::from_bytes(&[0u8; PUBLIC_KEY_SIZE]), Err(KeyError::InvalidPublicKey));
        let mut off_curve = [0xffu8; PUBLIC_KEY_SIZE];
        off_curve[0] = 0x02;
        assert!(PublicKey::from_bytes(&off_curve).is_err());
        assert!(PrivateKey::from_bytes(&[0u8; PRIVATE_KEY_SIZE]).is_err());

        // only the compressed encoding is accepted
        let key = PrivateKey::generate(&mut OsRng).public_key();
        let uncompressed = key.key.to_encoded_point(false);
        assert_eq!(PublicKey::from_bytes(uncompressed.as_bytes()), Err(KeyError::InvalidPublicKey));
        let mut compact = key.to_bytes();
        compact[0] = 0x05;
        assert_eq!(PublicKey::from_bytes(&compact), Err(KeyError::InvalidPublicKey));
        assert!(PrivateKey::from_bytes(&[1u8; 31]).is_err());
    }

    #[test]
    fn blinding_commutes_test() {
        let mut rng = OsRng;
        let session = PrivateKey::generate(&mut rng);
        let hop = PrivateKey::generate(&mut rng);
        let secret = session.exp(&hop.public_key()).unwrap();
        let factor = blinding_factor(&session.public_key(), &secret);

        let blinded_private = session.blind(&factor).unwrap();
        let blinded_public = session.public_key().blind(&factor).unwrap();
        assert_eq!(blinded_private.public_key(), blinded_public);
    }
}
