// packet.rs - onion packet wire format
// Copyright (C) 2018  David Stainton.

use std::io::{Read, Write};

use super::constants::{ONION_PACKET_SIZE, ONION_VERSION, ROUTING_INFO_SIZE};
use super::ecdh::{PublicKey, PUBLIC_KEY_SIZE};
use super::error::ProcessingError;
use super::hop_data::HopData;
use super::internal_crypto::HMAC_SIZE;

/// OnionPacket is the fixed size packet handed from hop to hop. Its size
/// does not depend on the length of the route it encodes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OnionPacket {
    /// must equal `ONION_VERSION` to be processed
    pub version: u8,
    /// the blinded ephemeral key of the current hop
    pub ephemeral_key: PublicKey,
    /// onion encrypted per hop slots
    pub routing_info: [u8; ROUTING_INFO_SIZE],
    /// authenticates the routing info and the associated data
    pub header_mac: [u8; HMAC_SIZE],
}

impl OnionPacket {
    pub fn new(ephemeral_key: PublicKey, routing_info: [u8; ROUTING_INFO_SIZE], header_mac: [u8; HMAC_SIZE]) -> OnionPacket {
        OnionPacket {
            version: ONION_VERSION,
            ephemeral_key,
            routing_info,
            header_mac,
        }
    }

    pub fn to_bytes(&self) -> [u8; ONION_PACKET_SIZE] {
        let mut out = [0u8; ONION_PACKET_SIZE];
        {
            let (version, key, routing_info, mac) =
                mut_array_refs![&mut out, 1, PUBLIC_KEY_SIZE, ROUTING_INFO_SIZE, HMAC_SIZE];
            version[0] = self.version;
            key.copy_from_slice(&self.ephemeral_key.to_bytes());
            routing_info.copy_from_slice(&self.routing_info);
            mac.copy_from_slice(&self.header_mac);
        }
        out
    }

    /// Parse a serialized packet. The version byte is carried through
    /// untouched; processing rejects versions it does not know.
    pub fn from_bytes(b: &[u8]) -> Result<OnionPacket, ProcessingError> {
        if b.len() != ONION_PACKET_SIZE {
            return Err(ProcessingError::InvalidLength {
                expected: ONION_PACKET_SIZE,
                actual: b.len(),
            });
        }
        let raw = array_ref![b, 0, ONION_PACKET_SIZE];
        let (version, key, routing_info, mac) = array_refs![raw, 1, PUBLIC_KEY_SIZE, ROUTING_INFO_SIZE, HMAC_SIZE];
        Ok(OnionPacket {
            version: version[0],
            ephemeral_key: PublicKey::from_bytes(key)?,
            routing_info: *routing_info,
            header_mac: *mac,
        })
    }

    pub fn encode<W: Write>(&self, w: &mut W) -> Result<(), std::io::Error> {
        w.write_all(&self.to_bytes())
    }

    pub fn decode<R: Read>(r: &mut R) -> Result<OnionPacket, ProcessingError> {
        let mut raw = [0u8; ONION_PACKET_SIZE];
        r.read_exact(&mut raw)?;
        OnionPacket::from_bytes(&raw)
    }
}

/// ProcessedPacket is the outcome of unwrapping one layer: either this
/// node forwards `next_packet`, or it is the final recipient.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProcessedPacket {
    MoreHops {
        hop_data: HopData,
        next_packet: Box<OnionPacket>,
    },
    ExitNode {
        hop_data: HopData,
    },
}

impl ProcessedPacket {
    pub fn hop_data(&self) -> &HopData {
        match self {
            ProcessedPacket::MoreHops { hop_data, .. } => hop_data,
            ProcessedPacket::ExitNode { hop_data } => hop_data,
        }
    }

    pub fn next_packet(&self) -> Option<&OnionPacket> {
        match self {
            ProcessedPacket::MoreHops { next_packet, .. } => Some(next_packet.as_ref()),
            ProcessedPacket::ExitNode { .. } => None,
        }
    }

    pub fn is_exit(&self) -> bool {
        matches!(self, ProcessedPacket::ExitNode { .. })
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::OsRng;
    use rand::RngCore;

    use super::*;
    use crate::ecdh::PrivateKey;

    fn random_packet() -> OnionPacket {
        let mut rng = OsRng;
        let mut routing_info = [0u8; ROUTING_INFO_SIZE];
        rng.fill_bytes(&mut routing_info);
        let mut mac = [0u8; HMAC_SIZE];
        rng.fill_bytes(&mut mac);
        OnionPacket::new(PrivateKey::generate(&mut rng).public_key(), routing_info, mac)
    }

    #[test]
    fn wire_layout_test() {
        let packet = random_packet();
        let raw = packet.to_bytes();
        assert_eq!(raw[0], ONION_VERSION);
        assert_eq!(&raw[1..34], &packet.ephemeral_key.to_bytes()[..]);
        assert_eq!(&raw[34..1334], &packet.routing_info[..]);
        assert_eq!(&raw[1334..], &packet.header_mac[..]);

        let mut wire = Vec::new();
        packet.encode(&mut wire).unwrap();
        assert_eq!(OnionPacket::decode(&mut wire.as_slice()).unwrap(), packet);
    }

    #[test]
    fn truncated_packet_test() {
        let raw = random_packet().to_bytes();
        match OnionPacket::from_bytes(&raw[..ONION_PACKET_SIZE - 1]) {
            Err(ProcessingError::InvalidLength { expected, actual }) => {
                assert_eq!(expected, ONION_PACKET_SIZE);
                assert_eq!(actual, ONION_PACKET_SIZE - 1);
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(OnionPacket::decode(&mut &raw[..100]).is_err());
    }

    #[test]
    fn bad_ephemeral_key_test() {
        let mut raw = random_packet().to_bytes();
        raw[1] = 0x05;
        assert!(matches!(OnionPacket::from_bytes(&raw), Err(ProcessingError::InvalidEphemeralKey(_))));
    }
}
