// hop_data.rs - per hop routing information
// Copyright (C) 2018  David Stainton.

use byteorder::{BigEndian, ByteOrder};

use super::constants::{ADDRESS_SIZE, AMOUNT_SIZE, CLTV_SIZE, EXIT_ADDRESS, HOP_DATA_SIZE, PADDING_SIZE, REALM_SIZE};
use super::internal_crypto::HMAC_SIZE;

/// The realm understood by every hop.
pub const BITCOIN_REALM: u8 = 0;

/// HopData is the plaintext forwarding instruction a single hop finds in
/// its slot of the routing info.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HopData {
    /// version tag of the slot format
    pub realm: u8,
    /// short routing identifier of the outgoing link, all zeros at the exit
    pub next_address: [u8; ADDRESS_SIZE],
    /// amount to forward to the next hop
    pub forward_amount: u64,
    /// time-lock the outgoing HTLC must carry
    pub outgoing_cltv: u32,
    /// MAC the next hop verifies its packet against; filled in during
    /// construction
    pub hmac: [u8; HMAC_SIZE],
}

impl HopData {
    pub fn new(next_address: [u8; ADDRESS_SIZE], forward_amount: u64, outgoing_cltv: u32) -> HopData {
        HopData {
            realm: BITCOIN_REALM,
            next_address,
            forward_amount,
            outgoing_cltv,
            hmac: [0u8; HMAC_SIZE],
        }
    }

    /// The final hop is signalled by the all zero next address.
    pub fn is_exit(&self) -> bool {
        self.next_address == EXIT_ADDRESS
    }

    pub fn to_bytes(&self) -> [u8; HOP_DATA_SIZE] {
        let mut out = [0u8; HOP_DATA_SIZE];
        {
            let (realm, address, amount, cltv, _padding, hmac) =
                mut_array_refs![&mut out, REALM_SIZE, ADDRESS_SIZE, AMOUNT_SIZE, CLTV_SIZE, PADDING_SIZE, HMAC_SIZE];
            realm[0] = self.realm;
            address.copy_from_slice(&self.next_address);
            BigEndian::write_u64(amount, self.forward_amount);
            BigEndian::write_u32(cltv, self.outgoing_cltv);
            hmac.copy_from_slice(&self.hmac);
        }
        out
    }

    /// Padding bytes are ignored; a slot always decodes.
    pub fn from_bytes(b: &[u8; HOP_DATA_SIZE]) -> HopData {
        let (realm, address, amount, cltv, _padding, hmac) =
            array_refs![b, REALM_SIZE, ADDRESS_SIZE, AMOUNT_SIZE, CLTV_SIZE, PADDING_SIZE, HMAC_SIZE];
        HopData {
            realm: realm[0],
            next_address: *address,
            forward_amount: BigEndian::read_u64(amount),
            outgoing_cltv: BigEndian::read_u32(cltv),
            hmac: *hmac,
        }
    }
}
