//! Kernel v2 validator payload layouts.

use alloy_primitives::{Address, B256, U256};

use super::bytes::{push_u48_be, read_address, read_b32, read_u256_be, read_u48_be};
use crate::kernel::constants::{ENABLE_DATA_LEN, ENABLE_DATA_WITH_NONCE_LEN};

/// Decoded session-key enable data, as registered with the validator on enable.
///
/// Layout: `sessionKey(20) ++ merkleRoot(32) ++ validAfter(6) ++ validUntil(6) ++ paymaster(20)
/// [++ nonce(32)]`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnableData {
    pub session_key: Address,
    pub merkle_root: B256,
    pub valid_after: u64,
    pub valid_until: u64,
    pub paymaster: Address,
    pub nonce: Option<U256>,
}

impl EnableData {
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(ENABLE_DATA_WITH_NONCE_LEN);
        out.extend_from_slice(self.session_key.as_slice());
        out.extend_from_slice(self.merkle_root.as_slice());
        push_u48_be(&mut out, self.valid_after);
        push_u48_be(&mut out, self.valid_until);
        out.extend_from_slice(self.paymaster.as_slice());
        if let Some(nonce) = self.nonce {
            out.extend_from_slice(&nonce.to_be_bytes::<32>());
        }
        out
    }

    /// Parse 84- or 116-byte enable data; any other length is rejected.
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != ENABLE_DATA_LEN && bytes.len() != ENABLE_DATA_WITH_NONCE_LEN {
            return None;
        }
        let mut i = 0;
        let session_key = read_address(bytes, &mut i)?;
        let merkle_root = read_b32(bytes, &mut i)?;
        let valid_after = read_u48_be(bytes, &mut i)?;
        let valid_until = read_u48_be(bytes, &mut i)?;
        let paymaster = read_address(bytes, &mut i)?;
        let nonce = if i < bytes.len() { Some(read_u256_be(bytes, &mut i)?) } else { None };
        Some(Self { session_key, merkle_root, valid_after, valid_until, paymaster, nonce })
    }
}

/// Kernel `ValidatorApproved.validatorData`: `uint256(validUntil(6) ++ validAfter(6) ++ validator(20))`.
pub fn pack_validator_data(validator: Address, valid_after: u64, valid_until: u64) -> U256 {
    let mut word = Vec::with_capacity(32);
    push_u48_be(&mut word, valid_until);
    push_u48_be(&mut word, valid_after);
    word.extend_from_slice(validator.as_slice());
    U256::from_be_slice(&word)
}
