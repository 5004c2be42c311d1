//! Minimal big-endian packing helpers for the packed (non-ABI) Kernel layouts.

use alloy_primitives::{Address, B256, U256};

/// Byte width of a `uint48`.
pub const U48_LEN: usize = 6;

/// Append the low 48 bits of `value`, big-endian.
pub fn push_u48_be(out: &mut Vec<u8>, value: u64) {
    out.extend_from_slice(&value.to_be_bytes()[8 - U48_LEN..]);
}

pub fn read_u48_be(bytes: &[u8], i: &mut usize) -> Option<u64> {
    let slice = bytes.get(*i..*i + U48_LEN)?;
    let mut buf = [0u8; 8];
    buf[8 - U48_LEN..].copy_from_slice(slice);
    *i += U48_LEN;
    Some(u64::from_be_bytes(buf))
}

pub fn read_address(bytes: &[u8], i: &mut usize) -> Option<Address> {
    let out = Address::from_slice(bytes.get(*i..*i + 20)?);
    *i += 20;
    Some(out)
}

pub fn read_b32(bytes: &[u8], i: &mut usize) -> Option<B256> {
    let out = B256::from_slice(bytes.get(*i..*i + 32)?);
    *i += 32;
    Some(out)
}

pub fn read_u256_be(bytes: &[u8], i: &mut usize) -> Option<U256> {
    let out = U256::from_be_slice(bytes.get(*i..*i + 32)?);
    *i += 32;
    Some(out)
}
