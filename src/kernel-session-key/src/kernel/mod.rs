//! Kernel (ERC-4337 smart account, v2) compatibility surface.
//!
//! Keeps the ABI expectations of the account and its session-key validator in one place so
//! the encoding, matching and signing code can stay ABI-agnostic.

pub mod constants;
pub mod interfaces;
