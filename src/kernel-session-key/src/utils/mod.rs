//! Byte-layout helpers for Kernel validator payloads.

pub mod bytes;
pub mod kernel;
