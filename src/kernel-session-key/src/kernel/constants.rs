//! Kernel v2 / ERC-4337 v0.6 constants used by the session-key signing path.

use alloy_primitives::{address, bytes, fixed_bytes, Address, Bytes, FixedBytes};

/// ERC-4337 EntryPoint v0.6 (same address on every chain).
pub const ENTRY_POINT_V06: Address = address!("5FF137D4b0FDCD49DcA30c7CF57E578a026d2789");

/// Deployed Kernel session-key validator.
pub const SESSION_KEY_VALIDATOR: Address = address!("5C06CE2b673fD5E6e56076e40DD46aB67f5a72A5");

/// Kernel `execute(address,uint256,bytes,uint8)` selector, the default action a session enables.
pub const EXECUTE_SELECTOR: FixedBytes<4> = fixed_bytes!("51945447");

/// EIP-712 domain name / version of Kernel v2 accounts.
pub const KERNEL_NAME: &str = "Kernel";
pub const KERNEL_VERSION: &str = "0.2.4";

/// 65-byte ECDSA signature placeholder used for gas estimation.
pub const DUMMY_ECDSA_SIGNATURE: Bytes = bytes!(
    "fffffffffffffffffffffffffffffff0000000000000000000000000000000007aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa1c"
);

/// Byte length of enable data without / with the trailing nonce word.
pub const ENABLE_DATA_LEN: usize = 20 + 32 + 6 + 6 + 20;
pub const ENABLE_DATA_WITH_NONCE_LEN: usize = ENABLE_DATA_LEN + 32;
