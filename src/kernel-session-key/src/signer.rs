//! Signing capability used for session keys, sudo keys and multi-chain roots.
//!
//! The core treats signers as opaque: a passkey ceremony or remote signer can implement
//! [`Signer`]. [`LocalSigner`] covers the secp256k1 session keys the SDK generates and exports.

use alloy_dyn_abi::eip712::TypedData;
use alloy_primitives::{eip191_hash_message, Address, Bytes, B256};
use async_trait::async_trait;
use k256::ecdsa::SigningKey;

use crate::errors::SignerError;

#[async_trait]
pub trait Signer: Send + Sync {
    fn address(&self) -> Address;

    /// Sign `message` as an EIP-191 personal message over its raw bytes.
    async fn sign_raw_message(&self, message: &[u8]) -> Result<Bytes, SignerError>;

    /// Sign an EIP-712 typed message.
    async fn sign_typed_data(&self, typed_data: &TypedData) -> Result<Bytes, SignerError>;
}

/// In-process secp256k1 signer.
#[derive(Clone)]
pub struct LocalSigner {
    key: SigningKey,
    address: Address,
}

impl core::fmt::Debug for LocalSigner {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LocalSigner").field("address", &self.address).finish_non_exhaustive()
    }
}

impl LocalSigner {
    pub fn from_bytes(secret: &B256) -> Result<Self, SignerError> {
        let key = SigningKey::from_slice(secret.as_slice()).map_err(SignerError::new)?;
        Ok(Self::from_signing_key(key))
    }

    pub fn from_signing_key(key: SigningKey) -> Self {
        let address = Address::from_private_key(&key);
        Self { key, address }
    }

    /// Raw private key, for session export.
    pub fn to_bytes(&self) -> B256 {
        B256::from_slice(&self.key.to_bytes())
    }

    /// Sign a 32-byte digest; returns `r ++ s ++ v` with `v` in {27, 28}.
    pub fn sign_hash(&self, hash: &B256) -> Result<Bytes, SignerError> {
        let (signature, recovery_id) =
            self.key.sign_prehash_recoverable(hash.as_slice()).map_err(SignerError::new)?;
        let mut out = Vec::with_capacity(65);
        out.extend_from_slice(&signature.to_bytes());
        out.push(27 + recovery_id.to_byte());
        Ok(out.into())
    }
}

impl core::str::FromStr for LocalSigner {
    type Err = SignerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let secret: B256 = s.trim().parse().map_err(SignerError::new)?;
        Self::from_bytes(&secret)
    }
}

#[async_trait]
impl Signer for LocalSigner {
    fn address(&self) -> Address {
        self.address
    }

    async fn sign_raw_message(&self, message: &[u8]) -> Result<Bytes, SignerError> {
        self.sign_hash(&eip191_hash_message(message))
    }

    async fn sign_typed_data(&self, typed_data: &TypedData) -> Result<Bytes, SignerError> {
        let hash = typed_data.eip712_signing_hash().map_err(SignerError::new)?;
        self.sign_hash(&hash)
    }
}

/// Recover the signer of a 65-byte `r ++ s ++ v` signature over `hash`.
pub fn recover_address(hash: &B256, signature: &[u8]) -> Option<Address> {
    use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};

    if signature.len() != 65 {
        return None;
    }
    let v = match signature[64] {
        v @ (27 | 28) => v - 27,
        v @ (0 | 1) => v,
        _ => return None,
    };
    let sig = Signature::from_slice(&signature[..64]).ok()?;
    let recovery_id = RecoveryId::from_byte(v)?;
    let key = VerifyingKey::recover_from_prehash(hash.as_slice(), &sig, recovery_id).ok()?;
    Some(Address::from_public_key(&key))
}
