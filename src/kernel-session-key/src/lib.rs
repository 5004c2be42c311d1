//! Session keys for Kernel (ERC-4337) smart accounts.
//!
//! A session key is a secondary signer whose authority is limited to a set of [`Permission`]s.
//! The permissions are committed on-chain as a Merkle root when the session is enabled; every
//! UserOperation the session key signs carries the permission that authorizes its call together
//! with a Merkle proof against that root.
//!
//! Signing fails closed: when the session is restricted and no permission matches the call,
//! [`SessionKeyValidator::sign_user_operation`] returns [`Error::NoMatchingPermission`] without
//! asking the signer for anything.

pub mod chain;
pub mod decoder;
pub mod encoder;
pub mod errors;
pub mod export;
pub mod kernel;
pub mod matcher;
pub mod merkle;
pub mod multichain;
pub mod signer;
pub mod tree;
pub mod user_op;
pub mod utils;
pub mod validator;

#[cfg(test)]
mod tests;

pub use chain::{ChainReader, EnabledCache, EnabledKey};
pub use errors::{Error, Result};
pub use export::SessionExport;
pub use kernel_session_types::{
    ExecutionRule, Operation, ParamCondition, ParamRule, PaymasterPolicy, Permission,
    SessionKeyData,
};
pub use matcher::PermissionMatch;
pub use multichain::{ChainOperation, MultiChainAggregator};
pub use signer::{LocalSigner, Signer};
pub use tree::PermissionTree;
pub use user_op::{compute_user_op_hash, UserOperation};
pub use validator::{SessionKeyValidator, SessionValidatorConfig};
