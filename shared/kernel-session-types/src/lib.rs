//! Shared types for Kernel session-key permissions.
//!
//! These mirror the on-chain `Permission` / `ParamRule` / `ExecutionRule` structs of the Kernel
//! session-key validator and are used by both the signing core and tooling.

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod permission;
pub mod session;

pub use permission::{
    ExecutionRule, Operation, ParamCondition, ParamRule, Permission, ANY_SELECTOR, ANY_TARGET,
};
pub use session::{PaymasterPolicy, SessionKeyData, ANY_PAYMASTER, MAX_UINT48};
