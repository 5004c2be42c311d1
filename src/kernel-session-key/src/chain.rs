//! Read-only chain access and the caller-owned cache for "is the validator enabled" lookups.

use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

use alloy_primitives::{Address, Bytes, B256};
use alloy_sol_types::SolCall;
use async_trait::async_trait;

use crate::errors::ChainReadError;

/// `eth_call`-style access to contract state.
#[async_trait]
pub trait ChainReader: Send + Sync {
    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, ChainReadError>;
}

/// Call a view function and decode its return value.
pub async fn read_contract<R, C>(reader: &R, to: Address, call: &C) -> Result<C::Return, ChainReadError>
where
    R: ChainReader + ?Sized,
    C: SolCall + Sync,
{
    let output = reader.call(to, call.abi_encode().into()).await?;
    C::abi_decode_returns(&output, true).map_err(ChainReadError::new)
}

/// Identity of one session registration: the same session key enabled twice with different
/// permissions is two entries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EnabledKey {
    pub account: Address,
    pub validator: Address,
    pub session_key: Address,
    pub merkle_root: B256,
}

/// Memoized enabled-status per session registration with an explicit TTL.
///
/// Owned by the caller; validators never mutate their own state when queried.
#[derive(Debug)]
pub struct EnabledCache {
    ttl: Duration,
    entries: HashMap<EnabledKey, (bool, Instant)>,
}

impl EnabledCache {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, entries: HashMap::new() }
    }

    /// Cached status if it has not expired; an expired entry is dropped.
    pub fn get(&mut self, key: &EnabledKey) -> Option<bool> {
        let (enabled, at) = *self.entries.get(key)?;
        if at.elapsed() < self.ttl {
            return Some(enabled);
        }
        self.entries.remove(key);
        None
    }

    /// Record a status, pruning entries that have already expired.
    pub fn insert(&mut self, key: EnabledKey, enabled: bool) {
        let ttl = self.ttl;
        self.entries.retain(|_, (_, at)| at.elapsed() < ttl);
        self.entries.insert(key, (enabled, Instant::now()));
    }

    pub fn invalidate(&mut self, key: &EnabledKey) {
        self.entries.remove(key);
    }

    /// Forget every session cached for `account`, e.g. after it enables or revokes a validator.
    pub fn invalidate_account(&mut self, account: Address) {
        self.entries.retain(|key, _| key.account != account);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Default for EnabledCache {
    /// Cache for the lifetime of a single operation.
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}
