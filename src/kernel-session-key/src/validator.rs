//! Session-key validator for Kernel v2 accounts.
//!
//! Produces the enable data registered on-chain and the per-UserOperation signature
//! `sessionKey ++ ecdsaSignature ++ abi.encode(permission, proof)` the validator contract checks.

use std::borrow::Cow;

use alloy_dyn_abi::eip712::TypedData;
use alloy_primitives::{Address, Bytes, FixedBytes, B256, U256};
use alloy_sol_types::Eip712Domain;
use kernel_session_types::{Permission, SessionKeyData, MAX_UINT48};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    chain::{read_contract, ChainReader, EnabledCache, EnabledKey},
    encoder::{encode_batch_permissions, encode_permission},
    errors::{ChainReadError, Error, Result},
    kernel::{
        constants::{
            DUMMY_ECDSA_SIGNATURE, ENTRY_POINT_V06, EXECUTE_SELECTOR, KERNEL_NAME, KERNEL_VERSION,
            SESSION_KEY_VALIDATOR,
        },
        interfaces::{IKernel, ISessionKeyValidator, ValidatorApproved},
    },
    matcher::{self, PermissionMatch},
    signer::Signer,
    tree::PermissionTree,
    user_op::{compute_user_op_hash, UserOperation},
    utils::kernel::{pack_validator_data, EnableData},
};

/// Deployment parameters of the validator and the account it is plugged into.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionValidatorConfig {
    pub validator_address: Address,
    /// Executor registered for `selector`; zero uses the account's own dispatch.
    pub executor: Address,
    /// Account function the session key is enabled for.
    pub selector: FixedBytes<4>,
    pub entry_point: Address,
    pub chain_id: u64,
    /// EIP-712 domain version of the account.
    pub kernel_version: String,
}

impl Default for SessionValidatorConfig {
    fn default() -> Self {
        Self {
            validator_address: SESSION_KEY_VALIDATOR,
            executor: Address::ZERO,
            selector: EXECUTE_SELECTOR,
            entry_point: ENTRY_POINT_V06,
            chain_id: 1,
            kernel_version: KERNEL_VERSION.to_string(),
        }
    }
}

impl SessionValidatorConfig {
    pub fn for_chain(chain_id: u64) -> Self {
        Self { chain_id, ..Default::default() }
    }
}

/// A session key bound to an immutable permission set.
#[derive(Debug)]
pub struct SessionKeyValidator<S> {
    signer: S,
    session: SessionKeyData,
    config: SessionValidatorConfig,
    tree: PermissionTree,
    nonce: Option<U256>,
}

impl<S: Signer> SessionKeyValidator<S> {
    /// Build the validator and its permission tree.
    ///
    /// Each permission's `index` is reset to its position in `session.permissions`.
    pub fn new(signer: S, mut session: SessionKeyData, config: SessionValidatorConfig) -> Result<Self> {
        normalize_session(&mut session)?;
        let tree = PermissionTree::build(&session.permissions);
        debug!(
            session_key = %signer.address(),
            chain_id = config.chain_id,
            root = %tree.root(),
            "session key validator ready"
        );
        Ok(Self { signer, session, config, tree, nonce: None })
    }

    /// Append `nonce` to the enable data, for validators that track session nonces.
    pub fn with_nonce(mut self, nonce: U256) -> Self {
        self.nonce = Some(nonce);
        self
    }

    pub fn nonce(&self) -> Option<U256> {
        self.nonce
    }

    pub fn signer(&self) -> &S {
        &self.signer
    }

    pub fn session_key_address(&self) -> Address {
        self.signer.address()
    }

    pub fn session_data(&self) -> &SessionKeyData {
        &self.session
    }

    pub fn permissions(&self) -> &[Permission] {
        &self.session.permissions
    }

    pub fn config(&self) -> &SessionValidatorConfig {
        &self.config
    }

    pub fn tree(&self) -> &PermissionTree {
        &self.tree
    }

    pub fn merkle_root(&self) -> B256 {
        self.tree.root()
    }

    pub fn enable_data(&self) -> Bytes {
        EnableData {
            session_key: self.session_key_address(),
            merkle_root: self.merkle_root(),
            valid_after: self.session.valid_after,
            valid_until: self.session.valid_until,
            paymaster: self.session.paymaster,
            nonce: self.nonce,
        }
        .encode()
        .into()
    }

    pub fn find_matching_permission(&self, call_data: &[u8]) -> Option<PermissionMatch> {
        matcher::find_matching_permission(call_data, &self.session.permissions)
    }

    /// `abi.encode(permission, proof)` (or the batch form) for `call_data`.
    ///
    /// Empty when the session is unrestricted. Fails with [`Error::NoMatchingPermission`]
    /// when no permission authorizes the call.
    pub fn encoded_permission_proof(&self, call_data: &[u8]) -> Result<Bytes> {
        if self.tree.delegates_via_fallback() {
            return Ok(Bytes::new());
        }
        match self.find_matching_permission(call_data).ok_or(Error::NoMatchingPermission)? {
            PermissionMatch::Single(permission) => {
                let proof = self.tree.proof(&permission).ok_or(Error::NoMatchingPermission)?;
                Ok(encode_permission(&permission, Some(proof.as_slice())))
            }
            PermissionMatch::Batch(permissions) => {
                let proofs = permissions
                    .iter()
                    .map(|permission| self.tree.proof(permission))
                    .collect::<Option<Vec<_>>>()
                    .ok_or(Error::NoMatchingPermission)?;
                Ok(encode_batch_permissions(&permissions, &proofs))
            }
        }
    }

    pub fn user_op_hash(&self, user_op: &UserOperation) -> B256 {
        compute_user_op_hash(user_op, self.config.entry_point, self.config.chain_id)
    }

    /// Sign `user_op` with the session key.
    pub async fn sign_user_operation(&self, user_op: &UserOperation) -> Result<Bytes> {
        // Match first so an unauthorized call never reaches the signer.
        let permission_proof = self.encoded_permission_proof(&user_op.call_data)?;
        let hash = self.user_op_hash(user_op);
        let signature = self.signer.sign_raw_message(hash.as_slice()).await?;
        debug!(sender = %user_op.sender, hash = %hash, "signed user operation with session key");
        Ok(self.assemble(&signature, &permission_proof))
    }

    /// Signature of the same shape as [`Self::sign_user_operation`] for gas estimation.
    pub fn stub_signature(&self, user_op: &UserOperation) -> Result<Bytes> {
        let permission_proof = self.encoded_permission_proof(&user_op.call_data)?;
        Ok(self.assemble(&DUMMY_ECDSA_SIGNATURE, &permission_proof))
    }

    fn assemble(&self, signature: &[u8], permission_proof: &[u8]) -> Bytes {
        let mut out = Vec::with_capacity(20 + signature.len() + permission_proof.len());
        out.extend_from_slice(self.session_key_address().as_slice());
        out.extend_from_slice(signature);
        out.extend_from_slice(permission_proof);
        out.into()
    }

    pub fn validator_data(&self) -> U256 {
        pack_validator_data(
            self.config.validator_address,
            self.session.valid_after,
            self.session.valid_until,
        )
    }

    pub fn enable_message(&self) -> ValidatorApproved {
        ValidatorApproved {
            sig: self.config.selector,
            validatorData: self.validator_data(),
            executor: self.config.executor,
            enableData: self.enable_data(),
        }
    }

    pub fn eip712_domain(&self, account: Address) -> Eip712Domain {
        Eip712Domain::new(
            Some(Cow::Borrowed(KERNEL_NAME)),
            Some(Cow::Owned(self.config.kernel_version.clone())),
            Some(U256::from(self.config.chain_id)),
            Some(account),
            None,
        )
    }

    /// Typed message the account's sudo key signs to enable this validator on `account`.
    pub fn enable_typed_data(&self, account: Address) -> TypedData {
        TypedData::from_struct(&self.enable_message(), Some(self.eip712_domain(account)))
    }

    pub async fn enable_signature<T>(&self, sudo: &T, account: Address) -> Result<Bytes>
    where
        T: Signer + ?Sized,
    {
        let signature = sudo.sign_typed_data(&self.enable_typed_data(account)).await?;
        debug!(%account, sudo = %sudo.address(), "signed validator enable message");
        Ok(signature)
    }

    /// Cache entry for this session's registration on `account`.
    pub fn enabled_key(&self, account: Address) -> EnabledKey {
        EnabledKey {
            account,
            validator: self.config.validator_address,
            session_key: self.session_key_address(),
            merkle_root: self.merkle_root(),
        }
    }

    /// Whether this session is already enabled on `account`.
    ///
    /// Read failures count as "not enabled" and are not cached.
    pub async fn is_enabled<R>(&self, reader: &R, account: Address, cache: &mut EnabledCache) -> bool
    where
        R: ChainReader + ?Sized,
    {
        let key = self.enabled_key(account);
        let validator = key.validator;
        if let Some(enabled) = cache.get(&key) {
            return enabled;
        }
        match self.read_enabled(reader, account).await {
            Ok(enabled) => {
                cache.insert(key, enabled);
                enabled
            }
            Err(err) => {
                warn!(%account, %validator, error = %err, "enabled check failed, assuming not enabled");
                false
            }
        }
    }

    async fn read_enabled<R>(&self, reader: &R, account: Address) -> Result<bool, ChainReadError>
    where
        R: ChainReader + ?Sized,
    {
        let validator = self.config.validator_address;
        let execution =
            read_contract(reader, account, &IKernel::getExecutionCall { selector: self.config.selector })
                .await?
                .detail;
        if execution.validator != validator {
            return Ok(false);
        }

        let stored = read_contract(
            reader,
            validator,
            &ISessionKeyValidator::sessionDataCall { sessionKey: self.session_key_address(), kernel: account },
        )
        .await?;
        Ok(stored.merkleRoot == self.merkle_root()
            && stored.validAfter == self.session.valid_after
            && stored.validUntil == self.session.valid_until
            && stored.paymaster == self.session.paymaster)
    }
}

/// Check field ranges and assign every permission its array position as `index`.
///
/// This is what [`SessionKeyValidator::new`] commits to; the tree of a normalized session
/// equals the validator's.
pub fn normalize_session(session: &mut SessionKeyData) -> Result<()> {
    validate_session(session)?;
    for (position, permission) in session.permissions.iter_mut().enumerate() {
        permission.index =
            u32::try_from(position).map_err(|_| Error::Encoding("too many permissions".into()))?;
    }
    Ok(())
}

fn validate_session(session: &SessionKeyData) -> Result<()> {
    check_u48("validAfter", session.valid_after)?;
    check_u48("validUntil", session.valid_until)?;
    if session.valid_until != 0 && session.valid_until < session.valid_after {
        return Err(Error::Encoding(format!(
            "validUntil {} precedes validAfter {}",
            session.valid_until, session.valid_after
        )));
    }
    for permission in &session.permissions {
        let rule = &permission.execution_rule;
        check_u48("executionRule.validAfter", rule.valid_after)?;
        check_u48("executionRule.interval", rule.interval)?;
        check_u48("executionRule.runs", rule.runs)?;
    }
    Ok(())
}

fn check_u48(field: &str, value: u64) -> Result<()> {
    if value > MAX_UINT48 {
        return Err(Error::Encoding(format!("{field} {value} does not fit in uint48")));
    }
    Ok(())
}
