//! One signature authorizing UserOperations on several chains.
//!
//! Per-chain hashes become the leaves of a sorted-pair Merkle tree whose root is signed once.
//! Each chain receives `rootSignature ++ merkleRoot ++ abi.encode(bytes32[] proof)`.

use std::future::Future;

use alloy_primitives::{Address, Bytes, B256};
use alloy_sol_types::SolValue;
use futures::future::try_join_all;
use tracing::debug;

use crate::{
    errors::{Error, Result},
    merkle::MerkleTree,
    signer::Signer,
    user_op::{compute_user_op_hash, UserOperation},
};

/// A UserOperation bound to the chain it executes on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChainOperation {
    pub user_op: UserOperation,
    pub entry_point: Address,
    pub chain_id: u64,
}

impl ChainOperation {
    pub fn new(user_op: UserOperation, entry_point: Address, chain_id: u64) -> Self {
        Self { user_op, entry_point, chain_id }
    }

    pub fn hash(&self) -> B256 {
        compute_user_op_hash(&self.user_op, self.entry_point, self.chain_id)
    }
}

#[derive(Clone, Debug)]
pub struct MultiChainAggregator {
    tree: MerkleTree,
}

impl MultiChainAggregator {
    /// Aggregate per-chain hashes, in the order given. At least two are required.
    pub fn from_hashes(hashes: Vec<B256>) -> Result<Self> {
        if hashes.len() < 2 {
            return Err(Error::Precondition("multi-chain signing needs at least two operations"));
        }
        Ok(Self { tree: MerkleTree::new(hashes) })
    }

    pub fn from_operations(operations: &[ChainOperation]) -> Result<Self> {
        Self::from_hashes(operations.iter().map(ChainOperation::hash).collect())
    }

    pub fn root(&self) -> B256 {
        self.tree.root()
    }

    pub fn leaves(&self) -> &[B256] {
        self.tree.leaves()
    }

    pub fn proof(&self, index: usize) -> Option<Vec<B256>> {
        self.tree.proof(index)
    }

    /// Sign the root once and derive every chain's signature, in leaf order.
    pub async fn sign<S>(&self, signer: &S) -> Result<Vec<Bytes>>
    where
        S: Signer + ?Sized,
    {
        let root = self.root();
        let root_signature = signer.sign_raw_message(root.as_slice()).await?;
        debug!(chains = self.leaves().len(), %root, "signed multi-chain root");

        (0..self.leaves().len())
            .map(|index| {
                let proof = self
                    .proof(index)
                    .ok_or(Error::Precondition("leaf index out of range"))?;
                Ok(chain_signature(&root_signature, root, &proof))
            })
            .collect()
    }
}

/// `rootSignature ++ merkleRoot ++ abi.encode(bytes32[] proof)`.
pub fn chain_signature(root_signature: &[u8], root: B256, proof: &[B256]) -> Bytes {
    let encoded_proof = proof.to_vec().abi_encode();
    let mut out = Vec::with_capacity(root_signature.len() + 32 + encoded_proof.len());
    out.extend_from_slice(root_signature);
    out.extend_from_slice(root.as_slice());
    out.extend_from_slice(&encoded_proof);
    out.into()
}

/// Run every chain's preparation concurrently, then sign all of them with one root signature.
///
/// Any failed preparation fails the whole batch. Returned operations keep input order and carry
/// their per-chain signature.
pub async fn prepare_and_sign<I, F, S>(preparations: I, signer: &S) -> Result<Vec<ChainOperation>>
where
    I: IntoIterator<Item = F>,
    F: Future<Output = Result<ChainOperation>>,
    S: Signer + ?Sized,
{
    let mut operations = try_join_all(preparations).await?;
    let aggregator = MultiChainAggregator::from_operations(&operations)?;
    let signatures = aggregator.sign(signer).await?;
    for (operation, signature) in operations.iter_mut().zip(signatures) {
        operation.user_op.signature = signature;
    }
    Ok(operations)
}
