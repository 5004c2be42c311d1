use alloy_primitives::B256;
use kernel_session_types::Permission;
use tracing::debug;

use crate::{encoder::permission_leaf, merkle::MerkleTree};

/// Merkle commitment over a session's permissions.
///
/// Leaves are `keccak256(abi.encode(permission))` in the order of the permission array.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PermissionTree {
    tree: MerkleTree,
}

impl PermissionTree {
    pub fn build(permissions: &[Permission]) -> Self {
        let leaves = match permissions {
            // Unhashed zero leaf: root 0 tells the validator no restriction applies.
            [] => vec![B256::ZERO],
            // A lone leaf would have an empty proof; pair it with itself.
            [only] => {
                let leaf = permission_leaf(only);
                vec![leaf, leaf]
            }
            many => many.iter().map(permission_leaf).collect(),
        };
        let tree = MerkleTree::new(leaves);
        debug!(permissions = permissions.len(), root = %tree.root(), "built permission tree");
        Self { tree }
    }

    pub fn root(&self) -> B256 {
        self.tree.root()
    }

    /// Whether the session is unrestricted (root is zero), so calls need no permission proof.
    pub fn delegates_via_fallback(&self) -> bool {
        self.root() == B256::ZERO
    }

    /// Proof for `permission`, or `None` if it is not a leaf of this tree.
    pub fn proof(&self, permission: &Permission) -> Option<Vec<B256>> {
        if self.delegates_via_fallback() {
            return None;
        }
        let leaf = permission_leaf(permission);
        self.tree.position(&leaf).and_then(|index| self.tree.proof(index))
    }

    pub fn leaves(&self) -> &[B256] {
        self.tree.leaves()
    }
}
