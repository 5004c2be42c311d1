//! Sorted-pair Keccak-256 Merkle tree.
//!
//! Parents are `keccak256(min(a, b) ++ max(a, b))`, so proofs carry no position bits and verify
//! with the same rule as OpenZeppelin's `MerkleProof`. An unpaired node at the end of a layer is
//! promoted to the next layer unchanged.

use alloy_primitives::B256;
use sha3::{Digest, Keccak256};

/// Hash two nodes in sorted order.
pub fn hash_pair(a: &B256, b: &B256) -> B256 {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    let mut h = Keccak256::new();
    h.update(lo.as_slice());
    h.update(hi.as_slice());
    B256::from_slice(h.finalize().as_slice())
}

/// Fold `proof` onto `leaf` and compare with `root`.
pub fn verify(root: B256, leaf: B256, proof: &[B256]) -> bool {
    let computed = proof.iter().fold(leaf, |acc, node| hash_pair(&acc, node));
    computed == root
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MerkleTree {
    /// `layers[0]` holds the leaves, the last layer holds the root.
    layers: Vec<Vec<B256>>,
}

impl MerkleTree {
    /// Build a tree over already-hashed leaves, in the given order.
    pub fn new(leaves: Vec<B256>) -> Self {
        let mut layers = vec![leaves];
        while let Some(current) = layers.last().filter(|l| l.len() > 1) {
            let next = current
                .chunks(2)
                .map(|pair| match pair {
                    [left, right] => hash_pair(left, right),
                    [single] => *single,
                    _ => unreachable!("chunks(2) yields one or two nodes"),
                })
                .collect();
            layers.push(next);
        }
        Self { layers }
    }

    /// Root of the tree; zero for an empty tree.
    pub fn root(&self) -> B256 {
        self.layers
            .last()
            .and_then(|layer| layer.first())
            .copied()
            .unwrap_or(B256::ZERO)
    }

    pub fn leaves(&self) -> &[B256] {
        &self.layers[0]
    }

    /// Index of the first leaf equal to `leaf`.
    pub fn position(&self, leaf: &B256) -> Option<usize> {
        self.leaves().iter().position(|l| l == leaf)
    }

    /// Authentication path for the leaf at `index`, bottom-up.
    pub fn proof(&self, mut index: usize) -> Option<Vec<B256>> {
        if index >= self.leaves().len() {
            return None;
        }
        let mut proof = Vec::with_capacity(self.layers.len());
        for layer in &self.layers[..self.layers.len() - 1] {
            let sibling = if index % 2 == 0 { index + 1 } else { index - 1 };
            if let Some(node) = layer.get(sibling) {
                proof.push(*node);
            }
            index /= 2;
        }
        Some(proof)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::keccak256;

    fn leaves(n: u32) -> Vec<B256> {
        (0..n).map(|i| keccak256(i.to_be_bytes())).collect()
    }

    #[test]
    fn pair_hash_is_order_independent() {
        let [a, b] = [keccak256("a"), keccak256("b")];
        assert_eq!(hash_pair(&a, &b), hash_pair(&b, &a));

        let mut concat = Vec::new();
        concat.extend_from_slice(a.min(b).as_slice());
        concat.extend_from_slice(a.max(b).as_slice());
        assert_eq!(hash_pair(&a, &b), keccak256(concat));
    }

    #[test]
    fn every_leaf_verifies() {
        for n in 1..=9 {
            let tree = MerkleTree::new(leaves(n));
            for (i, leaf) in tree.leaves().iter().enumerate() {
                let proof = tree.proof(i).unwrap();
                assert!(verify(tree.root(), *leaf, &proof), "n={n} i={i}");
            }
        }
    }

    #[test]
    fn odd_node_is_promoted() {
        let l = leaves(3);
        let tree = MerkleTree::new(l.clone());
        assert_eq!(tree.root(), hash_pair(&hash_pair(&l[0], &l[1]), &l[2]));
        assert_eq!(tree.proof(2).unwrap(), vec![hash_pair(&l[0], &l[1])]);
    }

    #[test]
    fn single_leaf_tree_has_empty_proof() {
        let l = leaves(1);
        let tree = MerkleTree::new(l.clone());
        assert_eq!(tree.root(), l[0]);
        assert!(tree.proof(0).unwrap().is_empty());
    }

    #[test]
    fn empty_tree_root_is_zero() {
        let tree = MerkleTree::new(Vec::new());
        assert_eq!(tree.root(), B256::ZERO);
        assert_eq!(tree.proof(0), None);
    }

    #[test]
    fn wrong_leaf_fails() {
        let tree = MerkleTree::new(leaves(4));
        let proof = tree.proof(1).unwrap();
        assert!(!verify(tree.root(), keccak256("other"), &proof));
    }
}
