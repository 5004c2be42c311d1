/*
 * ERC-4337 v0.6 UserOperation and its hash.
 *
 * 1. Hash variable-length fields: initCode, callData, paymasterAndData
 * 2. Pack all fields (hashes from step 1, gas values as uint256); signature is excluded
 * 3. encodedHash = keccak256(abi.encode(packed))
 * 4. userOpHash  = keccak256(abi.encode(encodedHash, entryPoint, chainId))
 */
use alloy_primitives::{keccak256, Address, Bytes, B256, U256};
use alloy_sol_types::{sol, SolValue};
use serde::{Deserialize, Serialize};

sol! {
    #[derive(Default, Debug, PartialEq, Eq)]
    struct UserOperationHashEncoded {
        bytes32 encodedHash;
        address entryPoint;
        uint256 chainId;
    }

    #[derive(Default, Debug, PartialEq, Eq)]
    struct UserOperationPackedForHash {
        address sender;
        uint256 nonce;
        bytes32 hashInitCode;
        bytes32 hashCallData;
        uint256 callGasLimit;
        uint256 verificationGasLimit;
        uint256 preVerificationGas;
        uint256 maxFeePerGas;
        uint256 maxPriorityFeePerGas;
        bytes32 hashPaymasterAndData;
    }
}

/// ERC-4337 v0.6 UserOperation, as sent to bundlers.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOperation {
    pub sender: Address,
    pub nonce: U256,
    pub init_code: Bytes,
    pub call_data: Bytes,
    pub call_gas_limit: U256,
    pub verification_gas_limit: U256,
    pub pre_verification_gas: U256,
    pub max_fee_per_gas: U256,
    pub max_priority_fee_per_gas: U256,
    pub paymaster_and_data: Bytes,
    pub signature: Bytes,
}

impl UserOperation {
    pub fn new(sender: Address, nonce: U256, call_data: Bytes) -> Self {
        Self { sender, nonce, call_data, ..Default::default() }
    }

    pub fn with_signature(mut self, signature: Bytes) -> Self {
        self.signature = signature;
        self
    }
}

impl From<&UserOperation> for UserOperationPackedForHash {
    fn from(op: &UserOperation) -> Self {
        Self {
            sender: op.sender,
            nonce: op.nonce,
            hashInitCode: keccak256(&op.init_code),
            hashCallData: keccak256(&op.call_data),
            callGasLimit: op.call_gas_limit,
            verificationGasLimit: op.verification_gas_limit,
            preVerificationGas: op.pre_verification_gas,
            maxFeePerGas: op.max_fee_per_gas,
            maxPriorityFeePerGas: op.max_priority_fee_per_gas,
            hashPaymasterAndData: keccak256(&op.paymaster_and_data),
        }
    }
}

/// Computes the hash of a v0.6 user operation as defined by ERC-4337.
///
/// The signature field does not take part in the hash.
pub fn compute_user_op_hash(user_operation: &UserOperation, entry_point: Address, chain_id: u64) -> B256 {
    let packed = UserOperationPackedForHash::from(user_operation);
    let encoded = UserOperationHashEncoded {
        encodedHash: keccak256(packed.abi_encode()),
        entryPoint: entry_point,
        chainId: U256::from(chain_id),
    };
    keccak256(encoded.abi_encode())
}
