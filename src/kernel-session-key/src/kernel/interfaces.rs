//! Solidity ABI surface of Kernel v2 and its session-key validator.

use alloy_sol_types::sol;

sol! {
    /// Sub-call of `executeBatch`.
    #[derive(Debug, PartialEq, Eq)]
    struct Call {
        address to;
        uint256 value;
        bytes data;
    }

    /// Kernel's per-selector execution config.
    #[derive(Debug, PartialEq, Eq)]
    struct ExecutionDetail {
        uint48 validAfter;
        uint48 validUntil;
        address executor;
        address validator;
    }

    interface IKernel {
        function execute(address to, uint256 value, bytes data, uint8 operation) external payable;
        function executeBatch(Call[] calls) external payable;
        function executeDelegateCall(address to, bytes data) external payable;
        function getExecution(bytes4 selector) external view returns (ExecutionDetail detail);
    }

    interface ISessionKeyValidator {
        function sessionData(address sessionKey, address kernel)
            external
            view
            returns (bytes32 merkleRoot, uint48 validAfter, uint48 validUntil, address paymaster, uint256 nonce);
    }
}

sol! {
    /// ABI layout of `ParamRule` as verified on-chain.
    #[derive(Debug, PartialEq, Eq)]
    struct ParamRuleTuple {
        uint256 offset;
        uint8 condition;
        bytes32 param;
    }

    #[derive(Debug, PartialEq, Eq)]
    struct ExecutionRuleTuple {
        uint48 interval;
        uint48 runs;
        uint48 validAfter;
    }

    /// ABI layout of `Permission`; `keccak256(abi.encode(permission))` is the Merkle leaf.
    #[derive(Debug, PartialEq, Eq)]
    struct PermissionTuple {
        uint32 index;
        address target;
        bytes4 sig;
        uint256 valueLimit;
        ParamRuleTuple[] rules;
        ExecutionRuleTuple executionRule;
        uint8 operation;
    }
}

sol! {
    /// Kernel v2 typed message the sudo key signs to enable a validator for a selector.
    #[derive(Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
    struct ValidatorApproved {
        bytes4 sig;
        uint256 validatorData;
        address executor;
        bytes enableData;
    }
}
