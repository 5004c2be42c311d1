use alloy_dyn_abi::{DynSolType, DynSolValue, Specifier};
use alloy_json_abi::JsonAbi;
use alloy_primitives::{aliases::U48, keccak256, Bytes, FixedBytes, B256};
use alloy_sol_types::SolValue;
use kernel_session_types::{ParamCondition, ParamRule, Permission};

use crate::{
    errors::{Error, Result},
    kernel::interfaces::{ExecutionRuleTuple, ParamRuleTuple, PermissionTuple},
};

impl From<&ParamRule> for ParamRuleTuple {
    fn from(rule: &ParamRule) -> Self {
        Self { offset: rule.offset, condition: rule.condition as u8, param: rule.param }
    }
}

impl From<&Permission> for PermissionTuple {
    fn from(permission: &Permission) -> Self {
        Self {
            index: permission.index,
            target: permission.target,
            sig: permission.sig,
            valueLimit: permission.value_limit,
            rules: permission.rules.iter().map(ParamRuleTuple::from).collect(),
            executionRule: ExecutionRuleTuple {
                interval: U48::from(permission.execution_rule.interval),
                runs: U48::from(permission.execution_rule.runs),
                validAfter: U48::from(permission.execution_rule.valid_after),
            },
            operation: permission.operation as u8,
        }
    }
}

/// ABI-encode one permission, optionally followed by its Merkle proof.
///
/// Without a proof this is `abi.encode(permission)`, the preimage of the permission's leaf.
/// With a proof it is `abi.encode(permission, bytes32[] proof)`, the layout the validator
/// decodes from the UserOperation signature.
pub fn encode_permission(permission: &Permission, proof: Option<&[B256]>) -> Bytes {
    let tuple = PermissionTuple::from(permission);
    match proof {
        None => tuple.abi_encode().into(),
        Some(proof) => (tuple, proof.to_vec()).abi_encode_params().into(),
    }
}

/// ABI-encode the permissions matched by an `executeBatch` call with one proof each:
/// `abi.encode(permission[], bytes32[][] proofs)`.
pub fn encode_batch_permissions(permissions: &[Permission], proofs: &[Vec<B256>]) -> Bytes {
    let tuples: Vec<PermissionTuple> = permissions.iter().map(PermissionTuple::from).collect();
    (tuples, proofs.to_vec()).abi_encode_params().into()
}

/// Merkle leaf committed on-chain for `permission`.
pub fn permission_leaf(permission: &Permission) -> B256 {
    keccak256(encode_permission(permission, None))
}

/// Selector and rules derived from an ABI function and argument constraints.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectorRules {
    pub sig: FixedBytes<4>,
    pub rules: Vec<ParamRule>,
}

impl SelectorRules {
    /// Apply to a permission, replacing its selector and rules.
    pub fn apply(self, mut permission: Permission) -> Permission {
        permission.sig = self.sig;
        permission.rules = self.rules;
        permission
    }
}

/// Build the selector and per-argument rules for `function_name`.
///
/// `args[i]` constrains the `i`-th input at offset `i * 32`; `None` leaves it unconstrained.
/// Only static inputs can be constrained since a rule compares exactly one word.
pub fn permission_from_selector_and_args(
    abi: &JsonAbi,
    function_name: &str,
    args: &[Option<(ParamCondition, DynSolValue)>],
) -> Result<SelectorRules> {
    let overloads = abi
        .function(function_name)
        .ok_or_else(|| Error::Encoding(format!("function `{function_name}` not found in ABI")))?;

    let mut last_err = None;
    for function in overloads {
        if function.inputs.len() < args.len() {
            last_err = Some(Error::Encoding(format!(
                "`{}` takes {} arguments, {} constrained",
                function.signature(),
                function.inputs.len(),
                args.len()
            )));
            continue;
        }
        let types = function
            .inputs
            .iter()
            .map(|param| param.resolve())
            .collect::<core::result::Result<Vec<DynSolType>, _>>()
            .map_err(|e| Error::Encoding(e.to_string()))?;

        match rules_for_args(&types, args) {
            Ok(rules) => return Ok(SelectorRules { sig: function.selector(), rules }),
            Err(err) => last_err = Some(err),
        }
    }
    Err(last_err
        .unwrap_or_else(|| Error::Encoding(format!("function `{function_name}` not found in ABI"))))
}

/// Whether `ty` is ABI-encoded in the tail (`DynSolType::is_dynamic` in later alloy releases).
fn is_dynamic(ty: &DynSolType) -> bool {
    match ty {
        DynSolType::Bytes | DynSolType::String | DynSolType::Array(_) => true,
        DynSolType::FixedArray(inner, _) => is_dynamic(inner),
        DynSolType::Tuple(tuple) | DynSolType::CustomStruct { tuple, .. } => tuple.iter().any(is_dynamic),
        _ => false,
    }
}

fn rules_for_args(
    types: &[DynSolType],
    args: &[Option<(ParamCondition, DynSolValue)>],
) -> Result<Vec<ParamRule>> {
    let mut rules = Vec::new();
    for (i, arg) in args.iter().enumerate() {
        let Some((condition, value)) = arg else {
            continue;
        };
        let ty = &types[i];
        if is_dynamic(ty) {
            return Err(Error::Encoding(format!("argument {i} has dynamic type {ty}")));
        }
        if !ty.matches(value) {
            return Err(Error::Encoding(format!("argument {i} is not a {ty}")));
        }
        let word = value.abi_encode();
        if word.len() != 32 {
            return Err(Error::Encoding(format!("argument {i} does not fit in one word")));
        }
        rules.push(ParamRule::new(i * 32, *condition, B256::from_slice(&word)));
    }
    Ok(rules)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{address, fixed_bytes, hex, U256};
    use kernel_session_types::{ExecutionRule, Operation};

    const ERC20_ABI: &str = r#"[
        {"type":"function","name":"transfer","stateMutability":"nonpayable",
         "inputs":[{"name":"to","type":"address"},{"name":"amount","type":"uint256"}],
         "outputs":[{"name":"","type":"bool"}]},
        {"type":"function","name":"setName","stateMutability":"nonpayable",
         "inputs":[{"name":"name","type":"string"}],"outputs":[]}
    ]"#;

    fn transfer_permission() -> Permission {
        Permission::new(
            address!("7227dcfb0c5ec7a5f539f97b18be261c49687ed6"),
            fixed_bytes!("a9059cbb"),
        )
        .with_rule(ParamRule::uint_arg(1, ParamCondition::LessThanOrEqual, U256::from(10_000u64)))
    }

    #[test]
    fn encodes_permission_tuple_layout() {
        let permission = Permission::new(Default::default(), Default::default())
            .with_execution_rule(ExecutionRule { valid_after: 3, interval: 1, runs: 2 })
            .with_operation(Operation::DelegateCall);
        let encoded = encode_permission(&permission, None);

        // tuple offset, nine head words (execution rule is inline), empty rules length
        assert_eq!(encoded.len(), 32 + 9 * 32 + 32);
        let word = |i: usize| U256::from_be_slice(&encoded[32 + i * 32..64 + i * 32]);
        // rules offset relative to tuple start
        assert_eq!(word(4), U256::from(9 * 32));
        assert_eq!(word(5), U256::from(1));
        assert_eq!(word(6), U256::from(2));
        assert_eq!(word(7), U256::from(3));
        assert_eq!(word(8), U256::from(1));
    }

    #[test]
    fn proof_is_appended_as_second_param() {
        let permission = transfer_permission();
        let proof = vec![B256::repeat_byte(0xab), B256::repeat_byte(0xcd)];
        let encoded = encode_permission(&permission, Some(proof.as_slice()));

        let (decoded, decoded_proof) =
            <(PermissionTuple, Vec<B256>)>::abi_decode_params(&encoded, true).unwrap();
        assert_eq!(decoded, PermissionTuple::from(&permission));
        assert_eq!(decoded_proof, proof);
    }

    #[test]
    fn batch_encoding_decodes() {
        let permissions = vec![transfer_permission(), transfer_permission()];
        let proofs = vec![vec![B256::repeat_byte(1)], vec![B256::repeat_byte(2)]];
        let encoded = encode_batch_permissions(&permissions, &proofs);

        let (decoded, decoded_proofs) =
            <(Vec<PermissionTuple>, Vec<Vec<B256>>)>::abi_decode_params(&encoded, true).unwrap();
        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded_proofs, proofs);
    }

    #[test]
    fn index_changes_leaf() {
        let a = transfer_permission();
        let mut b = a.clone();
        b.index = 1;
        assert_ne!(permission_leaf(&a), permission_leaf(&b));
    }

    #[test]
    fn rules_from_abi() {
        let abi: JsonAbi = serde_json::from_str(ERC20_ABI).unwrap();
        let to = address!("f022051bEB9E8848e99f47D3eD1397CEEfBF3d4F");
        let derived = permission_from_selector_and_args(
            &abi,
            "transfer",
            &[
                Some((ParamCondition::Equal, DynSolValue::Address(to))),
                Some((ParamCondition::LessThanOrEqual, DynSolValue::Uint(U256::from(10_000u64), 256))),
            ],
        )
        .unwrap();

        assert_eq!(derived.sig, fixed_bytes!("a9059cbb"));
        assert_eq!(derived.rules.len(), 2);
        assert_eq!(derived.rules[0], ParamRule::address_arg(0, ParamCondition::Equal, to));
        assert_eq!(derived.rules[1].offset, U256::from(32));
        assert_eq!(
            derived.rules[1].param,
            B256::from(hex!("0000000000000000000000000000000000000000000000000000000000002710"))
        );
    }

    #[test]
    fn unconstrained_args_are_skipped() {
        let abi: JsonAbi = serde_json::from_str(ERC20_ABI).unwrap();
        let derived = permission_from_selector_and_args(
            &abi,
            "transfer",
            &[None, Some((ParamCondition::GreaterThan, DynSolValue::Uint(U256::ZERO, 256)))],
        )
        .unwrap();
        assert_eq!(derived.rules, vec![ParamRule::uint_arg(1, ParamCondition::GreaterThan, U256::ZERO)]);
    }

    #[test]
    fn unknown_function_fails() {
        let abi: JsonAbi = serde_json::from_str(ERC20_ABI).unwrap();
        let err = permission_from_selector_and_args(&abi, "approve", &[]).unwrap_err();
        assert!(matches!(err, Error::Encoding(_)));
    }

    #[test]
    fn dynamic_argument_fails() {
        let abi: JsonAbi = serde_json::from_str(ERC20_ABI).unwrap();
        let err = permission_from_selector_and_args(
            &abi,
            "setName",
            &[Some((ParamCondition::Equal, DynSolValue::String("x".into())))],
        )
        .unwrap_err();
        assert!(matches!(err, Error::Encoding(_)));
    }
}
