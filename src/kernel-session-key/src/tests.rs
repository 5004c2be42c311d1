use alloy_dyn_abi::DynSolValue;
use alloy_json_abi::JsonAbi;
use alloy_primitives::{address, b256, eip191_hash_message, Address, Bytes, B256, U256};
use alloy_sol_types::{sol, SolCall, SolValue};
use kernel_session_types::{ParamCondition, ParamRule, Permission, SessionKeyData, ANY_PAYMASTER};

use crate::encoder::{permission_from_selector_and_args, permission_leaf};
use crate::kernel::interfaces::{Call, IKernel, PermissionTuple};
use crate::merkle::verify;
use crate::signer::{recover_address, LocalSigner};
use crate::{Error, PaymasterPolicy, SessionKeyValidator, SessionValidatorConfig, UserOperation};

sol! {
    function transfer(address to, uint256 amount) external returns (bool);
}

const SESSION_KEY: B256 = b256!("59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d");
const ACCOUNT: Address = address!("6605F8785E09a245DD558e55F9A0f4A508434503");
const TOKEN: Address = address!("7227dcfb0c5ec7a5f539f97b18be261c49687ed6");
const RECIPIENT: Address = address!("2dc2fb2f4f11dee1d6a2054ffcbf102d09b62be2");

const ERC20_ABI: &str = r#"[
    {"type":"function","name":"transfer","stateMutability":"nonpayable",
     "inputs":[{"name":"to","type":"address"},{"name":"amount","type":"uint256"}],
     "outputs":[{"name":"","type":"bool"}]},
    {"type":"function","name":"approve","stateMutability":"nonpayable",
     "inputs":[{"name":"spender","type":"address"},{"name":"amount","type":"uint256"}],
     "outputs":[{"name":"","type":"bool"}]}
]"#;

fn capped_transfer() -> Permission {
    Permission::new(TOKEN, transferCall::SELECTOR.into())
        .with_rule(ParamRule::uint_arg(1, ParamCondition::LessThanOrEqual, U256::from(10_000u64)))
}

fn validator(permissions: Vec<Permission>) -> SessionKeyValidator<LocalSigner> {
    SessionKeyValidator::new(
        LocalSigner::from_bytes(&SESSION_KEY).unwrap(),
        SessionKeyData::new(permissions),
        SessionValidatorConfig::for_chain(8453),
    )
    .unwrap()
}

fn transfer_op(amount: u64) -> UserOperation {
    let inner = transferCall { to: RECIPIENT, amount: U256::from(amount) }.abi_encode();
    let call_data =
        IKernel::executeCall { to: TOKEN, value: U256::ZERO, data: inner.into(), operation: 0 }
            .abi_encode();
    UserOperation::new(ACCOUNT, U256::ZERO, call_data.into())
}

#[tokio::test]
async fn test_capped_transfer_end_to_end() {
    let v = validator(vec![capped_transfer()]);

    let signature = v.sign_user_operation(&transfer_op(9_999)).await.unwrap();
    let (permission, proof) =
        <(PermissionTuple, Vec<B256>)>::abi_decode_params(&signature[85..], true).unwrap();
    assert_eq!(permission, PermissionTuple::from(&v.permissions()[0]));
    assert!(verify(v.merkle_root(), permission_leaf(&v.permissions()[0]), &proof));

    let err = v.sign_user_operation(&transfer_op(10_001)).await.unwrap_err();
    assert!(matches!(err, Error::NoMatchingPermission));
}

#[tokio::test]
async fn test_signature_is_over_chain_bound_hash() {
    let v = validator(vec![capped_transfer()]);
    let op = transfer_op(1);
    let signature = v.sign_user_operation(&op).await.unwrap();

    let hash = eip191_hash_message(v.user_op_hash(&op).as_slice());
    assert_eq!(recover_address(&hash, &signature[20..85]), Some(v.session_key_address()));

    let mainnet = SessionKeyValidator::new(
        LocalSigner::from_bytes(&SESSION_KEY).unwrap(),
        SessionKeyData::new(vec![capped_transfer()]),
        SessionValidatorConfig::default(),
    )
    .unwrap();
    assert_ne!(mainnet.user_op_hash(&op), v.user_op_hash(&op));
}

#[tokio::test]
async fn test_batch_signing() {
    let approve = Permission::new(RECIPIENT, alloy_primitives::fixed_bytes!("00000000"));
    let v = validator(vec![capped_transfer(), approve]);

    let inner: Bytes = transferCall { to: RECIPIENT, amount: U256::from(5u64) }.abi_encode().into();
    let call_data = IKernel::executeBatchCall {
        calls: vec![
            Call { to: TOKEN, value: U256::ZERO, data: inner },
            Call { to: RECIPIENT, value: U256::ZERO, data: Bytes::new() },
        ],
    }
    .abi_encode();
    let op = UserOperation::new(ACCOUNT, U256::ZERO, call_data.into());

    let signature = v.sign_user_operation(&op).await.unwrap();
    let (permissions, proofs) =
        <(Vec<PermissionTuple>, Vec<Vec<B256>>)>::abi_decode_params(&signature[85..], true).unwrap();
    assert_eq!(permissions.len(), 2);
    for (i, proof) in proofs.iter().enumerate() {
        assert_eq!(permissions[i].index, i as u32);
        assert!(verify(v.merkle_root(), permission_leaf(&v.permissions()[i]), proof));
    }

    let stub = v.stub_signature(&op).unwrap();
    assert_eq!(stub.len(), signature.len());
}

#[tokio::test]
async fn test_unrestricted_session_has_no_permission_suffix() {
    let v = validator(vec![]);
    assert!(v.tree().delegates_via_fallback());
    let signature = v.sign_user_operation(&transfer_op(1_000_000)).await.unwrap();
    assert_eq!(signature.len(), 85);
    assert_eq!(v.stub_signature(&transfer_op(1_000_000)).unwrap().len(), 85);
}

#[tokio::test]
async fn test_permission_from_abi() {
    let abi: JsonAbi = serde_json::from_str(ERC20_ABI).unwrap();
    let derived = permission_from_selector_and_args(
        &abi,
        "transfer",
        &[
            Some((ParamCondition::Equal, DynSolValue::Address(RECIPIENT))),
            Some((ParamCondition::LessThan, DynSolValue::Uint(U256::from(100u64), 256))),
        ],
    )
    .unwrap();
    let v = validator(vec![derived.apply(Permission::new(TOKEN, Default::default()))]);

    assert!(v.sign_user_operation(&transfer_op(99)).await.is_ok());
    assert!(v.sign_user_operation(&transfer_op(100)).await.unwrap_err().is_permission_denied());

    let missing = permission_from_selector_and_args(&abi, "burn", &[]);
    assert!(matches!(missing, Err(Error::Encoding(_))));
}

#[test]
fn test_paymaster_policy_in_session() {
    let session = SessionKeyData::new(vec![]).with_paymaster(ANY_PAYMASTER);
    assert_eq!(session.paymaster_policy(), PaymasterPolicy::AnyPaymaster);

    let v = SessionKeyValidator::new(
        LocalSigner::from_bytes(&SESSION_KEY).unwrap(),
        session,
        SessionValidatorConfig::default(),
    )
    .unwrap();
    assert_eq!(&v.enable_data()[64..84], ANY_PAYMASTER.as_slice());
}
