//! Enable, export, import and sign, the way an application drives a session key.

use alloy_primitives::{address, b256, Address, B256, U256};
use alloy_sol_types::{sol, SolCall};
use eyre::Result;
use kernel_session_key::{
    kernel::interfaces::IKernel, merkle::verify, signer::recover_address, utils::kernel::EnableData,
    ChainOperation, LocalSigner, MultiChainAggregator, ParamCondition, ParamRule, Permission,
    SessionExport, SessionKeyData, SessionKeyValidator, SessionValidatorConfig, Signer,
    UserOperation,
};

sol! {
    function transfer(address to, uint256 amount) external returns (bool);
}

const SUDO_KEY: B256 = b256!("ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80");
const SESSION_KEY: B256 = b256!("59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d");
const ACCOUNT: Address = address!("6605F8785E09a245DD558e55F9A0f4A508434503");
const USDC: Address = address!("833589fCD6eDb6E08f4c7C32D4f71b54bdA02913");
const RECIPIENT: Address = address!("2dc2fb2f4f11dee1d6a2054ffcbf102d09b62be2");

fn session() -> SessionKeyData {
    let permission = Permission::new(USDC, transferCall::SELECTOR.into())
        .with_rule(ParamRule::address_arg(0, ParamCondition::Equal, RECIPIENT))
        .with_rule(ParamRule::uint_arg(1, ParamCondition::LessThanOrEqual, U256::from(1_000_000u64)));
    SessionKeyData::new(vec![permission]).with_validity(1_700_000_000, 1_900_000_000)
}

fn transfer(amount: u64) -> UserOperation {
    let inner = transferCall { to: RECIPIENT, amount: U256::from(amount) }.abi_encode();
    let call_data =
        IKernel::executeCall { to: USDC, value: U256::ZERO, data: inner.into(), operation: 0 }
            .abi_encode();
    UserOperation::new(ACCOUNT, U256::from(1u64), call_data.into())
}

#[tokio::test]
async fn enable_export_import_sign() -> Result<()> {
    let sudo = LocalSigner::from_bytes(&SUDO_KEY)?;
    let config = SessionValidatorConfig::for_chain(8453);
    let validator =
        SessionKeyValidator::new(LocalSigner::from_bytes(&SESSION_KEY)?, session(), config.clone())?;

    let enable_data = EnableData::decode(&validator.enable_data()).ok_or_else(|| eyre::eyre!("enable data"))?;
    assert_eq!(enable_data.session_key, validator.session_key_address());
    assert_eq!(enable_data.merkle_root, validator.merkle_root());
    assert_eq!(enable_data.valid_until, 1_900_000_000);

    let enable_signature = validator.enable_signature(&sudo, ACCOUNT).await?;
    let enable_hash = validator.enable_typed_data(ACCOUNT).eip712_signing_hash()?;
    assert_eq!(recover_address(&enable_hash, &enable_signature), Some(sudo.address()));

    let exported = validator.to_export(Some(enable_signature.clone())).encode()?;
    let (restored, restored_enable) = SessionExport::decode(&exported)?.into_validator(config)?;
    assert_eq!(restored_enable, Some(enable_signature));
    assert_eq!(restored.enable_data(), validator.enable_data());

    let signature = restored.sign_user_operation(&transfer(500_000)).await?;
    assert_eq!(&signature[..20], validator.session_key_address().as_slice());

    let denied = restored.sign_user_operation(&transfer(1_000_001)).await.unwrap_err();
    assert!(denied.is_permission_denied());
    Ok(())
}

#[tokio::test]
async fn one_signature_for_three_chains() -> Result<()> {
    let sudo = LocalSigner::from_bytes(&SUDO_KEY)?;
    let operations: Vec<ChainOperation> = [1u64, 10, 8453]
        .into_iter()
        .map(|chain_id| {
            let config = SessionValidatorConfig::for_chain(chain_id);
            ChainOperation::new(transfer(1), config.entry_point, chain_id)
        })
        .collect();

    let aggregator = MultiChainAggregator::from_operations(&operations)?;
    let signatures = aggregator.sign(&sudo).await?;
    for (index, (operation, signature)) in operations.iter().zip(&signatures).enumerate() {
        assert_eq!(&signature[65..97], aggregator.root().as_slice());
        let proof = aggregator.proof(index).ok_or_else(|| eyre::eyre!("proof"))?;
        assert!(verify(aggregator.root(), operation.hash(), &proof));
    }
    Ok(())
}
