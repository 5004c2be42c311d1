//! Serialized session: enough to rebuild a [`SessionKeyValidator`] elsewhere.
//!
//! Format: base64 (standard alphabet) of UTF-8 JSON
//! `{ version, sessionKeyData, sessionPrivateKey, enableSignature?, nonce? }`.

use alloy_primitives::{Bytes, B256, U256};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use kernel_session_types::SessionKeyData;
use serde::{Deserialize, Serialize};

use crate::{
    errors::{Error, Result},
    signer::LocalSigner,
    validator::{SessionKeyValidator, SessionValidatorConfig},
};

pub const EXPORT_VERSION: u32 = 1;

fn default_version() -> u32 {
    EXPORT_VERSION
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionExport {
    /// Absent in exports written before versioning; read as 1.
    #[serde(default = "default_version")]
    pub version: u32,
    pub session_key_data: SessionKeyData,
    pub session_private_key: B256,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_signature: Option<Bytes>,
    /// Enable-data nonce, for sessions registered with one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<U256>,
}

impl SessionExport {
    pub fn new(
        session_key_data: SessionKeyData,
        session_private_key: B256,
        enable_signature: Option<Bytes>,
    ) -> Self {
        Self {
            version: EXPORT_VERSION,
            session_key_data,
            session_private_key,
            enable_signature,
            nonce: None,
        }
    }

    pub fn encode(&self) -> Result<String> {
        let json = serde_json::to_vec(self).map_err(|e| Error::Export(e.to_string()))?;
        Ok(STANDARD.encode(json))
    }

    pub fn decode(encoded: &str) -> Result<Self> {
        let json = STANDARD
            .decode(encoded.trim())
            .map_err(|e| Error::Export(format!("base64: {e}")))?;
        let export: Self =
            serde_json::from_slice(&json).map_err(|e| Error::Export(format!("json: {e}")))?;
        if export.version != EXPORT_VERSION {
            return Err(Error::Export(format!("unsupported version {}", export.version)));
        }
        Ok(export)
    }

    pub fn signer(&self) -> Result<LocalSigner> {
        Ok(LocalSigner::from_bytes(&self.session_private_key)?)
    }

    /// Rebuild the validator; the enable signature, if any, is returned alongside it.
    pub fn into_validator(
        self,
        config: SessionValidatorConfig,
    ) -> Result<(SessionKeyValidator<LocalSigner>, Option<Bytes>)> {
        let signer = self.signer()?;
        let mut validator = SessionKeyValidator::new(signer, self.session_key_data, config)?;
        if let Some(nonce) = self.nonce {
            validator = validator.with_nonce(nonce);
        }
        Ok((validator, self.enable_signature))
    }
}

impl SessionKeyValidator<LocalSigner> {
    pub fn to_export(&self, enable_signature: Option<Bytes>) -> SessionExport {
        SessionExport {
            nonce: self.nonce(),
            ..SessionExport::new(self.session_data().clone(), self.signer().to_bytes(), enable_signature)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{address, b256, bytes, fixed_bytes, U256};
    use kernel_session_types::{ParamCondition, ParamRule, Permission};

    const KEY: B256 = b256!("59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d");

    fn validator() -> SessionKeyValidator<LocalSigner> {
        let permission = Permission::new(
            address!("7227dcfb0c5ec7a5f539f97b18be261c49687ed6"),
            fixed_bytes!("a9059cbb"),
        )
        .with_rule(ParamRule::uint_arg(1, ParamCondition::LessThanOrEqual, U256::from(10_000u64)));
        let session = SessionKeyData::new(vec![permission]).with_validity(0, 1_800_000_000);
        SessionKeyValidator::new(
            LocalSigner::from_bytes(&KEY).unwrap(),
            session,
            SessionValidatorConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn export_rebuilds_same_validator() {
        let original = validator();
        let encoded = original.to_export(Some(bytes!("c0ffee"))).encode().unwrap();

        let (restored, enable_signature) =
            SessionExport::decode(&encoded).unwrap().into_validator(Default::default()).unwrap();
        assert_eq!(restored.session_key_address(), original.session_key_address());
        assert_eq!(restored.merkle_root(), original.merkle_root());
        assert_eq!(restored.enable_data(), original.enable_data());
        assert_eq!(enable_signature, Some(bytes!("c0ffee")));
    }

    #[test]
    fn missing_version_reads_as_current() {
        let json = serde_json::json!({
            "sessionKeyData": { "validUntil": 5 },
            "sessionPrivateKey": KEY,
        });
        let encoded = STANDARD.encode(json.to_string());
        let export = SessionExport::decode(&encoded).unwrap();
        assert_eq!(export.version, EXPORT_VERSION);
        assert_eq!(export.enable_signature, None);
        assert_eq!(export.nonce, None);
    }

    #[test]
    fn nonce_survives_export() {
        let original = validator().with_nonce(U256::from(5u64));
        let export = original.to_export(None);
        assert_eq!(export.nonce, Some(U256::from(5u64)));

        let (restored, _) =
            SessionExport::decode(&export.encode().unwrap()).unwrap().into_validator(Default::default()).unwrap();
        assert_eq!(restored.nonce(), Some(U256::from(5u64)));
        assert_eq!(restored.enable_data().len(), crate::kernel::constants::ENABLE_DATA_WITH_NONCE_LEN);
        assert_eq!(restored.enable_data(), original.enable_data());

        // exports without a nonce keep the short layout and omit the field
        let plain = validator().to_export(None);
        let json = serde_json::to_value(&plain).unwrap();
        assert!(json.get("nonce").is_none());
    }

    #[test]
    fn unknown_version_is_rejected() {
        let mut export = validator().to_export(None);
        export.version = 2;
        let encoded = STANDARD.encode(serde_json::to_vec(&export).unwrap());
        assert!(matches!(SessionExport::decode(&encoded), Err(Error::Export(_))));
    }

    #[test]
    fn garbage_is_an_export_error() {
        assert!(matches!(SessionExport::decode("not base64!"), Err(Error::Export(_))));
        assert!(matches!(SessionExport::decode(&STANDARD.encode("{}")), Err(Error::Export(_))));
    }
}
