use alloc::vec::Vec;

use alloy_primitives::{address, Address};

use crate::permission::Permission;

/// Paymaster sentinel meaning "any paymaster may sponsor the session".
pub const ANY_PAYMASTER: Address = address!("0000000000000000000000000000000000000001");

/// Largest value representable by a `uint48` field.
pub const MAX_UINT48: u64 = (1 << 48) - 1;

/// Session-wide policy registered alongside the permission root.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct SessionKeyData {
    /// Unix seconds; 0 means unbounded.
    #[cfg_attr(feature = "serde", serde(default))]
    pub valid_after: u64,
    /// Unix seconds; 0 means unbounded.
    #[cfg_attr(feature = "serde", serde(default))]
    pub valid_until: u64,
    #[cfg_attr(feature = "serde", serde(default))]
    pub paymaster: Address,
    #[cfg_attr(feature = "serde", serde(default))]
    pub permissions: Vec<Permission>,
    /// Legacy hint for which permission to use when none is resolved.
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub permission_index: Option<u32>,
}

impl SessionKeyData {
    pub fn new(permissions: Vec<Permission>) -> Self {
        Self { permissions, ..Default::default() }
    }

    pub fn with_validity(mut self, valid_after: u64, valid_until: u64) -> Self {
        self.valid_after = valid_after;
        self.valid_until = valid_until;
        self
    }

    pub fn with_paymaster(mut self, paymaster: Address) -> Self {
        self.paymaster = paymaster;
        self
    }

    pub fn paymaster_policy(&self) -> PaymasterPolicy {
        PaymasterPolicy::from(self.paymaster)
    }
}

/// Interpretation of [`SessionKeyData::paymaster`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PaymasterPolicy {
    /// Zero address: no paymaster requirement.
    Unrestricted,
    /// Sentinel `0x…01`: any paymaster, no restriction on which.
    AnyPaymaster,
    /// Only this paymaster may sponsor the session's operations.
    Only(Address),
}

impl From<Address> for PaymasterPolicy {
    fn from(paymaster: Address) -> Self {
        if paymaster == Address::ZERO {
            PaymasterPolicy::Unrestricted
        } else if paymaster == ANY_PAYMASTER {
            PaymasterPolicy::AnyPaymaster
        } else {
            PaymasterPolicy::Only(paymaster)
        }
    }
}

impl PaymasterPolicy {
    /// Whether a UserOperation carrying `paymaster_and_data` satisfies the policy.
    pub fn permits(&self, paymaster_and_data: &[u8]) -> bool {
        match self {
            PaymasterPolicy::Unrestricted | PaymasterPolicy::AnyPaymaster => true,
            PaymasterPolicy::Only(expected) => {
                paymaster_and_data.len() >= 20
                    && Address::from_slice(&paymaster_and_data[..20]) == *expected
            }
        }
    }
}
