use alloc::vec::Vec;

use alloy_primitives::{Address, FixedBytes, B256, U256};

/// Selector value that matches any function.
pub const ANY_SELECTOR: FixedBytes<4> = FixedBytes::ZERO;

/// Target value that matches any contract.
pub const ANY_TARGET: Address = Address::ZERO;

/// Comparison applied by a [`ParamRule`] to one calldata word.
///
/// Discriminants are the on-chain `ParamCondition` values. Deserializes from either the name
/// (`"LESS_THAN_OR_EQUAL"`) or the discriminant (`4`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
#[repr(u8)]
pub enum ParamCondition {
    Equal = 0,
    GreaterThan = 1,
    LessThan = 2,
    GreaterThanOrEqual = 3,
    LessThanOrEqual = 4,
    NotEqual = 5,
}

impl ParamCondition {
    /// Evaluate `actual <condition> expected` as unsigned 256-bit integers.
    pub fn evaluate(self, actual: U256, expected: U256) -> bool {
        match self {
            ParamCondition::Equal => actual == expected,
            ParamCondition::GreaterThan => actual > expected,
            ParamCondition::LessThan => actual < expected,
            ParamCondition::GreaterThanOrEqual => actual >= expected,
            ParamCondition::LessThanOrEqual => actual <= expected,
            ParamCondition::NotEqual => actual != expected,
        }
    }
}

impl TryFrom<u8> for ParamCondition {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        use ParamCondition::*;
        let condition = match value {
            0 => Equal,
            1 => GreaterThan,
            2 => LessThan,
            3 => GreaterThanOrEqual,
            4 => LessThanOrEqual,
            5 => NotEqual,
            other => return Err(other),
        };
        Ok(condition)
    }
}

/// Kind of call the account performs on behalf of the session key.
///
/// Deserializes from `"call"`/`"delegateCall"` or `0`/`1`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
#[repr(u8)]
pub enum Operation {
    #[default]
    Call = 0,
    DelegateCall = 1,
}

impl TryFrom<u8> for Operation {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Operation::Call),
            1 => Ok(Operation::DelegateCall),
            other => Err(other),
        }
    }
}

#[cfg(feature = "serde")]
mod discriminant {
    use core::{fmt, marker::PhantomData};

    use serde::de::{self, Deserialize, Deserializer, Unexpected, Visitor};

    use super::{Operation, ParamCondition};

    /// Enums written either by name or by their on-chain `uint8` value.
    trait Discriminant: TryFrom<u8, Error = u8> + Sized {
        /// Serialized names, in discriminant order.
        const NAMES: &'static [&'static str];

        fn from_name(name: &str) -> Option<Self> {
            let index = Self::NAMES.iter().position(|n| *n == name)?;
            Self::try_from(u8::try_from(index).ok()?).ok()
        }
    }

    impl Discriminant for ParamCondition {
        const NAMES: &'static [&'static str] = &[
            "EQUAL",
            "GREATER_THAN",
            "LESS_THAN",
            "GREATER_THAN_OR_EQUAL",
            "LESS_THAN_OR_EQUAL",
            "NOT_EQUAL",
        ];
    }

    impl Discriminant for Operation {
        const NAMES: &'static [&'static str] = &["call", "delegateCall"];
    }

    struct DiscriminantVisitor<T>(PhantomData<T>);

    impl<'de, T: Discriminant> Visitor<'de> for DiscriminantVisitor<T> {
        type Value = T;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "one of {:?} or its numeric value", T::NAMES)
        }

        fn visit_u64<E: de::Error>(self, value: u64) -> Result<T, E> {
            u8::try_from(value)
                .ok()
                .and_then(|v| T::try_from(v).ok())
                .ok_or_else(|| E::invalid_value(Unexpected::Unsigned(value), &self))
        }

        fn visit_i64<E: de::Error>(self, value: i64) -> Result<T, E> {
            match u64::try_from(value) {
                Ok(value) => self.visit_u64(value),
                Err(_) => Err(E::invalid_value(Unexpected::Signed(value), &self)),
            }
        }

        fn visit_str<E: de::Error>(self, value: &str) -> Result<T, E> {
            if let Some(parsed) = T::from_name(value) {
                return Ok(parsed);
            }
            match value.parse::<u8>() {
                Ok(number) => {
                    T::try_from(number).map_err(|_| E::invalid_value(Unexpected::Str(value), &self))
                }
                Err(_) => Err(E::unknown_variant(value, T::NAMES)),
            }
        }
    }

    impl<'de> Deserialize<'de> for ParamCondition {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            deserializer.deserialize_any(DiscriminantVisitor(PhantomData))
        }
    }

    impl<'de> Deserialize<'de> for Operation {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            deserializer.deserialize_any(DiscriminantVisitor(PhantomData))
        }
    }
}

/// Constraint on one 32-byte word of the call arguments.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct ParamRule {
    /// Byte offset into the arguments, i.e. after the 4-byte selector.
    pub offset: U256,
    pub condition: ParamCondition,
    /// Right-hand side, left-padded to 32 bytes.
    pub param: B256,
}

impl ParamRule {
    pub fn new(offset: usize, condition: ParamCondition, param: B256) -> Self {
        Self { offset: U256::from(offset), condition, param }
    }

    /// Rule on the `index`-th static argument, compared against an integer.
    pub fn uint_arg(index: usize, condition: ParamCondition, value: U256) -> Self {
        Self::new(index * 32, condition, B256::from(value.to_be_bytes::<32>()))
    }

    /// Rule on the `index`-th static argument, compared against an address.
    pub fn address_arg(index: usize, condition: ParamCondition, value: Address) -> Self {
        Self::new(index * 32, condition, value.into_word())
    }

    /// Evaluate the rule against the argument bytes (calldata without selector).
    ///
    /// A word that does not fit inside `args` fails the rule.
    pub fn check(&self, args: &[u8]) -> bool {
        let Ok(offset) = usize::try_from(self.offset) else {
            return false;
        };
        let Some(end) = offset.checked_add(32) else {
            return false;
        };
        if args.len() < end {
            return false;
        }
        let actual = U256::from_be_slice(&args[offset..end]);
        let expected = U256::from_be_bytes(self.param.0);
        self.condition.evaluate(actual, expected)
    }
}

/// Temporal and call-count limits, enforced on-chain.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase", default))]
pub struct ExecutionRule {
    pub valid_after: u64,
    pub interval: u64,
    pub runs: u64,
}

/// A single grant of capability to a session key.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Permission {
    #[cfg_attr(feature = "serde", serde(default))]
    pub index: u32,
    pub target: Address,
    #[cfg_attr(feature = "serde", serde(default))]
    pub sig: FixedBytes<4>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub value_limit: U256,
    #[cfg_attr(feature = "serde", serde(default))]
    pub rules: Vec<ParamRule>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub execution_rule: ExecutionRule,
    #[cfg_attr(feature = "serde", serde(default))]
    pub operation: Operation,
}

impl Permission {
    pub fn new(target: Address, sig: FixedBytes<4>) -> Self {
        Self {
            index: 0,
            target,
            sig,
            value_limit: U256::ZERO,
            rules: Vec::new(),
            execution_rule: ExecutionRule::default(),
            operation: Operation::Call,
        }
    }

    pub fn with_value_limit(mut self, value_limit: U256) -> Self {
        self.value_limit = value_limit;
        self
    }

    pub fn with_rule(mut self, rule: ParamRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn with_rules(mut self, rules: impl IntoIterator<Item = ParamRule>) -> Self {
        self.rules.extend(rules);
        self
    }

    pub fn with_execution_rule(mut self, execution_rule: ExecutionRule) -> Self {
        self.execution_rule = execution_rule;
        self
    }

    pub fn with_operation(mut self, operation: Operation) -> Self {
        self.operation = operation;
        self
    }

    pub fn is_any_target(&self) -> bool {
        self.target == ANY_TARGET
    }

    pub fn is_any_selector(&self) -> bool {
        self.sig == ANY_SELECTOR
    }
}
