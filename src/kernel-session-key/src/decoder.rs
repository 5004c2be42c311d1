use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::SolCall;
use kernel_session_types::Operation;
use tracing::debug;

use crate::kernel::interfaces::IKernel;

/// One call the account will perform.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Execution {
    pub target: Address,
    pub value: U256,
    pub data: Bytes,
    pub operation: Operation,
}

impl Execution {
    /// Selector of the inner call, if it has one.
    pub fn selector(&self) -> Option<[u8; 4]> {
        self.data.get(..4).map(|s| [s[0], s[1], s[2], s[3]])
    }

    /// Arguments of the inner call (calldata after the selector).
    pub fn args(&self) -> &[u8] {
        self.data.get(4..).unwrap_or_default()
    }
}

/// Account calldata classified by dispatch function.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KernelCall {
    Execute(Execution),
    Batch(Vec<Execution>),
    DelegateCall(Execution),
    /// Not a dispatch function the session-key path recognises, or malformed arguments.
    Unrecognized,
}

impl KernelCall {
    /// Decode `call_data` by selector, then with the matching function's decoder.
    pub fn decode(call_data: &[u8]) -> Self {
        let Some(selector) = call_data.get(..4) else {
            return KernelCall::Unrecognized;
        };

        let decoded = match selector {
            s if s == IKernel::executeCall::SELECTOR => decode_execute(call_data),
            s if s == IKernel::executeBatchCall::SELECTOR => decode_batch(call_data),
            s if s == IKernel::executeDelegateCallCall::SELECTOR => decode_delegate_call(call_data),
            _ => None,
        };
        decoded.unwrap_or_else(|| {
            debug!(selector = %hex::encode(selector), "unrecognized account call");
            KernelCall::Unrecognized
        })
    }

    /// The calls this dispatch performs, in order.
    pub fn executions(&self) -> &[Execution] {
        match self {
            KernelCall::Execute(execution) | KernelCall::DelegateCall(execution) => {
                core::slice::from_ref(execution)
            }
            KernelCall::Batch(executions) => executions,
            KernelCall::Unrecognized => &[],
        }
    }
}

fn decode_execute(call_data: &[u8]) -> Option<KernelCall> {
    let call = IKernel::executeCall::abi_decode(call_data, true).ok()?;
    let operation = Operation::try_from(call.operation).ok()?;
    Some(KernelCall::Execute(Execution {
        target: call.to,
        value: call.value,
        data: call.data,
        operation,
    }))
}

fn decode_batch(call_data: &[u8]) -> Option<KernelCall> {
    let call = IKernel::executeBatchCall::abi_decode(call_data, true).ok()?;
    let executions = call
        .calls
        .into_iter()
        .map(|c| Execution { target: c.to, value: c.value, data: c.data, operation: Operation::Call })
        .collect();
    Some(KernelCall::Batch(executions))
}

fn decode_delegate_call(call_data: &[u8]) -> Option<KernelCall> {
    let call = IKernel::executeDelegateCallCall::abi_decode(call_data, true).ok()?;
    Some(KernelCall::DelegateCall(Execution {
        target: call.to,
        value: U256::ZERO,
        data: call.data,
        operation: Operation::DelegateCall,
    }))
}
