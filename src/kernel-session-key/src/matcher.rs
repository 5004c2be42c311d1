//! Selection of the permission that authorizes an outgoing account call.
//!
//! For each call, candidates are filtered by target, operation, selector and value limit, ordered
//! by value limit (highest first, stable otherwise), and the first candidate whose parameter rules
//! all pass is chosen. A batch matches only if every sub-call does.

use kernel_session_types::Permission;
use tracing::debug;

use crate::decoder::{Execution, KernelCall};

/// Permission(s) authorizing a decoded account call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PermissionMatch {
    /// `execute` / `executeDelegateCall`.
    Single(Permission),
    /// `executeBatch`, one permission per sub-call in call order.
    Batch(Vec<Permission>),
}

/// Find the permission(s) authorizing `call_data`, or `None`.
pub fn find_matching_permission(
    call_data: &[u8],
    permissions: &[Permission],
) -> Option<PermissionMatch> {
    match KernelCall::decode(call_data) {
        KernelCall::Execute(execution) | KernelCall::DelegateCall(execution) => {
            match_execution(&execution, permissions).cloned().map(PermissionMatch::Single)
        }
        KernelCall::Batch(executions) => executions
            .iter()
            .map(|execution| match_execution(execution, permissions).cloned())
            .collect::<Option<Vec<_>>>()
            .map(PermissionMatch::Batch),
        KernelCall::Unrecognized => None,
    }
}

/// Pick the permission authorizing a single call.
pub fn match_execution<'a>(
    execution: &Execution,
    permissions: &'a [Permission],
) -> Option<&'a Permission> {
    let selector = execution.selector();
    let mut candidates: Vec<&Permission> = permissions
        .iter()
        // addresses compare as bytes, so checksum casing is irrelevant
        .filter(|p| p.is_any_target() || p.target == execution.target)
        .filter(|p| p.operation == execution.operation)
        .filter(|p| p.is_any_selector() || selector == Some(p.sig.0))
        .filter(|p| p.value_limit >= execution.value)
        .collect();
    candidates.sort_by(|a, b| b.value_limit.cmp(&a.value_limit));

    let args = execution.args();
    let found = candidates.into_iter().find(|p| p.rules.iter().all(|rule| rule.check(args)));
    match found {
        Some(p) => debug!(to = %execution.target, index = p.index, "matched permission"),
        None => debug!(to = %execution.target, value = %execution.value, "no permission matches call"),
    }
    found
}
