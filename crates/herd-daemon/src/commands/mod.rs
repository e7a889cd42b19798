//! IPC command handlers.
//!
//! Each submodule implements the commands for one IPC category.

pub mod diagnostics;
pub mod livestock;
pub mod settlement;
pub mod splits;
pub mod wallets;

use serde_json::Value;

use crate::rpc::RpcError;

/// Required string param.
pub(crate) fn str_param<'a>(params: &'a Value, name: &str) -> Result<&'a str, RpcError> {
    params
        .get(name)
        .and_then(|v| v.as_str())
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| RpcError::invalid_params(&format!("{name} required")))
}

/// Optional string param; empty strings count as absent.
pub(crate) fn opt_str_param<'a>(params: &'a Value, name: &str) -> Option<&'a str> {
    params
        .get(name)
        .and_then(|v| v.as_str())
        .filter(|s| !s.trim().is_empty())
}

/// Required non-negative integer param.
pub(crate) fn u64_param(params: &Value, name: &str) -> Result<u64, RpcError> {
    params
        .get(name)
        .and_then(|v| v.as_u64())
        .ok_or_else(|| RpcError::invalid_params(&format!("{name} must be a non-negative integer")))
}

pub(crate) fn to_json<T: serde::Serialize>(value: &T) -> Result<Value, RpcError> {
    serde_json::to_value(value).map_err(|e| RpcError::internal_error(&format!("serialize: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_param_helpers() {
        let params = serde_json::json!({"name": "Bessie", "blank": "  ", "gross": 10, "neg": -1});
        assert_eq!(str_param(&params, "name").expect("name"), "Bessie");
        assert!(str_param(&params, "blank").is_err());
        assert_eq!(opt_str_param(&params, "blank"), None);
        assert_eq!(u64_param(&params, "gross").expect("gross"), 10);
        assert!(u64_param(&params, "neg").is_err());
        assert!(u64_param(&params, "missing").is_err());
    }
}
