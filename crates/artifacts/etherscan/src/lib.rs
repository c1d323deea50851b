//! Etherscan API response envelopes.

#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

use serde::{Deserialize, Serialize};
use std::fmt;

/// `message` of a successful response
pub const OK_MESSAGE: &str = "OK";

/// `message` of a failed response
pub const NOTOK_MESSAGE: &str = "NOTOK";

/// `result` of a failed response caused by the API rate limit
pub const RATE_LIMIT_RESULT: &str = "Max rate limit reached";

/// The `{status, message, result}` envelope returned by the `module=contract` endpoints.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiResponse {
    pub status: String,
    pub message: String,
    /// The payload on success, e.g. the JSON encoded ABI for `action=getabi`, and a human readable
    /// reason otherwise.
    pub result: String,
}

impl ApiResponse {
    pub fn is_ok(&self) -> bool {
        self.message == OK_MESSAGE
    }

    /// Whether the request failed because too many requests were made with the API key; these
    /// are the only failures worth retrying.
    pub fn is_rate_limited(&self) -> bool {
        self.message == NOTOK_MESSAGE && self.result == RATE_LIMIT_RESULT
    }
}

impl fmt::Display for ApiResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{status: {}, message: {}, result: {}}}", self.status, self.message, self.result)
    }
}

/// The JSON-RPC envelope returned by the `module=proxy` endpoints.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcResponse {
    pub jsonrpc: String,
    #[serde(default)]
    pub id: serde_json::Value,
    /// For `action=eth_getCode` the hex encoded code at the address, `0x` if there is none.
    pub result: String,
}
