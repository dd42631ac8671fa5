// SPDX-License-Identifier: Apache-2.0

use crate::contract::EngineError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("engine must be initialized before execution")]
    NotInitialized,

    #[error(transparent)]
    Convert(#[from] ConvertError),
}

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("declaration has no name")]
    EmptyName,

    #[error("malformed function name `{0}`")]
    MalformedName(String),

    #[error("`{define}` has unresolved issues: {}", issues.join("; "))]
    Rejected { define: String, issues: Vec<String> },

    #[error("failed to serialize executable")]
    Serialize(#[from] serde_json::Error),
}
