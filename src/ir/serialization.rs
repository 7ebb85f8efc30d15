//! IR serialization helpers.
//!
//! Serde already provides JSON serialization. This module centralizes the
//! helpers used by clients and servers and keeps formatting stable.

use crate::error::{ResolverError, TransportError};
use crate::ir::operations::ResolverIR;

/// Serialize an IR to pretty JSON.
pub fn to_json_pretty(ir: &ResolverIR) -> Result<String, ResolverError> {
    serde_json::to_string_pretty(ir).map_err(|e| {
        TransportError::SerializationFailed {
            message: format!("serialize IR: {e}"),
        }
        .into()
    })
}

/// Deserialize an IR from JSON.
///
/// Callers should then invoke `ir.request.validate()` before executing.
pub fn from_json(s: &str) -> Result<ResolverIR, ResolverError> {
    serde_json::from_str::<ResolverIR>(s).map_err(|e| {
        TransportError::DeserializationFailed {
            message: format!("deserialize IR: {e}"),
        }
        .into()
    })
}
