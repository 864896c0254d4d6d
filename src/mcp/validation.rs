//! MCP Message Validation
//!
//! Structural checks on incoming JSON before it is dispatched: the JSON-RPC
//! version tag, the shape of the envelope and the parameters of the methods
//! the server understands.

use crate::mcp::errors::{McpError, McpResult};
use crate::mcp::protocol::*;
use serde_json::Value;
use tracing::debug;

/// Validator for MCP messages
#[derive(Debug, Default, Clone, Copy)]
pub struct McpValidator;

impl McpValidator {
    #[inline]
    pub fn new() -> Self {
        Self
    }

    /// Validate a raw JSON value as a JSON-RPC message
    #[inline]
    pub fn validate_raw_message(&self, value: &Value) -> McpResult<JsonRpcMessage> {
        let object = value.as_object().ok_or_else(|| McpError::InvalidRequest {
            message: "JSON-RPC message must be an object".to_string(),
        })?;

        match object.get("jsonrpc").and_then(Value::as_str) {
            Some(JSONRPC_VERSION) => {}
            other => {
                return Err(McpError::InvalidRequest {
                    message: format!("Unsupported jsonrpc version: {:?}", other),
                });
            }
        }

        if object.get("method").is_some_and(|method| !method.is_string()) {
            return Err(McpError::InvalidRequest {
                message: "method must be a string".to_string(),
            });
        }

        if object
            .get("params")
            .is_some_and(|params| !params.is_object() && !params.is_array() && !params.is_null())
        {
            return Err(McpError::InvalidRequest {
                message: "params must be an object or an array".to_string(),
            });
        }

        let message: JsonRpcMessage =
            serde_json::from_value(value.clone()).map_err(|e| McpError::InvalidRequest {
                message: format!("Value does not match any known JSON-RPC message type: {}", e),
            })?;

        if let JsonRpcMessage::Request(request) = &message {
            self.validate_request(request)?;
        }

        Ok(message)
    }

    /// Check method-specific parameters of a request
    #[inline]
    pub fn validate_request(&self, request: &JsonRpcRequest) -> McpResult<()> {
        debug!("Validating request: {}", request.method);

        match request.method.as_str() {
            "initialize" => {
                let params = request.params.clone().ok_or_else(|| McpError::InvalidParameters {
                    message: "initialize requires params".to_string(),
                })?;
                serde_json::from_value::<InitializeParams>(params).map_err(|e| {
                    McpError::InvalidParameters {
                        message: format!("Invalid initialize params: {}", e),
                    }
                })?;
            }
            "tools/call" => {
                let params = request.params.clone().ok_or_else(|| McpError::InvalidParameters {
                    message: "tools/call requires params".to_string(),
                })?;
                serde_json::from_value::<CallToolParams>(params).map_err(|e| {
                    McpError::InvalidParameters {
                        message: format!("Invalid tools/call params: {}", e),
                    }
                })?;
            }
            _ => {}
        }

        Ok(())
    }

    /// Check if a protocol version is supported
    #[inline]
    pub fn is_protocol_version_supported(&self, version: &str) -> bool {
        self.supported_protocol_versions().contains(&version)
    }

    /// Get supported protocol versions
    #[inline]
    pub fn supported_protocol_versions(&self) -> Vec<&'static str> {
        vec![MCP_VERSION, "2025-03-26", "2024-11-05"]
    }
}
