//! MCP Error Handling
//!
//! Classifies server failures and turns them into JSON-RPC error responses.
//! Pipeline validation failures become `INVALID_PARAMS` carrying the pipeline's
//! message verbatim; every other pipeline failure is an internal error.

use crate::LegalRagError;
use crate::mcp::protocol::*;
use thiserror::Error;
use tracing::error;

/// MCP-specific errors that can occur during server operation
#[derive(Error, Debug)]
pub enum McpError {
    #[error("Protocol version not supported: {version}. Supported versions: {supported:?}")]
    UnsupportedProtocolVersion {
        version: String,
        supported: Vec<String>,
    },

    #[error("Tool not found: {name}")]
    ToolNotFound { name: String },

    #[error("Invalid tool parameters for {tool}: {message}")]
    InvalidToolParameters { tool: String, message: String },

    #[error("Tool execution failed for {tool}: {message}")]
    ToolExecutionFailed { tool: String, message: String },

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Internal server error: {message}")]
    InternalError { message: String },

    #[error("Invalid parameters: {message}")]
    InvalidParameters { message: String },
}

impl McpError {
    /// Convert MCP error to JSON-RPC error
    #[inline]
    pub fn to_jsonrpc_error(&self) -> JsonRpcError {
        match self {
            Self::UnsupportedProtocolVersion { version, supported } => JsonRpcError::new(
                mcp_error_codes::INVALID_PROTOCOL_VERSION,
                format!(
                    "Unsupported protocol version: {}. Supported: {}",
                    version,
                    supported.join(", ")
                ),
                None,
            ),
            Self::ToolNotFound { name } => JsonRpcError::new(
                mcp_error_codes::TOOL_NOT_FOUND,
                format!("Tool not found: {}", name),
                None,
            ),
            Self::InvalidToolParameters { tool, message } => JsonRpcError::new(
                error_codes::INVALID_PARAMS,
                format!("Invalid parameters for tool '{}': {}", tool, message),
                None,
            ),
            Self::ToolExecutionFailed { tool, message } => JsonRpcError::new(
                error_codes::INTERNAL_ERROR,
                format!("Tool '{}' execution failed: {}", tool, message),
                None,
            ),
            Self::InvalidRequest { message } => {
                JsonRpcError::new(error_codes::INVALID_REQUEST, message.clone(), None)
            }
            Self::InternalError { message } => {
                JsonRpcError::new(error_codes::INTERNAL_ERROR, message.clone(), None)
            }
            Self::InvalidParameters { message } => {
                JsonRpcError::new(error_codes::INVALID_PARAMS, message.clone(), None)
            }
        }
    }

    /// Create error response message
    #[inline]
    pub fn to_error_response(&self, id: Option<RequestId>) -> JsonRpcMessage {
        let error = self.to_jsonrpc_error();
        let error_response = JsonRpcErrorResponse::new(error, id);
        JsonRpcMessage::ErrorResponse(error_response)
    }

    /// Map a pipeline failure raised while running `tool`
    #[inline]
    pub fn from_pipeline(tool: &str, error: &LegalRagError) -> Self {
        if error.is_client_error() {
            Self::InvalidParameters {
                message: error.to_string(),
            }
        } else {
            Self::ToolExecutionFailed {
                tool: tool.to_string(),
                message: error.to_string(),
            }
        }
    }

    /// Log the error with appropriate level
    #[inline]
    pub fn log(&self) {
        match self {
            Self::InvalidRequest { .. }
            | Self::InvalidParameters { .. }
            | Self::InvalidToolParameters { .. } => {
                error!("Client error: {}", self);
            }
            Self::ToolNotFound { .. } => {
                error!("Not found error: {}", self);
            }
            Self::ToolExecutionFailed { .. } | Self::InternalError { .. } => {
                error!("Server error: {}", self);
            }
            Self::UnsupportedProtocolVersion { .. } => {
                error!("MCP error: {}", self);
            }
        }
    }
}

/// Error handler utility for consistent error processing
pub struct ErrorHandler;

impl ErrorHandler {
    /// Handle any error and convert to appropriate JSON-RPC response
    #[inline]
    pub fn handle_error(error: &anyhow::Error, id: Option<RequestId>) -> JsonRpcMessage {
        // Try to downcast to MCP error first
        if let Some(mcp_error) = error.downcast_ref::<McpError>() {
            mcp_error.log();
            return mcp_error.to_error_response(id);
        }

        if let Some(pipeline_error) = error.downcast_ref::<LegalRagError>() {
            let mcp_error = McpError::from_pipeline("unknown", pipeline_error);
            mcp_error.log();
            return mcp_error.to_error_response(id);
        }

        error!("Unexpected error: {:#}", error);
        let internal_error = McpError::InternalError {
            message: format!("{:#}", error),
        };
        internal_error.to_error_response(id)
    }
}

/// Result type for MCP operations
pub type McpResult<T> = Result<T, McpError>;
