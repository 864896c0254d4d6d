//! MCP (Model Context Protocol) Server Implementation
//!
//! This module exposes the legal question-answering pipeline as an MCP server
//! speaking JSON-RPC 2.0 over stdio, protocol version 2025-06-18.

#[cfg(test)]
mod tests;

pub mod errors;
pub mod protocol;
pub mod server;
pub mod tools;
pub mod validation;

pub use errors::{McpError, McpResult};
pub use server::{ConnectionState, McpServer, ToolHandler};
pub use tools::{AskLegalQuestionHandler, HealthCheckHandler, register_tools};
