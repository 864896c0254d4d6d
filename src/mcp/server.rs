//! MCP Server Implementation
//!
//! Line-delimited JSON-RPC over any async reader/writer pair, with stdio as the
//! production transport. Requests are processed one at a time in arrival order.

use crate::mcp::errors::{ErrorHandler, McpError};
use crate::mcp::protocol::*;
use crate::mcp::validation::McpValidator;
use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::io;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

/// Instructions returned to clients on initialize
const SERVER_INSTRUCTIONS: &str = "Answers questions about Nepal's National Penal Code, 2017 \
using only the retrieved text of the code. Call ask_legal_question with a natural-language question.";

/// Tool handler trait for implementing tool execution
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn handle(&self, params: CallToolParams) -> Result<CallToolResult>;
}

struct RegisteredTool {
    tool: Tool,
    handler: Arc<dyn ToolHandler>,
}

/// MCP Server state and configuration
pub struct McpServer {
    /// Server implementation information
    pub server_info: Implementation,
    /// Server capabilities
    pub capabilities: ServerCapabilities,
    /// Registered tools and their handlers, listed in name order
    tools: RwLock<BTreeMap<String, RegisteredTool>>,
    /// Connection state
    connection_state: RwLock<ConnectionState>,
    /// Message validator
    validator: McpValidator,
}

/// Connection state tracking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Uninitialized,
    Initializing,
    Ready,
    Closed,
}

/// Message handler for processing incoming messages
pub struct MessageHandler {
    server: Arc<McpServer>,
}

impl McpServer {
    /// Create a new MCP server
    #[inline]
    pub fn new(name: String, version: String) -> Self {
        let server_info = Implementation { name, version };

        let capabilities = ServerCapabilities {
            tools: Some(ToolsCapability {
                list_changed: Some(false),
            }),
        };

        Self {
            server_info,
            capabilities,
            tools: RwLock::new(BTreeMap::new()),
            connection_state: RwLock::new(ConnectionState::Uninitialized),
            validator: McpValidator::new(),
        }
    }

    /// Register a tool with the server
    #[inline]
    pub async fn register_tool<H>(&self, tool: Tool, handler: H)
    where
        H: ToolHandler + 'static,
    {
        let tool_name = tool.name.clone();

        let mut tools = self.tools.write().await;
        tools.insert(
            tool_name.clone(),
            RegisteredTool {
                tool,
                handler: Arc::new(handler),
            },
        );

        debug!("Registered tool: {}", tool_name);
    }

    /// Names of all registered tools
    #[inline]
    pub async fn tool_names(&self) -> Vec<String> {
        self.tools.read().await.keys().cloned().collect()
    }

    /// Start the server using stdio transport
    #[inline]
    pub async fn serve_stdio(self: Arc<Self>) -> Result<()> {
        info!("Starting MCP server with stdio transport");
        self.serve(io::stdin(), io::stdout()).await
    }

    /// Serve line-delimited JSON-RPC from `reader` until EOF, writing replies to `writer`
    #[inline]
    pub async fn serve<R, W>(self: Arc<Self>, reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut reader = BufReader::new(reader);

        // Read and process messages until the client hangs up
        let mut line = String::new();
        loop {
            line.clear();
            match reader.read_line(&mut line).await {
                Ok(0) => {
                    info!("EOF reached, closing connection");
                    break;
                }
                Ok(_) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }

                    // First parse as raw JSON
                    let raw_value: Value = match serde_json::from_str(line) {
                        Ok(value) => value,
                        Err(e) => {
                            error!("Failed to parse JSON: {}", e);
                            let error_response =
                                JsonRpcErrorResponse::new(JsonRpcError::parse_error(), None);
                            self.send_message(
                                &mut writer,
                                &JsonRpcMessage::ErrorResponse(error_response),
                            )
                            .await?;
                            continue;
                        }
                    };

                    // Validate and parse as MCP message
                    match self.validator.validate_raw_message(&raw_value) {
                        Ok(message) => {
                            let handler = MessageHandler::new(Arc::clone(&self));
                            if let Err(e) = handler.process_message(message, &mut writer).await {
                                error!("Error processing message: {}", e);
                            }
                        }
                        Err(e) => {
                            error!("Message validation failed: {}", e);
                            let id = raw_value
                                .get("id")
                                .and_then(|id| serde_json::from_value::<RequestId>(id.clone()).ok());
                            let error_response = match e {
                                McpError::InvalidParameters { .. } => e.to_error_response(id),
                                _ => JsonRpcMessage::ErrorResponse(JsonRpcErrorResponse::new(
                                    JsonRpcError::invalid_request(),
                                    id,
                                )),
                            };
                            self.send_message(&mut writer, &error_response).await?;
                        }
                    }
                }
                Err(e) => {
                    error!("Error reading from transport: {}", e);
                    break;
                }
            }
        }

        *self.connection_state.write().await = ConnectionState::Closed;

        info!("MCP server stopped");
        Ok(())
    }

    /// Send a message to the client
    async fn send_message<W>(&self, writer: &mut W, message: &JsonRpcMessage) -> Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        let json = serde_json::to_string(message)?;
        writer.write_all(json.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
        Ok(())
    }

    /// Get current connection state
    #[inline]
    pub async fn connection_state(&self) -> ConnectionState {
        *self.connection_state.read().await
    }
}

impl MessageHandler {
    /// Create a new message handler
    #[inline]
    pub fn new(server: Arc<McpServer>) -> Self {
        Self { server }
    }

    /// Process an incoming message
    #[inline]
    pub async fn process_message<W>(&self, message: JsonRpcMessage, writer: &mut W) -> Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        match message {
            JsonRpcMessage::Request(request) => self.handle_request(request, writer).await,
            JsonRpcMessage::Notification(notification) => {
                self.handle_notification(&notification).await;
                Ok(())
            }
            JsonRpcMessage::Response(_) | JsonRpcMessage::ErrorResponse(_) => {
                warn!("Received unexpected response message from client");
                Ok(())
            }
        }
    }

    /// Handle a JSON-RPC request
    async fn handle_request<W>(&self, request: JsonRpcRequest, writer: &mut W) -> Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        debug!("Handling request: {}", request.method);

        let response = match request.method.as_str() {
            "initialize" => self.handle_initialize(request.params).await,
            "tools/list" => self.handle_list_tools().await,
            "tools/call" => self.handle_call_tool(request.params).await,
            "ping" => Ok(Self::handle_ping()),
            _ => {
                let error = JsonRpcError::method_not_found();
                let message =
                    JsonRpcMessage::ErrorResponse(JsonRpcErrorResponse::new(error, Some(request.id)));
                return self.server.send_message(writer, &message).await;
            }
        };

        let message = match response {
            Ok(result) => JsonRpcMessage::Response(JsonRpcResponse::new(result, request.id)),
            Err(e) => {
                error!("Error handling request {}: {:#}", request.method, e);
                ErrorHandler::handle_error(&e, Some(request.id))
            }
        };
        self.server.send_message(writer, &message).await
    }

    /// Handle a JSON-RPC notification
    async fn handle_notification(&self, notification: &JsonRpcNotification) {
        match notification.method.as_str() {
            "initialized" | "notifications/initialized" => {
                *self.server.connection_state.write().await = ConnectionState::Ready;
                info!("Server ready to handle requests");
            }
            "notifications/cancelled" => {
                debug!("Received cancellation notification");
            }
            _ => {
                warn!("Unknown notification method: {}", notification.method);
            }
        }
    }

    /// Handle initialize request
    #[inline]
    pub async fn handle_initialize(&self, params: Option<Value>) -> Result<Value> {
        let params: InitializeParams = match params {
            Some(p) => serde_json::from_value(p).map_err(|e| McpError::InvalidParameters {
                message: e.to_string(),
            })?,
            None => {
                return Err(McpError::InvalidParameters {
                    message: "Initialize request missing parameters".to_string(),
                }
                .into());
            }
        };

        // Check protocol version compatibility
        if !self
            .server
            .validator
            .is_protocol_version_supported(&params.protocol_version)
        {
            let supported = self
                .server
                .validator
                .supported_protocol_versions()
                .into_iter()
                .map(str::to_string)
                .collect();
            return Err(McpError::UnsupportedProtocolVersion {
                version: params.protocol_version,
                supported,
            }
            .into());
        }

        *self.server.connection_state.write().await = ConnectionState::Initializing;

        let result = InitializeResult {
            protocol_version: params.protocol_version.clone(),
            capabilities: self.server.capabilities.clone(),
            server_info: self.server.server_info.clone(),
            instructions: Some(SERVER_INSTRUCTIONS.to_string()),
        };

        info!(
            "Client initialized: {} {} (protocol {})",
            params.client_info.name, params.client_info.version, params.protocol_version
        );
        Ok(serde_json::to_value(result)?)
    }

    /// Handle list tools request
    #[inline]
    pub async fn handle_list_tools(&self) -> Result<Value> {
        let tools = self.server.tools.read().await;
        let tools_vec: Vec<Tool> = tools.values().map(|entry| entry.tool.clone()).collect();

        let result = ListToolsResult { tools: tools_vec };
        Ok(serde_json::to_value(result)?)
    }

    /// Handle call tool request
    #[inline]
    pub async fn handle_call_tool(&self, params: Option<Value>) -> Result<Value> {
        let params: CallToolParams = match params {
            Some(p) => serde_json::from_value(p).map_err(|e| McpError::InvalidParameters {
                message: e.to_string(),
            })?,
            None => {
                return Err(McpError::InvalidParameters {
                    message: "Tool call request missing parameters".to_string(),
                }
                .into());
            }
        };

        // Registry lock is released before the handler runs
        let handler = {
            let tools = self.server.tools.read().await;
            let entry = tools.get(&params.name).ok_or_else(|| McpError::ToolNotFound {
                name: params.name.clone(),
            })?;
            Arc::clone(&entry.handler)
        };

        debug!("Calling tool: {}", params.name);
        let result = handler.handle(params).await?;
        Ok(serde_json::to_value(result)?)
    }

    /// Handle ping request
    #[inline]
    pub fn handle_ping() -> Value {
        serde_json::json!({})
    }
}
