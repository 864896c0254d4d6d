//! MCP Tools Implementation
//!
//! The legal assistant exposes two tools: `ask_legal_question`, which runs the
//! full retrieval and generation pipeline, and `health_check`.

use crate::mcp::errors::McpError;
use crate::mcp::protocol::*;
use crate::mcp::server::{McpServer, ToolHandler};
use crate::pipeline::{AnswerResponse, LegalRagPipeline};
use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{Instrument, debug, info, info_span};
use uuid::Uuid;

pub const ASK_LEGAL_QUESTION: &str = "ask_legal_question";
pub const HEALTH_CHECK: &str = "health_check";

/// Answers a legal question from the penal code corpus
pub struct AskLegalQuestionHandler {
    pipeline: Arc<LegalRagPipeline>,
}

/// Liveness probe
pub struct HealthCheckHandler {
    pipeline: Arc<LegalRagPipeline>,
}

impl AskLegalQuestionHandler {
    #[inline]
    pub fn new(pipeline: Arc<LegalRagPipeline>) -> Self {
        Self { pipeline }
    }

    /// Create the ask_legal_question tool definition
    #[inline]
    pub fn tool_definition() -> Tool {
        Tool {
            name: ASK_LEGAL_QUESTION.to_string(),
            description: Some(
                "Answer a question about Nepal's National Penal Code, 2017 using the retrieved text of the code"
                    .to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "question": {
                        "type": "string",
                        "description": "Natural-language legal question"
                    }
                },
                "required": ["question"],
                "additionalProperties": false
            }),
        }
    }
}

#[async_trait]
impl ToolHandler for AskLegalQuestionHandler {
    #[inline]
    async fn handle(&self, params: CallToolParams) -> Result<CallToolResult> {
        let args = params.arguments.unwrap_or_default();

        let question = args
            .get("question")
            .and_then(Value::as_str)
            .ok_or_else(|| McpError::InvalidToolParameters {
                tool: ASK_LEGAL_QUESTION.to_string(),
                message: "Missing required string parameter: question".to_string(),
            })?
            .to_string();

        let request_id = Uuid::new_v4();
        let span = info_span!("ask", %request_id);
        info!(parent: &span, "Received question over MCP");

        let pipeline = Arc::clone(&self.pipeline);
        let blocking_span = span.clone();
        let outcome = tokio::task::spawn_blocking(move || {
            let _entered = blocking_span.enter();
            pipeline.answer(&question)
        })
        .instrument(span)
        .await
        .map_err(|e| McpError::InternalError {
            message: format!("Pipeline task failed: {}", e),
        })?;

        let answer = outcome.map_err(|e| McpError::from_pipeline(ASK_LEGAL_QUESTION, &e))?;
        debug!("Request {} answered", request_id);

        let response = AnswerResponse::success(answer);
        Ok(CallToolResult::text(serde_json::to_string_pretty(&response)?))
    }
}

impl HealthCheckHandler {
    #[inline]
    pub fn new(pipeline: Arc<LegalRagPipeline>) -> Self {
        Self { pipeline }
    }

    /// Create the health_check tool definition
    #[inline]
    pub fn tool_definition() -> Tool {
        Tool {
            name: HEALTH_CHECK.to_string(),
            description: Some("Report whether the legal assistant is running".to_string()),
            input_schema: json!({
                "type": "object",
                "properties": {},
                "additionalProperties": false
            }),
        }
    }
}

#[async_trait]
impl ToolHandler for HealthCheckHandler {
    #[inline]
    async fn handle(&self, _params: CallToolParams) -> Result<CallToolResult> {
        debug!("Health check requested");

        let response = json!({
            "status": "healthy",
            "message": "Nepal Legal RAG service is running",
            "documents": self.pipeline.corpus().len(),
        });

        Ok(CallToolResult::text(serde_json::to_string_pretty(&response)?))
    }
}

/// Register every legal assistant tool on `server`
#[inline]
pub async fn register_tools(server: &McpServer, pipeline: &Arc<LegalRagPipeline>) {
    server
        .register_tool(
            AskLegalQuestionHandler::tool_definition(),
            AskLegalQuestionHandler::new(Arc::clone(pipeline)),
        )
        .await;
    server
        .register_tool(
            HealthCheckHandler::tool_definition(),
            HealthCheckHandler::new(Arc::clone(pipeline)),
        )
        .await;
}
