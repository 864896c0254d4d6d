//! MCP Protocol Implementation Tests
//!
//! Drives the JSON-RPC loop over in-memory buffers with a pipeline backed by
//! deterministic encoder and engine stand-ins.

use super::*;
use crate::corpus::{Corpus, Document};
use crate::embeddings::QueryEncoder;
use crate::generation::{GenerationEngine, GenerationParams};
use crate::index::EmbeddingIndex;
use crate::mcp::protocol::*;
use crate::pipeline::LegalRagPipeline;
use crate::{LegalRagError, Result};
use ndarray::array;
use serde_json::{Value, json};
use std::sync::Arc;

struct AxisEncoder;

impl QueryEncoder for AxisEncoder {
    fn encode(&self, _text: &str) -> Result<Vec<f32>> {
        Ok(vec![1.0, 0.0])
    }
}

struct EchoEngine;

impl GenerationEngine for EchoEngine {
    fn generate(&self, prompt: &str, _params: &GenerationParams) -> Result<String> {
        if prompt.contains("Theft is penalized") {
            Ok(" Theft is punished with imprisonment. ".to_string())
        } else {
            Ok("The provided sections of the National Penal Code, 2017 do not mention this.".to_string())
        }
    }
}

struct BrokenEngine;

impl GenerationEngine for BrokenEngine {
    fn generate(&self, _prompt: &str, _params: &GenerationParams) -> Result<String> {
        Err(LegalRagError::Generation("model crashed".to_string()))
    }
}

fn corpus() -> Corpus {
    Corpus::new(
        EmbeddingIndex::new(array![[1.0_f32, 0.0], [0.0, 1.0]]),
        vec![
            Document::new("5", "12", None, "Theft is penalized by imprisonment"),
            Document::new("7", "30", Some("2"), "Fraud is penalized by fine"),
        ],
    )
    .expect("corpus is aligned")
}

async fn server_with<G: GenerationEngine + 'static>(engine: G) -> Arc<McpServer> {
    let pipeline = Arc::new(LegalRagPipeline::new(corpus(), AxisEncoder, engine));
    let server = McpServer::new("legal-rag".to_string(), "0.1.0".to_string());
    register_tools(&server, &pipeline).await;
    Arc::new(server)
}

/// Feed `requests` as line-delimited JSON and collect every reply
async fn exchange(server: Arc<McpServer>, requests: &[Value]) -> Vec<Value> {
    let mut input = String::new();
    for request in requests {
        input.push_str(&request.to_string());
        input.push('\n');
    }
    let mut output = Vec::new();

    server
        .serve(input.as_bytes(), &mut output)
        .await
        .expect("server loop completes");

    String::from_utf8(output)
        .expect("replies are utf-8")
        .lines()
        .map(|line| serde_json::from_str(line).expect("reply is json"))
        .collect()
}

fn ask(id: i64, question: &str) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "tools/call",
        "params": {
            "name": "ask_legal_question",
            "arguments": {"question": question}
        }
    })
}

#[cfg(test)]
mod tool_definition_tests {
    use super::*;

    #[test]
    fn ask_tool_definition() {
        let tool = AskLegalQuestionHandler::tool_definition();

        assert_eq!(tool.name, "ask_legal_question");
        let schema = tool.input_schema;
        let properties = schema["properties"].as_object().expect("has properties");
        assert!(properties.contains_key("question"));
        assert_eq!(schema["properties"]["question"]["type"], "string");

        let required = schema["required"].as_array().expect("has required array");
        assert_eq!(required.len(), 1);
        assert_eq!(required[0], "question");
    }

    #[test]
    fn health_tool_takes_no_arguments() {
        let tool = HealthCheckHandler::tool_definition();

        assert_eq!(tool.name, "health_check");
        assert!(
            tool.input_schema["properties"]
                .as_object()
                .expect("has properties")
                .is_empty()
        );
    }
}

#[cfg(test)]
mod server_tests {
    use super::*;

    #[tokio::test]
    async fn initialize_handshake() {
        let server = server_with(EchoEngine).await;
        let replies = exchange(
            Arc::clone(&server),
            &[
                json!({
                    "jsonrpc": "2.0",
                    "id": 1,
                    "method": "initialize",
                    "params": {
                        "protocolVersion": MCP_VERSION,
                        "capabilities": {},
                        "clientInfo": {"name": "test-client", "version": "1.0.0"}
                    }
                }),
                json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
            ],
        )
        .await;

        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0]["id"], 1);
        assert_eq!(replies[0]["result"]["protocolVersion"], MCP_VERSION);
        assert_eq!(replies[0]["result"]["serverInfo"]["name"], "legal-rag");
        assert_eq!(
            replies[0]["result"]["capabilities"],
            json!({"tools": {"listChanged": false}})
        );
        assert_eq!(server.connection_state().await, ConnectionState::Closed);
    }

    #[tokio::test]
    async fn unsupported_protocol_version_rejected() {
        let server = server_with(EchoEngine).await;
        let replies = exchange(
            server,
            &[json!({
                "jsonrpc": "2.0",
                "id": 1,
                "method": "initialize",
                "params": {
                    "protocolVersion": "1999-01-01",
                    "capabilities": {},
                    "clientInfo": {"name": "old-client", "version": "0.1"}
                }
            })],
        )
        .await;

        assert_eq!(
            replies[0]["error"]["code"],
            mcp_error_codes::INVALID_PROTOCOL_VERSION
        );
    }

    #[tokio::test]
    async fn tools_are_listed_by_name() {
        let server = server_with(EchoEngine).await;
        let replies = exchange(
            server,
            &[json!({"jsonrpc": "2.0", "id": "list", "method": "tools/list"})],
        )
        .await;

        let names: Vec<&str> = replies[0]["result"]["tools"]
            .as_array()
            .expect("tools array")
            .iter()
            .map(|tool| tool["name"].as_str().expect("tool name"))
            .collect();
        assert_eq!(names, vec!["ask_legal_question", "health_check"]);
    }

    #[tokio::test]
    async fn ask_returns_trimmed_answer_with_status() {
        let server = server_with(EchoEngine).await;
        let replies = exchange(server, &[ask(3, "What is the punishment for theft?")]).await;

        assert_eq!(replies[0]["id"], 3);
        let result: CallToolResult =
            serde_json::from_value(replies[0]["result"].clone()).expect("tool result");
        assert_eq!(result.is_error, Some(false));

        let ToolContent::Text { text } = &result.content[0];
        let body: Value = serde_json::from_str(text).expect("answer is json");
        assert_eq!(body["answer"], "Theft is punished with imprisonment.");
        assert_eq!(body["status"], "success");
    }

    #[tokio::test]
    async fn blank_question_is_invalid_params() {
        let server = server_with(EchoEngine).await;
        let replies = exchange(server, &[ask(4, ""), ask(5, "   ")]).await;

        for reply in &replies {
            assert_eq!(reply["error"]["code"], error_codes::INVALID_PARAMS);
            assert_eq!(reply["error"]["message"], "Question cannot be empty");
        }
        assert_eq!(replies[0]["id"], 4);
        assert_eq!(replies[1]["id"], 5);
    }

    #[tokio::test]
    async fn missing_question_argument_is_invalid_params() {
        let server = server_with(EchoEngine).await;
        let replies = exchange(
            server,
            &[json!({
                "jsonrpc": "2.0",
                "id": 6,
                "method": "tools/call",
                "params": {"name": "ask_legal_question", "arguments": {}}
            })],
        )
        .await;

        assert_eq!(replies[0]["error"]["code"], error_codes::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn generation_failure_is_internal_error() {
        let server = server_with(BrokenEngine).await;
        let replies = exchange(server, &[ask(7, "theft?")]).await;

        assert_eq!(replies[0]["error"]["code"], error_codes::INTERNAL_ERROR);
        let message = replies[0]["error"]["message"].as_str().expect("message");
        assert!(message.contains("model crashed"));
    }

    #[tokio::test]
    async fn health_check_reports_healthy() {
        let server = server_with(EchoEngine).await;
        let replies = exchange(
            server,
            &[json!({
                "jsonrpc": "2.0",
                "id": 8,
                "method": "tools/call",
                "params": {"name": "health_check"}
            })],
        )
        .await;

        let result: CallToolResult =
            serde_json::from_value(replies[0]["result"].clone()).expect("tool result");
        let ToolContent::Text { text } = &result.content[0];
        let body: Value = serde_json::from_str(text).expect("health is json");
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["documents"], 2);
    }

    #[tokio::test]
    async fn unknown_tool_and_method() {
        let server = server_with(EchoEngine).await;
        let replies = exchange(
            server,
            &[
                json!({
                    "jsonrpc": "2.0",
                    "id": 9,
                    "method": "tools/call",
                    "params": {"name": "search_docs"}
                }),
                json!({"jsonrpc": "2.0", "id": 10, "method": "resources/list"}),
            ],
        )
        .await;

        assert_eq!(replies[0]["error"]["code"], mcp_error_codes::TOOL_NOT_FOUND);
        assert_eq!(replies[1]["error"]["code"], error_codes::METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn malformed_lines_get_error_replies() {
        let server = server_with(EchoEngine).await;
        let input = "{not json\n\n{\"jsonrpc\":\"1.0\",\"id\":2,\"method\":\"ping\"}\n";
        let mut output = Vec::new();

        server
            .serve(input.as_bytes(), &mut output)
            .await
            .expect("server loop completes");

        let replies: Vec<Value> = String::from_utf8(output)
            .expect("utf-8")
            .lines()
            .map(|line| serde_json::from_str(line).expect("reply is json"))
            .collect();
        assert_eq!(replies.len(), 2);
        assert_eq!(replies[0]["error"]["code"], error_codes::PARSE_ERROR);
        assert_eq!(replies[1]["error"]["code"], error_codes::INVALID_REQUEST);
        assert_eq!(replies[1]["id"], 2);
    }

    #[tokio::test]
    async fn ping_replies_empty_object() {
        let server = server_with(EchoEngine).await;
        let replies = exchange(server, &[json!({"jsonrpc": "2.0", "id": 11, "method": "ping"})]).await;

        assert_eq!(replies[0]["result"], json!({}));
    }

    /// Handler that parks until the test releases it
    struct GatedHandler {
        release: Arc<tokio::sync::Notify>,
    }

    #[async_trait::async_trait]
    impl ToolHandler for GatedHandler {
        async fn handle(&self, _params: CallToolParams) -> anyhow::Result<CallToolResult> {
            self.release.notified().await;
            Ok(CallToolResult::text("released".to_string()))
        }
    }

    fn tool_named(name: &str) -> Tool {
        Tool {
            name: name.to_string(),
            description: None,
            input_schema: json!({"type": "object", "properties": {}}),
        }
    }

    #[tokio::test]
    async fn registry_stays_writable_while_a_tool_runs() {
        let server = Arc::new(McpServer::new("legal-rag".to_string(), "0.1.0".to_string()));
        let release = Arc::new(tokio::sync::Notify::new());
        server
            .register_tool(
                tool_named("slow"),
                GatedHandler {
                    release: Arc::clone(&release),
                },
            )
            .await;

        let handler = server::MessageHandler::new(Arc::clone(&server));
        let call = tokio::spawn(async move {
            handler
                .handle_call_tool(Some(json!({"name": "slow", "arguments": {}})))
                .await
        });
        tokio::task::yield_now().await;

        tokio::time::timeout(
            std::time::Duration::from_secs(1),
            server.register_tool(
                tool_named("late"),
                GatedHandler {
                    release: Arc::clone(&release),
                },
            ),
        )
        .await
        .expect("registration does not wait for the running tool");
        assert_eq!(server.tool_names().await, vec!["late", "slow"]);

        release.notify_one();
        let result = call
            .await
            .expect("call task joins")
            .expect("tool call succeeds");
        assert_eq!(result["content"][0]["text"], "released");
    }
}
