pub mod gemini;
pub mod groq;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A function the model may ask the host to run.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDeclaration {
    pub name: &'static str,
    pub description: &'static str,
    /// JSON schema of the arguments; `None` for tools that take none.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    /// Provider-assigned call id, echoed back with the result when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub args: Value,
}

/// One turn of a conversation as the host records it.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    User(String),
    Assistant(String),
    ToolCall(FunctionCall),
    ToolResult { call: FunctionCall, result: Value },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ModelReply {
    Text(String),
    /// In the order the model emitted them.
    ToolCalls(Vec<FunctionCall>),
}

#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn chat(
        &self,
        system_prompt: &str,
        tools: &[ToolDeclaration],
        messages: &[Message],
    ) -> anyhow::Result<ModelReply>;
}
