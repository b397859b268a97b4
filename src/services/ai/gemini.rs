use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{FunctionCall, LlmProvider, Message, ModelReply, ToolDeclaration};

const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

pub struct GeminiProvider {
    api_key: String,
    model: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    system_instruction: Content,
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ToolSet<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ToolSet<'a> {
    function_declarations: &'a [ToolDeclaration],
}

#[derive(Serialize, Deserialize, Debug, Default)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    function_call: Option<WireCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    function_response: Option<WireResponse>,
}

#[derive(Serialize, Deserialize, Debug)]
struct WireCall {
    name: String,
    #[serde(default)]
    args: Value,
}

#[derive(Serialize, Deserialize, Debug)]
struct WireResponse {
    name: String,
    response: Value,
}

#[derive(Deserialize, Debug)]
struct GenerateResponse {
    candidates: Option<Vec<Candidate>>,
    error: Option<ApiError>,
}

#[derive(Deserialize, Debug)]
struct ApiError {
    message: String,
}

#[derive(Deserialize, Debug)]
struct Candidate {
    content: Option<Content>,
}

impl GeminiProvider {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            api_key,
            model,
            client: reqwest::Client::new(),
        }
    }
}

fn text_content(role: &str, text: &str) -> Content {
    Content {
        role: Some(role.to_string()),
        parts: vec![Part {
            text: Some(text.to_string()),
            ..Default::default()
        }],
    }
}

/// Gemini wants function responses to be JSON objects.
fn response_object(result: &Value) -> Value {
    match result {
        Value::Object(_) => result.clone(),
        other => json!({ "result": other }),
    }
}

fn to_contents(messages: &[Message]) -> Vec<Content> {
    messages
        .iter()
        .map(|msg| match msg {
            Message::User(text) => text_content("user", text),
            Message::Assistant(text) => text_content("model", text),
            Message::ToolCall(call) => Content {
                role: Some("model".to_string()),
                parts: vec![Part {
                    function_call: Some(WireCall {
                        name: call.name.clone(),
                        args: call.args.clone(),
                    }),
                    ..Default::default()
                }],
            },
            Message::ToolResult { call, result } => Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    function_response: Some(WireResponse {
                        name: call.name.clone(),
                        response: response_object(result),
                    }),
                    ..Default::default()
                }],
            },
        })
        .collect()
}

fn into_reply(parts: Vec<Part>) -> anyhow::Result<ModelReply> {
    let mut calls = Vec::new();
    let mut text = String::new();

    for part in parts {
        if let Some(call) = part.function_call {
            calls.push(FunctionCall {
                id: None,
                name: call.name,
                args: call.args,
            });
        } else if let Some(t) = part.text {
            text.push_str(&t);
        }
    }

    if !calls.is_empty() {
        return Ok(ModelReply::ToolCalls(calls));
    }
    let text = text.trim();
    if text.is_empty() {
        anyhow::bail!("Gemini returned neither text nor a function call");
    }
    Ok(ModelReply::Text(text.to_string()))
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    async fn chat(
        &self,
        system_prompt: &str,
        tools: &[ToolDeclaration],
        messages: &[Message],
    ) -> anyhow::Result<ModelReply> {
        let request = GenerateRequest {
            system_instruction: Content {
                role: None,
                parts: vec![Part {
                    text: Some(system_prompt.to_string()),
                    ..Default::default()
                }],
            },
            contents: to_contents(messages),
            tools: if tools.is_empty() {
                Vec::new()
            } else {
                vec![ToolSet {
                    function_declarations: tools,
                }]
            },
        };

        let resp = self
            .client
            .post(format!("{GEMINI_API_URL}/{}:generateContent", self.model))
            .query(&[("key", &self.api_key)])
            .json(&request)
            .send()
            .await
            .context("failed to call Gemini API")?;

        let status = resp.status();
        let body = resp.text().await.context("failed to read Gemini response")?;
        tracing::debug!(%status, "gemini response");

        if !status.is_success() {
            anyhow::bail!("Gemini API error ({status}): {body}");
        }

        let parsed: GenerateResponse =
            serde_json::from_str(&body).context("failed to parse Gemini response")?;
        if let Some(error) = parsed.error {
            anyhow::bail!("Gemini error: {}", error.message);
        }

        let content = parsed
            .candidates
            .and_then(|c| c.into_iter().next())
            .and_then(|c| c.content)
            .ok_or_else(|| anyhow::anyhow!("no candidates in Gemini response"))?;

        into_reply(content.parts)
    }
}
