use anyhow::Context;
use async_trait::async_trait;
use serde_json::{json, Value};

use super::{FunctionCall, LlmProvider, Message, ModelReply, ToolDeclaration};

/// OpenAI-compatible chat completions with tool calling.
pub struct GroqProvider {
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl GroqProvider {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            api_key,
            model,
            client: reqwest::Client::new(),
        }
    }
}

fn call_id(call: &FunctionCall, index: usize) -> String {
    call.id.clone().unwrap_or_else(|| format!("call_{index}"))
}

fn to_chat_messages(system_prompt: &str, messages: &[Message]) -> Vec<Value> {
    let mut chat_messages = vec![json!({
        "role": "system",
        "content": system_prompt,
    })];

    for (i, msg) in messages.iter().enumerate() {
        chat_messages.push(match msg {
            Message::User(text) => json!({ "role": "user", "content": text }),
            Message::Assistant(text) => json!({ "role": "assistant", "content": text }),
            Message::ToolCall(call) => json!({
                "role": "assistant",
                "content": null,
                "tool_calls": [{
                    "id": call_id(call, i),
                    "type": "function",
                    "function": {
                        "name": call.name,
                        "arguments": call.args.to_string(),
                    }
                }]
            }),
            // The result always directly follows its call in history.
            Message::ToolResult { call, result } => json!({
                "role": "tool",
                "tool_call_id": call_id(call, i.saturating_sub(1)),
                "content": result.to_string(),
            }),
        });
    }
    chat_messages
}

fn to_tools(tools: &[ToolDeclaration]) -> Vec<Value> {
    tools
        .iter()
        .map(|t| {
            json!({
                "type": "function",
                "function": {
                    "name": t.name,
                    "description": t.description,
                    "parameters": t.parameters.clone().unwrap_or_else(
                        || json!({ "type": "object", "properties": {} })
                    ),
                }
            })
        })
        .collect()
}

fn parse_reply(data: &Value) -> anyhow::Result<ModelReply> {
    let message = &data["choices"][0]["message"];

    if let Some(tool_calls) = message["tool_calls"].as_array().filter(|c| !c.is_empty()) {
        let mut calls = Vec::with_capacity(tool_calls.len());
        for tc in tool_calls {
            let name = tc["function"]["name"]
                .as_str()
                .ok_or_else(|| anyhow::anyhow!("tool call without a name"))?;
            let args = match tc["function"]["arguments"].as_str() {
                Some(raw) if !raw.trim().is_empty() => serde_json::from_str(raw)
                    .with_context(|| format!("malformed arguments for {name}"))?,
                _ => json!({}),
            };
            calls.push(FunctionCall {
                id: tc["id"].as_str().map(str::to_string),
                name: name.to_string(),
                args,
            });
        }
        return Ok(ModelReply::ToolCalls(calls));
    }

    message["content"]
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| ModelReply::Text(s.to_string()))
        .ok_or_else(|| anyhow::anyhow!("missing content in Groq response"))
}

#[async_trait]
impl LlmProvider for GroqProvider {
    async fn chat(
        &self,
        system_prompt: &str,
        tools: &[ToolDeclaration],
        messages: &[Message],
    ) -> anyhow::Result<ModelReply> {
        let mut body = json!({
            "model": self.model,
            "messages": to_chat_messages(system_prompt, messages),
            "temperature": 0.7,
        });
        if !tools.is_empty() {
            body["tools"] = Value::Array(to_tools(tools));
        }

        let resp = self
            .client
            .post("https://api.groq.com/openai/v1/chat/completions")
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("failed to call Groq API")?;

        let status = resp.status();
        let data: Value = resp
            .json()
            .await
            .context("failed to parse Groq response")?;

        if !status.is_success() {
            anyhow::bail!("Groq API error ({}): {}", status, data);
        }

        parse_reply(&data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_result_references_call_id() {
        let call = FunctionCall {
            id: Some("call_abc".to_string()),
            name: "get_appointment".to_string(),
            args: json!({"phone": "99999999"}),
        };
        let msgs = to_chat_messages(
            "sys",
            &[
                Message::User("my booking?".to_string()),
                Message::ToolCall(call.clone()),
                Message::ToolResult {
                    call,
                    result: json!({"message": "No appointments found."}),
                },
            ],
        );

        assert_eq!(msgs[0]["role"], "system");
        assert_eq!(msgs[2]["tool_calls"][0]["id"], "call_abc");
        assert_eq!(msgs[2]["tool_calls"][0]["function"]["arguments"], r#"{"phone":"99999999"}"#);
        assert_eq!(msgs[3]["role"], "tool");
        assert_eq!(msgs[3]["tool_call_id"], "call_abc");
    }

    #[test]
    fn test_parse_tool_calls() {
        let data = json!({
            "choices": [{"message": {
                "content": null,
                "tool_calls": [{
                    "id": "call_1",
                    "type": "function",
                    "function": {"name": "check_availability", "arguments": "{\"date\":\"2025-12-25\"}"}
                }]
            }}]
        });

        let reply = parse_reply(&data).unwrap();
        assert_eq!(
            reply,
            ModelReply::ToolCalls(vec![FunctionCall {
                id: Some("call_1".to_string()),
                name: "check_availability".to_string(),
                args: json!({"date": "2025-12-25"}),
            }])
        );
    }

    #[test]
    fn test_parse_text_and_malformed() {
        let data = json!({"choices": [{"message": {"content": "Hello!"}}]});
        assert_eq!(parse_reply(&data).unwrap(), ModelReply::Text("Hello!".to_string()));

        let bad = json!({"choices": [{"message": {"tool_calls": [
            {"id": "x", "function": {"name": "get_appointment", "arguments": "{not json"}}
        ]}}]});
        assert!(parse_reply(&bad).is_err());
    }

    #[test]
    fn test_parameterless_tools_get_empty_schema() {
        let tools = to_tools(&[ToolDeclaration {
            name: "get_clinic_faq",
            description: "FAQ",
            parameters: None,
        }]);
        assert_eq!(tools[0]["function"]["parameters"]["type"], "object");
    }
}
