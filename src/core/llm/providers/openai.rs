use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::core::llm::{
    ChatMessage, GenerateRequest, LlmError, LlmProvider, ModelReply, ProviderType,
    ToolInvocation,
};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Serialize)]
pub(crate) struct OpenAiRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAiMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<OpenAiTool<'a>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAiMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<OpenAiToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

impl OpenAiMessage {
    fn text(role: &str, content: &str) -> Self {
        Self {
            role: role.to_string(),
            content: Some(content.to_string()),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAiToolCall {
    id: String,
    #[serde(rename = "type", default = "function_kind")]
    kind: String,
    function: OpenAiFunctionCall,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAiFunctionCall {
    name: String,
    // JSON-encoded arguments object
    #[serde(default)]
    arguments: String,
}

fn function_kind() -> String {
    "function".to_string()
}

#[derive(Serialize)]
struct OpenAiTool<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    function: OpenAiFunctionDef<'a>,
}

#[derive(Serialize)]
struct OpenAiFunctionDef<'a> {
    name: &'a str,
    description: &'a str,
    parameters: Value,
}

#[derive(Deserialize)]
pub(crate) struct OpenAiResponse {
    #[serde(default)]
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

pub struct OpenAiProvider {
    api_key: String,
    base_url: String,
    client: Client,
}

impl OpenAiProvider {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            client: Client::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }
}

fn call_id(id: &Option<String>, name: &str, index: usize) -> String {
    id.clone().unwrap_or_else(|| format!("call_{}_{}", name, index))
}

pub(crate) fn build_request<'a>(model_id: &'a str, request: &GenerateRequest<'a>) -> OpenAiRequest<'a> {
    let mut messages = Vec::new();
    if !request.system_instruction.is_empty() {
        messages.push(OpenAiMessage::text("system", request.system_instruction));
    }

    for m in request.messages {
        match m {
            ChatMessage::User(text) => messages.push(OpenAiMessage::text("user", text)),
            ChatMessage::Assistant { text, tool_calls } => messages.push(OpenAiMessage {
                role: "assistant".to_string(),
                content: text.clone(),
                tool_calls: tool_calls
                    .iter()
                    .enumerate()
                    .map(|(i, c)| OpenAiToolCall {
                        id: call_id(&c.id, &c.name, i),
                        kind: function_kind(),
                        function: OpenAiFunctionCall {
                            name: c.name.clone(),
                            arguments: c.args.to_string(),
                        },
                    })
                    .collect(),
                tool_call_id: None,
            }),
            ChatMessage::ToolResults(outcomes) => {
                for (i, o) in outcomes.iter().enumerate() {
                    messages.push(OpenAiMessage {
                        role: "tool".to_string(),
                        content: Some(o.response.to_string()),
                        tool_calls: Vec::new(),
                        tool_call_id: Some(call_id(&o.id, &o.name, i)),
                    });
                }
            }
        }
    }

    let tools = request
        .tools
        .iter()
        .map(|t| OpenAiTool {
            kind: "function",
            function: OpenAiFunctionDef {
                name: t.name,
                description: t.description,
                parameters: t
                    .parameters
                    .clone()
                    .unwrap_or_else(|| json!({ "type": "object", "properties": {} })),
            },
        })
        .collect();

    OpenAiRequest {
        model: model_id,
        messages,
        tools,
    }
}

pub(crate) fn parse_reply(response: OpenAiResponse) -> Result<ModelReply, LlmError> {
    let Some(choice) = response.choices.into_iter().next() else {
        return Err(LlmError::EmptyResponse);
    };
    let message = choice.message;
    let text = message.content.filter(|t| !t.trim().is_empty());

    if !message.tool_calls.is_empty() {
        let calls = message
            .tool_calls
            .into_iter()
            .map(|c| ToolInvocation {
                id: Some(c.id),
                name: c.function.name,
                args: serde_json::from_str(&c.function.arguments).unwrap_or(Value::Null),
            })
            .collect();
        return Ok(ModelReply::ToolCalls { text, calls });
    }

    text.map(ModelReply::Text).ok_or(LlmError::EmptyResponse)
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn provider_type(&self) -> ProviderType {
        ProviderType::OpenAI
    }

    async fn generate(
        &self,
        model_id: &str,
        request: &GenerateRequest<'_>,
    ) -> Result<ModelReply, LlmError> {
        let req = build_request(model_id, request);
        let res = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&req)
            .send()
            .await?;
        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(LlmError::from_status("OpenAI", status.as_u16(), &body));
        }
        let parsed: OpenAiResponse = res.json().await?;
        parse_reply(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::llm::{ToolDeclaration, ToolOutcome};

    #[test]
    fn request_maps_tool_round_trip() {
        let messages = vec![
            ChatMessage::User("list tables".to_string()),
            ChatMessage::Assistant {
                text: None,
                tool_calls: vec![ToolInvocation {
                    id: Some("call_1".to_string()),
                    name: "list_tables".to_string(),
                    args: json!({}),
                }],
            },
            ChatMessage::ToolResults(vec![ToolOutcome {
                id: Some("call_1".to_string()),
                name: "list_tables".to_string(),
                response: json!(["tech_products"]),
            }]),
        ];
        let tools = vec![ToolDeclaration {
            name: "list_tables",
            description: "Retrieve the names of all tables in the database.",
            parameters: None,
        }];
        let req = build_request(
            "gpt-4o-mini",
            &GenerateRequest {
                system_instruction: "be helpful",
                messages: &messages,
                tools: &tools,
            },
        );
        let body = serde_json::to_value(&req).unwrap();

        assert_eq!(body["model"], "gpt-4o-mini");
        let msgs = body["messages"].as_array().unwrap();
        assert_eq!(msgs.len(), 4);
        assert_eq!(msgs[0]["role"], "system");
        assert_eq!(msgs[2]["role"], "assistant");
        assert!(msgs[2]["content"].is_null());
        assert_eq!(msgs[2]["tool_calls"][0]["type"], "function");
        assert_eq!(msgs[2]["tool_calls"][0]["function"]["arguments"], "{}");
        assert_eq!(msgs[3]["role"], "tool");
        assert_eq!(msgs[3]["tool_call_id"], "call_1");
        assert_eq!(msgs[3]["content"], r#"["tech_products"]"#);
        assert_eq!(body["tools"][0]["function"]["parameters"]["type"], "object");
    }

    #[test]
    fn parse_reply_decodes_tool_arguments() {
        let raw = json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_9",
                        "type": "function",
                        "function": {
                            "name": "execute_query",
                            "arguments": "{\"sql\": \"SELECT * FROM tech_products\"}"
                        }
                    }]
                }
            }]
        });
        let reply = parse_reply(serde_json::from_value(raw).unwrap()).unwrap();
        let ModelReply::ToolCalls { calls, .. } = reply else {
            panic!("expected tool calls");
        };
        assert_eq!(calls[0].id.as_deref(), Some("call_9"));
        assert_eq!(calls[0].args["sql"], "SELECT * FROM tech_products");
    }

    #[test]
    fn parse_reply_with_blank_content_is_empty() {
        let raw = json!({ "choices": [{ "message": { "role": "assistant", "content": "  " } }] });
        assert!(matches!(
            parse_reply(serde_json::from_value(raw).unwrap()),
            Err(LlmError::EmptyResponse)
        ));
    }
}
