use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::core::llm::{
    ChatMessage, GenerateRequest, LlmError, LlmProvider, ModelReply, ProviderType,
    ToolDeclaration, ToolInvocation,
};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GeminiRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<GeminiTool>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct GeminiContent {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    role: String,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_call: Option<GeminiFunctionCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_response: Option<GeminiFunctionResponse>,
}

impl GeminiPart {
    fn text(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiFunctionCall {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    name: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    args: Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiFunctionResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    name: String,
    response: Value,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiTool {
    function_declarations: Vec<GeminiFunctionDeclaration>,
}

#[derive(Serialize)]
struct GeminiFunctionDeclaration {
    name: String,
    description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    parameters: Option<Value>,
}

#[derive(Deserialize)]
pub(crate) struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContent>,
}

/// The key travels in a header so it never shows up in URLs or error text.
const API_KEY_HEADER: &str = "x-goog-api-key";

pub struct GoogleProvider {
    api_key: String,
    base_url: String,
    client: Client,
}

impl GoogleProvider {
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

/// Append `parts` under `role`, merging into the previous entry when it has
/// the same role. Gemini requires strictly alternating user/model turns.
fn push_parts(contents: &mut Vec<GeminiContent>, role: &str, parts: Vec<GeminiPart>) {
    if parts.is_empty() {
        return;
    }
    match contents.last_mut() {
        Some(last) if last.role == role => last.parts.extend(parts),
        _ => contents.push(GeminiContent {
            role: role.to_string(),
            parts,
        }),
    }
}

pub(crate) fn build_request(request: &GenerateRequest<'_>) -> GeminiRequest {
    let mut contents = Vec::new();

    for m in request.messages {
        match m {
            ChatMessage::User(text) => push_parts(&mut contents, "user", vec![GeminiPart::text(text)]),
            ChatMessage::Assistant { text, tool_calls } => {
                let mut parts = Vec::new();
                if let Some(text) = text.as_deref().filter(|t| !t.is_empty()) {
                    parts.push(GeminiPart::text(text));
                }
                for call in tool_calls {
                    parts.push(GeminiPart {
                        function_call: Some(GeminiFunctionCall {
                            id: call.id.clone(),
                            name: call.name.clone(),
                            args: call.args.clone(),
                        }),
                        ..GeminiPart::default()
                    });
                }
                push_parts(&mut contents, "model", parts);
            }
            ChatMessage::ToolResults(outcomes) => {
                let parts = outcomes
                    .iter()
                    .map(|o| GeminiPart {
                        function_response: Some(GeminiFunctionResponse {
                            id: o.id.clone(),
                            name: o.name.clone(),
                            response: json!({ "result": o.response }),
                        }),
                        ..GeminiPart::default()
                    })
                    .collect();
                push_parts(&mut contents, "user", parts);
            }
        }
    }

    let system_instruction = (!request.system_instruction.is_empty()).then(|| GeminiContent {
        role: String::new(),
        parts: vec![GeminiPart::text(request.system_instruction)],
    });

    let tools = if request.tools.is_empty() {
        Vec::new()
    } else {
        vec![GeminiTool {
            function_declarations: request.tools.iter().map(declaration).collect(),
        }]
    };

    GeminiRequest {
        system_instruction,
        contents,
        tools,
    }
}

fn declaration(tool: &ToolDeclaration) -> GeminiFunctionDeclaration {
    GeminiFunctionDeclaration {
        name: tool.name.to_string(),
        description: tool.description.to_string(),
        parameters: tool.parameters.clone(),
    }
}

pub(crate) fn parse_reply(response: GeminiResponse) -> Result<ModelReply, LlmError> {
    let parts = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts)
        .unwrap_or_default();

    let mut text = String::new();
    let mut calls = Vec::new();
    for part in parts {
        if let Some(t) = part.text {
            text.push_str(&t);
        }
        if let Some(fc) = part.function_call {
            calls.push(ToolInvocation {
                id: fc.id,
                name: fc.name,
                args: fc.args,
            });
        }
    }

    if !calls.is_empty() {
        let text = (!text.trim().is_empty()).then_some(text);
        return Ok(ModelReply::ToolCalls { text, calls });
    }
    if text.trim().is_empty() {
        return Err(LlmError::EmptyResponse);
    }
    Ok(ModelReply::Text(text))
}

#[async_trait]
impl LlmProvider for GoogleProvider {
    fn provider_type(&self) -> ProviderType {
        ProviderType::Google
    }

    async fn generate(
        &self,
        model_id: &str,
        request: &GenerateRequest<'_>,
    ) -> Result<ModelReply, LlmError> {
        let req = build_request(request);
        let url = format!("{}/models/{}:generateContent", self.base_url, model_id);
        let res = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&req)
            .send()
            .await?;
        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(LlmError::from_status("Google Gemini", status.as_u16(), &body));
        }
        let parsed: GeminiResponse = res.json().await?;
        parse_reply(parsed)
    }
}
