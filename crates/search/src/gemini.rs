use crate::error::{Result, SearchError};
use crate::semantic::{build_prompt, parse_matched_ids, SemanticMatcher, ToolProjection};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-3-flash-preview";
pub const DEFAULT_GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Semantic matcher backed by the Gemini `generateContent` API.
///
/// The request asks for a JSON response constrained to
/// `{ "matchedIds": [string] }`; the body is still validated on receipt.
pub struct GeminiMatcher {
    client: Client,
    endpoint: String,
    model: String,
    api_key: String,
}

impl GeminiMatcher {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder().build()?;
        Ok(Self::with_client(client, api_key))
    }

    #[must_use]
    pub fn with_client(client: Client, api_key: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: DEFAULT_GEMINI_ENDPOINT.to_string(),
            model: DEFAULT_GEMINI_MODEL.to_string(),
            api_key: api_key.into(),
        }
    }

    #[must_use]
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    fn request_url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }

    fn request_body(query: &str, candidates: &[ToolProjection]) -> Value {
        json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": build_prompt(query, candidates) }],
            }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": {
                    "type": "OBJECT",
                    "properties": {
                        "matchedIds": {
                            "type": "ARRAY",
                            "items": { "type": "STRING" },
                        },
                    },
                },
            },
        })
    }
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<ResponseCandidate>,
}

#[derive(Debug, Deserialize)]
struct ResponseCandidate {
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text parts of the first candidate
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|candidate| candidate.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|part| part.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl SemanticMatcher for GeminiMatcher {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn match_ids(&self, query: &str, candidates: &[ToolProjection]) -> Result<Vec<String>> {
        log::debug!(
            "Gemini match: model={}, candidates={}",
            self.model,
            candidates.len()
        );

        let response = self
            .client
            .post(self.request_url())
            .header("x-goog-api-key", &self.api_key)
            .json(&Self::request_body(query, candidates))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::Status {
                status: status.as_u16(),
                body: body.chars().take(512).collect(),
            });
        }

        let payload: GenerateContentResponse = response
            .json()
            .await
            .map_err(|err| SearchError::malformed(format!("unexpected response shape: {err}")))?;
        parse_matched_ids(&payload.text())
    }
}
