//! Chat-completion backends

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::AiConfig;
use crate::error::AiError;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system",
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user",
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatCompletion {
    pub content: String,
    pub total_tokens: Option<u64>,
}

/// Something that answers chat requests
pub trait ChatBackend {
    fn complete(&self, request: &ChatRequest) -> Result<ChatCompletion, AiError>;
}

#[derive(Serialize)]
struct RequestBody<'a> {
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    max_completion_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Deserialize)]
struct ResponseBody {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    total_tokens: u64,
}

fn parse_completion(body: &str) -> Result<ChatCompletion, AiError> {
    let parsed: ResponseBody =
        serde_json::from_str(body).map_err(|e| AiError::Decode(e.to_string()))?;

    // A choice with no content is still an answer; only a missing choice fails
    let content = parsed
        .choices
        .into_iter()
        .next()
        .ok_or(AiError::EmptyResponse)?
        .message
        .content
        .unwrap_or_default();

    Ok(ChatCompletion {
        content,
        total_tokens: parsed.usage.map(|u| u.total_tokens),
    })
}

/// Azure OpenAI chat completions over HTTPS
pub struct AzureOpenAi {
    http: reqwest::blocking::Client,
    endpoint: String,
    api_key: String,
    api_version: String,
}

impl AzureOpenAi {
    /// Build a client; fails with [`AiError::NotConfigured`] when the endpoint
    /// or key is missing.
    pub fn from_config(config: &AiConfig) -> Result<Self, AiError> {
        let (Some(endpoint), Some(api_key)) = (&config.endpoint, &config.api_key) else {
            return Err(AiError::NotConfigured);
        };
        if !config.is_configured() {
            return Err(AiError::NotConfigured);
        }

        let http = reqwest::blocking::Client::builder()
            .user_agent(concat!("mdm/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AiError::Http(e.to_string()))?;

        Ok(Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key: api_key.clone(),
            api_version: config.api_version.clone(),
        })
    }

    fn url(&self, deployment: &str) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.endpoint, deployment, self.api_version
        )
    }
}

impl ChatBackend for AzureOpenAi {
    fn complete(&self, request: &ChatRequest) -> Result<ChatCompletion, AiError> {
        let url = self.url(&request.model);
        let body = RequestBody {
            messages: &request.messages,
            max_completion_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        log::debug!("POST {}", url);
        let response = self
            .http
            .post(&url)
            .header("api-key", &self.api_key)
            .json(&body)
            .send()
            .map_err(|e| AiError::Http(e.to_string()))?;

        let status = response.status();
        let text = response.text().map_err(|e| AiError::Http(e.to_string()))?;
        if !status.is_success() {
            return Err(AiError::Api {
                status: status.as_u16(),
                message: text,
            });
        }

        parse_completion(&text)
    }
}
