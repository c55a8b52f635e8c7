//! OpenAI-compatible chat-completions client.

use super::{ContentGenerator, ContentRequest, ContentTask};
use crate::config::ContentConfig;
use crate::error::{EngineError, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

pub struct HttpContentGenerator {
    client: reqwest::Client,
    url: String,
    model: String,
    api_key: Option<String>,
}

impl HttpContentGenerator {
    /// Reads the API key from the configured environment variable. A missing key is
    /// only reported when a request is made.
    pub fn new(config: &ContentConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty());
        Self::with_api_key(config, api_key)
    }

    pub fn with_api_key(config: &ContentConfig, api_key: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| EngineError::UpstreamUnavailable(format!("http client: {e}")))?;
        let url = format!("{}/chat/completions", config.endpoint.trim_end_matches('/'));
        info!(url = %url, model = %config.model, "content generator configured");
        Ok(Self {
            client,
            url,
            model: config.model.clone(),
            api_key,
        })
    }
}

#[async_trait]
impl ContentGenerator for HttpContentGenerator {
    async fn generate(&self, request: &ContentRequest) -> Result<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| EngineError::UpstreamUnavailable("no API key configured".into()))?;
        let body = ChatRequest {
            model: &self.model,
            messages: [ChatMessage {
                role: "user",
                content: &request.prompt,
            }],
            temperature: request.temperature,
        };
        let res = self
            .client
            .post(&self.url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| EngineError::UpstreamUnavailable(e.to_string()))?;

        let status = res.status();
        let text = res
            .text()
            .await
            .map_err(|e| EngineError::UpstreamUnavailable(e.to_string()))?;
        if !status.is_success() {
            warn!(task = %request.task, %status, "content generator rejected request");
        }
        decode_envelope(request.task, status, &text)
    }
}

/// First choice's message text from a chat-completions response body.
fn decode_envelope(task: ContentTask, status: StatusCode, body: &str) -> Result<String> {
    if !status.is_success() {
        return Err(EngineError::UpstreamUnavailable(format!("{status} {}", body.trim())));
    }
    let reply: ChatResponse = serde_json::from_str(body).map_err(|e| EngineError::UpstreamFormat {
        task: task.as_str(),
        reason: format!("chat envelope: {e}"),
    })?;
    reply
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| EngineError::UpstreamFormat {
            task: task.as_str(),
            reason: "empty completion".into(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_key_is_upstream_unavailable() {
        let g = HttpContentGenerator::with_api_key(&ContentConfig::default(), None).unwrap();
        let err = g
            .generate(&ContentRequest::new(ContentTask::Module, "p".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::UpstreamUnavailable(_)));
    }

    #[test]
    fn request_body_shape() {
        let body = ChatRequest {
            model: "gpt-4",
            messages: [ChatMessage {
                role: "user",
                content: "hi",
            }],
            temperature: 0.5,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["temperature"], 0.5);
    }

    #[test]
    fn envelope_yields_first_choice() {
        let body = r#"{"id":"c1","choices":[{"index":0,"message":{"role":"assistant","content":"{\"gaps\":[]}"}},{"message":{"content":"second"}}]}"#;
        assert_eq!(
            decode_envelope(ContentTask::KnowledgeGaps, StatusCode::OK, body).unwrap(),
            r#"{"gaps":[]}"#
        );
    }

    #[test]
    fn error_status_is_upstream_unavailable() {
        for status in [StatusCode::INTERNAL_SERVER_ERROR, StatusCode::TOO_MANY_REQUESTS] {
            let err = decode_envelope(ContentTask::Module, status, r#"{"error":"busy"}"#).unwrap_err();
            match err {
                EngineError::UpstreamUnavailable(msg) => {
                    assert!(msg.starts_with(&status.as_u16().to_string()));
                    assert!(msg.contains("busy"));
                }
                other => panic!("expected upstream unavailable, got {other:?}"),
            }
        }
    }

    #[test]
    fn empty_or_missing_content_is_upstream_format() {
        for body in [
            r#"{"choices":[]}"#,
            r#"{}"#,
            r#"{"choices":[{"message":{"role":"assistant","content":null}}]}"#,
            r#"{"choices":[{"message":{"role":"assistant"}}]}"#,
        ] {
            assert!(
                matches!(
                    decode_envelope(ContentTask::Exercise, StatusCode::OK, body),
                    Err(EngineError::UpstreamFormat { task: "exercise", .. })
                ),
                "{body}"
            );
        }
    }

    #[test]
    fn non_json_body_is_upstream_format() {
        let err = decode_envelope(ContentTask::Recommendations, StatusCode::OK, "<html>gateway</html>")
            .unwrap_err();
        assert_eq!(err.kind(), "upstream_format_error");
    }
}
