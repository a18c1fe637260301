//! OpenAI-compatible chat completion backend.

use crate::backend::{
    LlmBackend, LlmBackendConfig, LlmMessage, LlmProvider, LlmRequest, LlmResponse, TokenUsage,
};
use crate::error::LlmError;
use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::RETRY_AFTER;
use serde::{Deserialize, Serialize};

/// Backend for `POST {base_url}/chat/completions`.
#[derive(Debug, Clone)]
pub struct OpenAiBackend {
    client: reqwest::Client,
    config: LlmBackendConfig,
}

impl OpenAiBackend {
    /// Creates a backend from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: LlmBackendConfig) -> Result<Self, LlmError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| LlmError::InvalidConfig {
            reason: e.to_string(),
        })?;

        Ok(Self { client, config })
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [LlmMessage],
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    model: Option<String>,
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

#[async_trait]
impl LlmBackend for OpenAiBackend {
    async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let url = self.config.completions_url();
        let body = ChatCompletionRequest {
            model: &self.config.model,
            messages: &request.messages,
        };

        let mut http_request = self.client.post(&url).json(&body);
        if let Some(api_key) = &self.config.api_key
            && !api_key.is_empty()
        {
            http_request = http_request.bearer_auth(api_key);
        }

        let response = http_request.send().await.map_err(|e| {
            if e.is_timeout() {
                LlmError::Timeout
            } else {
                LlmError::RequestFailed {
                    reason: e.to_string(),
                }
            }
        })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse().ok());
            return Err(LlmError::RateLimited { retry_after_secs });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatCompletionResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                LlmError::Timeout
            } else {
                LlmError::ResponseParseFailed {
                    reason: e.to_string(),
                }
            }
        })?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(LlmError::EmptyResponse)?;

        let usage = parsed
            .usage
            .map(|u| TokenUsage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
            })
            .unwrap_or_default();

        Ok(LlmResponse {
            content,
            usage,
            model: parsed.model.unwrap_or_else(|| self.config.model.clone()),
        })
    }

    fn provider(&self) -> LlmProvider {
        self.config.provider
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, StatusCode as AxumStatus};
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{Value as JsonValue, json};
    use std::time::Duration;

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind stub listener");
        let addr = listener.local_addr().expect("stub address");
        tokio::spawn(async move {
            axum::serve(listener, router).await.expect("stub server");
        });
        format!("http://{addr}/v1")
    }

    fn backend(base_url: String) -> OpenAiBackend {
        OpenAiBackend::new(
            LlmBackendConfig::openai_compatible(base_url, "gpt-test").with_api_key("sk-test"),
        )
        .expect("backend")
    }

    #[tokio::test]
    async fn sends_model_messages_and_bearer_token() {
        async fn echo(headers: HeaderMap, Json(body): Json<JsonValue>) -> Json<JsonValue> {
            let auth = headers
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string();
            Json(json!({
                "model": body["model"],
                "choices": [{"message": {"role": "assistant", "content": format!(
                    "{auth}|{}|{}",
                    body["messages"].as_array().map(Vec::len).unwrap_or(0),
                    body["messages"][1]["role"].as_str().unwrap_or_default(),
                )}}],
                "usage": {"prompt_tokens": 12, "completion_tokens": 3}
            }))
        }

        let url = serve(Router::new().route("/v1/chat/completions", post(echo))).await;
        let request = LlmRequest::new(vec![
            LlmMessage::assistant("Hello Maria!"),
            LlmMessage::user("What is my balance?"),
        ]);

        let response = backend(url).generate(&request).await.expect("generate");

        assert_eq!(response.content, "Bearer sk-test|2|user");
        assert_eq!(response.model, "gpt-test");
        assert_eq!(response.usage.total(), 15);
    }

    #[test]
    fn request_body_carries_only_model_and_messages() {
        let messages = [LlmMessage::user("hi")];
        let body = serde_json::to_value(ChatCompletionRequest {
            model: "gpt-test",
            messages: &messages,
        })
        .expect("serialize");

        assert_eq!(
            body,
            json!({"model": "gpt-test", "messages": [{"role": "user", "content": "hi"}]})
        );
    }

    #[tokio::test]
    async fn non_success_status_is_reported() {
        async fn fail() -> (AxumStatus, &'static str) {
            (AxumStatus::INTERNAL_SERVER_ERROR, "upstream exploded")
        }

        let url = serve(Router::new().route("/v1/chat/completions", post(fail))).await;
        let err = backend(url)
            .generate(&LlmRequest::prompt("hi"))
            .await
            .expect_err("should fail");

        assert_eq!(
            err,
            LlmError::Status {
                status: 500,
                body: "upstream exploded".to_string()
            }
        );
    }

    #[tokio::test]
    async fn rate_limit_reads_retry_after() {
        async fn limited() -> (AxumStatus, [(&'static str, &'static str); 1], &'static str) {
            (AxumStatus::TOO_MANY_REQUESTS, [("retry-after", "7")], "slow down")
        }

        let url = serve(Router::new().route("/v1/chat/completions", post(limited))).await;
        let err = backend(url)
            .generate(&LlmRequest::prompt("hi"))
            .await
            .expect_err("should fail");

        assert_eq!(
            err,
            LlmError::RateLimited {
                retry_after_secs: Some(7)
            }
        );
    }

    #[tokio::test]
    async fn malformed_body_is_a_parse_failure() {
        async fn garbage() -> &'static str {
            "not json"
        }

        let url = serve(Router::new().route("/v1/chat/completions", post(garbage))).await;
        let err = backend(url)
            .generate(&LlmRequest::prompt("hi"))
            .await
            .expect_err("should fail");

        assert!(matches!(err, LlmError::ResponseParseFailed { .. }));
    }

    #[tokio::test]
    async fn empty_choices_are_rejected() {
        async fn empty() -> Json<JsonValue> {
            Json(json!({"choices": []}))
        }

        let url = serve(Router::new().route("/v1/chat/completions", post(empty))).await;
        let err = backend(url)
            .generate(&LlmRequest::prompt("hi"))
            .await
            .expect_err("should fail");

        assert_eq!(err, LlmError::EmptyResponse);
    }

    #[tokio::test]
    async fn slow_endpoint_times_out() {
        async fn slow() -> Json<JsonValue> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Json(json!({"choices": [{"message": {"content": "late"}}]}))
        }

        let url = serve(Router::new().route("/v1/chat/completions", post(slow))).await;
        let backend = OpenAiBackend::new(
            LlmBackendConfig::openai_compatible(url, "gpt-test")
                .with_timeout(Duration::from_millis(100)),
        )
        .expect("backend");

        let err = backend
            .generate(&LlmRequest::prompt("hi"))
            .await
            .expect_err("should time out");

        assert_eq!(err, LlmError::Timeout);
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_a_request_failure() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("address");
        drop(listener);

        let err = backend(format!("http://{addr}/v1"))
            .generate(&LlmRequest::prompt("hi"))
            .await
            .expect_err("should fail");

        assert!(matches!(err, LlmError::RequestFailed { .. }));
    }
}
