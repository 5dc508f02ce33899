use crate::config::job::JobConfig;
use crate::utils::error::{JudgeError, Result};
use serde_json::Value;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ChatOptions {
    pub api_url: String,
    pub api_key: String,
    pub model: String,
    pub temperature: f64,
    pub timeout_seconds: u64,
    pub retry_attempts: u32,
    pub retry_wait_seconds: u64,
}

impl ChatOptions {
    pub fn from_config(config: &JobConfig) -> Result<Self> {
        let api_key = config
            .api_key()
            .ok_or_else(|| JudgeError::MissingConfigError {
                field: "endpoint.api_key".to_string(),
            })?;

        Ok(Self {
            api_url: config.api_url().to_string(),
            api_key,
            model: config.model().to_string(),
            temperature: config.temperature(),
            timeout_seconds: config.timeout_seconds(),
            retry_attempts: config.retry_attempts(),
            retry_wait_seconds: config.retry_wait_seconds(),
        })
    }
}

/// 一次成功呼叫的結果：模型文字與完整原始回應
#[derive(Debug, Clone)]
pub struct ChatExchange {
    pub content: String,
    pub raw: Value,
}

pub struct ChatClient {
    client: reqwest::Client,
    options: ChatOptions,
}

impl ChatClient {
    pub fn new(options: ChatOptions) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(options.timeout_seconds))
            .build()?;

        Ok(Self { client, options })
    }

    /// 單次呼叫 chat-completions 端點
    pub async fn chat_once(&self, system_prompt: &str, user_content: &str) -> Result<ChatExchange> {
        let payload = serde_json::json!({
            "model": self.options.model,
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": user_content},
            ],
            "temperature": self.options.temperature,
        });

        tracing::debug!("📡 POST {}", self.options.api_url);
        let response = self
            .client
            .post(&self.options.api_url)
            .header("Authorization", format!("Bearer {}", self.options.api_key))
            .header("Content-Type", "application/json")
            .header("accept", "application/json")
            .json(&payload)
            .send()
            .await?;

        tracing::debug!("API response status: {}", response.status());
        let response = response.error_for_status()?;
        let raw: Value = response.json().await?;

        // OpenAI 相容格式；取不到文字時整包序列化，後續解析自然失敗重試
        let content = match raw["choices"][0]["message"]["content"].as_str() {
            Some(text) => text.to_string(),
            None => serde_json::to_string(&raw)?,
        };

        Ok(ChatExchange { content, raw })
    }

    /// 呼叫加解析：請求失敗與解析失敗都會整輪重試，固定間隔不退避。
    /// 回傳解析結果與成功那次的原始回應。
    pub async fn chat_with_retry<T, F>(
        &self,
        system_prompt: &str,
        user_content: &str,
        parse: F,
    ) -> Result<(T, Value)>
    where
        F: Fn(&str) -> Result<T>,
    {
        let attempts = self.options.retry_attempts.max(1);
        let mut last_err = None;

        for attempt in 1..=attempts {
            match self.chat_once(system_prompt, user_content).await {
                Ok(exchange) => match parse(&exchange.content) {
                    Ok(parsed) => return Ok((parsed, exchange.raw)),
                    Err(e) => {
                        tracing::warn!(
                            "⚠️ Attempt {}/{}: reply not usable: {}",
                            attempt,
                            attempts,
                            e
                        );
                        last_err = Some(e);
                    }
                },
                Err(e) => {
                    tracing::warn!("⚠️ Attempt {}/{}: request failed: {}", attempt, attempts, e);
                    last_err = Some(e);
                }
            }

            if attempt < attempts {
                tokio::time::sleep(Duration::from_secs(self.options.retry_wait_seconds)).await;
            }
        }

        // attempts >= 1，理論上 last_err 一定有值
        Err(last_err.unwrap_or_else(|| JudgeError::ProcessingError {
            message: "model call failed with no recorded error".to_string(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn test_options(server: &MockServer) -> ChatOptions {
        ChatOptions {
            api_url: server.url("/v1/chat/completions"),
            api_key: "test-key".to_string(),
            model: "gpt-oss-120b".to_string(),
            temperature: 0.2,
            timeout_seconds: 5,
            retry_attempts: 3,
            retry_wait_seconds: 0,
        }
    }

    fn chat_body(content: &str) -> serde_json::Value {
        serde_json::json!({
            "choices": [
                {"message": {"role": "assistant", "content": content}}
            ],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
        })
    }

    #[tokio::test]
    async fn test_chat_once_extracts_content() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(POST)
                .path("/v1/chat/completions")
                .header("authorization", "Bearer test-key")
                .header("accept", "application/json")
                .json_body_partial(r#"{"model": "gpt-oss-120b"}"#);
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(chat_body(r#"{"results": []}"#));
        });

        let client = ChatClient::new(test_options(&server)).unwrap();
        let exchange = client.chat_once("system", "user").await.unwrap();

        api_mock.assert();
        assert_eq!(exchange.content, r#"{"results": []}"#);
        assert!(exchange.raw["usage"]["total_tokens"].as_u64().is_some());
    }

    #[tokio::test]
    async fn test_chat_once_falls_back_to_whole_body() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(serde_json::json!({"detail": "model warming up"}));
        });

        let client = ChatClient::new(test_options(&server)).unwrap();
        let exchange = client.chat_once("system", "user").await.unwrap();

        api_mock.assert();
        assert!(exchange.content.contains("model warming up"));
    }

    #[tokio::test]
    async fn test_chat_once_propagates_http_error() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(500);
        });

        let client = ChatClient::new(test_options(&server)).unwrap();
        let result = client.chat_once("system", "user").await;

        api_mock.assert();
        assert!(matches!(result, Err(JudgeError::ApiError(_))));
    }

    #[tokio::test]
    async fn test_retry_exhausts_on_persistent_failure() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(503);
        });

        let client = ChatClient::new(test_options(&server)).unwrap();
        let result = client
            .chat_with_retry("system", "user", |content| Ok(content.to_string()))
            .await;

        assert!(result.is_err());
        api_mock.assert_hits(3);
    }

    #[tokio::test]
    async fn test_parse_failure_triggers_full_retry() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(chat_body("not json at all"));
        });

        let client = ChatClient::new(test_options(&server)).unwrap();
        let result = client
            .chat_with_retry("system", "user", |_| {
                Err::<(), _>(JudgeError::ModelReplyError {
                    message: "bad shape".to_string(),
                })
            })
            .await;

        assert!(matches!(result, Err(JudgeError::ModelReplyError { .. })));
        api_mock.assert_hits(3);
    }

    #[tokio::test]
    async fn test_retry_recovers_after_parse_failure() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(chat_body("payload"));
        });

        let calls = std::cell::Cell::new(0u32);
        let client = ChatClient::new(test_options(&server)).unwrap();
        let (parsed, raw) = client
            .chat_with_retry("system", "user", |content| {
                calls.set(calls.get() + 1);
                if calls.get() == 1 {
                    Err(JudgeError::ModelReplyError {
                        message: "first attempt rejected".to_string(),
                    })
                } else {
                    Ok(content.to_string())
                }
            })
            .await
            .unwrap();

        assert_eq!(parsed, "payload");
        assert!(raw["choices"].is_array());
        api_mock.assert_hits(2);
    }
}
