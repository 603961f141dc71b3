//! Adapter around the upstream generative text service.
//!
//! One [`GenerationCall`] maps to one logical upstream request with a
//! timeout that scales with the requested item count and up to
//! [`ADAPTER_RETRIES`] automatic retries on transient failure. The adapter
//! either returns a canonical [`GenerationPayload`] or a generation-failure
//! error; it never returns partial data.

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use secrecy::ExposeSecret;
use std::time::Duration;

use crate::{
    config::Config,
    constants::prompts,
    errors::{AppError, AppResult},
    models::domain::question::Section,
    models::dto::upstream::{GenerationPayload, RawGenerationPayload},
};

/// Automatic retries after the first attempt of a single call.
pub const ADAPTER_RETRIES: u32 = 2;

const TIMEOUT_BASE_SECS: u64 = 20;
const TIMEOUT_PER_ITEM_SECS: u64 = 6;
const RETRY_BACKOFF_MS: u64 = 500;

/// One generation request: how many items, for which section, with
/// free-text steering instructions.
#[derive(Debug, Clone)]
pub struct GenerationCall {
    pub section: Section,
    pub item_count: usize,
    pub instructions: String,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GenerationClient: Send + Sync {
    async fn generate(&self, call: &GenerationCall) -> AppResult<GenerationPayload>;
}

/// Timeout budget for a single upstream attempt; larger requests get
/// longer budgets.
pub fn request_timeout(item_count: usize) -> Duration {
    Duration::from_secs(TIMEOUT_BASE_SECS + TIMEOUT_PER_ITEM_SECS * item_count as u64)
}

/// Parses the upstream response body into a canonical payload. If the body
/// is not bare JSON, attempts to locate an embedded JSON object inside the
/// surrounding free text before failing.
pub fn parse_payload(content: &str) -> AppResult<GenerationPayload> {
    let raw: RawGenerationPayload = match serde_json::from_str(content) {
        Ok(raw) => raw,
        Err(direct_err) => {
            let fragment = extract_json_fragment(content).ok_or_else(|| {
                AppError::GenerationFailed(format!(
                    "upstream response is not structured data: {}",
                    direct_err
                ))
            })?;
            serde_json::from_str(fragment).map_err(|err| {
                AppError::GenerationFailed(format!(
                    "embedded payload failed to parse: {}",
                    err
                ))
            })?
        }
    };

    let payload = GenerationPayload::from(raw);
    if payload.questions.is_empty() {
        return Err(AppError::GenerationFailed(
            "upstream payload contained no questions".to_string(),
        ));
    }

    Ok(payload)
}

/// Locates the first balanced JSON object inside free text, tolerating
/// braces within string literals.
pub fn extract_json_fragment(content: &str) -> Option<&str> {
    let start = content.find('{')?;
    let bytes = content.as_bytes();

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, byte) in bytes[start..].iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if *byte == b'\\' {
                escaped = true;
            } else if *byte == b'"' {
                in_string = false;
            }
            continue;
        }

        match byte {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&content[start..=start + offset]);
                }
            }
            _ => {}
        }
    }

    None
}

/// Production client backed by the OpenAI-compatible chat completions API.
pub struct OpenAiGenerationClient {
    client: Client<OpenAIConfig>,
    model_name: String,
}

impl OpenAiGenerationClient {
    pub fn new(config: &Config) -> Self {
        let mut openai_config =
            OpenAIConfig::new().with_api_key(config.openai_api_key.expose_secret());
        if let Some(api_base) = &config.openai_api_base {
            openai_config = openai_config.with_api_base(api_base);
        }

        Self {
            client: Client::with_config(openai_config),
            model_name: config.openai_model.clone(),
        }
    }

    async fn complete(&self, call: &GenerationCall) -> Result<String, OpenAIError> {
        let system_message = ChatCompletionRequestSystemMessageArgs::default()
            .content(prompts::QUESTION_GENERATOR_SYSTEM_PROMPT)
            .build()?;
        let user_message = ChatCompletionRequestUserMessageArgs::default()
            .content(call.instructions.as_str())
            .build()?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(vec![
                ChatCompletionRequestMessage::System(system_message),
                ChatCompletionRequestMessage::User(user_message),
            ])
            .temperature(0.7)
            .max_tokens(4096u32)
            .build()?;

        let response = self.client.chat().create(request).await?;

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .unwrap_or_default();

        Ok(content.trim().to_string())
    }
}

#[async_trait]
impl GenerationClient for OpenAiGenerationClient {
    async fn generate(&self, call: &GenerationCall) -> AppResult<GenerationPayload> {
        let timeout = request_timeout(call.item_count);
        let mut last_error = String::new();

        for attempt in 0..=ADAPTER_RETRIES {
            if attempt > 0 {
                tokio::time::sleep(Duration::from_millis(RETRY_BACKOFF_MS * attempt as u64))
                    .await;
            }

            match tokio::time::timeout(timeout, self.complete(call)).await {
                Ok(Ok(content)) => match parse_payload(&content) {
                    Ok(payload) => {
                        log::debug!(
                            "generation call for {} {} items succeeded on attempt {}",
                            call.item_count,
                            call.section,
                            attempt + 1
                        );
                        return Ok(payload);
                    }
                    Err(err) => {
                        log::warn!(
                            "malformed generation payload on attempt {}: {}",
                            attempt + 1,
                            err
                        );
                        last_error = err.to_string();
                    }
                },
                Ok(Err(err)) => {
                    log::warn!(
                        "upstream call failed on attempt {}: {}",
                        attempt + 1,
                        err
                    );
                    last_error = err.to_string();
                }
                Err(_elapsed) => {
                    log::warn!(
                        "upstream call timed out after {:?} on attempt {}",
                        timeout,
                        attempt + 1
                    );
                    last_error = format!("timed out after {:?}", timeout);
                }
            }
        }

        Err(AppError::GenerationFailed(format!(
            "upstream generation failed after {} attempts: {}",
            ADAPTER_RETRIES + 1,
            last_error
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_timeout_scales_with_item_count() {
        assert!(request_timeout(10) > request_timeout(5));
        assert_eq!(request_timeout(0), Duration::from_secs(TIMEOUT_BASE_SECS));
        assert_eq!(
            request_timeout(5),
            Duration::from_secs(TIMEOUT_BASE_SECS + 5 * TIMEOUT_PER_ITEM_SECS)
        );
    }

    #[test]
    fn parse_payload_accepts_bare_json() {
        let body = r#"{"questions":[{"question":"Q","options":["a","b","c","d"],"correctAnswer":"A"}]}"#;
        let payload = parse_payload(body).expect("bare JSON parses");
        assert_eq!(payload.questions.len(), 1);
    }

    #[test]
    fn parse_payload_strips_surrounding_free_text() {
        let body = "Sure! Here are your questions:\n```json\n{\"questions\":[{\"question\":\"Q\",\"options\":[\"a\",\"b\",\"c\",\"d\"],\"correctAnswer\":\"B\"}]}\n```\nLet me know if you need more.";
        let payload = parse_payload(body).expect("wrapped JSON parses");
        assert_eq!(payload.questions.len(), 1);
    }

    #[test]
    fn parse_payload_rejects_unstructured_text() {
        let err = parse_payload("no json here at all").unwrap_err();
        assert!(matches!(err, AppError::GenerationFailed(_)));
    }

    #[test]
    fn parse_payload_rejects_empty_question_list() {
        let err = parse_payload(r#"{"questions":[]}"#).unwrap_err();
        assert!(matches!(err, AppError::GenerationFailed(_)));
    }

    #[test]
    fn extract_json_fragment_balances_nested_braces() {
        let text = "prefix {\"a\": {\"b\": 1}, \"c\": 2} suffix";
        assert_eq!(
            extract_json_fragment(text),
            Some("{\"a\": {\"b\": 1}, \"c\": 2}")
        );
    }

    #[test]
    fn extract_json_fragment_ignores_braces_inside_strings() {
        let text = r#"note {"text": "a } brace \" inside"} tail"#;
        assert_eq!(
            extract_json_fragment(text),
            Some(r#"{"text": "a } brace \" inside"}"#)
        );
    }

    #[test]
    fn extract_json_fragment_returns_none_without_object() {
        assert_eq!(extract_json_fragment("plain text"), None);
        assert_eq!(extract_json_fragment("{unterminated"), None);
    }
}
