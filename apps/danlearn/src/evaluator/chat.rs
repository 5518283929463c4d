//! OpenAI-compatible chat completions evaluator.

use super::{AnswerEvaluator, EvaluatorError, build_prompt, neutral_score, parse_score};
use crate::config::EvaluatorConfig;
use async_trait::async_trait;
use danlearn_core::{DiagnosticTask, Score};
use serde::{Deserialize, Serialize};

/// Sampling temperature for scoring.
const TEMPERATURE: f32 = 0.2;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

/// Evaluator backed by a `/chat/completions` endpoint.
#[derive(Clone)]
pub struct ChatEvaluator {
    http: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl std::fmt::Debug for ChatEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatEvaluator")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("has_api_key", &self.api_key.is_some())
            .finish()
    }
}

impl ChatEvaluator {
    /// Create an evaluator from configuration.
    pub fn new(config: &EvaluatorConfig) -> Result<Self, EvaluatorError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| EvaluatorError::ClientBuild(e.to_string()))?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
        })
    }

    /// Score an answer, surfacing every failure.
    pub async fn try_evaluate(
        &self,
        task: &DiagnosticTask,
        text: &str,
    ) -> Result<Score, EvaluatorError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(EvaluatorError::MissingCredential);
        };

        let prompt = build_prompt(task, text);
        let body = ChatRequest {
            model: &self.model,
            messages: [ChatMessage {
                role: "user",
                content: &prompt,
            }],
            temperature: TEMPERATURE,
        };

        let url = format!("{}/chat/completions", self.base_url);
        let resp = self
            .http
            .post(&url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| EvaluatorError::ConnectionFailed(format!("{}: {e}", self.base_url)))?;

        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(EvaluatorError::Unauthorized);
        }
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(EvaluatorError::RateLimited);
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(EvaluatorError::ServerError(status.as_u16(), body));
        }

        let completion: ChatResponse = resp
            .json()
            .await
            .map_err(|e| EvaluatorError::ParseError(e.to_string()))?;
        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| EvaluatorError::ParseError("empty completion".to_string()))?;

        parse_score(&content)
            .ok_or_else(|| EvaluatorError::ParseError(format!("no score in: {}", content)))
    }
}

#[async_trait]
impl AnswerEvaluator for ChatEvaluator {
    async fn evaluate(&self, task: &DiagnosticTask, text: &str) -> Score {
        match self.try_evaluate(task, text).await {
            Ok(score) => {
                tracing::debug!(focus = task.focus, score = %score, "Answer evaluated");
                score
            }
            Err(e) => {
                tracing::warn!(
                    event = "evaluator_fallback",
                    focus = task.focus,
                    error = %e,
                    "Evaluation failed, using neutral score"
                );
                neutral_score()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use danlearn_core::DIAGNOSTIC_TASKS;

    #[tokio::test]
    async fn missing_credential_degrades_to_neutral() {
        let evaluator = ChatEvaluator::new(&EvaluatorConfig::default()).expect("client");
        assert!(matches!(
            evaluator.try_evaluate(&DIAGNOSTIC_TASKS[0], "hej").await,
            Err(EvaluatorError::MissingCredential)
        ));
        assert_eq!(
            evaluator.evaluate(&DIAGNOSTIC_TASKS[0], "hej").await,
            neutral_score()
        );
    }

    #[tokio::test]
    async fn unreachable_endpoint_degrades_to_neutral() {
        let config = EvaluatorConfig {
            api_key: Some("sk-test".to_string()),
            base_url: "http://127.0.0.1:9".to_string(),
            timeout_secs: 1,
            ..EvaluatorConfig::default()
        };
        let evaluator = ChatEvaluator::new(&config).expect("client");
        assert_eq!(
            evaluator.evaluate(&DIAGNOSTIC_TASKS[2], "Jeg synes dansk er svært.").await,
            neutral_score()
        );
    }

    #[test]
    fn request_body_shape() {
        let body = ChatRequest {
            model: "gpt-4o-mini",
            messages: [ChatMessage {
                role: "user",
                content: "prompt",
            }],
            temperature: TEMPERATURE,
        };
        let json = serde_json::to_value(&body).expect("serialize");
        assert_eq!(json["model"], "gpt-4o-mini");
        assert_eq!(json["messages"][0]["role"], "user");
        assert!(json["temperature"].is_number());
    }

    #[test]
    fn debug_hides_key() {
        let config = EvaluatorConfig {
            api_key: Some("sk-secret".to_string()),
            ..EvaluatorConfig::default()
        };
        let rendered = format!("{:?}", ChatEvaluator::new(&config).expect("client"));
        assert!(!rendered.contains("sk-secret"));
    }
}
