//! Gateway generator: asks an OpenAI-compatible chat-completions endpoint
//! to write the reply.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::GenerationError;

use super::action::ActionType;
use super::generator::{GenerationRequest, ResponseGenerator};

const BACKEND: &str = "gateway";

/// Connection settings for the gateway.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Full chat-completions URL.
    pub endpoint: String,
    pub api_key: SecretString,
    pub model: String,
    /// Whole-request timeout.
    pub timeout: Duration,
}

/// Network-backed generator.
pub struct GatewayGenerator {
    client: reqwest::Client,
    config: GatewayConfig,
}

impl GatewayGenerator {
    pub fn new(config: GatewayConfig) -> Result<Self, GenerationError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GenerationError::RequestFailed {
                backend: BACKEND.to_string(),
                reason: format!("Failed to build HTTP client: {}", e),
            })?;

        info!(endpoint = %config.endpoint, model = %config.model, "Using gateway generator");
        Ok(Self { client, config })
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Instructions for the model, per action.
pub fn system_prompt(action: ActionType) -> &'static str {
    match action {
        ActionType::Accept => {
            "You are a professional government email assistant. \
             Generate a formal acceptance email that:\n\
             - Confirms acceptance of the request\n\
             - Thanks the sender\n\
             - Provides any next steps if applicable\n\
             - Maintains a professional, courteous tone"
        }
        ActionType::Reject => {
            "You are a professional government email assistant. \
             Generate a polite rejection email that:\n\
             - Respectfully declines the request\n\
             - Provides a brief, professional reason\n\
             - Thanks them for their inquiry\n\
             - Offers alternative solutions if possible"
        }
        ActionType::RequestInfo => {
            "You are a professional government email assistant. \
             Generate an information request email that:\n\
             - Politely requests additional information\n\
             - Specifies exactly what information is needed\n\
             - Explains why the information is necessary\n\
             - Provides a reasonable timeline for response"
        }
        ActionType::Forward => {
            "You are a professional government email assistant. \
             Generate a forwarding message that:\n\
             - Explains why the email is being forwarded\n\
             - Indicates which department can better assist\n\
             - Maintains professional courtesy\n\
             - Thanks them for their patience"
        }
        ActionType::Acknowledge => {
            "You are a professional government email assistant. \
             Generate an acknowledgment email that:\n\
             - Confirms receipt of their email\n\
             - Provides an estimated timeline for full response\n\
             - Reassures them their request is being processed\n\
             - Maintains a professional tone"
        }
        ActionType::Custom => {
            "You are a professional government email assistant. \
             Generate a professional response \
             email that addresses the sender's request appropriately while maintaining a formal, \
             courteous tone."
        }
    }
}

/// The original email, restated for the model.
pub fn user_prompt(request: &GenerationRequest) -> String {
    format!(
        "Generate a professional email response for the following:\n\n\
         Original Email:\n\
         From: {sender} <{sender_email}>\n\
         Subject: {subject}\n\
         Body:\n\
         {body}\n\n\
         Please generate an appropriate response based on the context.",
        sender = request.sender,
        sender_email = request.sender_email,
        subject = request.subject,
        body = request.body,
    )
}

/// Map a non-success HTTP status to an error.
fn classify_failure(status: StatusCode, body: &str) -> GenerationError {
    match status {
        StatusCode::TOO_MANY_REQUESTS => GenerationError::RateLimited {
            backend: BACKEND.to_string(),
        },
        StatusCode::PAYMENT_REQUIRED => GenerationError::PaymentRequired {
            backend: BACKEND.to_string(),
        },
        _ => GenerationError::RequestFailed {
            backend: BACKEND.to_string(),
            reason: format!("HTTP {}: {}", status, body.trim()),
        },
    }
}

/// Pull `choices[0].message.content` out of a completion body.
fn extract_content(raw: &str) -> Result<String, GenerationError> {
    let parsed: ChatResponse =
        serde_json::from_str(raw).map_err(|e| GenerationError::InvalidResponse {
            backend: BACKEND.to_string(),
            reason: e.to_string(),
        })?;

    let content = parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .unwrap_or_default();

    if content.trim().is_empty() {
        return Err(GenerationError::EmptyResponse {
            backend: BACKEND.to_string(),
        });
    }
    Ok(content)
}

#[async_trait]
impl ResponseGenerator for GatewayGenerator {
    fn name(&self) -> &str {
        BACKEND
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let body = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt(request.action).to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt(request),
                },
            ],
        };

        info!(action = %request.action, model = %self.config.model, "Calling generation gateway");

        let resp = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(self.config.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| GenerationError::RequestFailed {
                backend: BACKEND.to_string(),
                reason: e.to_string(),
            })?;

        let status = resp.status();
        let text = resp.text().await.map_err(|e| GenerationError::RequestFailed {
            backend: BACKEND.to_string(),
            reason: format!("Failed to read response body: {}", e),
        })?;

        if !status.is_success() {
            warn!(status = %status, "Generation gateway returned an error");
            return Err(classify_failure(status, &text));
        }

        extract_content(&text)
    }
}
