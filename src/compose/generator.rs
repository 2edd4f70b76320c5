//! Response generation: the swappable text source behind the composer.
//!
//! A generator turns a [`GenerationRequest`] into reply text. The template
//! backend renders fixed letters locally; the gateway backend asks a
//! chat-completions model. Nothing else in the crate knows which one is in use.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::GenerationError;
use crate::inbox::{Correspondence, Department};

use super::action::ActionType;
use super::templates;

/// Everything a generator may use to write a reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub sender: String,
    pub sender_email: String,
    pub subject: String,
    pub body: String,
    #[serde(rename = "actionType")]
    pub action: ActionType,
    /// Owning department, used for the letter signature.
    pub department: Department,
    /// When the original email arrived.
    pub received_at: DateTime<Utc>,
}

impl GenerationRequest {
    pub fn from_item(item: &Correspondence, action: ActionType) -> Self {
        Self {
            sender: item.sender.clone(),
            sender_email: item.sender_email.clone(),
            subject: item.subject.clone(),
            body: item.body.clone(),
            action,
            department: item.department,
            received_at: item.timestamp,
        }
    }
}

/// Source of reply text.
#[async_trait]
pub trait ResponseGenerator: Send + Sync {
    /// Backend name, for logs and errors.
    fn name(&self) -> &str;

    /// Produce the reply body. May suspend for an arbitrary time.
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError>;
}

/// Wall-clock source, replaceable in tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The real clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock stuck at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Renders the built-in letter templates, optionally after a delay.
pub struct TemplateGenerator {
    organization: String,
    latency: Duration,
    clock: Arc<dyn Clock>,
}

impl TemplateGenerator {
    pub fn new(organization: impl Into<String>) -> Self {
        Self {
            organization: organization.into(),
            latency: Duration::ZERO,
            clock: Arc::new(SystemClock),
        }
    }

    /// Wait this long before answering, to mimic a remote backend.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

#[async_trait]
impl ResponseGenerator for TemplateGenerator {
    fn name(&self) -> &str {
        "template"
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let text = templates::render(request, &self.organization, self.clock.now());
        debug!(action = %request.action, chars = text.len(), "Rendered template reply");
        Ok(text)
    }
}
