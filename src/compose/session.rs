//! Compose session state.
//!
//! A session owns one draft and a per-session generation counter. Every
//! generation request takes a fresh sequence number; only the response
//! carrying the latest number may write the body.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{ComposeError, GenerationError};
use crate::inbox::Correspondence;

use super::action::ActionType;
use super::generator::GenerationRequest;

/// Bracketed template placeholders such as `[Additional details needed]`.
static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[[^\[\]\n]{2,}\]").unwrap());

/// Editable reply fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Draft {
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

/// A generation request that has been issued and is waiting for its answer.
#[derive(Debug, Clone)]
pub struct GenerationTicket {
    pub session_id: Uuid,
    pub seq: u64,
    pub request: GenerationRequest,
}

/// What happened to a generation response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationOutcome {
    /// The response became the draft body.
    Applied,
    /// A newer request, an edit or a close superseded it.
    Discarded,
}

#[derive(Debug, Clone)]
pub struct ComposeSession {
    id: Uuid,
    item_id: String,
    action: ActionType,
    request: GenerationRequest,
    draft: Draft,
    /// Highest sequence number handed out so far.
    issued: u64,
    /// Sequence number whose response is still wanted.
    pending: Option<u64>,
    last_error: Option<String>,
    closed: bool,
}

impl ComposeSession {
    /// Fresh session for `item`. Never inherits an earlier draft.
    pub fn new(item: &Correspondence, action: ActionType) -> Self {
        Self {
            id: Uuid::new_v4(),
            item_id: item.id.clone(),
            action,
            request: GenerationRequest::from_item(item, action),
            draft: Draft {
                recipient: item.sender_email.clone(),
                subject: format!("Re: {}", item.subject),
                body: String::new(),
            },
            issued: 0,
            pending: None,
            last_error: None,
            closed: false,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn item_id(&self) -> &str {
        &self.item_id
    }

    pub fn action(&self) -> ActionType {
        self.action
    }

    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    pub fn is_generating(&self) -> bool {
        self.pending.is_some()
    }

    /// Message from the most recent failed generation, cleared on the next request.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Issue a new generation request. Any earlier request still in flight
    /// becomes stale.
    pub fn begin_generation(&mut self) -> Result<GenerationTicket, ComposeError> {
        self.ensure_open()?;

        self.issued += 1;
        self.pending = Some(self.issued);
        self.last_error = None;

        debug!(
            session_id = %self.id,
            seq = self.issued,
            action = %self.action,
            "Issued generation request"
        );
        Ok(GenerationTicket {
            session_id: self.id,
            seq: self.issued,
            request: self.request.clone(),
        })
    }

    /// Post a generation response back into the session.
    ///
    /// Stale responses are dropped with `Ok(Discarded)`. A failure of the
    /// current request leaves the body untouched and comes back as
    /// [`ComposeError::GenerationFailed`]; the session stays usable.
    pub fn complete_generation(
        &mut self,
        seq: u64,
        result: Result<String, GenerationError>,
    ) -> Result<GenerationOutcome, ComposeError> {
        if self.closed || self.pending != Some(seq) {
            debug!(
                session_id = %self.id,
                seq,
                latest = self.issued,
                "Discarding stale generation response"
            );
            return Ok(GenerationOutcome::Discarded);
        }
        self.pending = None;

        match result {
            Ok(text) => {
                debug!(
                    session_id = %self.id,
                    seq,
                    chars = text.len(),
                    "Applied generation response"
                );
                self.draft.body = text;
                Ok(GenerationOutcome::Applied)
            }
            Err(e) => {
                warn!(session_id = %self.id, seq, error = %e, "Generation failed");
                self.last_error = Some(e.to_string());
                Err(ComposeError::GenerationFailed(e))
            }
        }
    }

    pub fn set_recipient(&mut self, recipient: impl Into<String>) {
        self.draft.recipient = recipient.into();
    }

    pub fn set_subject(&mut self, subject: impl Into<String>) {
        self.draft.subject = subject.into();
    }

    /// Replace the body. A response still in flight will not overwrite it.
    pub fn set_body(&mut self, body: impl Into<String>) {
        if self.pending.take().is_some() {
            debug!(
                session_id = %self.id,
                "Body edited during generation, in-flight response dropped"
            );
        }
        self.draft.body = body.into();
    }

    pub fn can_send(&self) -> bool {
        !self.closed && !self.draft.body.trim().is_empty()
    }

    /// Check the draft is sendable and return it.
    pub fn ready_to_send(&self) -> Result<&Draft, ComposeError> {
        self.ensure_open()?;
        if self.draft.body.trim().is_empty() {
            return Err(ComposeError::EmptyDraft);
        }
        Ok(&self.draft)
    }

    pub fn close(&mut self) {
        self.closed = true;
        self.pending = None;
    }

    fn ensure_open(&self) -> Result<(), ComposeError> {
        if self.closed {
            return Err(ComposeError::SessionClosed {
                session_id: self.id,
            });
        }
        Ok(())
    }
}

/// Distinct bracketed placeholders left in `body`, in order of appearance.
pub fn unfilled_placeholders(body: &str) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();
    for m in PLACEHOLDER.find_iter(body) {
        let text = m.as_str();
        if !found.iter().any(|f| f == text) {
            found.push(text.to_string());
        }
    }
    found
}
