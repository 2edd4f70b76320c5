//! Inbox desk: the application state a presentation layer drives.
//!
//! The desk wires the store, the composer and the signed-in user together.
//! It tracks the current filter and at most one open compose session, and
//! turns [`DeskCommand`]s into store transitions and compose work. The store
//! stays the only writer of correspondence state.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};
use uuid::Uuid;

use crate::compose::{
    ActionType, Composer, Draft, GenerationOutcome, GenerationTask, SharedSession,
    unfilled_placeholders,
};
use crate::config::InboxConfig;
use crate::error::{ComposeError, Error, GenerationError, WorkflowError};
use crate::inbox::{Correspondence, InboxCounts, InboxFilter, InboxStore, Transition, User};

/// A reply that was sent and recorded against its correspondence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentReply {
    pub session_id: Uuid,
    pub item_id: String,
    pub action: ActionType,
    pub draft: Draft,
    /// Template placeholders still in the body. Sending is not blocked.
    pub warnings: Vec<String>,
    pub sent_at: DateTime<Utc>,
}

/// Intents from the presentation layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DeskCommand {
    /// Open an item in the detail pane.
    Select { id: String },
    /// Replace the list filter.
    SetFilter { filter: InboxFilter },
    /// Start a reply of the given kind.
    OpenCompose { id: String, action: ActionType },
    /// Change draft fields; absent fields stay as they are.
    EditDraft {
        #[serde(default)]
        recipient: Option<String>,
        #[serde(default)]
        subject: Option<String>,
        #[serde(default)]
        body: Option<String>,
    },
    /// Ask the generator for a new draft body.
    Regenerate,
    /// Send the open draft.
    Send,
    /// Dismiss the compose dialog without sending.
    CloseCompose,
    /// File an item away.
    Archive { id: String },
}

/// Result of a dispatched command.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DeskReply {
    Selected { item: Option<Correspondence> },
    Visible { items: Vec<Correspondence> },
    ComposeOpened { session_id: Uuid, draft: Draft },
    DraftUpdated { draft: Draft },
    Regenerating { session_id: Uuid },
    Sent { reply: SentReply },
    ComposeClosed,
    Archived { item: Option<Correspondence> },
}

/// The open compose dialog.
struct ActiveCompose {
    session: SharedSession,
    /// Latest generation spawned for the session.
    generation: Option<GenerationTask>,
}

pub struct InboxDesk {
    store: Arc<InboxStore>,
    composer: Composer,
    user: User,
    filter: RwLock<InboxFilter>,
    active: Mutex<Option<ActiveCompose>>,
}

impl InboxDesk {
    pub fn new(store: Arc<InboxStore>, composer: Composer, user: User) -> Self {
        Self {
            store,
            composer,
            user,
            filter: RwLock::new(InboxFilter::default()),
            active: Mutex::new(None),
        }
    }

    /// Seed a store with `items` and wire it to the configured generator.
    pub fn from_config(config: &InboxConfig, items: Vec<Correspondence>) -> Result<Self, Error> {
        let store = InboxStore::with_items(items)?;
        let composer = Composer::new(config.build_generator()?);
        info!(
            user = %config.user.email,
            backend = composer.generator_name(),
            "Inbox desk ready"
        );
        Ok(Self::new(store, composer, config.user.clone()))
    }

    pub fn store(&self) -> &Arc<InboxStore> {
        &self.store
    }

    pub fn user(&self) -> &User {
        &self.user
    }

    pub async fn filter(&self) -> InboxFilter {
        self.filter.read().await.clone()
    }

    /// Replace the filter and return the new visible list.
    pub async fn set_filter(&self, filter: InboxFilter) -> Vec<Correspondence> {
        *self.filter.write().await = filter;
        self.visible().await
    }

    /// The visible list under the current filter.
    pub async fn visible(&self) -> Vec<Correspondence> {
        let filter = self.filter.read().await.clone();
        self.store.visible(&filter).await
    }

    pub async fn counts(&self) -> InboxCounts {
        self.store.counts().await
    }

    /// Select `id` and mark it read. Ids arrive from the presentation
    /// layer, so an unknown one is rejected here rather than in the store.
    pub async fn select(&self, id: &str) -> Option<Correspondence> {
        if !self.store.contains(id).await {
            warn!(id = id, "Select for unknown correspondence id");
            return None;
        }
        self.store.select(id).await
    }

    pub async fn selected(&self) -> Option<Correspondence> {
        self.store.selected().await
    }

    /// Archive `id`. Archiving an archived item changes nothing. An
    /// unknown id yields `Ok(None)`.
    pub async fn archive(&self, id: &str) -> Result<Option<Correspondence>, WorkflowError> {
        if !self.store.contains(id).await {
            warn!(id = id, "Archive for unknown correspondence id");
            return Ok(None);
        }
        let Some(item) = self.store.apply(id, Transition::Archive).await? else {
            return Ok(None);
        };
        info!(id = %item.id, user = %self.user.email, "Correspondence archived");
        Ok(Some(item))
    }

    /// Open a fresh compose session for `id`, replacing any open one, and
    /// start generating its draft.
    pub async fn open_compose(
        &self,
        id: &str,
        action: ActionType,
    ) -> Result<SharedSession, ComposeError> {
        let item = self
            .store
            .get(id)
            .await
            .ok_or_else(|| ComposeError::UnknownItem { id: id.to_string() })?;

        let handle = self.composer.open(&item, action)?;
        let previous = self.active.lock().await.replace(ActiveCompose {
            session: handle.session.clone(),
            generation: Some(handle.generation),
        });
        if let Some(previous) = previous {
            previous.session.lock().await.close();
        }

        Ok(handle.session)
    }

    pub async fn active_session(&self) -> Option<SharedSession> {
        self.active
            .lock()
            .await
            .as_ref()
            .map(|active| active.session.clone())
    }

    /// Start a new generation for the open session.
    pub async fn regenerate(&self) -> Result<Uuid, ComposeError> {
        let mut active = self.active.lock().await;
        let active = active.as_mut().ok_or(ComposeError::NoActiveSession)?;

        let task = self.composer.regenerate(&active.session).await?;
        active.generation = Some(task);

        let session_id = active.session.lock().await.id();
        info!(session_id = %session_id, "Regenerating draft");
        Ok(session_id)
    }

    /// Wait for the open session's latest generation to finish.
    ///
    /// `None` when nothing is open or the latest result was already collected.
    pub async fn settle(&self) -> Option<Result<GenerationOutcome, ComposeError>> {
        let task = self.active.lock().await.as_mut()?.generation.take()?;
        let result = task.await.unwrap_or_else(|e| {
            Err(ComposeError::GenerationFailed(GenerationError::RequestFailed {
                backend: self.composer.generator_name().to_string(),
                reason: format!("Generation task failed: {}", e),
            }))
        });
        Some(result)
    }

    /// Edit the open draft.
    pub async fn edit_draft(
        &self,
        recipient: Option<String>,
        subject: Option<String>,
        body: Option<String>,
    ) -> Result<Draft, ComposeError> {
        let session = self.active_session().await.ok_or(ComposeError::NoActiveSession)?;
        let mut session = session.lock().await;
        if let Some(recipient) = recipient {
            session.set_recipient(recipient);
        }
        if let Some(subject) = subject {
            session.set_subject(subject);
        }
        if let Some(body) = body {
            session.set_body(body);
        }
        Ok(session.draft().clone())
    }

    /// Send the open draft. On success the dialog closes.
    pub async fn send(&self) -> Result<SentReply, Error> {
        let session = self.active_session().await.ok_or(ComposeError::NoActiveSession)?;
        let reply = self.send_session(&session).await?;

        let mut active = self.active.lock().await;
        if active
            .as_ref()
            .is_some_and(|a| Arc::ptr_eq(&a.session, &session))
        {
            *active = None;
        }
        Ok(reply)
    }

    /// Send `session`'s draft and record the response on its item.
    ///
    /// A blank body fails with `EmptyDraft` before anything changes. An
    /// archived item fails with `InvalidTransition` and the session stays
    /// open.
    pub async fn send_session(&self, session: &SharedSession) -> Result<SentReply, Error> {
        let mut session = session.lock().await;
        let draft = session.ready_to_send()?.clone();
        let item_id = session.item_id().to_string();

        if !self.store.contains(&item_id).await {
            return Err(ComposeError::UnknownItem { id: item_id }.into());
        }
        let updated = self
            .store
            .apply(&item_id, Transition::Respond)
            .await
            .inspect_err(|e| warn!(id = %item_id, error = %e, "Send rejected"))?;
        if updated.is_none() {
            return Err(ComposeError::UnknownItem { id: item_id }.into());
        }

        let warnings = unfilled_placeholders(&draft.body);
        if !warnings.is_empty() {
            warn!(
                id = %item_id,
                placeholders = warnings.len(),
                "Reply sent with unfilled placeholders"
            );
        }

        session.close();
        let reply = SentReply {
            session_id: session.id(),
            item_id,
            action: session.action(),
            draft,
            warnings,
            sent_at: Utc::now(),
        };

        info!(
            id = %reply.item_id,
            action = %reply.action,
            recipient = %reply.draft.recipient,
            user = %self.user.email,
            "Reply sent"
        );
        Ok(reply)
    }

    /// Dismiss the compose dialog. Any in-flight generation is dropped.
    pub async fn close_compose(&self) {
        if let Some(active) = self.active.lock().await.take() {
            active.session.lock().await.close();
        }
    }

    /// Apply one command from the presentation layer.
    pub async fn dispatch(&self, command: DeskCommand) -> Result<DeskReply, Error> {
        let reply = match command {
            DeskCommand::Select { id } => DeskReply::Selected {
                item: self.select(&id).await,
            },
            DeskCommand::SetFilter { filter } => DeskReply::Visible {
                items: self.set_filter(filter).await,
            },
            DeskCommand::OpenCompose { id, action } => {
                let session = self.open_compose(&id, action).await?;
                let session = session.lock().await;
                DeskReply::ComposeOpened {
                    session_id: session.id(),
                    draft: session.draft().clone(),
                }
            }
            DeskCommand::EditDraft {
                recipient,
                subject,
                body,
            } => DeskReply::DraftUpdated {
                draft: self.edit_draft(recipient, subject, body).await?,
            },
            DeskCommand::Regenerate => DeskReply::Regenerating {
                session_id: self.regenerate().await?,
            },
            DeskCommand::Send => DeskReply::Sent {
                reply: self.send().await?,
            },
            DeskCommand::CloseCompose => {
                self.close_compose().await;
                DeskReply::ComposeClosed
            }
            DeskCommand::Archive { id } => DeskReply::Archived {
                item: self.archive(&id).await?,
            },
        };
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::TemplateGenerator;
    use crate::inbox::{Department, Status};
    use chrono::TimeZone;

    fn user() -> User {
        User {
            id: "1".to_string(),
            name: "Admin User".to_string(),
            email: "admin@cityhall.gov".to_string(),
            department: Department::Administration,
        }
    }

    fn items() -> Vec<Correspondence> {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
        vec![
            Correspondence::new(
                "e1",
                "Jane Doe",
                "jane@example.com",
                "Permit Request",
                "Can I build a shed?",
                Department::Finance,
                at,
            ),
            Correspondence::new(
                "e2",
                "Bob",
                "bob@example.com",
                "Water leak",
                "Main street is flooded",
                Department::Infrastructure,
                at,
            )
            .with_status(Status::Responded),
        ]
    }

    fn desk() -> InboxDesk {
        let store = InboxStore::with_items(items()).unwrap();
        let composer = Composer::new(Arc::new(TemplateGenerator::new("City Hall")));
        InboxDesk::new(store, composer, user())
    }

    #[tokio::test]
    async fn compose_and_send_marks_responded() {
        let desk = desk();
        desk.open_compose("e1", ActionType::Accept).await.unwrap();
        assert_eq!(desk.settle().await.unwrap().unwrap(), GenerationOutcome::Applied);

        let reply = desk.send().await.unwrap();
        assert_eq!(reply.item_id, "e1");
        assert_eq!(reply.draft.recipient, "jane@example.com");
        assert_eq!(reply.draft.subject, "Re: Permit Request");
        assert!(reply.draft.body.starts_with("Dear Jane Doe,"));
        assert!(reply.warnings.is_empty());

        assert_eq!(desk.store().get("e1").await.unwrap().status, Status::Responded);
        assert!(desk.active_session().await.is_none());
    }

    #[tokio::test]
    async fn archive_then_send_is_rejected() {
        let desk = desk();
        let archived = desk.archive("e2").await.unwrap().unwrap();
        assert_eq!(archived.status, Status::Archived);

        let session = desk.open_compose("e2", ActionType::Acknowledge).await.unwrap();
        desk.settle().await.unwrap().unwrap();

        let err = desk.send().await.unwrap_err();
        assert!(matches!(
            err,
            Error::Workflow(WorkflowError::InvalidTransition {
                from: Status::Archived,
                to: Status::Responded,
                ..
            })
        ));
        assert_eq!(desk.store().get("e2").await.unwrap().status, Status::Archived);
        assert!(!session.lock().await.is_closed());
        assert!(desk.active_session().await.is_some());
    }

    #[tokio::test]
    async fn commands_for_unknown_ids_are_ignored() {
        let desk = desk();
        let before = desk.store().snapshot().await;

        let reply = desk
            .dispatch(DeskCommand::Select { id: "missing".to_string() })
            .await
            .unwrap();
        assert!(matches!(reply, DeskReply::Selected { item: None }));

        let reply = desk
            .dispatch(DeskCommand::Archive { id: "missing".to_string() })
            .await
            .unwrap();
        assert!(matches!(reply, DeskReply::Archived { item: None }));

        assert_eq!(desk.store().snapshot().await, before);
        assert!(desk.selected().await.is_none());
    }

    #[tokio::test]
    async fn blank_draft_is_rejected_before_transition() {
        let desk = desk();
        desk.open_compose("e1", ActionType::Accept).await.unwrap();
        desk.settle().await;
        desk.edit_draft(None, None, Some("   ".to_string())).await.unwrap();

        let err = desk.send().await.unwrap_err();
        assert!(matches!(err, Error::Compose(ComposeError::EmptyDraft)));
        assert_eq!(desk.store().get("e1").await.unwrap().status, Status::Pending);
    }

    #[tokio::test]
    async fn placeholders_are_reported_on_send() {
        let desk = desk();
        desk.open_compose("e1", ActionType::RequestInfo).await.unwrap();
        desk.settle().await.unwrap().unwrap();

        let reply = desk.send().await.unwrap();
        assert_eq!(reply.warnings.len(), 3);
        assert_eq!(reply.warnings[0], "[Please specify the required documentation]");
    }

    #[tokio::test]
    async fn opening_compose_replaces_previous_session() {
        let desk = desk();
        let first = desk.open_compose("e1", ActionType::Accept).await.unwrap();
        let second = desk.open_compose("e1", ActionType::Reject).await.unwrap();

        assert!(first.lock().await.is_closed());
        desk.settle().await.unwrap().unwrap();
        assert!(second.lock().await.draft().body.contains("unable to accommodate"));
    }

    #[tokio::test]
    async fn compose_for_unknown_item_fails() {
        let desk = desk();
        let err = desk.open_compose("missing", ActionType::Accept).await.unwrap_err();
        assert!(matches!(err, ComposeError::UnknownItem { ref id } if id == "missing"));
        assert!(matches!(desk.regenerate().await, Err(ComposeError::NoActiveSession)));
        assert!(desk.settle().await.is_none());
    }

    #[tokio::test]
    async fn filter_drives_visible_list() {
        let desk = desk();
        let visible = desk.set_filter(InboxFilter::new().with_query("water")).await;
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].id, "e2");
        assert_eq!(desk.visible().await.len(), 1);

        desk.set_filter(InboxFilter::default()).await;
        assert_eq!(desk.visible().await.len(), 2);
    }

    #[tokio::test]
    async fn close_compose_drops_session() {
        let desk = desk();
        let session = desk.open_compose("e1", ActionType::Custom).await.unwrap();
        desk.close_compose().await;
        assert!(session.lock().await.is_closed());
        assert!(desk.active_session().await.is_none());
        assert!(matches!(
            desk.edit_draft(None, None, Some("x".into())).await,
            Err(ComposeError::NoActiveSession)
        ));
    }

    #[tokio::test]
    async fn dispatch_runs_commands() {
        let desk = desk();

        let reply = desk
            .dispatch(DeskCommand::Select { id: "e1".to_string() })
            .await
            .unwrap();
        match reply {
            DeskReply::Selected { item: Some(item) } => assert!(item.is_read),
            other => panic!("Expected Selected, got {other:?}"),
        }

        let reply = desk
            .dispatch(DeskCommand::OpenCompose {
                id: "e1".to_string(),
                action: ActionType::Forward,
            })
            .await
            .unwrap();
        assert!(matches!(reply, DeskReply::ComposeOpened { .. }));
        desk.settle().await.unwrap().unwrap();

        desk.dispatch(DeskCommand::EditDraft {
            recipient: Some("roads@cityhall.gov".to_string()),
            subject: None,
            body: None,
        })
        .await
        .unwrap();

        let reply = desk.dispatch(DeskCommand::Send).await.unwrap();
        match reply {
            DeskReply::Sent { reply } => {
                assert_eq!(reply.draft.recipient, "roads@cityhall.gov");
                assert!(reply.draft.body.starts_with("Dear Colleague,"));
            }
            other => panic!("Expected Sent, got {other:?}"),
        }

        let reply = desk
            .dispatch(DeskCommand::Archive { id: "e1".to_string() })
            .await
            .unwrap();
        match reply {
            DeskReply::Archived { item: Some(item) } => assert_eq!(item.status, Status::Archived),
            other => panic!("Expected Archived, got {other:?}"),
        }
    }

    #[test]
    fn command_serde_uses_type_tag() {
        let json = r#"{"type":"open_compose","id":"e1","action":"request-info"}"#;
        let command: DeskCommand = serde_json::from_str(json).unwrap();
        match command {
            DeskCommand::OpenCompose { id, action } => {
                assert_eq!(id, "e1");
                assert_eq!(action, ActionType::RequestInfo);
            }
            other => panic!("Expected OpenCompose, got {other:?}"),
        }

        let command: DeskCommand =
            serde_json::from_str(r#"{"type":"edit_draft","body":"hi"}"#).unwrap();
        assert!(matches!(command, DeskCommand::EditDraft { body: Some(_), recipient: None, .. }));

        let json = serde_json::to_string(&DeskCommand::Regenerate).unwrap();
        assert_eq!(json, r#"{"type":"regenerate"}"#);
    }
}
