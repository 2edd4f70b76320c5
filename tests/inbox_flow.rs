//! Integration tests for the inbox desk.
//!
//! Each test loads a seed file from disk, builds a desk around a stub or
//! template generator, and drives it through the public command API.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use tokio::sync::broadcast;
use tokio::time::timeout;

use cityhall_inbox::compose::{
    ActionType, Composer, FixedClock, GenerationOutcome, GenerationRequest, ResponseGenerator,
    TemplateGenerator,
};
use cityhall_inbox::config::InboxConfig;
use cityhall_inbox::desk::{DeskCommand, DeskReply, InboxDesk};
use cityhall_inbox::error::{ComposeError, Error, GenerationError, WorkflowError};
use cityhall_inbox::inbox::{
    Department, InboxEvent, InboxFilter, InboxStore, Scope, Status, User, load_seed,
};

/// Maximum time any test is allowed to run before we consider it hung.
const TEST_TIMEOUT: Duration = Duration::from_secs(5);

const SEED: &str = r#"[
  {
    "id": "e1",
    "sender": "Jane Doe",
    "senderEmail": "jane@example.com",
    "recipient": "finance@cityhall.gov",
    "subject": "Permit Request",
    "body": "I would like to apply for a building permit.",
    "timestamp": "2024-01-01T10:00:00Z",
    "department": "finance",
    "status": "pending",
    "isRead": false,
    "priority": "high",
    "hasAttachments": true,
    "attachments": [
      {
        "id": "a1",
        "name": "plans.pdf",
        "size": 245760,
        "type": "application/pdf",
        "url": "/files/plans.pdf"
      }
    ],
    "dueDate": "2024-01-15"
  },
  {
    "id": "e2",
    "sender": "Bob Smith",
    "senderEmail": "bob@example.com",
    "recipient": "infrastructure@cityhall.gov",
    "subject": "Water leak on Main Street",
    "body": "There is a water leak near the library.",
    "timestamp": "2024-01-02T08:30:00Z",
    "department": "infrastructure",
    "status": "responded",
    "isRead": true,
    "hasAttachments": false
  },
  {
    "id": "e3",
    "sender": "Ann Lee",
    "senderEmail": "ann@example.com",
    "recipient": "finance@cityhall.gov",
    "subject": "Budget review",
    "body": "Please share the quarterly budget.",
    "timestamp": "2024-01-03T14:00:00Z",
    "department": "finance",
    "status": "pending",
    "isRead": false,
    "hasAttachments": true
  }
]"#;

/// Stub generator that echoes the request (no template rendering).
struct EchoGenerator;

#[async_trait]
impl ResponseGenerator for EchoGenerator {
    fn name(&self) -> &str {
        "echo"
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        Ok(format!("{} reply to {}", request.action, request.sender))
    }
}

/// Stub generator that is always unreachable.
struct DownGenerator;

#[async_trait]
impl ResponseGenerator for DownGenerator {
    fn name(&self) -> &str {
        "down"
    }

    async fn generate(&self, _request: &GenerationRequest) -> Result<String, GenerationError> {
        Err(GenerationError::RequestFailed {
            backend: "down".to_string(),
            reason: "connection refused".to_string(),
        })
    }
}

fn staff() -> User {
    User {
        id: "2".to_string(),
        name: "Finance Manager".to_string(),
        email: "finance@cityhall.gov".to_string(),
        department: Department::Finance,
    }
}

async fn desk_with(generator: Arc<dyn ResponseGenerator>) -> InboxDesk {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(SEED.as_bytes()).unwrap();

    let items = load_seed(file.path()).await.unwrap();
    let store = InboxStore::with_items(items).unwrap();
    InboxDesk::new(store, Composer::new(generator), staff())
}

fn template_generator() -> Arc<dyn ResponseGenerator> {
    let today = Utc.with_ymd_and_hms(2024, 3, 5, 12, 0, 0).unwrap();
    Arc::new(TemplateGenerator::new("City Hall").with_clock(Arc::new(FixedClock(today))))
}

/// Drain events until one matches, or fail after the test timeout.
async fn next_matching<F>(rx: &mut broadcast::Receiver<InboxEvent>, mut pred: F) -> InboxEvent
where
    F: FnMut(&InboxEvent) -> bool,
{
    timeout(TEST_TIMEOUT, async {
        loop {
            let event = rx.recv().await.unwrap();
            if pred(&event) {
                return event;
            }
        }
    })
    .await
    .expect("Timed out waiting for inbox event")
}

#[tokio::test]
async fn seed_loads_and_normalizes() {
    let desk = desk_with(Arc::new(EchoGenerator)).await;

    let e1 = desk.store().get("e1").await.unwrap();
    assert!(e1.has_attachments());
    assert_eq!(e1.attachments()[0].display_size(), "240 KB");
    assert!(e1.due_date.is_some());

    // The "e3" hint claims attachments but none are listed.
    let e3 = desk.store().get("e3").await.unwrap();
    assert!(!e3.has_attachments());
    assert!(!e3.has_attachments_hint());

    let counts = desk.counts().await;
    assert_eq!(counts.total, 3);
    assert_eq!(counts.unread, 2);
    assert_eq!(counts.pending, 2);
    assert_eq!(counts.responded, 1);
}

#[tokio::test]
async fn search_and_filters_narrow_the_list() {
    let desk = desk_with(Arc::new(EchoGenerator)).await;

    let reply = desk
        .dispatch(DeskCommand::SetFilter {
            filter: InboxFilter::new().with_query("WATER"),
        })
        .await
        .unwrap();
    let DeskReply::Visible { items } = reply else {
        panic!("Expected Visible");
    };
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].id, "e2");

    let visible = desk
        .set_filter(
            InboxFilter::new()
                .with_department(Department::Finance)
                .with_status(Status::Pending),
        )
        .await;
    let ids: Vec<_> = visible.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["e1", "e3"]);

    let filter = desk.filter().await;
    assert_eq!(filter.department, Scope::Only(Department::Finance));
}

#[tokio::test]
async fn full_reply_flow_broadcasts_changes() {
    let desk = desk_with(template_generator()).await;
    let mut rx = desk.store().subscribe();

    let item = desk.select("e1").await.unwrap();
    assert!(item.is_read);
    next_matching(&mut rx, |e| {
        matches!(e, InboxEvent::SelectionChanged { id: Some(id) } if id == "e1")
    })
    .await;

    desk.dispatch(DeskCommand::OpenCompose {
        id: "e1".to_string(),
        action: ActionType::Accept,
    })
    .await
    .unwrap();
    let outcome = timeout(TEST_TIMEOUT, desk.settle()).await.unwrap().unwrap();
    assert_eq!(outcome.unwrap(), GenerationOutcome::Applied);

    let reply = match desk.dispatch(DeskCommand::Send).await.unwrap() {
        DeskReply::Sent { reply } => reply,
        other => panic!("Expected Sent, got {other:?}"),
    };
    assert!(reply.draft.body.starts_with("Dear Jane Doe,"));
    assert!(reply.draft.body.contains("Permit Request"));
    assert!(reply.draft.body.ends_with("Finance Department\nMarch 5, 2024"));

    let event = next_matching(&mut rx, |e| {
        matches!(e, InboxEvent::ItemUpdated { item } if item.status == Status::Responded)
    })
    .await;
    if let InboxEvent::ItemUpdated { item } = event {
        assert_eq!(item.id, "e1");
    }

    let event = next_matching(&mut rx, |e| matches!(e, InboxEvent::Counts { .. })).await;
    if let InboxEvent::Counts { counts } = event {
        assert_eq!(counts.responded, 2);
        assert_eq!(counts.pending, 1);
    }
}

#[tokio::test]
async fn archived_items_cannot_be_answered() {
    let desk = desk_with(Arc::new(EchoGenerator)).await;

    desk.dispatch(DeskCommand::Archive { id: "e2".to_string() })
        .await
        .unwrap();
    // Archiving twice is harmless.
    let again = desk.archive("e2").await.unwrap().unwrap();
    assert_eq!(again.status, Status::Archived);

    desk.open_compose("e2", ActionType::Reject).await.unwrap();
    desk.settle().await.unwrap().unwrap();

    let err = desk.dispatch(DeskCommand::Send).await.unwrap_err();
    assert!(matches!(
        err,
        Error::Workflow(WorkflowError::InvalidTransition { ref id, .. }) if id == "e2"
    ));
    assert_eq!(desk.store().get("e2").await.unwrap().status, Status::Archived);
}

#[tokio::test]
async fn generation_failure_keeps_dialog_usable() {
    let desk = desk_with(Arc::new(DownGenerator)).await;

    let session = desk.open_compose("e3", ActionType::Acknowledge).await.unwrap();
    let result = desk.settle().await.unwrap();
    assert!(matches!(result, Err(ComposeError::GenerationFailed(_))));
    assert!(session.lock().await.last_error().unwrap().contains("connection refused"));

    // Nothing to send yet.
    let err = desk.send().await.unwrap_err();
    assert!(matches!(err, Error::Compose(ComposeError::EmptyDraft)));

    // Staff can still write the reply by hand.
    desk.dispatch(DeskCommand::EditDraft {
        recipient: None,
        subject: None,
        body: Some("We received your request.".to_string()),
    })
    .await
    .unwrap();
    let reply = desk.send().await.unwrap();
    assert_eq!(reply.item_id, "e3");
    assert_eq!(reply.draft.subject, "Re: Budget review");
    assert_eq!(desk.store().get("e3").await.unwrap().status, Status::Responded);
}

#[tokio::test]
async fn regenerate_replaces_draft() {
    let desk = desk_with(Arc::new(EchoGenerator)).await;

    desk.open_compose("e1", ActionType::Custom).await.unwrap();
    desk.settle().await.unwrap().unwrap();
    desk.edit_draft(None, None, Some("scratch".to_string()))
        .await
        .unwrap();

    desk.dispatch(DeskCommand::Regenerate).await.unwrap();
    desk.settle().await.unwrap().unwrap();

    let session = desk.active_session().await.unwrap();
    assert_eq!(session.lock().await.draft().body, "custom reply to Jane Doe");
}

#[tokio::test]
async fn desk_from_default_config_uses_templates() {
    let items = cityhall_inbox::inbox::parse_seed(SEED).unwrap();
    let desk = InboxDesk::from_config(&InboxConfig::default(), items).unwrap();
    assert_eq!(desk.user().email, "admin@cityhall.gov");

    desk.open_compose("e2", ActionType::Forward).await.unwrap();
    desk.settle().await.unwrap().unwrap();
    let reply = desk.send().await.unwrap();
    assert!(reply.draft.body.starts_with("Dear Colleague,"));
    assert!(reply.draft.body.contains("City Hall Infrastructure Department"));
}
