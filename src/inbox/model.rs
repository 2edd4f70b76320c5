//! Correspondence data model: citizen emails, attachments, staff identity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Organizational unit that owns a piece of correspondence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Department {
    Administration,
    Finance,
    Social,
    Audit,
    Culture,
    Infrastructure,
}

impl Department {
    /// Every department, in display order.
    pub const ALL: [Department; 6] = [
        Self::Administration,
        Self::Finance,
        Self::Social,
        Self::Audit,
        Self::Culture,
        Self::Infrastructure,
    ];

    /// Wire identifier (e.g. `"finance"`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Administration => "administration",
            Self::Finance => "finance",
            Self::Social => "social",
            Self::Audit => "audit",
            Self::Culture => "culture",
            Self::Infrastructure => "infrastructure",
        }
    }

    /// Human-readable name: separators become spaces, each word capitalized.
    pub fn title(&self) -> String {
        title_case(self.as_str())
    }
}

impl std::fmt::Display for Department {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Department {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|d| d.as_str() == s)
            .ok_or_else(|| format!("Unknown department: {}", s))
    }
}

/// Lifecycle status of a correspondence item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Newly received, awaiting action.
    Pending,
    /// A reply was sent.
    Responded,
    /// Handed to another department.
    Forwarded,
    /// Closed without a reply.
    Closed,
    /// Filed away. Terminal.
    Archived,
}

impl Status {
    /// Every status, in display order.
    pub const ALL: [Status; 5] = [
        Self::Pending,
        Self::Responded,
        Self::Forwarded,
        Self::Closed,
        Self::Archived,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Responded => "responded",
            Self::Forwarded => "forwarded",
            Self::Closed => "closed",
            Self::Archived => "archived",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Status {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|st| st.as_str() == s)
            .ok_or_else(|| format!("Unknown status: {}", s))
    }
}

/// Handling priority assigned at intake.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Urgent,
    High,
    #[default]
    Normal,
    Low,
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Urgent => write!(f, "urgent"),
            Self::High => write!(f, "high"),
            Self::Normal => write!(f, "normal"),
            Self::Low => write!(f, "low"),
        }
    }
}

/// A file attached to a correspondence item. The URL is never fetched here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// Unique within the parent item.
    pub id: String,
    pub name: String,
    /// Size in bytes.
    pub size: u64,
    /// MIME type.
    #[serde(rename = "type")]
    pub mime_type: String,
    pub url: String,
}

/// Coarse file category, used to pick an icon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentKind {
    Image,
    Pdf,
    Other,
}

impl Attachment {
    pub fn kind(&self) -> AttachmentKind {
        if self.mime_type.starts_with("image/") {
            AttachmentKind::Image
        } else if self.mime_type.contains("pdf") {
            AttachmentKind::Pdf
        } else {
            AttachmentKind::Other
        }
    }

    /// Human-readable size: `"0 Bytes"`, `"1.5 KB"`, `"2.25 MB"`.
    pub fn display_size(&self) -> String {
        format_file_size(self.size)
    }
}

/// Format a byte count in base-1024 units, rounded to two decimals.
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut unit = 0;
    let mut value = bytes as f64;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rounded = (value * 100.0).round() / 100.0;
    format!("{} {}", rounded, UNITS[unit])
}

/// One inbound citizen email tracked by the inbox.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Correspondence {
    /// Opaque, stable, unique within the store.
    pub id: String,
    /// Sender display name.
    pub sender: String,
    /// Sender address (not validated).
    pub sender_email: String,
    pub recipient: String,
    pub subject: String,
    /// Free text, preserved verbatim.
    pub body: String,
    /// Instant of receipt.
    #[serde(deserialize_with = "crate::inbox::seed::deserialize_instant")]
    pub timestamp: DateTime<Utc>,
    pub department: Department,
    pub status: Status,
    pub is_read: bool,
    /// Cached "has attachments" flag from the data source. Only a hint;
    /// [`Correspondence::has_attachments`] is authoritative.
    #[serde(default)]
    has_attachments: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Vec<Attachment>>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(
        default,
        deserialize_with = "crate::inbox::seed::deserialize_optional_instant",
        skip_serializing_if = "Option::is_none"
    )]
    pub due_date: Option<DateTime<Utc>>,
}

impl Correspondence {
    /// Create a new unread, pending item with no attachments.
    pub fn new(
        id: impl Into<String>,
        sender: impl Into<String>,
        sender_email: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
        department: Department,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            sender: sender.into(),
            sender_email: sender_email.into(),
            recipient: String::new(),
            subject: subject.into(),
            body: body.into(),
            timestamp,
            department,
            status: Status::Pending,
            is_read: false,
            has_attachments: false,
            attachments: None,
            priority: Priority::default(),
            due_date: None,
        }
    }

    pub fn with_recipient(mut self, recipient: impl Into<String>) -> Self {
        self.recipient = recipient.into();
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_due_date(mut self, due_date: DateTime<Utc>) -> Self {
        self.due_date = Some(due_date);
        self
    }

    pub fn with_attachments(mut self, attachments: Vec<Attachment>) -> Self {
        self.attachments = Some(attachments);
        self.has_attachments = self.has_attachments();
        self
    }

    pub fn with_status(mut self, status: Status) -> Self {
        self.status = status;
        self
    }

    /// Whether the item carries at least one attachment, computed from the
    /// attachment list rather than the cached flag.
    pub fn has_attachments(&self) -> bool {
        self.attachments.as_ref().is_some_and(|a| !a.is_empty())
    }

    /// The flag as received from the data source.
    pub fn has_attachments_hint(&self) -> bool {
        self.has_attachments
    }

    /// Bring the cached flag back in line with the attachment list.
    /// Returns true if the hint was stale.
    pub fn normalize_attachment_flag(&mut self) -> bool {
        let actual = self.has_attachments();
        let stale = self.has_attachments != actual;
        self.has_attachments = actual;
        stale
    }

    pub fn attachments(&self) -> &[Attachment] {
        self.attachments.as_deref().unwrap_or_default()
    }

    /// Deadline relative to `now`, if the item has one.
    pub fn due_state(&self, now: DateTime<Utc>) -> Option<DueState> {
        self.due_date.map(|due| DueState::between(now, due))
    }
}

/// How a due date relates to the current moment, counted in whole days
/// rounded up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DueState {
    Overdue { days: i64 },
    DueToday,
    DueTomorrow,
    DueIn { days: i64 },
}

impl DueState {
    pub fn between(now: DateTime<Utc>, due: DateTime<Utc>) -> Self {
        const DAY_MS: i64 = 24 * 60 * 60 * 1000;
        let diff_ms = due.signed_duration_since(now).num_milliseconds();
        // ceil division that also rounds negative values toward zero
        let days = diff_ms.div_euclid(DAY_MS) + i64::from(diff_ms.rem_euclid(DAY_MS) != 0);

        match days {
            d if d < 0 => Self::Overdue { days: -d },
            0 => Self::DueToday,
            1 => Self::DueTomorrow,
            d => Self::DueIn { days: d },
        }
    }

    pub fn is_overdue(&self) -> bool {
        matches!(self, Self::Overdue { .. })
    }
}

impl std::fmt::Display for DueState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Overdue { days } => write!(f, "Overdue by {} days", days),
            Self::DueToday => write!(f, "Due today"),
            Self::DueTomorrow => write!(f, "Due tomorrow"),
            Self::DueIn { days } => write!(f, "Due in {} days", days),
        }
    }
}

/// The authenticated staff member. Supplied by the identity collaborator and
/// never mutated here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub department: Department,
}

/// Capitalize each word after turning `-` and `_` into spaces.
pub(crate) fn title_case(raw: &str) -> String {
    raw.split(['-', '_', ' '])
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
