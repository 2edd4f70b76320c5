//! Correspondence state machine: read flag and lifecycle status.
//!
//! Only three transitions are driven from here: marking an item read,
//! recording a sent response, and archiving. Every transition is a pure
//! function from one snapshot to the next; the store applies the result.

use crate::error::WorkflowError;

use super::model::{Correspondence, Status};

impl Status {
    /// Edges of the lifecycle graph. `Archived` is terminal.
    pub fn can_transition_to(&self, target: Status) -> bool {
        use Status::*;

        matches!(
            (self, target),
            (Pending, Responded) | (Pending, Forwarded) | (Pending, Closed) | (Pending, Archived) |
            (Responded, Archived) |
            (Forwarded, Archived) |
            (Closed, Archived)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Archived)
    }
}

/// A core-driven change to one item, applied through
/// [`InboxStore::apply`](super::InboxStore::apply).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The item was opened.
    MarkRead,
    /// A reply was sent.
    Respond,
    /// The item was filed away.
    Archive,
}

impl Transition {
    /// Compute the next snapshot. Identity when the transition has nothing
    /// to change (already read, already archived).
    pub fn apply(self, item: &Correspondence) -> Result<Correspondence, WorkflowError> {
        match self {
            Self::MarkRead => Ok(mark_read(item)),
            Self::Respond => respond(item),
            Self::Archive => Ok(archive(item)),
        }
    }
}

impl std::fmt::Display for Transition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MarkRead => write!(f, "mark_read"),
            Self::Respond => write!(f, "respond"),
            Self::Archive => write!(f, "archive"),
        }
    }
}

/// Set the read flag. Never clears it; status is untouched.
pub fn mark_read(item: &Correspondence) -> Correspondence {
    let mut next = item.clone();
    next.is_read = true;
    next
}

/// Record a sent response. Allowed from every status except `Archived`,
/// so re-replying to a forwarded or closed item reopens it as responded.
pub fn respond(item: &Correspondence) -> Result<Correspondence, WorkflowError> {
    if item.status.is_terminal() {
        return Err(WorkflowError::InvalidTransition {
            id: item.id.clone(),
            from: item.status,
            to: Status::Responded,
        });
    }

    let mut next = item.clone();
    next.status = Status::Responded;
    Ok(next)
}

/// File the item. Archiving an archived item is a no-op.
pub fn archive(item: &Correspondence) -> Correspondence {
    let mut next = item.clone();
    if item.status.can_transition_to(Status::Archived) {
        next.status = Status::Archived;
    }
    next
}
