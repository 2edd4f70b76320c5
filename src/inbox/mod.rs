//! Correspondence inbox: entity model, visible-list filter, status state
//! machine and the working-set store.

pub mod filter;
pub mod model;
pub mod seed;
pub mod store;
pub mod workflow;

pub use filter::{InboxFilter, Scope, visible};
pub use model::{
    Attachment, AttachmentKind, Correspondence, Department, DueState, Priority, Status, User,
};
pub use seed::{load_seed, parse_seed};
pub use store::{InboxCounts, InboxEvent, InboxStore};
pub use workflow::Transition;
