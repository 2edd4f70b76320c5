//! City Hall Inbox: correspondence triage and reply drafting core.

pub mod compose;
pub mod config;
pub mod desk;
pub mod error;
pub mod inbox;

pub use error::{Error, Result};
