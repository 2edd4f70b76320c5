//! Inbox store: the working set of correspondence plus the current
//! selection, with change events broadcast to the presentation layer.
//!
//! This is the only place the collection is mutated. Everything else works
//! on cloned snapshots and hands lifecycle transitions to [`InboxStore::apply`]
//! or pure transformations to [`InboxStore::update_by_id`].
//!
//! Callers must only pass ids they got from the store. An unknown id is
//! ignored with a warning in release builds and panics in debug builds.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{RwLock, broadcast};
use tracing::{debug, info, warn};

use crate::error::{SeedError, WorkflowError};

use super::filter::InboxFilter;
use super::model::{Correspondence, Status};
use super::workflow::Transition;

/// Default broadcast channel capacity.
const DEFAULT_BROADCAST_CAPACITY: usize = 256;

/// Badge counts for the list header.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboxCounts {
    pub total: usize,
    pub unread: usize,
    pub pending: usize,
    pub responded: usize,
    pub forwarded: usize,
    pub closed: usize,
    pub archived: usize,
}

impl InboxCounts {
    fn tally(items: &[Correspondence]) -> Self {
        let mut counts = Self {
            total: items.len(),
            ..Default::default()
        };
        for item in items {
            if !item.is_read {
                counts.unread += 1;
            }
            match item.status {
                Status::Pending => counts.pending += 1,
                Status::Responded => counts.responded += 1,
                Status::Forwarded => counts.forwarded += 1,
                Status::Closed => counts.closed += 1,
                Status::Archived => counts.archived += 1,
            }
        }
        counts
    }
}

/// Change notifications. The presentation layer re-renders on each one.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboxEvent {
    /// The working set was replaced wholesale.
    Reloaded { count: usize },
    /// One item changed; carries the new snapshot.
    ItemUpdated { item: Correspondence },
    /// The selected id changed.
    SelectionChanged { id: Option<String> },
    /// Fresh badge counts, sent after every item change.
    Counts { counts: InboxCounts },
}

#[derive(Default)]
struct InboxState {
    items: Vec<Correspondence>,
    selected: Option<String>,
}

impl InboxState {
    fn position(&self, id: &str) -> Option<usize> {
        self.items.iter().position(|item| item.id == id)
    }
}

/// In-memory correspondence store guarded by a single lock.
pub struct InboxStore {
    state: RwLock<InboxState>,
    tx: broadcast::Sender<InboxEvent>,
}

impl InboxStore {
    /// Create an empty store.
    pub fn new() -> Arc<Self> {
        let (tx, _rx) = broadcast::channel(DEFAULT_BROADCAST_CAPACITY);
        Arc::new(Self {
            state: RwLock::new(InboxState::default()),
            tx,
        })
    }

    /// Create a store seeded with `items`.
    pub fn with_items(items: Vec<Correspondence>) -> Result<Arc<Self>, SeedError> {
        let items = prepare(items)?;
        let (tx, _rx) = broadcast::channel(DEFAULT_BROADCAST_CAPACITY);
        info!(count = items.len(), "Inbox store seeded");
        Ok(Arc::new(Self {
            state: RwLock::new(InboxState {
                items,
                selected: None,
            }),
            tx,
        }))
    }

    /// Subscribe to change events.
    pub fn subscribe(&self) -> broadcast::Receiver<InboxEvent> {
        self.tx.subscribe()
    }

    /// Replace the working set. Clears the selection if the selected id is
    /// no longer present.
    pub async fn load(&self, items: Vec<Correspondence>) -> Result<(), SeedError> {
        let items = prepare(items)?;
        let count = items.len();
        let counts = InboxCounts::tally(&items);

        let selection_dropped = {
            let mut state = self.state.write().await;
            state.items = items;
            let dropped = state
                .selected
                .as_deref()
                .is_some_and(|id| state.position(id).is_none());
            if dropped {
                state.selected = None;
            }
            dropped
        };

        info!(count, "Inbox reloaded");
        let _ = self.tx.send(InboxEvent::Reloaded { count });
        if selection_dropped {
            let _ = self.tx.send(InboxEvent::SelectionChanged { id: None });
        }
        let _ = self.tx.send(InboxEvent::Counts { counts });
        Ok(())
    }

    /// All items, in store order.
    pub async fn snapshot(&self) -> Vec<Correspondence> {
        self.state.read().await.items.clone()
    }

    /// Look up one item by id.
    pub async fn get(&self, id: &str) -> Option<Correspondence> {
        let state = self.state.read().await;
        state.position(id).map(|pos| state.items[pos].clone())
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.state.read().await.position(id).is_some()
    }

    /// The filtered, order-preserving list for display.
    pub async fn visible(&self, filter: &InboxFilter) -> Vec<Correspondence> {
        let state = self.state.read().await;
        filter.apply(&state.items).into_iter().cloned().collect()
    }

    pub async fn counts(&self) -> InboxCounts {
        InboxCounts::tally(&self.state.read().await.items)
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.items.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.read().await.items.is_empty()
    }

    /// Apply `mutator` to exactly the item with `id`. Returns the new
    /// snapshot, or `None` for an unknown id (nothing changes).
    pub async fn update_by_id<F>(&self, id: &str, mutator: F) -> Option<Correspondence>
    where
        F: FnOnce(&Correspondence) -> Correspondence,
    {
        let result: Result<_, std::convert::Infallible> =
            self.try_update_by_id(id, |item| Ok(mutator(item))).await;
        match result {
            Ok(updated) => updated,
            Err(never) => match never {},
        }
    }

    /// Fallible variant of [`update_by_id`](Self::update_by_id). On `Err`
    /// the item is left as it was.
    pub async fn try_update_by_id<F, E>(
        &self,
        id: &str,
        mutator: F,
    ) -> Result<Option<Correspondence>, E>
    where
        F: FnOnce(&Correspondence) -> Result<Correspondence, E>,
    {
        let (updated, counts) = {
            let mut state = self.state.write().await;
            let Some(pos) = state.position(id) else {
                unknown_id("Update", id);
                return Ok(None);
            };

            let current = &state.items[pos];
            let next = mutator(current)?;
            debug_assert_eq!(next.id, current.id, "mutator must not change the id");

            if next == *current {
                debug!(id = id, "Update left correspondence unchanged");
                return Ok(Some(next));
            }

            state.items[pos] = next.clone();
            (next, InboxCounts::tally(&state.items))
        };

        debug!(
            id = id,
            status = %updated.status,
            is_read = updated.is_read,
            "Correspondence updated"
        );
        let _ = self.tx.send(InboxEvent::ItemUpdated {
            item: updated.clone(),
        });
        let _ = self.tx.send(InboxEvent::Counts { counts });

        Ok(Some(updated))
    }

    /// Run one lifecycle transition against `id`. A rejected transition
    /// leaves the item as it was.
    pub async fn apply(
        &self,
        id: &str,
        transition: Transition,
    ) -> Result<Option<Correspondence>, WorkflowError> {
        debug!(id = id, transition = %transition, "Applying transition");
        self.try_update_by_id(id, |item| transition.apply(item)).await
    }

    /// Make `id` the selected item and mark it read. Returns the current
    /// snapshot of the selected item, or `None` for an unknown id, in which
    /// case the previous selection stays.
    pub async fn select(&self, id: &str) -> Option<Correspondence> {
        {
            let mut state = self.state.write().await;
            if state.position(id).is_none() {
                unknown_id("Select", id);
                return None;
            }
            if state.selected.as_deref() != Some(id) {
                state.selected = Some(id.to_string());
                let _ = self.tx.send(InboxEvent::SelectionChanged {
                    id: Some(id.to_string()),
                });
            }
        }

        match self.apply(id, Transition::MarkRead).await {
            Ok(item) => item,
            Err(e) => {
                warn!(id = id, error = %e, "Mark read rejected");
                None
            }
        }
    }

    /// The selected item as it is now, resolved by id.
    pub async fn selected(&self) -> Option<Correspondence> {
        let state = self.state.read().await;
        let id = state.selected.as_deref()?;
        state.position(id).map(|pos| state.items[pos].clone())
    }

    pub async fn selected_id(&self) -> Option<String> {
        self.state.read().await.selected.clone()
    }
}

/// Report an id the store has never held.
fn unknown_id(operation: &str, id: &str) {
    warn!(id = id, "{operation} for unknown correspondence id ignored");
    if cfg!(debug_assertions) {
        panic!("{operation} for unknown correspondence id {id:?}");
    }
}

/// Enforce id uniqueness and sync the attachment hint before items enter
/// the store.
fn prepare(mut items: Vec<Correspondence>) -> Result<Vec<Correspondence>, SeedError> {
    let mut seen = HashSet::new();
    for item in &mut items {
        if !seen.insert(item.id.clone()) {
            return Err(SeedError::DuplicateId {
                id: item.id.clone(),
            });
        }

        let mut attachment_ids = HashSet::new();
        for attachment in item.attachments() {
            if !attachment_ids.insert(attachment.id.as_str()) {
                return Err(SeedError::DuplicateAttachmentId {
                    id: item.id.clone(),
                    attachment_id: attachment.id.clone(),
                });
            }
        }

        if item.normalize_attachment_flag() {
            warn!(id = %item.id, "Stale hasAttachments flag corrected");
        }
    }
    Ok(items)
}
