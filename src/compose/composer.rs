//! Composer: opens compose sessions and runs generation off the session lock.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::info;

use crate::error::ComposeError;
use crate::inbox::Correspondence;

use super::action::ActionType;
use super::generator::ResponseGenerator;
use super::session::{ComposeSession, GenerationOutcome, GenerationTicket};

/// A compose session shared between the desk and its generation tasks.
pub type SharedSession = Arc<Mutex<ComposeSession>>;

/// A spawned generation; resolves once its response has been posted back.
pub type GenerationTask = JoinHandle<Result<GenerationOutcome, ComposeError>>;

/// A freshly opened session plus the generation it started.
pub struct ComposeHandle {
    pub session: SharedSession,
    pub generation: GenerationTask,
}

#[derive(Clone)]
pub struct Composer {
    generator: Arc<dyn ResponseGenerator>,
}

impl Composer {
    pub fn new(generator: Arc<dyn ResponseGenerator>) -> Self {
        Self { generator }
    }

    pub fn generator_name(&self) -> &str {
        self.generator.name()
    }

    /// Open a new session for `item` and start generating its first draft.
    pub fn open(
        &self,
        item: &Correspondence,
        action: ActionType,
    ) -> Result<ComposeHandle, ComposeError> {
        let mut session = ComposeSession::new(item, action);
        let ticket = session.begin_generation()?;

        info!(
            id = %item.id,
            action = %action,
            session_id = %ticket.session_id,
            backend = self.generator.name(),
            "Opened compose session"
        );

        let session = Arc::new(Mutex::new(session));
        let generation = self.spawn_ticket(session.clone(), ticket);
        Ok(ComposeHandle { session, generation })
    }

    /// Issue a new request in the background. Earlier requests become stale.
    pub async fn regenerate(
        &self,
        session: &SharedSession,
    ) -> Result<GenerationTask, ComposeError> {
        let ticket = session.lock().await.begin_generation()?;
        Ok(self.spawn_ticket(session.clone(), ticket))
    }

    /// Issue a new request and wait for it. The session lock is not held
    /// while the generator runs.
    pub async fn generate(
        &self,
        session: &SharedSession,
    ) -> Result<GenerationOutcome, ComposeError> {
        let ticket = session.lock().await.begin_generation()?;
        let result = self.generator.generate(&ticket.request).await;
        session.lock().await.complete_generation(ticket.seq, result)
    }

    fn spawn_ticket(&self, session: SharedSession, ticket: GenerationTicket) -> GenerationTask {
        let generator = self.generator.clone();
        tokio::spawn(async move {
            let result = generator.generate(&ticket.request).await;
            session.lock().await.complete_generation(ticket.seq, result)
        })
    }
}
