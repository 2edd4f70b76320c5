//! Response composer: action types, reply templates, generation backends
//! and compose sessions.

pub mod action;
pub mod composer;
pub mod gateway;
pub mod generator;
pub mod session;
pub mod templates;

pub use action::ActionType;
pub use composer::{ComposeHandle, Composer, GenerationTask, SharedSession};
pub use gateway::{GatewayConfig, GatewayGenerator};
pub use generator::{
    Clock, FixedClock, GenerationRequest, ResponseGenerator, SystemClock, TemplateGenerator,
};
pub use session::{
    ComposeSession, Draft, GenerationOutcome, GenerationTicket, unfilled_placeholders,
};
