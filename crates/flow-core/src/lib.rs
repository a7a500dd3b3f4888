//! Conversation state machine core.
//!
//! Explicit states and symbolic events drive a guarded transition table;
//! business logic is injected as [`TransitionHandler`] trait objects, so
//! this crate knows nothing about agents or backend services.

pub mod engine;
pub mod error;
pub mod event;
pub mod handler;
pub mod session;
pub mod state;
pub mod transition;

pub use engine::{FlowEngine, FlowSummary, TransitionSummary};
pub use error::{EngineError, FlowError, HandlerError, ValidationError};
pub use event::{classify_user_input, FlowEvent, RESTART_PHRASES};
pub use handler::{
    HandlerOutcome, HandlerResult, HandlerSet, NextEvent, SharedHandler, TransitionHandler,
    TurnContext,
};
pub use session::{SessionState, SessionStore, MAX_FEEDBACK_ANSWERS};
pub use state::FlowState;
pub use transition::{Transition, TransitionGuard};
