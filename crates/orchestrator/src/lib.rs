//! Caller-side glue around the flow engine: configuration, validation,
//! the business-logic transition handlers, and the conversation
//! orchestrator that ties engine, agents, and backends together.

pub mod config;
pub mod handlers;
pub mod logging;
pub mod orchestrator;
pub mod validation;

pub use config::Settings;
pub use handlers::{handler_set, FlowHandlers, MATCH_DISTANCE_THRESHOLD};
pub use logging::init_tracing;
pub use orchestrator::{Orchestrator, SessionInfo};
pub use validation::{ValidationService, YesNo};
