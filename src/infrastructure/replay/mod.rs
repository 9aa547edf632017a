//! Offline replay of channel sessions against in-memory adapters.

pub mod error;
pub mod message_service;
pub mod render;
pub mod runner;
pub mod script;
pub mod transport;

pub use error::{ReplayError, ReplayResult};
pub use message_service::{InMemoryMessageService, Operation};
pub use render::{render_report, render_threads};
pub use runner::{ReplayReport, ReplayRunner, StepRecord};
pub use script::{ReplayScript, ReplayStep, ScriptUser};
pub use transport::LoopbackTransport;
