//! Lume Match - interaction and match engine for the Lume dating app
//!
//! Records like/dislike signals, detects mutual matches atomically, gates
//! messaging on match state, handles unmatching, and keeps block lists and
//! reports. Candidate discovery consumes the exclusion set this crate exposes.

pub mod config;
pub mod core;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use crate::core::{Engine, EngineLimits, RetryPolicy};
pub use error::EngineError;
pub use models::{Interaction, InteractionOutcome, InteractionState, Message, Report, Signal};
