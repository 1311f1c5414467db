//! Agent cortex
//!
//! An autonomous decision-making agent that:
//! - Classifies free-text tasks into operational domains via a structured completion
//! - Dispatches each task to the domain's handler, falling back when a domain is unknown
//! - Scores market snapshots with configurable strategy tables (the playbook)
//! - Records every interaction in a short-term window and a long-term backend
//!
//! FLOW:
//! TASK → CLASSIFY → DISPATCH → (CAPABILITIES / PLAYBOOK) → REMEMBER → RESPONSE

pub mod agent;
pub mod api;
pub mod classifier;
pub mod config;
pub mod domains;
pub mod error;
pub mod gemini;
pub mod memory;
pub mod models;
pub mod strategy;
pub mod tools;

pub use error::{CortexError, Result};

// Re-export common types
pub use agent::Cortex;
pub use config::AgentConfig;
pub use models::*;
