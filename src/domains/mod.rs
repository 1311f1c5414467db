//! Stock domain handlers.

use serde_json::Value;

pub mod foundation;
pub mod intel;
pub mod ops;
pub mod tactical;

pub use foundation::{FoundationHandler, PlaceholderHandler};
pub use intel::IntelHandler;
pub use ops::{OpsAction, OpsHandler};
pub use tactical::TacticalHandler;

/// Pull the `answer` text out of an LLM capability result.
pub(crate) fn answer_text(value: &Value) -> String {
    value
        .get("answer")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| value.to_string())
}
