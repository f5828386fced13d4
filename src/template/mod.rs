//! Template planning utilities.

mod plan;

pub use plan::{TemplatePlan, DEFAULT_MIN_VAR};
