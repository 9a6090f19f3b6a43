//! Shared utilities: duration parsing and configuration validation.

pub mod duration;
pub mod validation;

pub use duration::parse_duration_to_seconds;
pub use validation::{validate_links, validate_trigger, warn_on_unreachable_trigger};
