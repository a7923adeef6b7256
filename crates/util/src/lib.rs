//! Evaluation primitives shared by the workflow engine and activities.
//!
//! - `expression` parses and runs the path-query subset used in `${ … }`
//!   templates and switch conditions
//! - `arguments` walks action argument trees, expanding template leaves
//! - `duration` parses the ISO-8601 durations accepted by sleep states

pub mod arguments;
pub mod duration;
pub mod expression;

pub use arguments::{ArgumentError, evaluate_argument, evaluate_argument_map, evaluate_value};
pub use duration::{DurationError, parse_iso8601_duration};
pub use expression::{Expression, ExpressionError, extract_template, is_template, is_truthy};
