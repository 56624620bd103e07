//! Constructor Parameter Descriptors
//!
//! This crate contains the static metadata the constructor engine consumes:
//! for every constructible type, the ordered list of its constructor
//! parameters together with their declared type alternatives and defaults.
//! It provides pure data structures plus YAML loading, without any
//! resolution logic.

pub mod table;
pub mod type_expr;
pub mod types;

// Re-export commonly used types at the crate root
pub use table::{TypeTable, TypeTableError};
pub use type_expr::{parse_type_expression, PRIMITIVE_TYPES};
pub use types::*;
