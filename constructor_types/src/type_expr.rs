/* Parsing of declared type expressions such as `Point|string|null` or `?Point[]` */

use crate::table::TypeTableError;
use crate::types::TypeAlternative;

/// Type names that never require recursive construction.
pub const PRIMITIVE_TYPES: &[&str] = &[
    "null", "bool", "boolean", "int", "integer", "float", "double", "string", "array", "mixed",
    "iterable", "scalar",
];

pub fn is_primitive_name(type_name: &str) -> bool {
    PRIMITIVE_TYPES.contains(&type_name.to_ascii_lowercase().as_str())
}

/// Parse a `|`-separated type expression into ordered alternatives.
///
/// A leading `?` adds a trailing `null` alternative; a leading `\` namespace
/// marker on a type name is dropped. Declaration order is preserved.
pub fn parse_type_expression(expression: &str) -> Result<Vec<TypeAlternative>, TypeTableError> {
    let invalid = |reason: &str| TypeTableError::InvalidTypeExpression {
        expression: expression.to_string(),
        reason: reason.to_string(),
    };

    let trimmed = expression.trim();
    let (body, optional) = match trimmed.strip_prefix('?') {
        Some(rest) => (rest, true),
        None => (trimmed, false),
    };

    if body.is_empty() {
        return Err(invalid("expression is empty"));
    }

    let mut alternatives = Vec::new();
    for token in body.split('|') {
        let token = token.trim().trim_start_matches('\\');
        if token.is_empty() {
            return Err(invalid("empty alternative"));
        }

        let alternative = match token.strip_suffix("[]") {
            Some(element) => {
                if element.is_empty() || element.ends_with("[]") {
                    return Err(invalid("list alternatives must name a single element type"));
                }
                TypeAlternative::list_of(element)
            }
            None if is_primitive_name(token) => TypeAlternative::primitive(token),
            None => TypeAlternative::object(token),
        };

        if token.chars().any(char::is_whitespace) {
            return Err(invalid("type names cannot contain whitespace"));
        }
        alternatives.push(alternative);
    }

    if optional && !alternatives.iter().any(TypeAlternative::is_null) {
        alternatives.push(TypeAlternative::primitive("null"));
    }

    Ok(alternatives)
}
