use crate::table::TypeTableError;
use crate::type_expr::{is_primitive_name, parse_type_expression};
use serde::de::Deserializer;
use serde::Deserialize as _;
use serde_derive::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// One candidate type a constructor parameter may satisfy.
///
/// For list alternatives `type_name` holds the element type, so `Point[]`
/// is stored as `{ type_name: "Point", list: true }`.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
#[serde(rename_all = "kebab-case", from = "RawAlternative")]
pub struct TypeAlternative {
    pub type_name: String,
    pub primitive: bool,
    pub list: bool,
}

/* Explicit alternatives may omit `primitive`; it is then derived from the name */
#[derive(Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RawAlternative {
    type_name: String,
    #[serde(default)]
    primitive: Option<bool>,
    #[serde(default)]
    list: bool,
}

impl From<RawAlternative> for TypeAlternative {
    fn from(raw: RawAlternative) -> Self {
        let primitive = raw
            .primitive
            .unwrap_or_else(|| is_primitive_name(&raw.type_name));
        Self {
            type_name: raw.type_name,
            primitive,
            list: raw.list,
        }
    }
}

impl TypeAlternative {
    /// Nested object alternative, e.g. `Point`.
    pub fn object(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            primitive: false,
            list: false,
        }
    }

    /// List of nested objects, e.g. `Point[]`.
    pub fn list_of(type_name: impl Into<String>) -> Self {
        let type_name = type_name.into();
        let primitive = is_primitive_name(&type_name);
        Self {
            type_name,
            primitive,
            list: true,
        }
    }

    /// Primitive alternative, e.g. `int` or `string`.
    pub fn primitive(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            primitive: true,
            list: false,
        }
    }

    /// The literal `null` alternative only signals nullability and is never tried.
    pub fn is_null(&self) -> bool {
        self.type_name.eq_ignore_ascii_case("null") && !self.list
    }

    /// Render the alternative back into type-expression form (`Point[]`).
    pub fn display_name(&self) -> String {
        if self.list {
            format!("{}[]", self.type_name)
        } else {
            self.type_name.clone()
        }
    }
}

/// Static metadata for one constructor parameter.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(rename_all = "kebab-case", try_from = "RawParameter")]
pub struct ParameterDescriptor {
    pub name: String,
    pub nullable: bool,
    pub alternatives: Vec<TypeAlternative>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<JsonValue>,
}

impl ParameterDescriptor {
    pub fn new(name: impl Into<String>, alternatives: Vec<TypeAlternative>) -> Self {
        let nullable = alternatives.iter().any(TypeAlternative::is_null);
        Self {
            name: name.into(),
            nullable,
            alternatives,
            default: None,
        }
    }

    /// Build a descriptor from a type expression such as `Point|string|null`.
    pub fn parse(name: impl Into<String>, expression: &str) -> Result<Self, TypeTableError> {
        Ok(Self::new(name, parse_type_expression(expression)?))
    }

    pub fn with_default(mut self, default: JsonValue) -> Self {
        self.default = Some(default);
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }

    /// The declared default, or JSON null when the parameter has none.
    pub fn default_value(&self) -> JsonValue {
        self.default.clone().unwrap_or(JsonValue::Null)
    }

    /// A parameter is complex when at least one alternative may need recursive construction.
    pub fn is_complex(&self) -> bool {
        self.alternatives
            .iter()
            .any(|alt| !alt.primitive && !alt.is_null())
    }

    /// The declared alternatives joined back into `A|B[]|null` form.
    pub fn type_expression(&self) -> String {
        self.alternatives
            .iter()
            .map(TypeAlternative::display_name)
            .collect::<Vec<_>>()
            .join("|")
    }
}

/* Wire form of a parameter: either a `type` expression or explicit alternatives */
#[derive(Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct RawParameter {
    name: String,
    #[serde(default, rename = "type")]
    type_expression: Option<String>,
    #[serde(default)]
    alternatives: Option<Vec<TypeAlternative>>,
    #[serde(default)]
    nullable: bool,
    #[serde(default, deserialize_with = "deserialize_present")]
    default: Option<JsonValue>,
}

impl TryFrom<RawParameter> for ParameterDescriptor {
    type Error = TypeTableError;

    fn try_from(raw: RawParameter) -> Result<Self, Self::Error> {
        let alternatives = match (raw.type_expression, raw.alternatives) {
            (Some(expression), None) => parse_type_expression(&expression)?,
            (None, Some(alternatives)) => alternatives,
            // Untyped parameters accept anything and are passed through.
            (None, None) => vec![TypeAlternative::primitive("mixed")],
            (Some(expression), Some(_)) => {
                return Err(TypeTableError::InvalidTypeExpression {
                    expression,
                    reason: format!(
                        "parameter '{}' declares both 'type' and 'alternatives'",
                        raw.name
                    ),
                })
            }
        };

        let mut descriptor = ParameterDescriptor::new(raw.name, alternatives);
        descriptor.nullable |= raw.nullable;
        descriptor.default = raw.default;
        Ok(descriptor)
    }
}

/// Keeps `default: null` distinct from a missing `default` key.
fn deserialize_present<'de, D>(deserializer: D) -> Result<Option<JsonValue>, D::Error>
where
    D: Deserializer<'de>,
{
    JsonValue::deserialize(deserializer).map(Some)
}

/// A constructible type and its ordered constructor parameters.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct TypeDef {
    pub name: String,
    #[serde(default)]
    pub parameters: Vec<ParameterDescriptor>,
}

impl TypeDef {
    pub fn new(name: impl Into<String>, parameters: Vec<ParameterDescriptor>) -> Self {
        Self {
            name: name.into(),
            parameters,
        }
    }

    pub fn parameter(&self, name: &str) -> Option<&ParameterDescriptor> {
        self.parameters.iter().find(|param| param.name == name)
    }
}
