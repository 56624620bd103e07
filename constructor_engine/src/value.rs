/* Payload values - raw input data, resolved objects and the argument lists handed to builders */

use crate::emit::ConstructorCall;
use crate::errors::BuilderError;
use indexmap::IndexMap;
use serde_json::Value as JsonValue;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/* Parameter name -> value, in insertion order */
pub type Params = IndexMap<String, Value>;

/* A value flowing through resolution */
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /* Raw, untyped payload data (scalars, mappings, sequences) */
    Data(JsonValue),

    /* A fully formed object produced by a builder (or injected by a subscriber) */
    Object(Object),

    /* A resolved sequence */
    List(Vec<Value>),
}

impl Value {
    /* The absent / none marker */
    pub fn none() -> Self {
        Value::Data(JsonValue::Null)
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Value::Data(JsonValue::Null))
    }

    pub fn is_sequence(&self) -> bool {
        matches!(self, Value::Data(JsonValue::Array(_)) | Value::List(_))
    }

    /* Short shape name used in error messages */
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Data(JsonValue::Null) => "null",
            Value::Data(JsonValue::Bool(_)) => "bool",
            Value::Data(JsonValue::Number(_)) => "number",
            Value::Data(JsonValue::String(_)) => "string",
            Value::Data(JsonValue::Array(_)) => "sequence",
            Value::Data(JsonValue::Object(_)) => "mapping",
            Value::Object(_) => "object",
            Value::List(_) => "list",
        }
    }

    /* Split a sequence into its elements, or hand the value back unchanged */
    pub fn into_sequence(self) -> Result<Vec<Value>, Value> {
        match self {
            Value::Data(JsonValue::Array(items)) => Ok(items.into_iter().map(Value::Data).collect()),
            Value::List(items) => Ok(items),
            other => Err(other),
        }
    }

    /* Turn a raw mapping into constructor params, or hand the value back unchanged */
    pub fn into_params(self) -> Result<Params, Value> {
        match self {
            Value::Data(JsonValue::Object(map)) => Ok(params_from_map(map)),
            other => Err(other),
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn as_json(&self) -> Option<&JsonValue> {
        match self {
            Value::Data(json) => Some(json),
            _ => None,
        }
    }

    /* Downcast a directly instantiated object */
    pub fn as_instance<T: Any>(&self) -> Option<&T> {
        match self {
            Value::Object(Object::Instance(instance)) => instance.downcast_ref::<T>(),
            _ => None,
        }
    }

    pub fn as_call(&self) -> Option<&ConstructorCall> {
        match self {
            Value::Object(Object::Call(call)) => Some(call),
            _ => None,
        }
    }
}

impl From<JsonValue> for Value {
    fn from(json: JsonValue) -> Self {
        Value::Data(json)
    }
}

impl From<Object> for Value {
    fn from(object: Object) -> Self {
        Value::Object(object)
    }
}

impl From<Instance> for Value {
    fn from(instance: Instance) -> Self {
        Value::Object(Object::Instance(instance))
    }
}

fn params_from_map(map: serde_json::Map<String, JsonValue>) -> Params {
    map.into_iter()
        .map(|(name, value)| (name, Value::Data(value)))
        .collect()
}

/* Convert a JSON mapping payload into params; None when the payload is not a mapping */
pub fn params_from_json(payload: JsonValue) -> Option<Params> {
    match payload {
        JsonValue::Object(map) => Some(params_from_map(map)),
        _ => None,
    }
}

/* Result of a builder strategy */
#[derive(Debug, Clone, PartialEq)]
pub enum Object {
    /* A live instance from direct instantiation */
    Instance(Instance),

    /* A constructor-call tree from tree emission */
    Call(ConstructorCall),
}

impl Object {
    pub fn type_name(&self) -> &str {
        match self {
            Object::Instance(instance) => instance.type_name(),
            Object::Call(call) => &call.type_name,
        }
    }

    pub fn as_instance<T: Any>(&self) -> Option<&T> {
        match self {
            Object::Instance(instance) => instance.downcast_ref::<T>(),
            Object::Call(_) => None,
        }
    }

    pub fn into_call(self) -> Option<ConstructorCall> {
        match self {
            Object::Call(call) => Some(call),
            Object::Instance(_) => None,
        }
    }
}

/* Type-erased instance; cheap to clone, compared by identity */
#[derive(Clone)]
pub struct Instance {
    type_name: String,
    inner: Arc<dyn Any + Send + Sync>,
}

impl Instance {
    pub fn new<T: Any + Send + Sync>(type_name: impl Into<String>, value: T) -> Self {
        Self {
            type_name: type_name.into(),
            inner: Arc::new(value),
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    pub fn is<T: Any>(&self) -> bool {
        self.inner.is::<T>()
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

impl PartialEq for Instance {
    fn eq(&self, other: &Self) -> bool {
        self.type_name == other.type_name && Arc::ptr_eq(&self.inner, &other.inner)
    }
}

/* Ordered constructor arguments for one type, as handed to a builder strategy */
#[derive(Debug, Clone, PartialEq)]
pub struct Arguments {
    type_name: String,
    entries: Vec<(String, Value)>,
}

impl Arguments {
    pub fn new(type_name: impl Into<String>, entries: Vec<(String, Value)>) -> Self {
        Self {
            type_name: type_name.into(),
            entries,
        }
    }

    pub fn from_params(type_name: impl Into<String>, params: Params) -> Self {
        Self::new(type_name, params.into_iter().collect())
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /* Positional access, in declaration order */
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.entries.get(index).map(|(_, value)| value)
    }

    pub fn by_name(&self, name: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(entry_name, _)| entry_name == name)
            .map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.entries.iter().map(|(_, value)| value)
    }

    pub fn into_entries(self) -> Vec<(String, Value)> {
        self.entries
    }

    /* A present, non-none argument */
    pub fn required(&self, name: &str) -> Result<&Value, BuilderError> {
        match self.by_name(name) {
            Some(value) if !value.is_none() => Ok(value),
            _ => Err(BuilderError::MissingArgument {
                type_name: self.type_name.clone(),
                parameter: name.to_string(),
            }),
        }
    }

    fn invalid(&self, name: &str, expected: &str, found: &Value) -> BuilderError {
        BuilderError::InvalidArgument {
            type_name: self.type_name.clone(),
            parameter: name.to_string(),
            reason: format!("expected {}, got {}", expected, found.kind_name()),
        }
    }

    pub fn int(&self, name: &str) -> Result<i64, BuilderError> {
        let value = self.required(name)?;
        value
            .as_json()
            .and_then(JsonValue::as_i64)
            .ok_or_else(|| self.invalid(name, "an integer", value))
    }

    pub fn float(&self, name: &str) -> Result<f64, BuilderError> {
        let value = self.required(name)?;
        value
            .as_json()
            .and_then(JsonValue::as_f64)
            .ok_or_else(|| self.invalid(name, "a number", value))
    }

    pub fn bool(&self, name: &str) -> Result<bool, BuilderError> {
        let value = self.required(name)?;
        value
            .as_json()
            .and_then(JsonValue::as_bool)
            .ok_or_else(|| self.invalid(name, "a bool", value))
    }

    pub fn string(&self, name: &str) -> Result<String, BuilderError> {
        let value = self.required(name)?;
        value
            .as_json()
            .and_then(JsonValue::as_str)
            .map(str::to_string)
            .ok_or_else(|| self.invalid(name, "a string", value))
    }

    pub fn optional_string(&self, name: &str) -> Result<Option<String>, BuilderError> {
        match self.by_name(name) {
            None => Ok(None),
            Some(value) if value.is_none() => Ok(None),
            Some(_) => self.string(name).map(Some),
        }
    }

    /* Clone out a directly instantiated object of type T */
    pub fn instance<T: Any + Clone>(&self, name: &str) -> Result<T, BuilderError> {
        let value = self.required(name)?;
        value
            .as_instance::<T>()
            .cloned()
            .ok_or_else(|| self.invalid(name, std::any::type_name::<T>(), value))
    }

    pub fn optional_instance<T: Any + Clone>(&self, name: &str) -> Result<Option<T>, BuilderError> {
        match self.by_name(name) {
            None => Ok(None),
            Some(value) if value.is_none() => Ok(None),
            Some(_) => self.instance(name).map(Some),
        }
    }

    /* Clone out a resolved list of instances of type T */
    pub fn instances<T: Any + Clone>(&self, name: &str) -> Result<Vec<T>, BuilderError> {
        let value = self.required(name)?;
        match value {
            Value::List(items) => items
                .iter()
                .map(|item| {
                    item.as_instance::<T>()
                        .cloned()
                        .ok_or_else(|| self.invalid(name, std::any::type_name::<T>(), item))
                })
                .collect(),
            other => Err(self.invalid(name, "a list", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq)]
    struct Tag(String);

    #[test]
    fn sequences_split_into_elements() {
        let items = Value::Data(json!([1, 2])).into_sequence().expect("sequence");
        assert_eq!(items, vec![Value::Data(json!(1)), Value::Data(json!(2))]);

        let not_a_sequence = Value::Data(json!("oops")).into_sequence();
        assert_eq!(not_a_sequence, Err(Value::Data(json!("oops"))));
    }

    #[test]
    fn only_mappings_become_params() {
        let params = Value::Data(json!({"b": 1, "a": 2})).into_params().expect("mapping");
        assert_eq!(params.keys().collect::<Vec<_>>(), vec!["b", "a"]);
        assert!(Value::Data(json!([1])).into_params().is_err());
        assert!(params_from_json(json!(3)).is_none());
    }

    #[test]
    fn instances_compare_by_identity() {
        let a = Instance::new("Tag", Tag("a".into()));
        let b = Instance::new("Tag", Tag("a".into()));
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
        assert_eq!(a.downcast_ref::<Tag>(), Some(&Tag("a".into())));
        assert!(a.downcast_ref::<String>().is_none());
    }

    #[test]
    fn typed_accessors_report_missing_and_invalid_arguments() {
        let args = Arguments::new(
            "Point",
            vec![
                ("x".to_string(), Value::Data(json!(1))),
                ("y".to_string(), Value::none()),
                ("label".to_string(), Value::Data(json!(true))),
            ],
        );

        assert_eq!(args.int("x").expect("x"), 1);
        assert!(matches!(
            args.int("y"),
            Err(BuilderError::MissingArgument { ref parameter, .. }) if parameter == "y"
        ));
        assert!(matches!(
            args.string("label"),
            Err(BuilderError::InvalidArgument { ref parameter, .. }) if parameter == "label"
        ));
        assert_eq!(args.optional_string("y").expect("none is fine"), None);
        assert_eq!(args.get(2), Some(&Value::Data(json!(true))));
    }

    #[test]
    fn instance_lists_downcast_each_element() {
        let args = Arguments::new(
            "Group",
            vec![(
                "members".to_string(),
                Value::List(vec![
                    Instance::new("Tag", Tag("a".into())).into(),
                    Instance::new("Tag", Tag("b".into())).into(),
                ]),
            )],
        );

        let tags: Vec<Tag> = args.instances("members").expect("members");
        assert_eq!(tags, vec![Tag("a".into()), Tag("b".into())]);
    }
}
