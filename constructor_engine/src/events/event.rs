use crate::value::{Params, Value};
use constructor_types::{ParameterDescriptor, TypeAlternative};
use std::fmt;

/// The four points at which subscribers may observe or override resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Before any parameter of a type is resolved; carries the whole payload.
    BeforeParamsResolution,
    /// Before one complex parameter is tried against its alternatives.
    BeforeParamResolution,
    /// Before one alternative of a parameter is tried.
    BeforeParamWithTypeResolution,
    /// After defaults, payload and resolved values are merged.
    AfterParamsResolution,
}

impl EventKind {
    pub const ALL: [EventKind; 4] = [
        EventKind::BeforeParamsResolution,
        EventKind::BeforeParamResolution,
        EventKind::BeforeParamWithTypeResolution,
        EventKind::AfterParamsResolution,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::BeforeParamsResolution => "before-params-resolution",
            EventKind::BeforeParamResolution => "before-param-resolution",
            EventKind::BeforeParamWithTypeResolution => "before-param-with-type-resolution",
            EventKind::AfterParamsResolution => "after-params-resolution",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A dispatched event. The engine owns the payload; handlers borrow it for
/// the duration of one dispatch.
#[derive(Debug)]
pub enum Event<'a, 'e> {
    BeforeParamsResolution(&'e mut ParamsResolution<'a>),
    BeforeParamResolution(&'e mut ParamResolution<'a>),
    BeforeParamWithTypeResolution(&'e mut ParamWithTypeResolution<'a>),
    AfterParamsResolution(&'e mut ParamsResolution<'a>),
}

impl Event<'_, '_> {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::BeforeParamsResolution(_) => EventKind::BeforeParamsResolution,
            Event::BeforeParamResolution(_) => EventKind::BeforeParamResolution,
            Event::BeforeParamWithTypeResolution(_) => EventKind::BeforeParamWithTypeResolution,
            Event::AfterParamsResolution(_) => EventKind::AfterParamsResolution,
        }
    }
}

/// Payload of the before/after params events.
#[derive(Debug)]
pub struct ParamsResolution<'a> {
    type_name: &'a str,
    original: Params,
    replacement: Option<Params>,
}

impl<'a> ParamsResolution<'a> {
    pub(crate) fn new(type_name: &'a str, original: Params) -> Self {
        Self {
            type_name,
            original,
            replacement: None,
        }
    }

    /// The type whose parameters are being resolved.
    pub fn type_name(&self) -> &str {
        self.type_name
    }

    pub fn original(&self) -> &Params {
        &self.original
    }

    /// The override if one was set, otherwise the original.
    pub fn value(&self) -> &Params {
        self.replacement.as_ref().unwrap_or(&self.original)
    }

    /// Replace the params the engine continues with. A later call wins.
    pub fn set_value(&mut self, params: Params) {
        self.replacement = Some(params);
    }

    pub fn is_overridden(&self) -> bool {
        self.replacement.is_some()
    }

    pub(crate) fn into_value(self) -> Params {
        self.replacement.unwrap_or(self.original)
    }
}

/// Payload of the before-param event.
#[derive(Debug)]
pub struct ParamResolution<'a> {
    descriptor: &'a ParameterDescriptor,
    original: Value,
    replacement: Option<Value>,
}

impl<'a> ParamResolution<'a> {
    pub(crate) fn new(descriptor: &'a ParameterDescriptor, original: Value) -> Self {
        Self {
            descriptor,
            original,
            replacement: None,
        }
    }

    pub fn descriptor(&self) -> &ParameterDescriptor {
        self.descriptor
    }

    pub fn original(&self) -> &Value {
        &self.original
    }

    pub fn value(&self) -> &Value {
        self.replacement.as_ref().unwrap_or(&self.original)
    }

    /// Override the value; an explicit none is a real override.
    pub fn set_value(&mut self, value: impl Into<Value>) {
        self.replacement = Some(value.into());
    }

    pub fn is_overridden(&self) -> bool {
        self.replacement.is_some()
    }

    pub(crate) fn into_value(self) -> Value {
        self.replacement.unwrap_or(self.original)
    }
}

/// Payload of the before-param-with-type event, fired once per alternative trial.
#[derive(Debug)]
pub struct ParamWithTypeResolution<'a> {
    descriptor: &'a ParameterDescriptor,
    alternative: &'a TypeAlternative,
    original: Value,
    replacement: Option<Value>,
}

impl<'a> ParamWithTypeResolution<'a> {
    pub(crate) fn new(
        descriptor: &'a ParameterDescriptor,
        alternative: &'a TypeAlternative,
        original: Value,
    ) -> Self {
        Self {
            descriptor,
            alternative,
            original,
            replacement: None,
        }
    }

    pub fn descriptor(&self) -> &ParameterDescriptor {
        self.descriptor
    }

    /// The alternative about to be tried.
    pub fn alternative(&self) -> &TypeAlternative {
        self.alternative
    }

    pub fn original(&self) -> &Value {
        &self.original
    }

    pub fn value(&self) -> &Value {
        self.replacement.as_ref().unwrap_or(&self.original)
    }

    pub fn set_value(&mut self, value: impl Into<Value>) {
        self.replacement = Some(value.into());
    }

    pub fn is_overridden(&self) -> bool {
        self.replacement.is_some()
    }

    pub(crate) fn into_value(self) -> Value {
        self.replacement.unwrap_or(self.original)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn value_falls_back_to_original() {
        let descriptor = ParameterDescriptor::parse("center", "Point|string").expect("descriptor");
        let mut event = ParamResolution::new(&descriptor, Value::from(json!("origin")));

        assert_eq!(event.value(), &Value::from(json!("origin")));
        assert!(!event.is_overridden());

        event.set_value(json!({"x": 1}));
        event.set_value(json!({"x": 2}));
        assert_eq!(event.original(), &Value::from(json!("origin")));
        assert_eq!(event.into_value(), Value::from(json!({"x": 2})));
    }

    #[test]
    fn explicit_none_is_an_override() {
        let descriptor = ParameterDescriptor::parse("center", "?Point").expect("descriptor");
        let alternative = &descriptor.alternatives[0];
        let mut event =
            ParamWithTypeResolution::new(&descriptor, alternative, Value::from(json!({"x": 1})));

        event.set_value(Value::none());
        assert!(event.is_overridden());
        assert_eq!(event.alternative().type_name, "Point");
        assert!(event.into_value().is_none());
    }

    #[test]
    fn kind_matches_variant() {
        let mut params = ParamsResolution::new("Point", Params::new());
        let event = Event::AfterParamsResolution(&mut params);
        assert_eq!(event.kind(), EventKind::AfterParamsResolution);
        assert_eq!(event.kind().to_string(), "after-params-resolution");
    }
}
