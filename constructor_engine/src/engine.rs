/* Metadata-driven resolution: payload -> constructor arguments -> object */

use crate::builder::{BuilderStrategy, FactoryRegistry};
use crate::config::EngineConfig;
use crate::descriptors::{DescriptorCache, DescriptorProvider};
use crate::emit::ConstructorCall;
use crate::errors::{AttemptError, BuildError, BuilderError, ConstructionError, EngineResult};
use crate::events::{Event, EventBus, ParamResolution, ParamWithTypeResolution, ParamsResolution};
use crate::value::{params_from_json, Arguments, Object, Params, Value};
use constructor_types::{ParameterDescriptor, TypeAlternative};
use serde_json::Value as JsonValue;
use std::sync::Arc;

/* Outcome of one failed alternative trial */
enum Trial {
    /* A nested build failed while resolving one of its own parameters */
    Nested(ConstructionError),
    /* Anything else; recorded and the next alternative is tried */
    Failed(AttemptError),
}

/// Builds objects of a named type from an untyped payload, resolving nested
/// parameters recursively from their declared type alternatives.
///
/// The descriptor cache lives as long as the engine. Builds never mutate the
/// engine, so one engine can serve concurrent builds when its provider and
/// handlers allow it.
#[derive(Debug)]
pub struct ResolutionEngine<P> {
    provider: P,
    cache: DescriptorCache,
    bus: Option<EventBus>,
    factories: FactoryRegistry,
    config: EngineConfig,
}

impl<P: DescriptorProvider> ResolutionEngine<P> {
    pub fn new(provider: P) -> Self {
        Self::with_config(provider, EngineConfig::default())
    }

    pub fn with_config(provider: P, config: EngineConfig) -> Self {
        Self {
            provider,
            cache: DescriptorCache::new(),
            bus: None,
            factories: FactoryRegistry::new(),
            config,
        }
    }

    /// Attach an event bus. Without one, no events are dispatched.
    pub fn with_bus(mut self, bus: EventBus) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Factories used by [`ResolutionEngine::construct`].
    pub fn with_factories(mut self, factories: FactoryRegistry) -> Self {
        self.factories = factories;
        self
    }

    pub fn factories(&self) -> &FactoryRegistry {
        &self.factories
    }

    pub fn factories_mut(&mut self) -> &mut FactoryRegistry {
        &mut self.factories
    }

    pub fn bus(&self) -> Option<&EventBus> {
        self.bus.as_ref()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn cache(&self) -> &DescriptorCache {
        &self.cache
    }

    /// Cached descriptor lookup.
    pub fn descriptors(&self, type_name: &str) -> EngineResult<Arc<[ParameterDescriptor]>> {
        self.cache
            .get_or_populate(type_name, &self.provider)
            .ok_or_else(|| BuildError::UnknownType {
                type_name: type_name.to_string(),
            })
    }

    /// Build a live instance with the registered factories.
    pub fn construct(&self, type_name: &str, payload: Params) -> EngineResult<Object> {
        self.build(
            type_name,
            payload,
            BuilderStrategy::DirectInstantiate(&self.factories),
        )
    }

    /// [`ResolutionEngine::construct`] from a JSON mapping.
    pub fn construct_json(&self, type_name: &str, payload: JsonValue) -> EngineResult<Object> {
        let payload = json_payload(type_name, payload)?;
        self.construct(type_name, payload)
    }

    /// Build a constructor-call tree instead of an instance.
    pub fn emit(&self, type_name: &str, payload: Params) -> EngineResult<ConstructorCall> {
        match self.build(type_name, payload, BuilderStrategy::TreeEmit)? {
            Object::Call(call) => Ok(call),
            /* tree emission never yields instances; a factory cannot run here */
            Object::Instance(instance) => Err(BuildError::Builder(BuilderError::Custom(format!(
                "tree emission produced a live '{}' instance",
                instance.type_name()
            )))),
        }
    }

    /// [`ResolutionEngine::emit`] from a JSON mapping.
    pub fn emit_json(&self, type_name: &str, payload: JsonValue) -> EngineResult<ConstructorCall> {
        let payload = json_payload(type_name, payload)?;
        self.emit(type_name, payload)
    }

    /// Resolve `payload` against the descriptors of `type_name` and hand the
    /// merged arguments to `strategy`.
    pub fn build(
        &self,
        type_name: &str,
        payload: Params,
        strategy: BuilderStrategy<'_>,
    ) -> EngineResult<Object> {
        tracing::debug!(type_name, strategy = strategy.name(), "build");
        let result = self.build_at(type_name, payload, strategy, 0);
        if let Err(err) = &result {
            tracing::debug!(type_name, error = %err, "build failed");
        }
        result
    }

    fn build_at(
        &self,
        type_name: &str,
        payload: Params,
        strategy: BuilderStrategy<'_>,
        depth: usize,
    ) -> EngineResult<Object> {
        if depth > self.config.max_depth {
            return Err(BuildError::DepthExceeded {
                type_name: type_name.to_string(),
                limit: self.config.max_depth,
            });
        }

        let descriptors = self.descriptors(type_name)?;
        let params = self.before_params(type_name, payload);

        let mut resolved = Params::new();
        for descriptor in descriptors.iter().filter(|d| d.is_complex()) {
            let value = self.resolve_parameter(descriptor, &params, strategy, depth)?;
            resolved.insert(descriptor.name.clone(), value);
        }

        let merged = merge_params(&descriptors, params, resolved);
        let merged = self.after_params(type_name, merged);
        let args = ordered_arguments(type_name, &descriptors, merged);

        tracing::trace!(type_name, depth, arguments = args.len(), "building");
        Ok(strategy.build(args)?)
    }

    fn resolve_parameter(
        &self,
        descriptor: &ParameterDescriptor,
        params: &Params,
        strategy: BuilderStrategy<'_>,
        depth: usize,
    ) -> EngineResult<Value> {
        let original = params
            .get(&descriptor.name)
            .cloned()
            .unwrap_or_else(Value::none);
        let value = self.before_param(descriptor, original);

        if descriptor.nullable && value.is_none() {
            tracing::trace!(parameter = %descriptor.name, "nullable parameter left empty");
            return Ok(value);
        }

        let mut errors = Vec::new();
        for alternative in descriptor.alternatives.iter().filter(|alt| !alt.is_null()) {
            let candidate = self.before_param_with_type(descriptor, alternative, value.clone());
            tracing::trace!(
                parameter = %descriptor.name,
                alternative = %alternative.display_name(),
                "trying alternative"
            );

            if alternative.primitive {
                return Ok(candidate);
            }

            match self.try_alternative(alternative, candidate, strategy, depth) {
                Ok(resolved) => return Ok(resolved),
                Err(Trial::Nested(inner)) => {
                    return Err(ConstructionError::chained(descriptor.name.clone(), inner).into());
                }
                Err(Trial::Failed(attempt)) => {
                    tracing::trace!(
                        parameter = %descriptor.name,
                        error = %attempt,
                        "alternative failed"
                    );
                    errors.push(attempt);
                }
            }
        }

        Err(ConstructionError::exhausted(descriptor.name.clone(), errors).into())
    }

    fn try_alternative(
        &self,
        alternative: &TypeAlternative,
        value: Value,
        strategy: BuilderStrategy<'_>,
        depth: usize,
    ) -> Result<Value, Trial> {
        if !alternative.list {
            return self.resolve_object(&alternative.type_name, value, strategy, depth);
        }

        let items = value.into_sequence().map_err(|other| {
            Trial::Failed(AttemptError::SequenceExpected {
                type_name: alternative.type_name.clone(),
                found: other.kind_name(),
            })
        })?;
        items
            .into_iter()
            .map(|item| self.resolve_object(&alternative.type_name, item, strategy, depth))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List)
    }

    /* A formed object is kept; anything else is built one level deeper */
    fn resolve_object(
        &self,
        type_name: &str,
        value: Value,
        strategy: BuilderStrategy<'_>,
        depth: usize,
    ) -> Result<Value, Trial> {
        if let Value::Object(_) = value {
            return Ok(value);
        }

        let outcome = value
            .into_params()
            .map_err(|other| BuildError::PayloadNotMapping {
                type_name: type_name.to_string(),
                found: other.kind_name(),
            })
            .and_then(|payload| self.build_at(type_name, payload, strategy, depth + 1));

        match outcome {
            Ok(object) => Ok(Value::Object(object)),
            Err(BuildError::Construction(inner)) => Err(Trial::Nested(inner)),
            Err(other) => Err(Trial::Failed(AttemptError::AlternativeFailed {
                type_name: type_name.to_string(),
                source: Box::new(other),
            })),
        }
    }

    fn before_params(&self, type_name: &str, params: Params) -> Params {
        let Some(bus) = &self.bus else {
            return params;
        };
        let mut resolution = ParamsResolution::new(type_name, params);
        bus.dispatch(&mut Event::BeforeParamsResolution(&mut resolution));
        resolution.into_value()
    }

    fn after_params(&self, type_name: &str, params: Params) -> Params {
        let Some(bus) = &self.bus else {
            return params;
        };
        let mut resolution = ParamsResolution::new(type_name, params);
        bus.dispatch(&mut Event::AfterParamsResolution(&mut resolution));
        resolution.into_value()
    }

    fn before_param(&self, descriptor: &ParameterDescriptor, value: Value) -> Value {
        let Some(bus) = &self.bus else {
            return value;
        };
        let mut resolution = ParamResolution::new(descriptor, value);
        bus.dispatch(&mut Event::BeforeParamResolution(&mut resolution));
        resolution.into_value()
    }

    fn before_param_with_type(
        &self,
        descriptor: &ParameterDescriptor,
        alternative: &TypeAlternative,
        value: Value,
    ) -> Value {
        let Some(bus) = &self.bus else {
            return value;
        };
        let mut resolution = ParamWithTypeResolution::new(descriptor, alternative, value);
        bus.dispatch(&mut Event::BeforeParamWithTypeResolution(&mut resolution));
        resolution.into_value()
    }
}

fn json_payload(type_name: &str, payload: JsonValue) -> EngineResult<Params> {
    match payload {
        JsonValue::Object(_) => Ok(params_from_json(payload).unwrap_or_default()),
        other => Err(BuildError::PayloadNotMapping {
            type_name: type_name.to_string(),
            found: Value::Data(other).kind_name(),
        }),
    }
}

/* Defaults, then the payload, then resolved values; later sources win */
fn merge_params(descriptors: &[ParameterDescriptor], params: Params, resolved: Params) -> Params {
    let mut merged: Params = descriptors
        .iter()
        .map(|descriptor| {
            let default = descriptor
                .default
                .clone()
                .map_or_else(Value::none, Value::Data);
            (descriptor.name.clone(), default)
        })
        .collect();
    merged.extend(params);
    merged.extend(resolved);
    merged
}

/* Declared parameters first, in declaration order; extra keys follow */
fn ordered_arguments(
    type_name: &str,
    descriptors: &[ParameterDescriptor],
    mut params: Params,
) -> Arguments {
    let mut entries = Vec::with_capacity(params.len().max(descriptors.len()));
    for descriptor in descriptors {
        let value = params
            .shift_remove(&descriptor.name)
            .unwrap_or_else(Value::none);
        entries.push((descriptor.name.clone(), value));
    }
    entries.extend(params);
    Arguments::new(type_name, entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use constructor_types::TypeTable;
    use serde_json::json;

    fn descriptors(yaml: &str, type_name: &str) -> Vec<ParameterDescriptor> {
        TypeTable::from_yaml_str(yaml)
            .expect("table")
            .parameter_descriptors(type_name)
            .expect("known type")
    }

    fn params(json: JsonValue) -> Params {
        params_from_json(json).expect("mapping")
    }

    #[test]
    fn merge_prefers_resolved_over_payload_over_defaults() {
        let descriptors = descriptors(
            r#"
types:
  - name: P
    parameters:
      - name: x
        type: int
        default: 1
      - name: y
        type: int
        default: 2
"#,
            "P",
        );

        let merged = merge_params(&descriptors, params(json!({"x": 5})), Params::new());
        assert_eq!(merged, params(json!({"x": 5, "y": 2})));

        let mut resolved = Params::new();
        resolved.insert("y".to_string(), Value::from(json!(9)));
        let merged = merge_params(&descriptors, params(json!({"x": 5, "y": 7})), resolved);
        assert_eq!(merged, params(json!({"x": 5, "y": 9})));
    }

    #[test]
    fn arguments_follow_declaration_order() {
        let descriptors = descriptors(
            r#"
types:
  - name: P
    parameters:
      - name: x
        type: int
      - name: y
        type: int
"#,
            "P",
        );

        let args = ordered_arguments("P", &descriptors, params(json!({"extra": true, "y": 2})));
        let names: Vec<&str> = args.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["x", "y", "extra"]);
        assert!(args.by_name("x").expect("x").is_none());
    }

    #[test]
    fn json_payload_must_be_a_mapping() {
        let err = json_payload("Point", json!([1, 2])).expect_err("sequence payload");
        assert!(matches!(
            err,
            BuildError::PayloadNotMapping { ref type_name, .. } if type_name == "Point"
        ));
    }
}
