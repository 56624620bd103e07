/* Constructor Resolution Engine
 *
 * Builds objects of a named type from an untyped, possibly nested payload.
 * Every constructor parameter is resolved against its declared type
 * alternatives in order, recursing into nested types and lists, while
 * subscribers on an event bus may observe or override each step. Failures
 * surface as a chain of construction errors annotated with the parameter
 * path that led to them.
 */

pub mod builder;
pub mod config;
pub mod descriptors;
pub mod emit;
pub mod engine;
pub mod errors;
pub mod events;
pub mod value;

pub use builder::{BuilderStrategy, Factory, FactoryRegistry};
pub use config::{EngineConfig, DEFAULT_MAX_DEPTH};
pub use descriptors::{DescriptorCache, DescriptorProvider};
pub use emit::{CallArgument, ConstructorCall, Expr};
pub use engine::ResolutionEngine;
pub use errors::{AttemptError, BuildError, BuilderError, ConstructionError, EngineResult};
pub use events::{
    Event, EventBus, EventKind, Handler, ParamResolution, ParamWithTypeResolution,
    ParamsResolution, Subscriber,
};
pub use value::{params_from_json, Arguments, Instance, Object, Params, Value};
