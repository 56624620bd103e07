/* Builder strategies: turn a merged argument list into a result object */

use crate::emit::ConstructorCall;
use crate::errors::BuilderError;
use crate::value::{Arguments, Instance, Object};
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

/* Constructor for one registered type */
pub type Factory = Arc<dyn Fn(Arguments) -> Result<Instance, BuilderError> + Send + Sync>;

/* Constructors for live instances, keyed by type name */
#[derive(Clone, Default)]
pub struct FactoryRegistry {
    factories: HashMap<String, Factory>,
}

impl std::fmt::Debug for FactoryRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FactoryRegistry")
            .field("factories", &self.registered_types())
            .finish()
    }
}

impl FactoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /* Register a constructor; a later registration for the same type replaces it */
    pub fn register<T, F>(&mut self, type_name: impl Into<String>, factory: F)
    where
        T: Any + Send + Sync,
        F: Fn(Arguments) -> Result<T, BuilderError> + Send + Sync + 'static,
    {
        let type_name = type_name.into();
        let instance_name = type_name.clone();
        self.factories.insert(
            type_name,
            Arc::new(move |args| factory(args).map(|value| Instance::new(instance_name.clone(), value))),
        );
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.factories.contains_key(type_name)
    }

    /* Get list of registered type names, sorted */
    pub fn registered_types(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn instantiate(&self, args: Arguments) -> Result<Instance, BuilderError> {
        let factory = self
            .factories
            .get(args.type_name())
            .ok_or_else(|| BuilderError::Unregistered {
                type_name: args.type_name().to_string(),
            })?;
        factory(args)
    }
}

/* How the engine finishes a build */
#[derive(Debug, Clone, Copy)]
pub enum BuilderStrategy<'f> {
    /* Call a registered factory and return the live instance */
    DirectInstantiate(&'f FactoryRegistry),
    /* Return a constructor-call tree instead of an instance */
    TreeEmit,
}

impl BuilderStrategy<'_> {
    pub fn build(&self, args: Arguments) -> Result<Object, BuilderError> {
        match self {
            BuilderStrategy::DirectInstantiate(registry) => {
                registry.instantiate(args).map(Object::Instance)
            }
            BuilderStrategy::TreeEmit => ConstructorCall::from_arguments(args).map(Object::Call),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            BuilderStrategy::DirectInstantiate(_) => "direct-instantiate",
            BuilderStrategy::TreeEmit => "tree-emit",
        }
    }
}
