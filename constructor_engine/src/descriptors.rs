use constructor_types::{ParameterDescriptor, TypeTable};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Source of constructor parameter descriptors.
///
/// `None` means the type is unknown. `Some(vec![])` is a type whose
/// constructor takes no parameters.
pub trait DescriptorProvider {
    fn parameter_descriptors(&self, type_name: &str) -> Option<Vec<ParameterDescriptor>>;
}

impl DescriptorProvider for TypeTable {
    fn parameter_descriptors(&self, type_name: &str) -> Option<Vec<ParameterDescriptor>> {
        self.get(type_name).map(|def| def.parameters.clone())
    }
}

impl<P: DescriptorProvider + ?Sized> DescriptorProvider for &P {
    fn parameter_descriptors(&self, type_name: &str) -> Option<Vec<ParameterDescriptor>> {
        (**self).parameter_descriptors(type_name)
    }
}

impl<P: DescriptorProvider + ?Sized> DescriptorProvider for Arc<P> {
    fn parameter_descriptors(&self, type_name: &str) -> Option<Vec<ParameterDescriptor>> {
        (**self).parameter_descriptors(type_name)
    }
}

/// Descriptor lists memoized per type name.
///
/// Entries are never evicted. Unknown types are not cached, so a provider
/// that learns a type later is consulted again.
#[derive(Debug, Default)]
pub struct DescriptorCache {
    entries: RwLock<HashMap<String, Arc<[ParameterDescriptor]>>>,
}

impl DescriptorCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_populate<P>(&self, type_name: &str, provider: &P) -> Option<Arc<[ParameterDescriptor]>>
    where
        P: DescriptorProvider + ?Sized,
    {
        if let Some(hit) = self.entries.read().get(type_name) {
            return Some(Arc::clone(hit));
        }

        let descriptors: Arc<[ParameterDescriptor]> =
            provider.parameter_descriptors(type_name)?.into();
        let mut entries = self.entries.write();
        /* another thread may have populated it in between; keep the first */
        let entry = entries
            .entry(type_name.to_string())
            .or_insert(descriptors);
        Some(Arc::clone(entry))
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.entries.read().contains_key(type_name)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
