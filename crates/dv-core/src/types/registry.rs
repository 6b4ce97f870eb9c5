//! Registry of data types
//!
//! Built once through [`TypeRegistryBuilder`] and read-only afterwards.

use std::sync::Arc;

use indexmap::IndexMap;
use tracing::debug;

use super::{Container, DateType, TypeDescriptor, VideoFrameType};
use crate::RegistryError;

/// Builder that validates each descriptor as it is registered
#[derive(Default)]
pub struct TypeRegistryBuilder {
    descriptors: IndexMap<&'static str, Arc<dyn TypeDescriptor>>,
}

impl TypeRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a descriptor.
    ///
    /// Fails on duplicate names and on required properties the schema does not declare.
    pub fn register<D: TypeDescriptor + 'static>(mut self, descriptor: D) -> Result<Self, RegistryError> {
        let name = descriptor.name();
        if self.descriptors.contains_key(name) {
            return Err(RegistryError::DuplicateType(name.to_string()));
        }

        let undeclared = descriptor.schema().undeclared_required();
        if !undeclared.is_empty() {
            return Err(RegistryError::UndeclaredRequired {
                data_type: name.to_string(),
                properties: undeclared.iter().map(|p| p.to_string()).collect(),
            });
        }

        debug!(data_type = name, "registered data type");
        self.descriptors.insert(name, Arc::new(descriptor));
        Ok(self)
    }

    /// Freeze the registry
    pub fn build(self) -> TypeRegistry {
        TypeRegistry {
            descriptors: self.descriptors,
        }
    }
}

/// Ordered, read-only collection of data types indexed by name
#[derive(Clone)]
pub struct TypeRegistry {
    descriptors: IndexMap<&'static str, Arc<dyn TypeDescriptor>>,
}

impl TypeRegistry {
    pub fn builder() -> TypeRegistryBuilder {
        TypeRegistryBuilder::new()
    }

    /// Registry holding the built-in date and video frame types
    pub fn with_defaults() -> Result<Self, RegistryError> {
        Ok(Self::builder()
            .register(DateType::new())?
            .register(VideoFrameType::new())?
            .build())
    }

    pub fn get(&self, name: &str) -> Option<&dyn TypeDescriptor> {
        self.descriptors.get(name).map(|d| d.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.descriptors.contains_key(name)
    }

    /// Descriptor that produced a container
    pub fn descriptor_for(&self, container: &Container) -> Option<&dyn TypeDescriptor> {
        self.get(container.data_type())
    }

    /// Descriptors in registration order
    pub fn iter(&self) -> impl Iterator<Item = &dyn TypeDescriptor> + '_ {
        self.descriptors.values().map(|d| d.as_ref())
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.descriptors.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

impl std::fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.descriptors.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PropertyKind, TypeSchema, TypeValue};

    #[derive(Debug)]
    struct BrokenType {
        schema: TypeSchema,
    }

    impl TypeDescriptor for BrokenType {
        fn name(&self) -> &'static str {
            "broken"
        }

        fn schema(&self) -> &TypeSchema {
            &self.schema
        }

        fn parse_string(&self, _container: &mut Container, _raw: &str) -> bool {
            false
        }

        fn make_into_string(&self, _container: &Container) -> Option<String> {
            None
        }

        fn value(&self, _container: &Container) -> Option<TypeValue> {
            None
        }
    }

    #[test]
    fn test_defaults_keep_registration_order() {
        let registry = TypeRegistry::with_defaults().unwrap();
        let names: Vec<_> = registry.names().collect();
        assert_eq!(names, vec![DateType::NAME, VideoFrameType::NAME]);
    }

    #[test]
    fn test_rejects_duplicates() {
        let result = TypeRegistry::builder()
            .register(DateType::new())
            .and_then(|b| b.register(DateType::new()));
        assert!(matches!(result, Err(RegistryError::DuplicateType(_))));
    }

    #[test]
    fn test_rejects_undeclared_required() {
        let broken = BrokenType {
            schema: TypeSchema::new()
                .property("a", PropertyKind::Number)
                .require(&["b"]),
        };
        let result = TypeRegistry::builder().register(broken);
        assert!(matches!(result, Err(RegistryError::UndeclaredRequired { .. })));
    }

    #[test]
    fn test_descriptor_for_container() {
        let registry = TypeRegistry::with_defaults().unwrap();
        let container = registry.get(VideoFrameType::NAME).unwrap().create_container();
        assert_eq!(registry.descriptor_for(&container).unwrap().name(), VideoFrameType::NAME);
    }
}
