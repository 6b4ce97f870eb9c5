//! Registry of record formats

use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;
use tracing::debug;

use super::{DateColumnsFormat, DateFormat, FormatReader, TimelineFormat, VideoFrameFormat};
use crate::types::TypeRegistry;
use crate::RegistryError;

/// Builder validating readers against a frozen type registry
pub struct FormatRegistryBuilder<'a> {
    types: &'a TypeRegistry,
    readers: IndexMap<&'static str, Arc<dyn FormatReader>>,
}

impl<'a> FormatRegistryBuilder<'a> {
    pub fn new(types: &'a TypeRegistry) -> Self {
        Self {
            types,
            readers: IndexMap::new(),
        }
    }

    /// Register a reader.
    ///
    /// Its required types must be available, and every type it names must be registered.
    pub fn register<R: FormatReader + 'static>(mut self, reader: R) -> Result<Self, RegistryError> {
        let name = reader.name();
        if self.readers.contains_key(name) {
            return Err(RegistryError::DuplicateFormat(name.to_string()));
        }

        for required in reader.required_data_types() {
            if !reader.supports(required) {
                return Err(RegistryError::RequiredNotAvailable {
                    format: name.to_string(),
                    data_type: required.to_string(),
                });
            }
        }

        for data_type in reader.available_data_types() {
            if !self.types.contains(data_type) {
                return Err(RegistryError::UnknownType {
                    format: name.to_string(),
                    data_type: data_type.to_string(),
                });
            }
        }

        debug!(format = name, available = ?reader.available_data_types(), "registered format");
        self.readers.insert(name, Arc::new(reader));
        Ok(self)
    }

    pub fn build(self) -> FormatRegistry {
        FormatRegistry {
            readers: self.readers,
        }
    }
}

/// Ordered, read-only collection of formats indexed by name
#[derive(Clone)]
pub struct FormatRegistry {
    readers: IndexMap<&'static str, Arc<dyn FormatReader>>,
}

impl FormatRegistry {
    pub fn builder(types: &TypeRegistry) -> FormatRegistryBuilder<'_> {
        FormatRegistryBuilder::new(types)
    }

    /// Registry holding the built-in formats
    pub fn with_defaults(types: &TypeRegistry) -> Result<Self, RegistryError> {
        Ok(Self::builder(types)
            .register(DateFormat)?
            .register(DateColumnsFormat)?
            .register(VideoFrameFormat)?
            .register(TimelineFormat)?
            .build())
    }

    pub fn get(&self, name: &str) -> Option<&dyn FormatReader> {
        self.readers.get(name).map(|r| r.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.readers.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn FormatReader> + '_ {
        self.readers.values().map(|r| r.as_ref())
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.readers.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.readers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readers.is_empty()
    }

    /// First format, in registration order, whose required types all come out of `record`
    pub fn detect(&self, record: &Value, types: &TypeRegistry) -> Option<&'static str> {
        self.iter()
            .find(|reader| reader.matches(record, types))
            .map(|reader| reader.name())
    }
}

impl std::fmt::Debug for FormatRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.readers.keys()).finish()
    }
}
