//! Wire/file formats
//!
//! A [`FormatReader`] knows how to pull typed containers out of one raw record
//! shape, how to write containers back into that shape, and how to express a
//! range in it. Readers are stateless.

use std::fmt::Debug;

use indexmap::IndexMap;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{error, warn};

use crate::types::{Container, RangePair, TypeDescriptor, TypeRegistry, TypedElement};

mod date;
mod registry;
mod timeline;
mod video_frame;

pub use date::{DateColumnsFormat, DateFormat};
pub use registry::{FormatRegistry, FormatRegistryBuilder};
pub use timeline::TimelineFormat;
pub use video_frame::VideoFrameFormat;

/// Errors raised when synthesizing records
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FormatError {
    #[error("format '{format}' requires a '{data_type}' value")]
    MissingRequiredType { format: &'static str, data_type: String },

    #[error("format '{format}' cannot express '{data_type}'")]
    UnsupportedType { format: &'static str, data_type: String },

    #[error("data type '{0}' is not registered")]
    UnknownType(String),

    #[error("format '{format}' got a '{found}' container filed under '{data_type}'")]
    MismatchedContainer {
        format: &'static str,
        data_type: String,
        found: &'static str,
    },

    #[error("{bound} bound of '{data_type}' range is missing {properties:?}")]
    IncompleteBound {
        bound: &'static str,
        data_type: &'static str,
        properties: Vec<&'static str>,
    },

    #[error("'{data_type}' value cannot be written: {reason}")]
    Unwritable { data_type: &'static str, reason: String },
}

/// Result of extracting one type from a record
#[derive(Debug, Clone)]
pub enum Extracted {
    Present(Container),
    Absent,
}

impl Extracted {
    pub fn container(&self) -> Option<&Container> {
        match self {
            Extracted::Present(c) => Some(c),
            Extracted::Absent => None,
        }
    }

    pub fn is_present(&self) -> bool {
        matches!(self, Extracted::Present(_))
    }
}

/// Per-type extraction results keyed by type name, in type registry order
pub type Extraction = IndexMap<&'static str, Extracted>;

/// Number from a JSON number or a numeric string
pub(crate) fn numeric(value: &Value) -> Option<Value> {
    match value {
        Value::Number(_) => Some(value.clone()),
        Value::String(s) => {
            let s = s.trim();
            if let Ok(n) = s.parse::<u64>() {
                Some(Value::from(n))
            } else if let Ok(n) = s.parse::<i64>() {
                Some(Value::from(n))
            } else {
                s.parse::<f64>().ok().filter(|f| f.is_finite()).map(Value::from)
            }
        }
        _ => None,
    }
}

/// Definition of one raw record shape
pub trait FormatReader: Send + Sync + Debug {
    /// Unique registry name
    fn name(&self) -> &'static str;

    /// Types this format can ever produce
    fn available_data_types(&self) -> &'static [&'static str];

    /// Types that must be derivable for a record to be in this format
    fn required_data_types(&self) -> &'static [&'static str];

    /// Read one available type from one record
    fn read_type(&self, descriptor: &dyn TypeDescriptor, element: &Value, prior: &Extraction) -> Option<Container>;

    /// Write one available type into a record
    fn write_type(
        &self,
        element: &mut Map<String, Value>,
        descriptor: &dyn TypeDescriptor,
        container: &Container,
    ) -> Result<(), FormatError>;

    fn supports(&self, data_type: &str) -> bool {
        self.available_data_types().contains(&data_type)
    }

    /// Extract a single named type from a record.
    ///
    /// Unsupported or unknown types are logged and yield `None`.
    fn get_from_element(
        &self,
        data_type: &str,
        element: &Value,
        prior: &Extraction,
        types: &TypeRegistry,
    ) -> Option<Container> {
        if !self.supports(data_type) {
            warn!(format = self.name(), data_type, "format does not provide this data type");
            return None;
        }

        let Some(descriptor) = types.get(data_type) else {
            error!(format = self.name(), data_type, registry = ?types, "data type is not registered");
            return None;
        };

        self.read_type(descriptor, element, prior)
    }

    /// Extract every registered type from a record, or from the first
    /// element of an array-shaped record
    fn data_types_from_value(&self, value: &Value, types: &TypeRegistry) -> Extraction {
        let mut extraction = Extraction::new();
        let record = match value {
            Value::Array(items) => items.first(),
            other => Some(other),
        };

        for descriptor in types.iter() {
            let name = descriptor.name();
            let extracted = match record {
                Some(record) if self.supports(name) => {
                    match self.get_from_element(name, record, &extraction, types) {
                        Some(container) => Extracted::Present(container),
                        None => Extracted::Absent,
                    }
                }
                _ => Extracted::Absent,
            };
            extraction.insert(name, extracted);
        }

        extraction
    }

    /// Whether every required type can be extracted from a record
    fn matches(&self, value: &Value, types: &TypeRegistry) -> bool {
        let extraction = self.data_types_from_value(value, types);
        self.required_data_types()
            .iter()
            .all(|name| extraction.get(name).is_some_and(Extracted::is_present))
    }

    /// Synthesize a record from typed values
    fn make_element_from_values(&self, values: &TypedElement, types: &TypeRegistry) -> Result<Value, FormatError> {
        for required in self.required_data_types() {
            if !values.contains_key(*required) {
                error!(format = self.name(), data_type = *required, values = ?values, "required data type missing");
                return Err(FormatError::MissingRequiredType {
                    format: self.name(),
                    data_type: required.to_string(),
                });
            }
        }

        let mut element = Map::new();
        for (name, container) in values {
            if !self.supports(name) {
                warn!(format = self.name(), data_type = name.as_str(), "skipping value the format cannot express");
                continue;
            }
            let descriptor = types
                .get(name)
                .ok_or_else(|| FormatError::UnknownType(name.clone()))?;
            if !descriptor.owns(container) {
                error!(format = self.name(), data_type = name.as_str(), container = ?container, "container filed under the wrong data type");
                return Err(FormatError::MismatchedContainer {
                    format: self.name(),
                    data_type: name.clone(),
                    found: container.data_type(),
                });
            }
            self.write_type(&mut element, descriptor, container)?;
        }

        Ok(Value::Object(element))
    }

    /// Express the bounds of a range as plain records in this format's shape
    fn generate_range_values_from_data(
        &self,
        range: &RangePair,
        types: &TypeRegistry,
    ) -> Result<(Value, Value), FormatError> {
        let data_type = range.data_type();
        if !self.supports(data_type) {
            error!(format = self.name(), data_type, "range type is not available in this format");
            return Err(FormatError::UnsupportedType {
                format: self.name(),
                data_type: data_type.to_string(),
            });
        }
        let descriptor = types
            .get(data_type)
            .ok_or_else(|| FormatError::UnknownType(data_type.to_string()))?;

        let mut bounds = Vec::with_capacity(2);
        for (bound, container) in [("min", &range.min), ("max", &range.max)] {
            let missing = container.missing_required();
            if !missing.is_empty() || container.data_type() != data_type {
                error!(format = self.name(), bound, container = ?container, "range bound is incomplete");
                return Err(FormatError::IncompleteBound {
                    bound,
                    data_type,
                    properties: missing,
                });
            }

            let mut element = Map::new();
            self.write_type(&mut element, descriptor, container)?;
            bounds.push(Value::Object(element));
        }

        let max = bounds.pop().unwrap_or(Value::Null);
        let min = bounds.pop().unwrap_or(Value::Null);
        Ok((min, max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_numeric_coercion() {
        assert_eq!(numeric(&json!("42")), Some(json!(42)));
        assert_eq!(numeric(&json!(" -3 ")), Some(json!(-3)));
        assert_eq!(numeric(&json!("2.5")), Some(json!(2.5)));
        assert_eq!(numeric(&json!(7)), Some(json!(7)));
        assert_eq!(numeric(&json!("abc")), None);
        assert_eq!(numeric(&json!(null)), None);
    }
}
