//! Semantic data types
//!
//! A [`TypeDescriptor`] defines one data type: its schema, how a [`Container`]
//! is parsed from and written to its compact string form, its plain value
//! projection, and the total order and range computation built on top of it.

use std::cmp::Ordering;
use std::fmt::Debug;

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

mod container;
mod date;
mod registry;
mod video_frame;

pub use container::{Container, PropertyKind, TypeSchema};
pub use date::DateType;
pub use registry::{TypeRegistry, TypeRegistryBuilder};
pub use video_frame::VideoFrameType;

/// A composite element holding containers keyed by type name
pub type TypedElement = IndexMap<String, Container>;

/// Errors raised by type operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TypeError {
    #[error("range of an empty collection of '{data_type}' is undefined")]
    EmptyRange { data_type: &'static str },

    #[error("expected a '{expected}' container, found '{found}'")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("element {index} holds no '{data_type}' value")]
    MissingElementValue { data_type: &'static str, index: usize },
}

/// Plain projection of a container
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeValue {
    /// Key the type's total order is defined on
    #[serde(skip)]
    pub sort_key: f64,
    #[serde(flatten)]
    pub components: Map<String, Value>,
}

impl TypeValue {
    pub fn new(sort_key: f64) -> Self {
        Self {
            sort_key,
            components: Map::new(),
        }
    }

    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.components.insert(name.to_string(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.components.get(name)
    }

    pub fn to_json(&self) -> Value {
        Value::Object(self.components.clone())
    }
}

/// Input shapes accepted by [`TypeDescriptor::range_information`]
#[derive(Debug, Clone, Copy)]
pub enum RangeInput<'a> {
    /// Containers of the type itself
    Containers(&'a [Container]),
    /// Composite elements, each holding a container under the type's name
    Elements(&'a [TypedElement]),
}

impl<'a> RangeInput<'a> {
    fn len(&self) -> usize {
        match self {
            RangeInput::Containers(items) => items.len(),
            RangeInput::Elements(items) => items.len(),
        }
    }

    fn get(&self, index: usize, data_type: &'static str) -> Result<&'a Container, TypeError> {
        match *self {
            RangeInput::Containers(items) => Ok(&items[index]),
            RangeInput::Elements(items) => items[index]
                .get(data_type)
                .ok_or(TypeError::MissingElementValue { data_type, index }),
        }
    }
}

/// Minimum and maximum of a collection under a type's order
#[derive(Debug, Clone)]
pub struct RangePair {
    pub min: Container,
    pub max: Container,
}

impl RangePair {
    pub fn data_type(&self) -> &'static str {
        self.min.data_type()
    }
}

/// Order two optional projections: missing projections sort first
pub fn compare_values(a: Option<&TypeValue>, b: Option<&TypeValue>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => a.sort_key.total_cmp(&b.sort_key),
    }
}

/// Definition of one semantic data type
pub trait TypeDescriptor: Send + Sync + Debug {
    /// Unique registry name
    fn name(&self) -> &'static str;

    /// Declared properties of the type's containers
    fn schema(&self) -> &TypeSchema;

    /// Populate `container` from the compact string form.
    ///
    /// On failure the container is left empty and `false` is returned.
    fn parse_string(&self, container: &mut Container, raw: &str) -> bool;

    /// Compact string form, the inverse of [`parse_string`](Self::parse_string)
    fn make_into_string(&self, container: &Container) -> Option<String>;

    /// Plain projection, `None` when the container is not valid
    fn value(&self, container: &Container) -> Option<TypeValue>;

    /// Create a container with every property empty
    fn create_container(&self) -> Container {
        Container::empty(self.name(), self.schema())
    }

    /// Whether a container was produced by this type
    fn owns(&self, container: &Container) -> bool {
        container.data_type() == self.name()
    }

    /// Populate `container` from a JSON object keyed by property name.
    ///
    /// All-or-nothing: on failure the container is left empty.
    fn populate_from_object(&self, container: &mut Container, object: &Map<String, Value>) -> bool {
        if !self.owns(container) {
            return false;
        }

        let mut filled = self.create_container();
        for (name, _) in self.schema().properties() {
            if let Some(value) = object.get(name) {
                if !filled.set(name, value.clone()) {
                    container.clear();
                    return false;
                }
            }
        }

        if filled.is_valid() && self.value(&filled).is_some() {
            *container = filled;
            true
        } else {
            container.clear();
            false
        }
    }

    /// Total order over two containers of this type, defined on [`value`](Self::value)
    fn compare(&self, a: &Container, b: &Container) -> Ordering {
        compare_values(self.value(a).as_ref(), self.value(b).as_ref())
    }

    /// Minimum and maximum of `input` in a single comparator pass
    fn range_information(&self, input: RangeInput<'_>) -> Result<RangePair, TypeError> {
        let data_type = self.name();
        if input.len() == 0 {
            return Err(TypeError::EmptyRange { data_type });
        }

        let mut min = input.get(0, data_type)?;
        if !self.owns(min) {
            return Err(TypeError::TypeMismatch {
                expected: data_type,
                found: min.data_type(),
            });
        }
        let mut max = min;

        for index in 1..input.len() {
            let item = input.get(index, data_type)?;
            if !self.owns(item) {
                return Err(TypeError::TypeMismatch {
                    expected: data_type,
                    found: item.data_type(),
                });
            }

            if self.compare(item, min) == Ordering::Less {
                min = item;
            } else if self.compare(item, max) == Ordering::Greater {
                max = item;
            }
        }

        Ok(RangePair {
            min: min.clone(),
            max: max.clone(),
        })
    }
}
