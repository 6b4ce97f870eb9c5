//! Schema-checked value holders for registered data types

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Semantic kind of a schema property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropertyKind {
    Number,
    String,
    Object,
}

impl PropertyKind {
    /// Whether a JSON value has this kind
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            PropertyKind::Number => value.is_number(),
            PropertyKind::String => value.is_string(),
            PropertyKind::Object => value.is_object(),
        }
    }
}

/// Declared properties of a data type plus the subset that must be present
#[derive(Debug, Clone, Default)]
pub struct TypeSchema {
    properties: IndexMap<&'static str, PropertyKind>,
    required: Vec<&'static str>,
}

impl TypeSchema {
    /// Create an empty schema
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a property
    pub fn property(mut self, name: &'static str, kind: PropertyKind) -> Self {
        self.properties.insert(name, kind);
        self
    }

    /// Mark properties as required
    pub fn require(mut self, names: &[&'static str]) -> Self {
        for name in names {
            if !self.required.contains(name) {
                self.required.push(name);
            }
        }
        self
    }

    /// Kind of a declared property
    pub fn kind_of(&self, name: &str) -> Option<PropertyKind> {
        self.properties.get(name).copied()
    }

    /// Declared property names in declaration order
    pub fn properties(&self) -> impl Iterator<Item = (&'static str, PropertyKind)> + '_ {
        self.properties.iter().map(|(name, kind)| (*name, *kind))
    }

    /// Required property names
    pub fn required(&self) -> &[&'static str] {
        &self.required
    }

    /// Required names that are not declared as properties
    pub fn undeclared_required(&self) -> Vec<&'static str> {
        self.required
            .iter()
            .filter(|name| !self.properties.contains_key(*name))
            .copied()
            .collect()
    }
}

#[derive(Debug, Clone)]
struct Slot {
    kind: PropertyKind,
    required: bool,
    value: Option<Value>,
}

/// One instance of a registered data type.
///
/// Containers are only created through [`TypeDescriptor::create_container`](super::TypeDescriptor::create_container)
/// and always carry the registry name of the type that made them. Properties
/// are only written by the owning descriptor, and containers are compared
/// through [`TypeDescriptor::compare`](super::TypeDescriptor::compare).
///
/// ```compile_fail
/// use dv_core::types::DateType;
/// use dv_core::TypeDescriptor;
///
/// let date = DateType::new();
/// let mut container = date.create_container();
/// container.set("year", serde_json::json!(2017));
/// ```
///
/// ```compile_fail
/// use dv_core::types::DateType;
/// use dv_core::TypeDescriptor;
///
/// let date = DateType::new();
/// assert!(date.create_container() == date.create_container());
/// ```
#[derive(Debug, Clone)]
pub struct Container {
    data_type: &'static str,
    slots: IndexMap<&'static str, Slot>,
}

impl Container {
    pub(crate) fn empty(data_type: &'static str, schema: &TypeSchema) -> Self {
        let slots = schema
            .properties()
            .map(|(name, kind)| {
                let slot = Slot {
                    kind,
                    required: schema.required().contains(&name),
                    value: None,
                };
                (name, slot)
            })
            .collect();

        Self { data_type, slots }
    }

    /// Registry name of the type this container belongs to
    pub fn data_type(&self) -> &'static str {
        self.data_type
    }

    /// Raw value of a property, if set
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.slots.get(name).and_then(|slot| slot.value.as_ref())
    }

    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(Value::as_i64)
    }

    pub fn get_f64(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(Value::as_f64)
    }

    /// Set a property. Fails for undeclared names and values of the wrong kind.
    pub(crate) fn set(&mut self, name: &str, value: Value) -> bool {
        match self.slots.get_mut(name) {
            Some(slot) if slot.kind.accepts(&value) => {
                slot.value = Some(value);
                true
            }
            _ => false,
        }
    }

    /// Reset every property to empty
    pub(crate) fn clear(&mut self) {
        for slot in self.slots.values_mut() {
            slot.value = None;
        }
    }

    /// Whether every required property is set
    pub fn is_valid(&self) -> bool {
        self.missing_required().is_empty()
    }

    /// Required properties that are still empty
    pub fn missing_required(&self) -> Vec<&'static str> {
        self.slots
            .iter()
            .filter(|(_, slot)| slot.required && slot.value.is_none())
            .map(|(name, _)| *name)
            .collect()
    }

    /// Set properties as a JSON object
    pub fn to_object(&self) -> Map<String, Value> {
        self.slots
            .iter()
            .filter_map(|(name, slot)| slot.value.clone().map(|v| (name.to_string(), v)))
            .collect()
    }

    /// Self-describing JSON form: `{"dataType": ..., "fields": {...}}`
    pub fn to_json(&self) -> Value {
        serde_json::json!({
            "dataType": self.data_type,
            "fields": Value::Object(self.to_object()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> TypeSchema {
        TypeSchema::new()
            .property("a", PropertyKind::Number)
            .property("b", PropertyKind::String)
            .require(&["a"])
    }

    #[test]
    fn test_empty_container_has_no_values() {
        let container = Container::empty("t", &schema());
        assert_eq!(container.data_type(), "t");
        assert!(container.get("a").is_none());
        assert!(container.get("b").is_none());
        assert_eq!(container.missing_required(), vec!["a"]);
    }

    #[test]
    fn test_set_checks_kind_and_name() {
        let mut container = Container::empty("t", &schema());
        assert!(!container.set("a", json!("text")));
        assert!(!container.set("missing", json!(1)));
        assert!(container.set("a", json!(3)));
        assert!(container.is_valid());
        assert_eq!(container.get_i64("a"), Some(3));
    }

    #[test]
    fn test_undeclared_required() {
        let schema = TypeSchema::new()
            .property("a", PropertyKind::Number)
            .require(&["a", "z"]);
        assert_eq!(schema.undeclared_required(), vec!["z"]);
    }
}
