//! In-memory datasets
//!
//! A dataset is a sequence of records. Each record maps field names to either
//! the raw value read from the source or a typed container once the field has
//! been formatted. Once a format is known, each record also carries the values
//! its format reader extracts from it.

use dv_core::{Container, Extracted, FormatReader, TypeRegistry, TypedElement};
use indexmap::IndexMap;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::VisControllerDataError;

/// Field name to data type name mapping
pub type FieldTypeMap = IndexMap<String, String>;

/// One record, keyed by field name in source order
pub type Record = IndexMap<String, FieldValue>;

/// A record field, raw or typed. Typed fields keep the value they were read from.
#[derive(Debug, Clone)]
pub enum FieldValue {
    Raw(Value),
    Typed { source: Value, container: Container },
}

impl FieldValue {
    pub fn raw(&self) -> Option<&Value> {
        match self {
            FieldValue::Raw(value) => Some(value),
            FieldValue::Typed { .. } => None,
        }
    }

    pub fn container(&self) -> Option<&Container> {
        match self {
            FieldValue::Raw(_) => None,
            FieldValue::Typed { container, .. } => Some(container),
        }
    }

    /// The value as read from the source, typed or not
    pub fn source(&self) -> &Value {
        match self {
            FieldValue::Raw(value) => value,
            FieldValue::Typed { source, .. } => source,
        }
    }

    pub fn to_json(&self) -> Value {
        self.source().clone()
    }
}

/// Build a record from a JSON object
pub fn record_from_object(object: Map<String, Value>) -> Record {
    object
        .into_iter()
        .map(|(key, value)| (key, FieldValue::Raw(value)))
        .collect()
}

/// JSON form of a record in its source shape
pub fn record_to_json(record: &Record) -> Value {
    Value::Object(
        record
            .iter()
            .map(|(key, value)| (key.clone(), value.to_json()))
            .collect(),
    )
}

/// A loaded dataset
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    records: Vec<Record>,
    source_name: Option<String>,
    format: Option<String>,
    field_types: FieldTypeMap,
    extracted: Vec<TypedElement>,
}

impl Dataset {
    pub fn new(records: Vec<Record>) -> Self {
        Self {
            records,
            ..Self::default()
        }
    }

    /// Build a dataset from a JSON array of objects or a single object.
    ///
    /// Array elements that are not objects are skipped.
    pub fn from_json(value: Value) -> Result<Self, VisControllerDataError> {
        let records = match value {
            Value::Array(items) => items
                .into_iter()
                .enumerate()
                .filter_map(|(index, item)| match item {
                    Value::Object(object) => Some(record_from_object(object)),
                    other => {
                        warn!(index, value = %other, "skipping non-object record");
                        None
                    }
                })
                .collect(),
            Value::Object(object) => vec![record_from_object(object)],
            _ => return Err(VisControllerDataError::NotRecords),
        };

        Ok(Self::new(records))
    }

    pub fn with_source_name(mut self, name: impl Into<String>) -> Self {
        self.source_name = Some(name.into());
        self
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn records_mut(&mut self) -> &mut [Record] {
        &mut self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn source_name(&self) -> Option<&str> {
        self.source_name.as_deref()
    }

    /// Name of the format used to interpret the records
    pub fn format(&self) -> Option<&str> {
        self.format.as_deref()
    }

    /// Change the format. Values extracted under the previous format are dropped.
    pub fn set_format(&mut self, format: Option<String>) {
        if self.format != format {
            self.extracted.clear();
        }
        self.format = format;
    }

    /// Run `reader` over every record and keep the values it extracts.
    ///
    /// Returns the number of containers extracted.
    pub fn extract_with(&mut self, reader: &dyn FormatReader, types: &TypeRegistry) -> usize {
        let mut total = 0;
        self.extracted = self
            .records
            .iter()
            .enumerate()
            .map(|(index, record)| {
                let element: TypedElement = reader
                    .data_types_from_value(&record_to_json(record), types)
                    .into_iter()
                    .filter_map(|(name, extracted)| match extracted {
                        Extracted::Present(container) => Some((name.to_string(), container)),
                        Extracted::Absent => None,
                    })
                    .collect();
                if element.is_empty() {
                    debug!(record = index, format = reader.name(), "record yields no values in this format");
                }
                total += element.len();
                element
            })
            .collect();
        total
    }

    /// Values the format reader extracted from record `index`
    pub fn extracted(&self, index: usize) -> Option<&TypedElement> {
        self.extracted.get(index)
    }

    /// Field to type mapping applied so far
    pub fn field_types(&self) -> &FieldTypeMap {
        &self.field_types
    }

    pub(crate) fn merge_field_types(&mut self, map: &FieldTypeMap) {
        for (field, data_type) in map {
            self.field_types.insert(field.clone(), data_type.clone());
        }
    }

    /// Raw JSON of the first record, used to detect the format
    pub fn first_raw(&self) -> Option<Value> {
        self.records.first().map(record_to_json)
    }

    /// Every container of `data_type`, in record then field order.
    ///
    /// A record contributes its typed fields of that type; a record with none
    /// contributes the value its format reader extracted, if any.
    pub fn containers_of(&self, data_type: &str) -> Vec<Container> {
        let mut containers = Vec::new();
        for (index, record) in self.records.iter().enumerate() {
            let before = containers.len();
            containers.extend(
                record
                    .values()
                    .filter_map(FieldValue::container)
                    .filter(|container| container.data_type() == data_type)
                    .cloned(),
            );
            if containers.len() == before {
                if let Some(container) = self.extracted(index).and_then(|element| element.get(data_type)) {
                    containers.push(container.clone());
                }
            }
        }
        containers
    }

    /// One composite element per record, holding the first container of each
    /// type; typed fields take precedence over extracted values
    pub fn typed_elements(&self) -> Vec<TypedElement> {
        self.records
            .iter()
            .enumerate()
            .map(|(index, record)| {
                let mut element = TypedElement::new();
                for container in record.values().filter_map(FieldValue::container) {
                    element
                        .entry(container.data_type().to_string())
                        .or_insert_with(|| container.clone());
                }
                if let Some(extracted) = self.extracted(index) {
                    for (name, container) in extracted {
                        element.entry(name.clone()).or_insert_with(|| container.clone());
                    }
                }
                element
            })
            .collect()
    }
}
