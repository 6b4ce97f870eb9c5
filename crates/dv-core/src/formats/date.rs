//! Date record formats

use serde_json::{Map, Value};

use super::{numeric, Extraction, FormatError, FormatReader};
use crate::types::{Container, DateType, TypeDescriptor};

const DATE_TYPES: &[&str] = &[DateType::NAME];

/// Read a date from a compact string or a `{year, month, day}` object
pub(crate) fn read_date(descriptor: &dyn TypeDescriptor, value: &Value) -> Option<Container> {
    let mut container = descriptor.create_container();
    let ok = match value {
        Value::String(s) => descriptor.parse_string(&mut container, s),
        Value::Object(object) => descriptor.populate_from_object(&mut container, object),
        _ => false,
    };
    ok.then_some(container)
}

/// Write a value's compact string form under `key`
pub(crate) fn write_compact(
    element: &mut Map<String, Value>,
    key: &str,
    descriptor: &dyn TypeDescriptor,
    container: &Container,
) -> Result<(), FormatError> {
    let text = descriptor
        .make_into_string(container)
        .ok_or_else(|| FormatError::Unwritable {
            data_type: descriptor.name(),
            reason: format!("missing {:?}", container.missing_required()),
        })?;
    element.insert(key.to_string(), Value::String(text));
    Ok(())
}

/// Records carrying a `date` field: `{"date": "2017!07!10"}`
#[derive(Debug, Default)]
pub struct DateFormat;

impl DateFormat {
    pub const NAME: &'static str = "s2Date";
}

impl FormatReader for DateFormat {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn available_data_types(&self) -> &'static [&'static str] {
        DATE_TYPES
    }

    fn required_data_types(&self) -> &'static [&'static str] {
        DATE_TYPES
    }

    fn read_type(&self, descriptor: &dyn TypeDescriptor, element: &Value, _prior: &Extraction) -> Option<Container> {
        read_date(descriptor, element.get("date")?)
    }

    fn write_type(
        &self,
        element: &mut Map<String, Value>,
        descriptor: &dyn TypeDescriptor,
        container: &Container,
    ) -> Result<(), FormatError> {
        write_compact(element, "date", descriptor, container)
    }
}

/// Records with one column per date component: `{"year": .., "month": .., "day": ..}`
#[derive(Debug, Default)]
pub struct DateColumnsFormat;

impl DateColumnsFormat {
    pub const NAME: &'static str = "s2DateColumns";
    const COLUMNS: [&'static str; 3] = ["year", "month", "day"];
}

impl FormatReader for DateColumnsFormat {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn available_data_types(&self) -> &'static [&'static str] {
        DATE_TYPES
    }

    fn required_data_types(&self) -> &'static [&'static str] {
        DATE_TYPES
    }

    fn read_type(&self, descriptor: &dyn TypeDescriptor, element: &Value, _prior: &Extraction) -> Option<Container> {
        let mut object = Map::new();
        for column in Self::COLUMNS {
            object.insert(column.to_string(), numeric(element.get(column)?)?);
        }

        let mut container = descriptor.create_container();
        descriptor
            .populate_from_object(&mut container, &object)
            .then_some(container)
    }

    fn write_type(
        &self,
        element: &mut Map<String, Value>,
        descriptor: &dyn TypeDescriptor,
        container: &Container,
    ) -> Result<(), FormatError> {
        let value = descriptor.value(container).ok_or_else(|| FormatError::Unwritable {
            data_type: descriptor.name(),
            reason: format!("missing {:?}", container.missing_required()),
        })?;

        for column in Self::COLUMNS {
            if let Some(component) = value.get(column) {
                element.insert(column.to_string(), component.clone());
            }
        }
        Ok(())
    }
}
