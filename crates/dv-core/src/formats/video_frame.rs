//! Video frame record format

use serde_json::{Map, Value};

use super::{numeric, Extraction, FormatError, FormatReader};
use crate::types::{Container, TypeDescriptor, VideoFrameType};

const FRAME_TYPES: &[&str] = &[VideoFrameType::NAME];

/// Read a frame from `frame` (number or compact string) plus optional
/// `maxFrame` and `frameRate` fields
pub(crate) fn read_frame(descriptor: &dyn TypeDescriptor, element: &Value) -> Option<Container> {
    let mut object = match numeric(element.get("frame")?) {
        Some(index) => {
            let mut object = Map::new();
            object.insert("value".to_string(), index);
            object
        }
        None => {
            let text = element.get("frame")?.as_str()?;
            let mut parsed = descriptor.create_container();
            if !descriptor.parse_string(&mut parsed, text) {
                return None;
            }
            parsed.to_object()
        }
    };

    for key in ["maxFrame", "frameRate"] {
        if let Some(value) = element.get(key).and_then(numeric) {
            object.entry(key.to_string()).or_insert(value);
        }
    }

    let mut container = descriptor.create_container();
    descriptor
        .populate_from_object(&mut container, &object)
        .then_some(container)
}

/// Write a frame as `frame`, `maxFrame` and `frameRate` fields
pub(crate) fn write_frame(
    element: &mut Map<String, Value>,
    descriptor: &dyn TypeDescriptor,
    container: &Container,
) -> Result<(), FormatError> {
    if !container.is_valid() {
        return Err(FormatError::Unwritable {
            data_type: descriptor.name(),
            reason: format!("missing {:?}", container.missing_required()),
        });
    }

    for (key, value) in container.to_object() {
        let key = if key == "value" { "frame".to_string() } else { key };
        element.insert(key, value);
    }
    Ok(())
}

/// Records carrying a `frame` field: `{"frame": 42, "maxFrame": 120}`
#[derive(Debug, Default)]
pub struct VideoFrameFormat;

impl VideoFrameFormat {
    pub const NAME: &'static str = "s2VideoFrame";
}

impl FormatReader for VideoFrameFormat {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn available_data_types(&self) -> &'static [&'static str] {
        FRAME_TYPES
    }

    fn required_data_types(&self) -> &'static [&'static str] {
        FRAME_TYPES
    }

    fn read_type(&self, descriptor: &dyn TypeDescriptor, element: &Value, _prior: &Extraction) -> Option<Container> {
        read_frame(descriptor, element)
    }

    fn write_type(
        &self,
        element: &mut Map<String, Value>,
        descriptor: &dyn TypeDescriptor,
        container: &Container,
    ) -> Result<(), FormatError> {
        write_frame(element, descriptor, container)
    }
}
