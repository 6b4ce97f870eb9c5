//! Dated video timeline records: `{"date": "2017!07!10", "frame": "42/120"}`

use serde_json::{Map, Value};

use super::date::{read_date, write_compact};
use super::video_frame::{read_frame, write_frame};
use super::{Extraction, FormatError, FormatReader};
use crate::types::{Container, DateType, TypeDescriptor, VideoFrameType};

#[derive(Debug, Default)]
pub struct TimelineFormat;

impl TimelineFormat {
    pub const NAME: &'static str = "s2Timeline";
}

impl FormatReader for TimelineFormat {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn available_data_types(&self) -> &'static [&'static str] {
        &[DateType::NAME, VideoFrameType::NAME]
    }

    fn required_data_types(&self) -> &'static [&'static str] {
        &[DateType::NAME]
    }

    fn read_type(&self, descriptor: &dyn TypeDescriptor, element: &Value, _prior: &Extraction) -> Option<Container> {
        match descriptor.name() {
            DateType::NAME => read_date(descriptor, element.get("date")?),
            VideoFrameType::NAME => read_frame(descriptor, element),
            _ => None,
        }
    }

    fn write_type(
        &self,
        element: &mut Map<String, Value>,
        descriptor: &dyn TypeDescriptor,
        container: &Container,
    ) -> Result<(), FormatError> {
        match descriptor.name() {
            DateType::NAME => write_compact(element, "date", descriptor, container),
            VideoFrameType::NAME => write_frame(element, descriptor, container),
            other => Err(FormatError::UnsupportedType {
                format: Self::NAME,
                data_type: other.to_string(),
            }),
        }
    }
}
