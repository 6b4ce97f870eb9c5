//! Video frame position type
//!
//! Compact form: a frame index, optionally followed by `/` and the total
//! frame count, e.g. `42` or `42/120`.

use serde_json::{json, Map, Value};
use tracing::warn;

use super::{Container, PropertyKind, TypeDescriptor, TypeSchema, TypeValue};

const DELIMITER: char = '/';

/// A frame index within a video, optionally with frame count and frame rate
#[derive(Debug)]
pub struct VideoFrameType {
    schema: TypeSchema,
}

impl VideoFrameType {
    pub const NAME: &'static str = "dataTypeVideoFrame";

    pub fn new() -> Self {
        let schema = TypeSchema::new()
            .property("value", PropertyKind::Number)
            .property("maxFrame", PropertyKind::Number)
            .property("frameRate", PropertyKind::Number)
            .require(&["value"]);

        Self { schema }
    }

    fn parse_index(text: &str) -> Option<u64> {
        if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        text.parse().ok()
    }

    fn is_consistent(frame: u64, max_frame: Option<u64>, frame_rate: Option<f64>) -> bool {
        let max_ok = max_frame.map_or(true, |max| max > 0 && frame <= max);
        let rate_ok = frame_rate.map_or(true, |rate| rate.is_finite() && rate > 0.0);
        max_ok && rate_ok
    }

    /// Playback time of the frame in seconds, when the frame rate is known.
    ///
    /// The frame rate is not part of the compact form, so it stays out of
    /// [`TypeDescriptor::value`].
    pub fn seconds(&self, container: &Container) -> Option<f64> {
        if !self.owns(container) {
            return None;
        }
        let frame = container.get("value").and_then(Value::as_u64)?;
        let rate = container.get_f64("frameRate")?;
        Some(frame as f64 / rate)
    }
}

impl Default for VideoFrameType {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeDescriptor for VideoFrameType {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn schema(&self) -> &TypeSchema {
        &self.schema
    }

    fn parse_string(&self, container: &mut Container, raw: &str) -> bool {
        if !self.owns(container) {
            warn!(data_type = Self::NAME, found = container.data_type(), "container belongs to another type");
            return false;
        }

        let parsed = match raw.split(DELIMITER).collect::<Vec<_>>().as_slice() {
            [frame] => Self::parse_index(frame).map(|frame| (frame, None)),
            [frame, max] => match (Self::parse_index(frame), Self::parse_index(max)) {
                (Some(frame), Some(max)) => Some((frame, Some(max))),
                _ => None,
            },
            _ => None,
        };

        container.clear();
        match parsed {
            Some((frame, max_frame)) if Self::is_consistent(frame, max_frame, None) => {
                container.set("value", json!(frame));
                if let Some(max) = max_frame {
                    container.set("maxFrame", json!(max));
                }
                true
            }
            _ => {
                warn!(data_type = Self::NAME, input = raw, "malformed compact video frame");
                false
            }
        }
    }

    fn make_into_string(&self, container: &Container) -> Option<String> {
        let frame = container.get("value").and_then(Value::as_u64)?;
        match container.get("maxFrame").and_then(Value::as_u64) {
            Some(max) => Some(format!("{frame}{DELIMITER}{max}")),
            None => Some(frame.to_string()),
        }
    }

    fn value(&self, container: &Container) -> Option<TypeValue> {
        let frame = container.get("value").and_then(Value::as_u64)?;
        let max_frame = container.get("maxFrame").and_then(Value::as_u64);

        let modified = match max_frame {
            Some(max) if max > 0 => frame as f64 / max as f64,
            _ => frame as f64,
        };

        let mut value = TypeValue::new(modified).with("value", frame);
        if let Some(max) = max_frame {
            value = value.with("maxFrame", max);
        }
        Some(value.with("modifiedValue", modified))
    }

    fn populate_from_object(&self, container: &mut Container, object: &Map<String, Value>) -> bool {
        if !self.owns(container) {
            return false;
        }

        container.clear();
        let Some(frame) = object.get("value").and_then(Value::as_u64) else {
            return false;
        };
        let max_frame = match object.get("maxFrame") {
            None => None,
            Some(max) => match max.as_u64() {
                Some(max) => Some(max),
                None => return false,
            },
        };
        let frame_rate = match object.get("frameRate") {
            None => None,
            Some(rate) => match rate.as_f64() {
                Some(rate) => Some(rate),
                None => return false,
            },
        };

        if !Self::is_consistent(frame, max_frame, frame_rate) {
            return false;
        }

        container.set("value", json!(frame));
        if let Some(max) = max_frame {
            container.set("maxFrame", json!(max));
        }
        if let Some(rate) = frame_rate {
            container.set("frameRate", json!(rate));
        }
        true
    }
}
