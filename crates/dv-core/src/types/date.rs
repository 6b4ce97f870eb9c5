//! Calendar date type
//!
//! Compact form: `YYYY!MM!DD`, e.g. `2017!07!10`.

use chrono::NaiveDate;
use serde_json::{json, Map, Value};
use tracing::warn;

use super::{Container, PropertyKind, TypeDescriptor, TypeSchema, TypeValue};

const DELIMITER: char = '!';

/// A calendar date decomposed into year, month and day
#[derive(Debug)]
pub struct DateType {
    schema: TypeSchema,
}

impl DateType {
    pub const NAME: &'static str = "dataTypeDate";

    pub fn new() -> Self {
        let schema = TypeSchema::new()
            .property("year", PropertyKind::Number)
            .property("month", PropertyKind::Number)
            .property("day", PropertyKind::Number)
            .property("value", PropertyKind::Number)
            .require(&["year", "month", "day"]);

        Self { schema }
    }

    /// Sortable integer form, `yyyymmdd`
    pub fn sortable(year: i64, month: i64, day: i64) -> i64 {
        year * 10_000 + month * 100 + day
    }

    fn is_calendar_date(year: i64, month: i64, day: i64) -> bool {
        let (Ok(year), Ok(month), Ok(day)) = (
            i32::try_from(year),
            u32::try_from(month),
            u32::try_from(day),
        ) else {
            return false;
        };
        NaiveDate::from_ymd_opt(year, month, day).is_some()
    }

    fn fill(&self, container: &mut Container, year: i64, month: i64, day: i64) {
        container.clear();
        container.set("year", json!(year));
        container.set("month", json!(month));
        container.set("day", json!(day));
        container.set("value", json!(Self::sortable(year, month, day)));
    }

    fn parts(container: &Container) -> Option<(i64, i64, i64)> {
        Some((
            container.get_i64("year")?,
            container.get_i64("month")?,
            container.get_i64("day")?,
        ))
    }
}

impl Default for DateType {
    fn default() -> Self {
        Self::new()
    }
}

/// Integer from a JSON number or a numeric string
fn integer(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

impl TypeDescriptor for DateType {
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

        let components: Vec<&str> = raw.split(DELIMITER).collect();
        let parsed = match components.as_slice() {
            [year, month, day] => match (year.parse::<i64>(), month.parse::<i64>(), day.parse::<i64>()) {
                (Ok(year), Ok(month), Ok(day)) => Some((year, month, day)),
                _ => None,
            },
            _ => None,
        };

        match parsed {
            Some((year, month, day)) if Self::is_calendar_date(year, month, day) => {
                self.fill(container, year, month, day);
                true
            }
            _ => {
                warn!(data_type = Self::NAME, input = raw, "malformed compact date");
                container.clear();
                false
            }
        }
    }

    fn make_into_string(&self, container: &Container) -> Option<String> {
        let (year, month, day) = Self::parts(container)?;
        Some(format!("{year:04}{DELIMITER}{month:02}{DELIMITER}{day:02}"))
    }

    fn value(&self, container: &Container) -> Option<TypeValue> {
        let (year, month, day) = Self::parts(container)?;
        let value = Self::sortable(year, month, day);
        Some(
            TypeValue::new(value as f64)
                .with("value", value)
                .with("year", year)
                .with("month", month)
                .with("day", day),
        )
    }

    fn populate_from_object(&self, container: &mut Container, object: &Map<String, Value>) -> bool {
        if !self.owns(container) {
            return false;
        }

        let parts = (
            integer(object.get("year")),
            integer(object.get("month")),
            integer(object.get("day")),
        );
        match parts {
            (Some(year), Some(month), Some(day)) if Self::is_calendar_date(year, month, day) => {
                self.fill(container, year, month, day);
                true
            }
            _ => {
                container.clear();
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cmp::Ordering;

    fn date(raw: &str) -> Container {
        let ty = DateType::new();
        let mut container = ty.create_container();
        assert!(ty.parse_string(&mut container, raw), "failed to parse {raw}");
        container
    }

    #[test]
    fn test_parse_compact_date() {
        let container = date("2017!07!10");
        assert_eq!(container.get_i64("year"), Some(2017));
        assert_eq!(container.get_i64("month"), Some(7));
        assert_eq!(container.get_i64("day"), Some(10));
        assert_eq!(container.get_i64("value"), Some(20170710));
    }

    #[test]
    fn test_rejects_other_delimiters() {
        let ty = DateType::new();
        for raw in ["2017-07-10", "2017/07/10", "2017!07", "2017!07!10!1", "", "2017!!10", "2017!13!01", "2017!02!30"] {
            let mut container = ty.create_container();
            assert!(!ty.parse_string(&mut container, raw), "accepted {raw}");
            assert!(!container.is_valid());
        }
    }

    #[test]
    fn test_failed_parse_clears_previous_value() {
        let ty = DateType::new();
        let mut container = date("2017!07!10");
        assert!(!ty.parse_string(&mut container, "garbage"));
        assert!(container.get("year").is_none());
        assert!(ty.value(&container).is_none());
    }

    #[test]
    fn test_round_trip() {
        let ty = DateType::new();
        for raw in ["2017!07!10", "1999!12!31", "2000!02!29", "0005!01!01"] {
            let original = date(raw);
            let text = ty.make_into_string(&original).unwrap();
            let mut copy = ty.create_container();
            assert!(ty.parse_string(&mut copy, &text));
            assert_eq!(ty.value(&copy), ty.value(&original));
        }
    }

    #[test]
    fn test_order_follows_calendar() {
        let ty = DateType::new();
        assert_eq!(ty.compare(&date("2016!01!01"), &date("2017!07!10")), Ordering::Less);
        assert_eq!(ty.compare(&date("2017!07!10"), &date("2017!07!09")), Ordering::Greater);
        assert_eq!(ty.compare(&date("2017!07!10"), &date("2017!7!10")), Ordering::Equal);
    }

    #[test]
    fn test_populate_from_object_accepts_numeric_strings() {
        let ty = DateType::new();
        let mut container = ty.create_container();
        let object = serde_json::json!({"year": "2015", "month": 12, "day": "31"});
        assert!(ty.populate_from_object(&mut container, object.as_object().unwrap()));
        assert_eq!(container.get_i64("value"), Some(20151231));
    }
}
