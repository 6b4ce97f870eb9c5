use std::cmp::Ordering;

use dv_core::types::{DateType, VideoFrameType};
use serde_json::json;
use dv_core::{Container, RangeInput, TypeDescriptor, TypeError, TypeRegistry, TypedElement};

fn parse_all(descriptor: &dyn TypeDescriptor, raws: &[&str]) -> Vec<Container> {
    raws.iter()
        .map(|raw| {
            let mut container = descriptor.create_container();
            assert!(descriptor.parse_string(&mut container, raw), "failed to parse {raw}");
            container
        })
        .collect()
}

fn populate_all(descriptor: &dyn TypeDescriptor, objects: &[serde_json::Value]) -> Vec<Container> {
    objects
        .iter()
        .map(|object| {
            let mut container = descriptor.create_container();
            assert!(
                descriptor.populate_from_object(&mut container, object.as_object().unwrap()),
                "failed to populate {object}"
            );
            container
        })
        .collect()
}

fn samples(registry: &TypeRegistry) -> Vec<(&dyn TypeDescriptor, Vec<Container>)> {
    let date = registry.get(DateType::NAME).unwrap();
    let frame = registry.get(VideoFrameType::NAME).unwrap();

    let mut dates = parse_all(date, &["2016!01!01", "2017!07!10", "2015!12!31", "2017!07!10", "1900!02!28", "2024!02!29"]);
    dates.extend(populate_all(date, &[json!({"year": 1999, "month": 12, "day": 31})]));

    let mut frames = parse_all(frame, &["0", "42/120", "7", "120/120", "1/3", "42/120", "3"]);
    frames.extend(populate_all(
        frame,
        &[
            json!({"value": 60, "maxFrame": 120, "frameRate": 30.0}),
            json!({"value": 9, "frameRate": 24.0}),
        ],
    ));

    vec![(date, dates), (frame, frames)]
}

#[test]
fn test_round_trip_law() {
    let registry = TypeRegistry::with_defaults().unwrap();
    for (descriptor, containers) in samples(&registry) {
        for original in &containers {
            let text = descriptor.make_into_string(original).unwrap();
            let mut copy = descriptor.create_container();
            assert!(descriptor.parse_string(&mut copy, &text));
            assert_eq!(descriptor.value(&copy), descriptor.value(original), "{text}");
        }
    }
}

#[test]
fn test_order_is_antisymmetric_and_transitive() {
    let registry = TypeRegistry::with_defaults().unwrap();
    for (descriptor, containers) in samples(&registry) {
        for a in &containers {
            for b in &containers {
                assert_eq!(descriptor.compare(a, b), descriptor.compare(b, a).reverse());
                for c in &containers {
                    if descriptor.compare(a, b) != Ordering::Greater && descriptor.compare(b, c) != Ordering::Greater {
                        assert_ne!(descriptor.compare(a, c), Ordering::Greater);
                    }
                }
            }
        }
    }
}

#[test]
fn test_range_bounds_every_element() {
    let registry = TypeRegistry::with_defaults().unwrap();
    for (descriptor, containers) in samples(&registry) {
        let range = descriptor.range_information(RangeInput::Containers(&containers)).unwrap();
        for x in &containers {
            assert_ne!(descriptor.compare(&range.min, x), Ordering::Greater);
            assert_ne!(descriptor.compare(&range.max, x), Ordering::Less);
        }
    }
}

#[test]
fn test_range_modes_agree() {
    let registry = TypeRegistry::with_defaults().unwrap();
    for (descriptor, containers) in samples(&registry) {
        let elements: Vec<TypedElement> = containers
            .iter()
            .map(|c| TypedElement::from([(descriptor.name().to_string(), c.clone())]))
            .collect();

        let raw = descriptor.range_information(RangeInput::Containers(&containers)).unwrap();
        let composite = descriptor.range_information(RangeInput::Elements(&elements)).unwrap();
        assert_eq!(descriptor.value(&raw.min), descriptor.value(&composite.min));
        assert_eq!(descriptor.value(&raw.max), descriptor.value(&composite.max));
    }
}

#[test]
fn test_date_range_example() {
    let registry = TypeRegistry::with_defaults().unwrap();
    let date = registry.get(DateType::NAME).unwrap();
    let dates = parse_all(date, &["2016!01!01", "2017!07!10", "2015!12!31"]);

    let range = date.range_information(RangeInput::Containers(&dates)).unwrap();
    assert_eq!(date.make_into_string(&range.min).as_deref(), Some("2015!12!31"));
    assert_eq!(date.make_into_string(&range.max).as_deref(), Some("2017!07!10"));
}

#[test]
fn test_range_errors() {
    let registry = TypeRegistry::with_defaults().unwrap();
    let date = registry.get(DateType::NAME).unwrap();
    let frame = registry.get(VideoFrameType::NAME).unwrap();

    assert!(matches!(
        date.range_information(RangeInput::Containers(&[])),
        Err(TypeError::EmptyRange { data_type: DateType::NAME })
    ));

    let frames = parse_all(frame, &["1", "2"]);
    assert!(matches!(
        date.range_information(RangeInput::Containers(&frames)),
        Err(TypeError::TypeMismatch { .. })
    ));

    let elements = vec![TypedElement::new()];
    assert!(matches!(
        date.range_information(RangeInput::Elements(&elements)),
        Err(TypeError::MissingElementValue { data_type: DateType::NAME, index: 0 })
    ));
}
