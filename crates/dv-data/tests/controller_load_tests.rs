use std::fs;
use std::sync::Arc;

use dv_core::events::events::{DataSourceError, DataSourceLoaded};
use dv_core::events::handler_from_fn;
use dv_core::types::{DateType, VideoFrameType};
use dv_core::{ChannelTransport, FormatRegistry, TypeRegistry, ViewId};
use dv_data::{
    ControllerState, DatasetConfig, FieldTypeMap, View, VisControllerDataError, VisualizationController,
};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tempfile::tempdir;

fn controller() -> (VisualizationController, tokio::sync::mpsc::UnboundedReceiver<dv_core::ViewUpdate>) {
    let types = Arc::new(TypeRegistry::with_defaults().unwrap());
    let formats = Arc::new(FormatRegistry::with_defaults(&types).unwrap());
    let (transport, receiver) = ChannelTransport::new();
    (VisualizationController::new(types, formats, Arc::new(transport)), receiver)
}

#[tokio::test]
async fn test_csv_header_names_each_row() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("data.csv");
    fs::write(&path, "a,b,c\n1,2,3\n4,5,6\n").unwrap();

    let (controller, _) = controller();
    let rows = controller.load_data_source(&path).await.unwrap();
    assert_eq!(rows, 2);
    assert_eq!(controller.state(), ControllerState::Ready);

    controller.with_dataset(|dataset| {
        let dataset = dataset.unwrap();
        assert_eq!(dataset.source_name(), Some("data.csv"));
        for record in dataset.records() {
            let keys: Vec<_> = record.keys().map(String::as_str).collect();
            assert_eq!(keys, vec!["a", "b", "c"]);
        }
        assert_eq!(dataset.records()[0]["a"].raw(), Some(&json!("1")));
    });
}

#[tokio::test]
async fn test_tsv_load_and_format() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("frames.tsv");
    fs::write(&path, "shot\tframe\nopen\t0/100\nclose\t100/100\nmiddle\t50/100\n").unwrap();

    let (controller, _) = controller();
    controller.load_data_source(&path).await.unwrap();

    let map = FieldTypeMap::from([("frame".to_string(), VideoFrameType::NAME.to_string())]);
    let summary = controller.format_data(&map);
    assert_eq!(summary.converted, 3);

    let range = controller.range(VideoFrameType::NAME).unwrap().unwrap();
    assert_eq!(range.min.get_i64("value"), Some(0));
    assert_eq!(range.max.get_i64("value"), Some(100));
}

#[tokio::test]
async fn test_json_load_detects_format() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("dates.json");
    let data = json!([
        {"date": "2016!01!01", "note": "a"},
        {"date": "2017!07!10", "note": "b"},
        {"date": "2015!12!31", "note": "c"}
    ]);
    fs::write(&path, data.to_string()).unwrap();

    let (controller, _) = controller();
    controller.load_data_source(&path).await.unwrap();
    assert_eq!(controller.infer_format(), Some("s2Date"));
    assert_eq!(controller.with_dataset(|d| d.and_then(|d| d.format().map(str::to_string))), Some("s2Date".to_string()));
    assert_eq!(controller.typed_values(DateType::NAME).len(), 3);
}

#[tokio::test]
async fn test_unsupported_suffix_is_named_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("data.xml");
    fs::write(&path, "<data/>").unwrap();

    let (controller, _) = controller();
    let error = controller.load_data_source(&path).await.unwrap_err();
    assert!(matches!(error, VisControllerDataError::UnsupportedSuffix { .. }));
    assert!(error.to_string().contains("data.xml"));
    assert_eq!(controller.state(), ControllerState::Empty);
}

#[tokio::test]
async fn test_missing_file_reports_and_stays_empty() {
    let dir = tempdir().unwrap();
    let (controller, _) = controller();

    let errors = Arc::new(Mutex::new(Vec::new()));
    let sink = errors.clone();
    controller.event_bus().subscribe::<DataSourceError>(handler_from_fn(move |event| {
        if let Some(error) = event.as_any().downcast_ref::<DataSourceError>() {
            sink.lock().push(error.source_name.clone());
        }
    }));

    let result = controller.load_data_source(dir.path().join("absent.json")).await;
    assert!(matches!(result, Err(VisControllerDataError::Io { .. })));
    assert_eq!(controller.state(), ControllerState::Empty);
    assert_eq!(errors.lock().len(), 1);
}

#[tokio::test]
async fn test_malformed_json_fails_the_load() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("broken.json");
    fs::write(&path, "[{\"date\": ").unwrap();

    let (controller, _) = controller();
    let result = controller.load_data_source(&path).await;
    assert!(matches!(result, Err(VisControllerDataError::Json(_))));
    assert_eq!(controller.state(), ControllerState::Empty);
}

#[tokio::test]
async fn test_bad_value_does_not_abort_dataset() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("dates.csv");
    fs::write(&path, "date\n2017!07!10\n2017-07-11\n2017!07!12\n").unwrap();

    let (controller, _) = controller();
    controller.load_data_source(&path).await.unwrap();
    let map = FieldTypeMap::from([("date".to_string(), DateType::NAME.to_string())]);
    let summary = controller.format_data(&map);

    assert_eq!(summary.converted, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(controller.typed_values(DateType::NAME).len(), 2);
}

#[tokio::test]
async fn test_configured_load_pushes_views() {
    let dir = tempdir().unwrap();
    fs::write(
        dir.path().join("obs.csv"),
        "year,month,day,when\n2016,1,1,2016!01!01\n2017,7,10,2017!07!10\n2015,12,31,-\n",
    )
    .unwrap();
    let config_path = dir.path().join("obs.config.json");
    fs::write(
        &config_path,
        json!({
            "path": "obs.csv",
            "field_types": {"when": DateType::NAME},
            "views": [{"id": "dates", "data_type": DateType::NAME}]
        })
        .to_string(),
    )
    .unwrap();

    let loaded = Arc::new(Mutex::new(0usize));
    let (controller, mut receiver) = controller();
    let counter = loaded.clone();
    controller.event_bus().subscribe::<DataSourceLoaded>(handler_from_fn(move |event| {
        if let Some(loaded) = event.as_any().downcast_ref::<DataSourceLoaded>() {
            *counter.lock() = loaded.row_count;
        }
    }));

    let config = DatasetConfig::from_json_file(&config_path).unwrap();
    let summary = controller.load_configured(&config).await.unwrap();
    assert_eq!(*loaded.lock(), 3);
    assert_eq!(summary.converted, 2);
    assert_eq!(summary.skipped, 1);
    assert_eq!(controller.with_dataset(|d| d.and_then(|d| d.format().map(str::to_string))), Some("s2DateColumns".to_string()));

    assert_eq!(controller.update_all_views(), 1);
    let update = receiver.try_recv().unwrap();
    assert_eq!(update.id, ViewId::from("dates"));
    assert_eq!(update.data["count"], 3);
    assert_eq!(
        update.data["rangeElements"],
        json!([{"year": 2015, "month": 12, "day": 31}, {"year": 2017, "month": 7, "day": 10}])
    );

    controller.remove_view(&ViewId::from("dates"));
    assert!(!controller.update_view(&ViewId::from("dates")));
    assert!(receiver.try_recv().is_err());
}

#[tokio::test]
async fn test_view_of_unregistered_type_pushes_empty_subset() {
    let (controller, mut receiver) = controller();
    controller.set_data_source(json!([{"color": "red"}])).unwrap();
    controller.add_view(View::new("v", "dataTypeColor"));

    assert!(controller.update_view(&ViewId::from("v")));
    let update = receiver.try_recv().unwrap();
    assert_eq!(update.data["count"], 0);
    assert_eq!(update.data["range"], Value::Null);
}
