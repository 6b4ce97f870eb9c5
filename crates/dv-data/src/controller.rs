//! Visualization controller
//!
//! Owns one dataset and a set of view subscriptions. The dataset moves
//! through `Empty -> Loading -> Ready`; a failed load falls back to `Empty`.
//! Only one load may be in flight at a time: a second `load_data_source`
//! started while another is pending is rejected with
//! [`VisControllerDataError::LoadInProgress`]. Dropping a pending load
//! returns the controller to `Empty`.

use std::path::Path;
use std::sync::Arc;

use dv_core::events::events::{DataFormatted, DataSourceError, DataSourceLoaded, ViewAdded, ViewRemoved};
use dv_core::events::EventBus;
use dv_core::{
    Container, FormatRegistry, RangeInput, RangePair, TypeDescriptor, TypeError, TypeRegistry, ViewId, ViewTransport,
    ViewUpdate,
};
use indexmap::IndexMap;
use parking_lot::RwLock;
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

use crate::config::{DatasetConfig, NullConfig};
use crate::dataset::{Dataset, FieldTypeMap, FieldValue};
use crate::sources;
use crate::VisControllerDataError;

/// Lifecycle of the controller's dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Empty,
    Loading,
    Ready,
}

/// A view subscription: an id and the data type it wants
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct View {
    pub id: ViewId,
    pub data_type: String,
}

impl View {
    pub fn new(id: impl Into<ViewId>, data_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            data_type: data_type.into(),
        }
    }
}

/// Outcome of [`VisualizationController::format_data`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FormatSummary {
    /// Raw values replaced by containers
    pub converted: usize,
    /// Raw values that could not be parsed and were left raw
    pub failed: usize,
    /// Null values and already-typed values left as they were
    pub skipped: usize,
    /// Containers derived through the dataset's format reader
    pub extracted: usize,
}

struct ControllerInner {
    state: ControllerState,
    dataset: Option<Dataset>,
    views: IndexMap<ViewId, View>,
}

/// Resets a pending load to `Empty` unless it completed
struct LoadGuard<'a> {
    inner: &'a RwLock<ControllerInner>,
    armed: bool,
}

impl LoadGuard<'_> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for LoadGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            let mut inner = self.inner.write();
            if inner.state == ControllerState::Loading {
                warn!("data source load abandoned before completion");
                inner.state = ControllerState::Empty;
                inner.dataset = None;
            }
        }
    }
}

/// Loads datasets, types their fields and pushes typed subsets to views
pub struct VisualizationController {
    types: Arc<TypeRegistry>,
    formats: Arc<FormatRegistry>,
    transport: Arc<dyn ViewTransport>,
    event_bus: Arc<EventBus>,
    null_config: NullConfig,
    inner: RwLock<ControllerInner>,
}

impl VisualizationController {
    /// Create a controller over frozen registries
    pub fn new(types: Arc<TypeRegistry>, formats: Arc<FormatRegistry>, transport: Arc<dyn ViewTransport>) -> Self {
        Self {
            types,
            formats,
            transport,
            event_bus: Arc::new(EventBus::new()),
            null_config: NullConfig::default(),
            inner: RwLock::new(ControllerInner {
                state: ControllerState::Empty,
                dataset: None,
                views: IndexMap::new(),
            }),
        }
    }

    pub fn with_event_bus(mut self, event_bus: Arc<EventBus>) -> Self {
        self.event_bus = event_bus;
        self
    }

    pub fn with_null_config(mut self, null_config: NullConfig) -> Self {
        self.null_config = null_config;
        self
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }

    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    pub fn formats(&self) -> &FormatRegistry {
        &self.formats
    }

    pub fn state(&self) -> ControllerState {
        self.inner.read().state
    }

    /// Number of records in the current dataset
    pub fn row_count(&self) -> usize {
        self.inner.read().dataset.as_ref().map_or(0, Dataset::len)
    }

    /// Run `f` against the current dataset
    pub fn with_dataset<R>(&self, f: impl FnOnce(Option<&Dataset>) -> R) -> R {
        f(self.inner.read().dataset.as_ref())
    }

    /// Assign raw data directly: a JSON array of objects or a single object
    pub fn set_data_source(&self, raw: Value) -> Result<usize, VisControllerDataError> {
        let dataset = Dataset::from_json(raw)?;
        self.set_dataset(dataset)
    }

    /// Assign an already built dataset
    pub fn set_dataset(&self, mut dataset: Dataset) -> Result<usize, VisControllerDataError> {
        let mut inner = self.inner.write();
        if inner.state == ControllerState::Loading {
            return Err(VisControllerDataError::LoadInProgress);
        }

        self.extract_format(&mut dataset);
        let rows = dataset.len();
        let source_name = dataset.source_name().unwrap_or("inline").to_string();
        let format = dataset.format().map(str::to_string);
        inner.dataset = Some(dataset);
        inner.state = ControllerState::Ready;
        drop(inner);

        debug!(source = %source_name, rows, "data source assigned");
        self.event_bus.publish(DataSourceLoaded {
            source_name,
            row_count: rows,
            format,
        });
        Ok(rows)
    }

    /// Load a `.json`, `.csv` or `.tsv` file.
    ///
    /// Any failure leaves the controller `Empty` and is returned to the caller.
    pub async fn load_data_source(&self, path: impl AsRef<Path>) -> Result<usize, VisControllerDataError> {
        let path = path.as_ref();
        let guard = self.begin_load()?;

        let result = match sources::open(path) {
            Ok(source) => source.read().await,
            Err(e) => Err(e),
        };

        let mut inner = self.inner.write();
        guard.disarm();
        match result {
            Ok(dataset) => {
                let rows = dataset.len();
                let source_name = dataset.source_name().unwrap_or_default().to_string();
                inner.dataset = Some(dataset);
                inner.state = ControllerState::Ready;
                drop(inner);

                info!(path = %path.display(), rows, "data source loaded");
                self.event_bus.publish(DataSourceLoaded {
                    source_name,
                    row_count: rows,
                    format: None,
                });
                Ok(rows)
            }
            Err(e) => {
                inner.dataset = None;
                inner.state = ControllerState::Empty;
                drop(inner);

                error!(path = %path.display(), error = %e, "failed to load data source");
                self.event_bus.publish(DataSourceError {
                    source_name: path.display().to_string(),
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    fn begin_load(&self) -> Result<LoadGuard<'_>, VisControllerDataError> {
        let mut inner = self.inner.write();
        if inner.state == ControllerState::Loading {
            warn!("rejecting overlapping data source load");
            return Err(VisControllerDataError::LoadInProgress);
        }

        inner.state = ControllerState::Loading;
        inner.dataset = None;
        Ok(LoadGuard {
            inner: &self.inner,
            armed: true,
        })
    }

    /// Load, type and subscribe everything a [`DatasetConfig`] describes
    pub async fn load_configured(&self, config: &DatasetConfig) -> Result<FormatSummary, VisControllerDataError> {
        self.load_data_source(&config.path).await?;

        match &config.format {
            Some(format) => self.set_format(format)?,
            None => {
                self.infer_format();
            }
        }

        let summary = self.format_data_with(&config.field_types, &config.null_config);
        for view in &config.views {
            self.add_view(View::new(view.id.as_str(), view.data_type.as_str()));
        }
        Ok(summary)
    }

    /// Declare the format the current records are in
    pub fn set_format(&self, format: &str) -> Result<(), VisControllerDataError> {
        if !self.formats.contains(format) {
            error!(format, registered = ?self.formats, "unknown format requested");
            return Err(VisControllerDataError::UnknownFormat(format.to_string()));
        }

        let mut inner = self.inner.write();
        if let Some(dataset) = inner.dataset.as_mut() {
            dataset.set_format(Some(format.to_string()));
            self.extract_format(dataset);
        }
        Ok(())
    }

    /// Extract values through the dataset's format reader, if it has one
    fn extract_format(&self, dataset: &mut Dataset) -> usize {
        let Some(format) = dataset.format() else {
            return 0;
        };
        let Some(reader) = self.formats.get(format) else {
            error!(format, registered = ?self.formats, "dataset names an unregistered format");
            return 0;
        };

        let extracted = dataset.extract_with(reader, &self.types);
        debug!(format = reader.name(), extracted, "values extracted through format");
        extracted
    }

    /// Detect the format from the first record and remember it
    pub fn infer_format(&self) -> Option<&'static str> {
        let mut inner = self.inner.write();
        let dataset = inner.dataset.as_mut()?;
        let first = dataset.first_raw()?;

        let detected = self.formats.detect(&first, &self.types);
        match detected {
            Some(format) => {
                debug!(format, "detected data format");
                dataset.set_format(Some(format.to_string()));
                self.extract_format(dataset);
            }
            None => warn!(record = %first, "no registered format matches the data"),
        }
        detected
    }

    /// Replace raw values with typed containers, using the controller's null handling
    pub fn format_data(&self, field_types: &FieldTypeMap) -> FormatSummary {
        self.format_data_with(field_types, &self.null_config)
    }

    /// Replace each mapped raw value with a container of its field's type, then
    /// refresh the values extracted through the dataset's format.
    ///
    /// Unmapped fields, null values and fields that already hold containers are
    /// left untouched; a value that fails to parse stays raw.
    pub fn format_data_with(&self, field_types: &FieldTypeMap, null_config: &NullConfig) -> FormatSummary {
        let mut summary = FormatSummary::default();
        let mut inner = self.inner.write();
        let Some(dataset) = inner.dataset.as_mut() else {
            warn!("format_data called without a data source");
            return summary;
        };

        for (index, record) in dataset.records_mut().iter_mut().enumerate() {
            for (field, value) in record.iter_mut() {
                let Some(type_name) = field_types.get(field) else {
                    continue;
                };
                let raw = match value {
                    FieldValue::Raw(raw) => raw,
                    FieldValue::Typed { .. } => {
                        summary.skipped += 1;
                        continue;
                    }
                };
                if null_config.is_null_value(raw) {
                    summary.skipped += 1;
                    continue;
                }
                let Some(descriptor) = self.types.get(type_name) else {
                    error!(field = field.as_str(), data_type = type_name.as_str(), registry = ?self.types, "field mapped to unregistered data type");
                    summary.failed += 1;
                    continue;
                };

                match typed_from_raw(descriptor, raw) {
                    Some(container) => {
                        *value = FieldValue::Typed {
                            source: raw.clone(),
                            container,
                        };
                        summary.converted += 1;
                    }
                    None => {
                        warn!(record = index, field = field.as_str(), data_type = type_name.as_str(), value = %raw, "value left untyped");
                        summary.failed += 1;
                    }
                }
            }
        }
        dataset.merge_field_types(field_types);
        summary.extracted = self.extract_format(dataset);
        drop(inner);

        info!(
            converted = summary.converted,
            failed = summary.failed,
            skipped = summary.skipped,
            extracted = summary.extracted,
            "dataset formatted"
        );
        self.event_bus.publish(DataFormatted {
            converted: summary.converted,
            failed: summary.failed,
        });
        summary
    }

    /// Every container of `data_type` in the current dataset
    pub fn typed_values(&self, data_type: &str) -> Vec<Container> {
        self.with_dataset(|dataset| dataset.map(|d| d.containers_of(data_type)).unwrap_or_default())
    }

    /// Range of `data_type` over the records that hold it; `None` when no record does
    pub fn range(&self, data_type: &str) -> Result<Option<RangePair>, TypeError> {
        let Some(descriptor) = self.types.get(data_type) else {
            error!(data_type, "range requested for unregistered data type");
            return Ok(None);
        };

        let elements: Vec<_> = self.with_dataset(|dataset| {
            dataset
                .map(Dataset::typed_elements)
                .unwrap_or_default()
                .into_iter()
                .filter(|element| element.contains_key(data_type))
                .collect()
        });
        if elements.is_empty() {
            return Ok(None);
        }

        descriptor.range_information(RangeInput::Elements(&elements)).map(Some)
    }

    /// Register a view; an existing view with the same id is replaced
    pub fn add_view(&self, view: View) -> bool {
        let view_id = view.id.to_string();
        let data_type = view.data_type.clone();
        let replaced = self.inner.write().views.insert(view.id.clone(), view).is_some();

        debug!(view_id = %view_id, data_type = %data_type, replaced, "view registered");
        self.event_bus.publish(ViewAdded { view_id, data_type });
        replaced
    }

    /// Remove a view; returns whether it existed
    pub fn remove_view(&self, id: &ViewId) -> bool {
        let removed = self.inner.write().views.shift_remove(id).is_some();
        if removed {
            debug!(view_id = %id, "view removed");
            self.event_bus.publish(ViewRemoved {
                view_id: id.to_string(),
            });
        }
        removed
    }

    pub fn view(&self, id: &ViewId) -> Option<View> {
        self.inner.read().views.get(id).cloned()
    }

    pub fn views(&self) -> Vec<View> {
        self.inner.read().views.values().cloned().collect()
    }

    /// Push the subset for one view. Unknown ids are a no-op and return `false`.
    pub fn update_view(&self, id: &ViewId) -> bool {
        let payload = {
            let inner = self.inner.read();
            let Some(view) = inner.views.get(id) else {
                debug!(view_id = %id, "update for unknown view ignored");
                return false;
            };
            self.view_payload(view, inner.dataset.as_ref())
        };

        info!(view_id = %id, "pushing view update");
        self.transport.push(ViewUpdate {
            id: id.clone(),
            data: payload,
        });
        true
    }

    /// Push every registered view; returns how many were pushed
    pub fn update_all_views(&self) -> usize {
        let ids: Vec<ViewId> = self.inner.read().views.keys().cloned().collect();
        ids.iter().filter(|id| self.update_view(id)).count()
    }

    fn view_payload(&self, view: &View, dataset: Option<&Dataset>) -> Value {
        let data_type = view.data_type.as_str();
        let Some(descriptor) = self.types.get(data_type) else {
            error!(view_id = %view.id, data_type, "view subscribes to unregistered data type");
            return empty_payload(data_type);
        };
        let Some(dataset) = dataset else {
            return empty_payload(data_type);
        };

        let containers = dataset.containers_of(data_type);
        let values: Vec<Value> = containers
            .iter()
            .filter_map(|c| descriptor.value(c))
            .map(|v| v.to_json())
            .collect();
        let strings: Vec<Value> = containers
            .iter()
            .filter_map(|c| descriptor.make_into_string(c))
            .map(Value::String)
            .collect();

        let range = if containers.is_empty() {
            None
        } else {
            match descriptor.range_information(RangeInput::Containers(&containers)) {
                Ok(range) => Some(range),
                Err(e) => {
                    warn!(view_id = %view.id, error = %e, "range computation failed");
                    None
                }
            }
        };

        let range_elements = range.as_ref().and_then(|range| {
            let reader = self.formats.get(dataset.format()?)?;
            if !reader.supports(data_type) {
                return None;
            }
            reader
                .generate_range_values_from_data(range, &self.types)
                .ok()
                .map(|(small, large)| json!([small, large]))
        });

        json!({
            "dataType": data_type,
            "count": containers.len(),
            "values": values,
            "strings": strings,
            "range": range.map(|r| range_json(descriptor, &r)),
            "rangeElements": range_elements,
        })
    }
}

fn typed_from_raw(descriptor: &dyn TypeDescriptor, raw: &Value) -> Option<Container> {
    let mut container = descriptor.create_container();
    let ok = match raw {
        Value::String(text) => descriptor.parse_string(&mut container, text.trim()),
        Value::Number(number) => descriptor.parse_string(&mut container, &number.to_string()),
        Value::Object(object) => descriptor.populate_from_object(&mut container, object),
        _ => false,
    };
    ok.then_some(container)
}

fn range_json(descriptor: &dyn TypeDescriptor, range: &RangePair) -> Value {
    let min = descriptor.value(&range.min).map(|v| v.to_json());
    let max = descriptor.value(&range.max).map(|v| v.to_json());
    json!([min, max])
}

fn empty_payload(data_type: &str) -> Value {
    json!({
        "dataType": data_type,
        "count": 0,
        "values": [],
        "strings": [],
        "range": null,
        "rangeElements": null,
    })
}
