//! File-backed record sources

pub mod csv_source;
pub mod json_source;

use std::path::Path;

use async_trait::async_trait;

pub use csv_source::DelimitedSource;
pub use json_source::JsonSource;

use crate::dataset::Dataset;
use crate::VisControllerDataError;

/// Something that can produce a dataset
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Read every record
    async fn read(&self) -> Result<Dataset, VisControllerDataError>;

    /// Get the source name/path
    fn source_name(&self) -> &str;
}

/// Pick a source from the file suffix: `json`, `csv` or `tsv`
pub fn open(path: &Path) -> Result<Box<dyn RecordSource>, VisControllerDataError> {
    let suffix = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());

    match suffix.as_deref() {
        Some("json") => Ok(Box::new(JsonSource::new(path.to_path_buf()))),
        Some("csv") => Ok(Box::new(DelimitedSource::csv(path.to_path_buf()))),
        Some("tsv") => Ok(Box::new(DelimitedSource::tsv(path.to_path_buf()))),
        _ => Err(VisControllerDataError::UnsupportedSuffix {
            path: path.to_path_buf(),
        }),
    }
}

/// File name for logs and events
pub(crate) fn display_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .unwrap_or_else(|| path.display().to_string())
}
