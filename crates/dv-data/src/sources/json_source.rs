use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use super::{display_name, RecordSource};
use crate::dataset::Dataset;
use crate::VisControllerDataError;

/// JSON source: an array of objects, or a single object
pub struct JsonSource {
    path: PathBuf,
    name: String,
}

impl JsonSource {
    pub fn new(path: PathBuf) -> Self {
        let name = display_name(&path);
        Self { path, name }
    }

    fn read_file(path: &Path) -> Result<Value, VisControllerDataError> {
        let file = File::open(path).map_err(|source| VisControllerDataError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }
}

#[async_trait]
impl RecordSource for JsonSource {
    async fn read(&self) -> Result<Dataset, VisControllerDataError> {
        let path = self.path.clone();
        let value = tokio::task::spawn_blocking(move || JsonSource::read_file(&path)).await??;
        let dataset = Dataset::from_json(value)?.with_source_name(self.name.clone());

        debug!(source = %self.name, rows = dataset.len(), "read json file");
        Ok(dataset)
    }

    fn source_name(&self) -> &str {
        &self.name
    }
}
