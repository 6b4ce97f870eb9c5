//! Dataset configuration files
//!
//! ```json
//! {
//!   "path": "observations.csv",
//!   "format": "s2DateColumns",
//!   "field_types": { "date": "dataTypeDate" },
//!   "views": [ { "id": "timeline", "data_type": "dataTypeDate" } ]
//! }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::null_handling::NullConfig;
use crate::dataset::FieldTypeMap;
use crate::VisControllerDataError;

/// A view to register once the dataset is loaded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewConfig {
    pub id: String,
    pub data_type: String,
}

/// Everything needed to load and type one dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Path to the data file; relative paths resolve against the config file
    pub path: PathBuf,
    
    /// Format name; detected from the first record when absent
    #[serde(default)]
    pub format: Option<String>,
    
    /// Field to data type mapping
    #[serde(default)]
    pub field_types: FieldTypeMap,
    
    /// Null handling configuration
    #[serde(default)]
    pub null_config: NullConfig,
    
    /// Views to register
    #[serde(default)]
    pub views: Vec<ViewConfig>,
}

impl DatasetConfig {
    /// Create a configuration for a data file with no mapping
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            format: None,
            field_types: FieldTypeMap::new(),
            null_config: NullConfig::default(),
            views: Vec::new(),
        }
    }
    
    /// Parse a configuration from JSON text
    pub fn from_json_str(text: &str) -> Result<Self, VisControllerDataError> {
        Ok(serde_json::from_str(text)?)
    }
    
    /// Read a configuration file
    pub fn from_json_file(path: &Path) -> Result<Self, VisControllerDataError> {
        let text = std::fs::read_to_string(path).map_err(|source| VisControllerDataError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        
        let mut config = Self::from_json_str(&text)?;
        if config.path.is_relative() {
            if let Some(dir) = path.parent() {
                config.path = dir.join(&config.path);
            }
        }
        Ok(config)
    }
    
    /// Map a field to a data type
    pub fn with_field_type(mut self, field: &str, data_type: &str) -> Self {
        self.field_types.insert(field.to_string(), data_type.to_string());
        self
    }
}
