//! Data handling and sources for the visualization platform

pub mod config;
pub mod controller;
pub mod dataset;
pub mod sources;

use std::path::PathBuf;

use tokio::task::JoinError;
use thiserror::Error;

// Re-exports
pub use config::{DatasetConfig, NullConfig, ViewConfig};
pub use controller::{ControllerState, FormatSummary, View, VisualizationController};
pub use dataset::{Dataset, FieldTypeMap, FieldValue, Record};
pub use sources::{DelimitedSource, JsonSource, RecordSource};

/// Errors that can occur while loading or assigning a data source
#[derive(Error, Debug)]
pub enum VisControllerDataError {
    #[error("unsupported data source '{}': expected a .json, .csv or .tsv file", path.display())]
    UnsupportedSuffix { path: PathBuf },
    
    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
    
    #[error("CSV parsing error: {0}")]
    Csv(String),
    
    #[error("data source is not a record or an array of records")]
    NotRecords,
    
    #[error("a data source load is already in progress")]
    LoadInProgress,
    
    #[error("format '{0}' is not registered")]
    UnknownFormat(String),
    
    #[error("Join error: {0}")]
    Join(#[from] JoinError),
}

impl From<csv::Error> for VisControllerDataError {
    fn from(error: csv::Error) -> Self {
        VisControllerDataError::Csv(error.to_string())
    }
}
