//! Core functionality for the data visualization platform
//! 
//! This crate provides the typed-data layer: registered semantic data types,
//! the record formats that extract and synthesize them, the event bus and the
//! transport boundary views are pushed through.

pub mod events;
pub mod formats;
pub mod transport;
pub mod types;

use thiserror::Error;

// Re-export commonly used types
pub use formats::{Extracted, Extraction, FormatError, FormatReader, FormatRegistry};
pub use transport::{ChannelTransport, ViewId, ViewTransport, ViewUpdate};
pub use types::{
    Container, RangeInput, RangePair, TypeDescriptor, TypeError, TypeRegistry, TypeValue, TypedElement,
};

/// Errors raised while building the type and format registries
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistryError {
    #[error("data type '{0}' is already registered")]
    DuplicateType(String),

    #[error("format '{0}' is already registered")]
    DuplicateFormat(String),

    #[error("data type '{data_type}' requires undeclared properties {properties:?}")]
    UndeclaredRequired {
        data_type: String,
        properties: Vec<String>,
    },

    #[error("format '{format}' requires '{data_type}' but does not make it available")]
    RequiredNotAvailable { format: String, data_type: String },

    #[error("format '{format}' names unregistered data type '{data_type}'")]
    UnknownType { format: String, data_type: String },
}
