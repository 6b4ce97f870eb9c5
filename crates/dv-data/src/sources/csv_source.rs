use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use csv::ReaderBuilder;
use serde_json::Value;
use tracing::{debug, warn};

use super::{display_name, RecordSource};
use crate::dataset::{Dataset, FieldValue, Record};
use crate::VisControllerDataError;

/// Delimited text source (CSV or TSV).
///
/// The first line is the header; its fields name the values of every
/// following row. Values stay strings until the dataset is formatted.
pub struct DelimitedSource {
    path: PathBuf,
    name: String,
    delimiter: u8,
}

impl DelimitedSource {
    pub fn new(path: PathBuf, delimiter: u8) -> Self {
        let name = display_name(&path);
        Self { path, name, delimiter }
    }

    pub fn csv(path: PathBuf) -> Self {
        Self::new(path, b',')
    }

    pub fn tsv(path: PathBuf) -> Self {
        Self::new(path, b'\t')
    }

    /// Parse delimited text from any reader
    pub fn parse<R: std::io::Read>(reader: R, delimiter: u8) -> Result<Vec<Record>, VisControllerDataError> {
        let mut csv_reader = ReaderBuilder::new()
            .has_headers(true)
            .delimiter(delimiter)
            .flexible(true)
            .from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        let mut records = Vec::new();

        for (row, result) in csv_reader.records().enumerate() {
            let fields = result?;
            if fields.len() > headers.len() {
                warn!(row, expected = headers.len(), found = fields.len(), "ignoring fields past the header");
            }

            let record: Record = headers
                .iter()
                .zip(fields.iter())
                .map(|(name, value)| (name.to_string(), FieldValue::Raw(Value::String(value.to_string()))))
                .collect();
            records.push(record);
        }

        Ok(records)
    }

    fn read_file(path: &Path, delimiter: u8) -> Result<Vec<Record>, VisControllerDataError> {
        let file = File::open(path).map_err(|source| VisControllerDataError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(BufReader::new(file), delimiter)
    }
}

#[async_trait]
impl RecordSource for DelimitedSource {
    async fn read(&self) -> Result<Dataset, VisControllerDataError> {
        let path = self.path.clone();
        let delimiter = self.delimiter;
        let records = tokio::task::spawn_blocking(move || DelimitedSource::read_file(&path, delimiter)).await??;

        debug!(source = %self.name, rows = records.len(), "read delimited file");
        Ok(Dataset::new(records).with_source_name(self.name.clone()))
    }

    fn source_name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_names_every_row() {
        let records = DelimitedSource::parse("a,b,c\n1,2,3\n4,5,6\n".as_bytes(), b',').unwrap();
        assert_eq!(records.len(), 2);
        for record in &records {
            let keys: Vec<_> = record.keys().map(String::as_str).collect();
            assert_eq!(keys, vec!["a", "b", "c"]);
        }
        assert_eq!(records[1]["c"].raw(), Some(&Value::String("6".to_string())));
    }

    #[test]
    fn test_tab_delimited() {
        let records = DelimitedSource::parse("date\tframe\n2017!07!10\t42/120\n".as_bytes(), b'\t').unwrap();
        assert_eq!(records[0]["frame"].raw(), Some(&Value::String("42/120".to_string())));
    }

    #[test]
    fn test_short_rows_omit_missing_fields() {
        let records = DelimitedSource::parse("a,b,c\n1,2\n".as_bytes(), b',').unwrap();
        assert_eq!(records[0].len(), 2);
        assert!(records[0].get("c").is_none());
    }
}
