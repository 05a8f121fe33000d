//! Output formatting and persistence for reconciliation results.
//!
//! Supports pretty-printing, JSON serialization, and CSV append.

use anyhow::Result;
use serde::Serialize;
use tracing::{debug, info};

use crate::reconcile::ResolvedLocation;
use csv::WriterBuilder;
use std::fs::OpenOptions;
use std::path::Path;

/// One CSV row: a client and the location resolved for it.
#[derive(Debug, Serialize)]
pub struct LocationRecord {
    pub client_id: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub altitude: Option<f64>,
    pub accuracy: Option<f64>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub source: String,
    pub device_id: Option<String>,
    pub timestamp: Option<String>,
}

impl LocationRecord {
    pub fn new(client_id: &str, location: &ResolvedLocation) -> Self {
        Self {
            client_id: client_id.to_string(),
            latitude: location.latitude,
            longitude: location.longitude,
            altitude: location.altitude,
            accuracy: location.accuracy,
            city: location.city.clone(),
            country: location.country.clone(),
            source: location.source.to_string(),
            device_id: location.device_id.clone(),
            timestamp: location.timestamp.clone(),
        }
    }
}

/// Logs a value using Rust's debug pretty-print format.
pub fn print_pretty<T: std::fmt::Debug>(value: &T) {
    debug!("{:#?}", value);
}

/// Logs a value as pretty-printed JSON.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Appends a [`LocationRecord`] as a row to a CSV file.
///
/// Creates the file with headers if it does not already exist.
pub fn append_record(path: &str, record: &LocationRecord) -> Result<()> {
    let file_exists = Path::new(path).exists();
    debug!(path, file_exists, "Appending CSV record");

    let file = OpenOptions::new().append(true).create(true).open(path)?;

    let mut writer = WriterBuilder::new()
        .has_headers(!file_exists) // IMPORTANT when appending
        .from_writer(file);

    writer.serialize(record)?;
    writer.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::Category;
    use std::env;
    use std::fs;

    fn temp_path(name: &str) -> String {
        format!("{}/{}", env::temp_dir().display(), name)
    }

    fn record() -> LocationRecord {
        let location = ResolvedLocation {
            latitude: Some(34.5),
            longitude: Some(-118.2),
            source: Category::Starlink,
            device_id: Some("dish-1".into()),
            ..ResolvedLocation::unknown()
        };
        LocationRecord::new("client-1", &location)
    }

    #[test]
    fn test_print_pretty_does_not_panic() {
        print_pretty(&record());
    }

    #[test]
    fn test_print_json_does_not_panic() {
        print_json(&ResolvedLocation::unknown()).unwrap();
    }

    #[test]
    fn test_record_flattens_source() {
        let r = record();
        assert_eq!(r.source, "starlink");
        assert_eq!(r.client_id, "client-1");
        assert_eq!(r.city, None);
    }

    #[test]
    fn test_append_record_writes_header_once() {
        let path = temp_path("sensor_reconcile_test_header.csv");
        let _ = fs::remove_file(&path);

        append_record(&path, &record()).unwrap();
        append_record(&path, &record()).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let header_count = content.lines().filter(|l| l.starts_with("client_id")).count();
        assert_eq!(header_count, 1);

        // 1 header + 2 data rows
        assert_eq!(content.lines().count(), 3);
        assert!(content.contains("client-1,34.5,-118.2"));

        fs::remove_file(&path).unwrap();
    }
}
