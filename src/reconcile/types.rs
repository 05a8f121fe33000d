//! Data types shared by the grouping and resolution pipeline.

use serde::{Deserialize, Serialize};
use serde::ser::{SerializeStruct, Serializer};
use std::fmt;

/// One raw observation as handed over by the fetch layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sensor_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_type: Option<String>,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl SensorReading {
    /// `sensor_type`, then `device_type`, then `"unknown"`.
    pub fn effective_sensor_type(&self) -> &str {
        self.sensor_type
            .as_deref()
            .or(self.device_type.as_deref())
            .unwrap_or("unknown")
    }

    /// `device_id`, falling back to the effective sensor type.
    pub fn effective_device_id(&self) -> &str {
        self.device_id
            .as_deref()
            .unwrap_or_else(|| self.effective_sensor_type())
    }
}

/// A plain coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

/// Per-(client, sensor type) aggregate over a borrowed reading set.
///
/// `latest` is kept as an index into `readings`, so it always points at an
/// element of the history.
#[derive(Debug, Clone)]
pub struct DeviceGroup<'a> {
    pub device_id: String,
    pub device_type: String,
    pub client_id: String,
    pub(crate) readings: Vec<&'a SensorReading>,
    pub(crate) latest: usize,
    pub location: Option<LatLng>,
}

impl<'a> DeviceGroup<'a> {
    pub(crate) fn new(reading: &'a SensorReading) -> Self {
        Self {
            device_id: reading.effective_device_id().to_string(),
            device_type: reading.effective_sensor_type().to_string(),
            client_id: reading.client_id.clone(),
            readings: vec![reading],
            latest: 0,
            location: None,
        }
    }

    /// History in raw arrival order.
    pub fn readings(&self) -> &[&'a SensorReading] {
        &self.readings
    }

    /// The reading with the greatest parseable timestamp seen so far.
    pub fn latest(&self) -> &'a SensorReading {
        self.readings[self.latest]
    }

    /// Attaches a precomputed location, which the resolver prefers over extraction.
    pub fn with_location(mut self, location: LatLng) -> Self {
        self.location = Some(location);
        self
    }
}

impl Serialize for DeviceGroup<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("DeviceGroup", 6)?;
        s.serialize_field("device_id", &self.device_id)?;
        s.serialize_field("device_type", &self.device_type)?;
        s.serialize_field("client_id", &self.client_id)?;
        s.serialize_field("readings", &self.readings)?;
        s.serialize_field("latest", self.latest())?;
        s.serialize_field("location", &self.location)?;
        s.end()
    }
}

/// Where a location candidate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Starlink,
    Gps,
    Lora,
    Arduino,
    Adsb,
    Thermal,
    System,
    Wifi,
    Bluetooth,
    Geolocated,
    Unknown,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Starlink => "starlink",
            Category::Gps => "gps",
            Category::Lora => "lora",
            Category::Arduino => "arduino",
            Category::Adsb => "adsb",
            Category::Thermal => "thermal",
            Category::System => "system",
            Category::Wifi => "wifi",
            Category::Bluetooth => "bluetooth",
            Category::Geolocated => "geolocated",
            Category::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Best-guess position of a client. Absent coordinates mean "no location".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedLocation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub altitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    pub source: Category,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl ResolvedLocation {
    /// The degenerate result: no coordinates, source `unknown`.
    pub fn unknown() -> Self {
        Self {
            latitude: None,
            longitude: None,
            altitude: None,
            accuracy: None,
            city: None,
            country: None,
            source: Category::Unknown,
            device_id: None,
            timestamp: None,
        }
    }

    pub fn has_coordinates(&self) -> bool {
        self.latitude.is_some() && self.longitude.is_some()
    }
}

/// IP-geolocation block attached to a client by the registry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientGeo {
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

/// A reporting host as known to the client registry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientInfo {
    pub client_id: String,
    #[serde(default)]
    pub hostname: String,
    #[serde(default)]
    pub ip_address: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub last_seen: String,
    #[serde(default)]
    pub location: Option<ClientGeo>,
}
