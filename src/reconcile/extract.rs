//! Coordinate extraction from arbitrarily nested sensor payloads.
//!
//! Each category owns an ordered list of [`Probe`]s. A probe walks to a node
//! in the payload and looks for a coordinate pair there; the first probe that
//! finds one wins. Missing or malformed fields never fail, they just don't
//! match.

use crate::reconcile::types::Category;
use serde_json::Value;

/// A coordinate pair plus whatever context the matching payload carried.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedLocation {
    pub lat: f64,
    pub lng: f64,
    pub altitude: Option<f64>,
    pub accuracy: Option<f64>,
    pub city: Option<String>,
    pub country: Option<String>,
}

/// How a probe inspects the node it walked to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeMode {
    /// Only `{latitude, longitude}` directly on the node.
    Flat,
    /// Every shape in [`SHAPES`], in order.
    Generic,
}

/// One step of a category's extraction strategy.
#[derive(Debug, Clone, Copy)]
pub struct Probe {
    pub path: &'static [&'static str],
    pub mode: ProbeMode,
}

impl Probe {
    const fn flat(path: &'static [&'static str]) -> Self {
        Self {
            path,
            mode: ProbeMode::Flat,
        }
    }

    const fn generic(path: &'static [&'static str]) -> Self {
        Self {
            path,
            mode: ProbeMode::Generic,
        }
    }

    /// Runs this probe against `payload`.
    pub fn run(&self, payload: &Value) -> Option<ExtractedLocation> {
        let node = self
            .path
            .iter()
            .try_fold(payload, |node, key| node.get(*key))?;

        match self.mode {
            ProbeMode::Flat => FLAT_SHAPE.match_node(node),
            ProbeMode::Generic => generic_probe(node),
        }
    }
}

static STARLINK_PROBES: &[Probe] = &[
    Probe::flat(&["starlink"]),
    Probe::generic(&["starlink"]),
    Probe::generic(&[]),
];

static GPS_PROBES: &[Probe] = &[
    Probe::generic(&["gps"]),
    Probe::generic(&["gnss"]),
    Probe::generic(&[]),
];

static ARDUINO_PROBES: &[Probe] = &[
    Probe::generic(&["arduino"]),
    Probe::generic(&["sensors", "gps"]),
    Probe::generic(&[]),
];

static LORA_PROBES: &[Probe] = &[
    Probe::generic(&["lora"]),
    Probe::generic(&["gateway"]),
    Probe::generic(&[]),
];

static ADSB_PROBES: &[Probe] = &[
    Probe::generic(&["receiver_location"]),
    Probe::generic(&["adsb"]),
    Probe::generic(&["station_location"]),
    Probe::generic(&[]),
];

static DEFAULT_PROBES: &[Probe] = &[Probe::generic(&[])];

/// Returns the ordered probe list for `category`.
pub fn probes_for(category: Category) -> &'static [Probe] {
    match category {
        Category::Starlink => STARLINK_PROBES,
        Category::Gps => GPS_PROBES,
        Category::Arduino => ARDUINO_PROBES,
        Category::Lora => LORA_PROBES,
        Category::Adsb => ADSB_PROBES,
        _ => DEFAULT_PROBES,
    }
}

/// A recognizable coordinate layout: an optional container key plus the
/// accepted latitude and longitude key names.
#[derive(Debug, Clone, Copy)]
struct Shape {
    container: Option<&'static str>,
    lat_keys: &'static [&'static str],
    lng_keys: &'static [&'static str],
}

impl Shape {
    const fn new(
        container: Option<&'static str>,
        lat_keys: &'static [&'static str],
        lng_keys: &'static [&'static str],
    ) -> Self {
        Self {
            container,
            lat_keys,
            lng_keys,
        }
    }

    fn match_node(&self, node: &Value) -> Option<ExtractedLocation> {
        let holder = match self.container {
            Some(key) => node.get(key)?,
            None => node,
        };
        if !holder.is_object() {
            return None;
        }

        let lat = first_number(holder, self.lat_keys)?;
        let lng = first_number(holder, self.lng_keys)?;

        Some(ExtractedLocation {
            lat,
            lng,
            altitude: first_number(holder, ALTITUDE_KEYS).or_else(|| first_number(node, ALTITUDE_KEYS)),
            accuracy: first_number(holder, ACCURACY_KEYS).or_else(|| first_number(node, ACCURACY_KEYS)),
            city: string_field(holder, "city").or_else(|| string_field(node, "city")),
            country: string_field(holder, "country").or_else(|| string_field(node, "country")),
        })
    }
}

const LAT_LONG: (&[&str], &[&str]) = (&["latitude"], &["longitude"]);
const LAT_LNG: (&[&str], &[&str]) = (&["lat"], &["lng", "lon"]);

static FLAT_SHAPE: Shape = Shape::new(None, LAT_LONG.0, LAT_LONG.1);

/// Shapes tried by the generic probe, in priority order.
static SHAPES: &[Shape] = &[
    Shape::new(None, LAT_LONG.0, LAT_LONG.1),
    Shape::new(None, &["lat"], &["lon", "lng"]),
    Shape::new(Some("location"), LAT_LONG.0, LAT_LONG.1),
    Shape::new(Some("location"), LAT_LNG.0, LAT_LNG.1),
    Shape::new(Some("gps_location"), LAT_LONG.0, LAT_LONG.1),
    Shape::new(Some("gps_location"), LAT_LNG.0, LAT_LNG.1),
    Shape::new(Some("location_detail"), LAT_LONG.0, LAT_LONG.1),
    Shape::new(Some("location_detail"), LAT_LNG.0, LAT_LNG.1),
    Shape::new(Some("coordinates"), LAT_LONG.0, LAT_LONG.1),
    Shape::new(Some("coordinates"), LAT_LNG.0, LAT_LNG.1),
    Shape::new(Some("position"), LAT_LONG.0, LAT_LONG.1),
];

static ALTITUDE_KEYS: &[&str] = &["altitude", "alt", "altitude_m"];
static ACCURACY_KEYS: &[&str] = &["accuracy", "accuracy_m", "horizontal_accuracy"];

/// Tries every shape in [`SHAPES`] against `node`; the first match wins.
pub fn generic_probe(node: &Value) -> Option<ExtractedLocation> {
    SHAPES.iter().find_map(|shape| shape.match_node(node))
}

/// Extracts a location from `payload` using the probe order of `category`.
pub fn extract(category: Category, payload: &Value) -> Option<ExtractedLocation> {
    probes_for(category)
        .iter()
        .find_map(|probe| probe.run(payload))
}

/// Reads the first key in `keys` that holds a finite number, or a string that
/// parses to one.
fn first_number(node: &Value, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|key| as_coordinate(node.get(*key)?))
}

fn as_coordinate(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

fn string_field(node: &Value, key: &str) -> Option<String> {
    node.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn coords(loc: Option<ExtractedLocation>) -> Option<(f64, f64)> {
        loc.map(|l| (l.lat, l.lng))
    }

    #[test]
    fn test_generic_shapes_in_priority_order() {
        assert_eq!(
            coords(generic_probe(&json!({ "latitude": 1.0, "longitude": 2.0 }))),
            Some((1.0, 2.0))
        );
        assert_eq!(
            coords(generic_probe(&json!({ "lat": 3.0, "lon": 4.0 }))),
            Some((3.0, 4.0))
        );
        assert_eq!(
            coords(generic_probe(&json!({ "lat": 3.0, "lng": 5.0 }))),
            Some((3.0, 5.0))
        );
        assert_eq!(
            coords(generic_probe(&json!({ "location": { "lat": 6.0, "lng": 7.0 } }))),
            Some((6.0, 7.0))
        );
        assert_eq!(
            coords(generic_probe(
                &json!({ "gps_location": { "latitude": 8.0, "longitude": 9.0 } })
            )),
            Some((8.0, 9.0))
        );
        assert_eq!(
            coords(generic_probe(
                &json!({ "location_detail": { "lat": 10.0, "lng": 11.0 } })
            )),
            Some((10.0, 11.0))
        );
        assert_eq!(
            coords(generic_probe(&json!({ "coordinates": { "lat": 12.0, "lng": 13.0 } }))),
            Some((12.0, 13.0))
        );
        assert_eq!(
            coords(generic_probe(
                &json!({ "position": { "latitude": 14.0, "longitude": 15.0 } })
            )),
            Some((14.0, 15.0))
        );
    }

    #[test]
    fn test_top_level_pair_beats_nested() {
        let payload = json!({
            "latitude": 1.0,
            "longitude": 1.0,
            "location": { "latitude": 2.0, "longitude": 2.0 }
        });
        assert_eq!(coords(generic_probe(&payload)), Some((1.0, 1.0)));
    }

    #[test]
    fn test_incomplete_or_malformed_pairs_do_not_match() {
        assert_eq!(generic_probe(&json!({ "latitude": 1.0 })), None);
        assert_eq!(generic_probe(&json!({ "lat": "north", "lng": 2.0 })), None);
        assert_eq!(generic_probe(&json!({ "location": "here" })), None);
        assert_eq!(generic_probe(&json!(null)), None);
        assert_eq!(generic_probe(&json!([1.0, 2.0])), None);
    }

    #[test]
    fn test_numeric_strings_and_zero_are_accepted() {
        assert_eq!(
            coords(generic_probe(&json!({ "lat": "51.5", "lon": "0" }))),
            Some((51.5, 0.0))
        );
    }

    #[test]
    fn test_context_fields_are_carried() {
        let loc = generic_probe(&json!({
            "city": "Reno",
            "location": { "lat": 39.5, "lng": -119.8, "alt": 1373.0, "accuracy": 4.5 },
            "country": "US"
        }))
        .unwrap();
        assert_eq!(loc.altitude, Some(1373.0));
        assert_eq!(loc.accuracy, Some(4.5));
        assert_eq!(loc.city.as_deref(), Some("Reno"));
        assert_eq!(loc.country.as_deref(), Some("US"));
    }

    #[test]
    fn test_starlink_prefers_nested_block() {
        let payload = json!({
            "latitude": 1.0,
            "longitude": 1.0,
            "starlink": { "latitude": 34.5, "longitude": -118.2 }
        });
        assert_eq!(
            coords(extract(Category::Starlink, &payload)),
            Some((34.5, -118.2))
        );
    }

    #[test]
    fn test_starlink_generic_inside_block_then_top_level() {
        let nested = json!({ "starlink": { "gps_location": { "lat": 2.0, "lng": 3.0 } } });
        assert_eq!(coords(extract(Category::Starlink, &nested)), Some((2.0, 3.0)));

        let top = json!({ "starlink": { "uptime": 42 }, "lat": 4.0, "lon": 5.0 });
        assert_eq!(coords(extract(Category::Starlink, &top)), Some((4.0, 5.0)));
    }

    #[test]
    fn test_gps_checks_gnss_before_top_level() {
        let payload = json!({
            "gnss": { "lat": 10.0, "lon": 20.0 },
            "latitude": 0.5,
            "longitude": 0.5
        });
        assert_eq!(coords(extract(Category::Gps, &payload)), Some((10.0, 20.0)));
    }

    #[test]
    fn test_arduino_reads_sensor_gps() {
        let payload = json!({ "sensors": { "gps": { "latitude": 7.0, "longitude": 8.0 } } });
        assert_eq!(coords(extract(Category::Arduino, &payload)), Some((7.0, 8.0)));
    }

    #[test]
    fn test_lora_falls_back_to_gateway() {
        let payload = json!({ "lora": { "rssi": -90 }, "gateway": { "lat": 1.5, "lng": 2.5 } });
        assert_eq!(coords(extract(Category::Lora, &payload)), Some((1.5, 2.5)));
    }

    #[test]
    fn test_adsb_prefers_receiver_location() {
        let payload = json!({
            "adsb": { "lat": 50.0, "lon": 8.0 },
            "receiver_location": { "lat": 49.0, "lon": 7.0 }
        });
        assert_eq!(coords(extract(Category::Adsb, &payload)), Some((49.0, 7.0)));

        let station = json!({ "station_location": { "latitude": 48.0, "longitude": 6.0 } });
        assert_eq!(coords(extract(Category::Adsb, &station)), Some((48.0, 6.0)));
    }

    #[test]
    fn test_other_categories_use_top_level_only() {
        let payload = json!({ "gps": { "lat": 1.0, "lon": 2.0 } });
        assert_eq!(extract(Category::Thermal, &payload), None);
        assert!(extract(Category::Gps, &payload).is_some());
    }
}
