use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One place a metric may be read from: a named aggregate-statistics
/// document and a JSON pointer into it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricCandidate {
    pub source: String,
    pub pointer: String,
}

impl MetricCandidate {
    fn new(source: &str, pointer: &str) -> Self {
        Self {
            source: source.to_string(),
            pointer: pointer.to_string(),
        }
    }
}

/// Built-in candidate order per metric. `local` is the statistics computed
/// from the reading set itself and always comes last.
static DEFAULT_METRICS: &[(&str, &[(&str, &str)])] = &[
    (
        "total_readings",
        &[
            ("stats", "/total_readings"),
            ("summary", "/total"),
            ("summary", "/readings/count"),
            ("local", "/total_readings"),
        ],
    ),
    (
        "active_devices",
        &[
            ("stats", "/active_devices"),
            ("summary", "/devices/total"),
            ("local", "/active_devices"),
        ],
    ),
    (
        "active_clients",
        &[
            ("stats", "/active_clients"),
            ("summary", "/clients/total"),
            ("local", "/active_clients"),
        ],
    ),
    (
        "located_devices",
        &[("stats", "/located_devices"), ("local", "/located_devices")],
    ),
    (
        "readings_per_minute",
        &[("stats", "/readings_per_minute"), ("summary", "/rate/per_minute")],
    ),
];

/// Maps metric names to their ordered candidate lists.
///
/// Stored as a plain JSON object on disk:
/// ```json
/// {
///   "total_readings": [
///     { "source": "stats", "pointer": "/total_readings" },
///     { "source": "local", "pointer": "/total_readings" }
///   ]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricConfig {
    entries: BTreeMap<String, Vec<MetricCandidate>>,
}

impl Default for MetricConfig {
    fn default() -> Self {
        let entries = DEFAULT_METRICS
            .iter()
            .map(|(metric, candidates)| {
                let list = candidates
                    .iter()
                    .map(|(source, pointer)| MetricCandidate::new(source, pointer))
                    .collect();
                (metric.to_string(), list)
            })
            .collect();
        Self { entries }
    }
}

impl MetricConfig {
    /// Loads the config from a JSON file at `path`.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read metric config '{path}'"))?;
        Self::from_json(&content).with_context(|| format!("Invalid metric config '{path}'"))
    }

    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Returns the candidate list for `metric`, if one is configured.
    pub fn get(&self, metric: &str) -> Option<&[MetricCandidate]> {
        self.entries.get(metric).map(Vec::as_slice)
    }

    /// Iterates over all `(metric, candidates)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[MetricCandidate])> {
        self.entries
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}
