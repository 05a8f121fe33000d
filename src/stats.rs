use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

use crate::reconcile::extract::extract;
use crate::reconcile::utility::parse_timestamp;
use crate::reconcile::{DeviceGroup, classify};

/// Counts derived locally from a grouped reading set.
///
/// Serialized, this is the `local` source used as the last metric fallback.
#[derive(Debug, Default, Serialize)]
pub struct ReadingStats {
    pub total_readings: usize,
    pub active_devices: usize,
    pub active_clients: usize,
    pub located_devices: usize,
    pub malformed_timestamps: usize,

    // devices per category
    pub by_category: BTreeMap<String, usize>,
}

impl ReadingStats {
    pub fn from_groups(groups: &[DeviceGroup<'_>]) -> Self {
        let mut s = ReadingStats::default();
        let mut clients: HashSet<&str> = HashSet::new();

        for g in groups {
            s.active_devices += 1;
            s.total_readings += g.readings().len();

            clients.insert(&g.client_id);

            let category = classify(&g.device_type);
            *s.by_category.entry(category.to_string()).or_default() += 1;

            if g.location.is_some() || extract(category, &g.latest().data).is_some() {
                s.located_devices += 1;
            }

            s.malformed_timestamps += g
                .readings()
                .iter()
                .filter(|r| parse_timestamp(&r.timestamp).is_none())
                .count();
        }

        s.active_clients = clients.len();
        s
    }

    pub fn pct(part: usize, total: usize) -> f64 {
        if total == 0 {
            0.0
        } else {
            (part as f64 / total as f64) * 100.0
        }
    }

    pub fn located_pct(&self) -> f64 {
        Self::pct(self.located_devices, self.active_devices)
    }

    /// The stats as a JSON document for metric coalescing.
    pub fn to_source(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}
