//! Sensor reading reconciliation.
//!
//! Groups raw readings into per-device aggregates, classifies device types,
//! extracts coordinates from nested payloads, resolves one location per
//! client and coalesces dashboard metrics from overlapping sources. Every
//! function here is pure over its inputs and never fails.

pub mod classify;
pub mod coalesce;
pub mod extract;
pub mod group;
pub mod resolve;
pub mod types;
pub mod utility;

pub use classify::{classify, priority};
pub use coalesce::{DashboardSummary, first_defined, summarize};
pub use extract::{ExtractedLocation, extract};
pub use group::{group_readings, groups_for_client, window_tail};
pub use resolve::{rank_candidates, resolve_clients, resolve_location};
pub use types::{
    Category, ClientGeo, ClientInfo, DeviceGroup, LatLng, ResolvedLocation, SensorReading,
};
