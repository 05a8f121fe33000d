//! Picks one location per client out of whatever its devices claim.

use crate::reconcile::classify::{classify, priority};
use crate::reconcile::extract::extract;
use crate::reconcile::types::{Category, ClientInfo, DeviceGroup, ResolvedLocation};
use serde_json::Value;
use std::collections::HashSet;
use tracing::debug;

/// Builds a candidate for one device, or `None` when it has no usable
/// coordinates.
fn candidate(device: &DeviceGroup<'_>) -> Option<ResolvedLocation> {
    let latest = device.latest();
    let source = classify(&device.device_type);

    let location = match device.location {
        Some(loc) => ResolvedLocation {
            latitude: Some(loc.lat),
            longitude: Some(loc.lng),
            city: text(&latest.data, "city"),
            country: text(&latest.data, "country"),
            ..ResolvedLocation::unknown()
        },
        None => {
            let found = extract(source, &latest.data)?;
            ResolvedLocation {
                latitude: Some(found.lat),
                longitude: Some(found.lng),
                altitude: found.altitude,
                accuracy: found.accuracy,
                city: found.city,
                country: found.country,
                ..ResolvedLocation::unknown()
            }
        }
    };

    Some(ResolvedLocation {
        source,
        device_id: Some(device.device_id.clone()),
        timestamp: Some(latest.timestamp.clone()).filter(|t| !t.is_empty()),
        ..location
    })
}

fn text(data: &Value, key: &str) -> Option<String> {
    data.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Every device-derived candidate, best first.
///
/// The sort is stable, so equal priorities keep the order of `devices`.
pub fn rank_candidates<'g, 'a: 'g, I>(devices: I) -> Vec<ResolvedLocation>
where
    I: IntoIterator<Item = &'g DeviceGroup<'a>>,
{
    let mut candidates: Vec<ResolvedLocation> =
        devices.into_iter().filter_map(candidate).collect();
    candidates.sort_by_key(|c| priority(c.source));
    candidates
}

/// Resolves the single best location for a client.
///
/// The client's IP geolocation competes as one more candidate ranked after
/// every device, so it only beats devices of a worse category (`adsb`).
/// With no candidate at all the result is [`ResolvedLocation::unknown`].
pub fn resolve_location<'g, 'a: 'g, I>(client: Option<&ClientInfo>, devices: I) -> ResolvedLocation
where
    I: IntoIterator<Item = &'g DeviceGroup<'a>>,
{
    let mut candidates: Vec<ResolvedLocation> =
        devices.into_iter().filter_map(candidate).collect();
    candidates.extend(client.and_then(geolocated));
    candidates.sort_by_key(|c| priority(c.source));

    debug!(candidates = candidates.len(), "Ranked location candidates");

    candidates
        .into_iter()
        .next()
        .unwrap_or_else(ResolvedLocation::unknown)
}

fn geolocated(client: &ClientInfo) -> Option<ResolvedLocation> {
    let geo = client.location.as_ref()?;
    let (latitude, longitude) = (geo.latitude?, geo.longitude?);
    Some(ResolvedLocation {
        latitude: Some(latitude),
        longitude: Some(longitude),
        city: geo.city.clone(),
        country: geo.country.clone(),
        source: Category::Geolocated,
        ..ResolvedLocation::unknown()
    })
}

/// Resolves every client known to the registry or seen in `groups`.
///
/// Registry clients come first in registry order, followed by clients that
/// only appear in the readings, in group order.
pub fn resolve_clients(
    clients: &[ClientInfo],
    groups: &[DeviceGroup<'_>],
) -> Vec<(String, ResolvedLocation)> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut resolved = Vec::new();

    for client in clients {
        if !seen.insert(client.client_id.as_str()) {
            continue;
        }
        let devices = groups.iter().filter(|g| g.client_id == client.client_id);
        resolved.push((client.client_id.clone(), resolve_location(Some(client), devices)));
    }

    for group in groups {
        if !seen.insert(group.client_id.as_str()) {
            continue;
        }
        let devices = groups.iter().filter(|g| g.client_id == group.client_id);
        resolved.push((group.client_id.clone(), resolve_location(None, devices)));
    }

    resolved
}
