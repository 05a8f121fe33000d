use crate::reconcile::types::{DeviceGroup, SensorReading};
use crate::reconcile::utility::parse_timestamp;
use std::collections::HashMap;
use tracing::debug;

/// Folds `readings` into per-(client, sensor type) aggregates.
///
/// Groups come back in order of first appearance and each history keeps raw
/// arrival order. `latest` moves only to a reading whose timestamp parses and
/// is strictly newer; readings with malformed timestamps are kept in history
/// but never become latest.
///
/// Every call re-walks the whole slice. Bound the input with [`window_tail`]
/// (or any other pre-windowing) when histories grow large.
pub fn group_readings(readings: &[SensorReading]) -> Vec<DeviceGroup<'_>> {
    let mut groups: Vec<DeviceGroup<'_>> = Vec::new();
    let mut index: HashMap<(&str, &str), usize> = HashMap::new();

    for reading in readings {
        let key = (reading.client_id.as_str(), reading.effective_sensor_type());

        let Some(slot) = index.get(&key).copied() else {
            index.insert(key, groups.len());
            groups.push(DeviceGroup::new(reading));
            continue;
        };

        let group = &mut groups[slot];
        group.readings.push(reading);

        if is_newer(reading, group.latest()) {
            group.latest = group.readings.len() - 1;
        }
    }

    debug!(
        readings = readings.len(),
        groups = groups.len(),
        "Grouped readings"
    );

    groups
}

/// True when `candidate` parses and is strictly after `current`. A current
/// latest with an unparseable timestamp loses to any parseable one.
fn is_newer(candidate: &SensorReading, current: &SensorReading) -> bool {
    let Some(candidate_ts) = parse_timestamp(&candidate.timestamp) else {
        return false;
    };
    match parse_timestamp(&current.timestamp) {
        Some(current_ts) => candidate_ts > current_ts,
        None => true,
    }
}

/// Returns the trailing `max` readings of `readings`.
pub fn window_tail(readings: &[SensorReading], max: usize) -> &[SensorReading] {
    let start = readings.len().saturating_sub(max);
    &readings[start..]
}

/// Groups that belong to `client_id`, in their original order.
pub fn groups_for_client<'g, 'a>(
    groups: &'g [DeviceGroup<'a>],
    client_id: &str,
) -> Vec<&'g DeviceGroup<'a>> {
    groups.iter().filter(|g| g.client_id == client_id).collect()
}

impl<'a> DeviceGroup<'a> {
    /// History sorted by parsed timestamp. Unparseable readings go last,
    /// ties keep arrival order.
    pub fn chronological(&self) -> Vec<&'a SensorReading> {
        let mut sorted = self.readings.clone();
        sorted.sort_by_cached_key(|r| match parse_timestamp(&r.timestamp) {
            Some(ts) => (false, Some(ts)),
            None => (true, None),
        });
        sorted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn reading(client: &str, sensor: &str, ts: &str) -> SensorReading {
        SensorReading {
            sensor_type: Some(sensor.to_string()),
            client_id: client.to_string(),
            timestamp: ts.to_string(),
            data: json!({ "ts": ts }),
            ..Default::default()
        }
    }

    const T1: &str = "2024-05-01T10:00:00Z";
    const T2: &str = "2024-05-01T11:00:00Z";
    const T3: &str = "2024-05-01T12:00:00Z";

    #[test]
    fn test_empty_input() {
        assert!(group_readings(&[]).is_empty());
    }

    #[test]
    fn test_out_of_order_keeps_newest_as_latest() {
        let readings = vec![
            reading("clientA", "thermal_probe", T2),
            reading("clientA", "thermal_probe", T1),
        ];
        let groups = group_readings(&readings);

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].latest().timestamp, T2);
        let history: Vec<_> = groups[0].readings().iter().map(|r| r.timestamp.as_str()).collect();
        assert_eq!(history, vec![T2, T1]);
    }

    #[test]
    fn test_latest_is_max_regardless_of_arrival() {
        let readings = vec![
            reading("c", "gps", T1),
            reading("c", "gps", T3),
            reading("c", "gps", T2),
        ];
        let groups = group_readings(&readings);
        assert_eq!(groups[0].latest().timestamp, T3);
        assert_eq!(groups[0].readings().len(), 3);
    }

    #[test]
    fn test_malformed_timestamp_never_becomes_latest() {
        let readings = vec![reading("c", "gps", T1), reading("c", "gps", "not-a-date")];
        let groups = group_readings(&readings);

        assert_eq!(groups[0].latest().timestamp, T1);
        assert_eq!(groups[0].readings().len(), 2);
        assert_eq!(groups[0].readings()[1].timestamp, "not-a-date");
    }

    #[test]
    fn test_valid_timestamp_replaces_malformed_first_reading() {
        let readings = vec![reading("c", "gps", "garbage"), reading("c", "gps", T1)];
        let groups = group_readings(&readings);
        assert_eq!(groups[0].latest().timestamp, T1);
    }

    #[test]
    fn test_minute_precision_reading_becomes_latest() {
        let readings = vec![
            reading("c", "gps", T1),
            reading("c", "gps", "2024-05-01T12:00Z"),
            reading("c", "gps", "2024-05-01T11:00:00+0000"),
        ];
        let groups = group_readings(&readings);
        assert_eq!(groups[0].latest().timestamp, "2024-05-01T12:00Z");
    }

    #[test]
    fn test_equal_timestamp_does_not_replace() {
        let mut second = reading("c", "gps", T1);
        second.device_id = Some("second".into());
        let readings = vec![reading("c", "gps", T1), second];
        let groups = group_readings(&readings);
        assert_eq!(groups[0].latest().device_id, None);
    }

    #[test]
    fn test_keys_split_by_client_and_sensor_type() {
        let readings = vec![
            reading("a", "gps", T1),
            reading("b", "gps", T1),
            reading("a", "starlink", T1),
            reading("a", "gps", T2),
        ];
        let groups = group_readings(&readings);

        let keys: Vec<_> = groups
            .iter()
            .map(|g| (g.client_id.as_str(), g.device_type.as_str()))
            .collect();
        assert_eq!(keys, vec![("a", "gps"), ("b", "gps"), ("a", "starlink")]);
        assert_eq!(groups[0].readings().len(), 2);
    }

    #[test]
    fn test_device_type_fallbacks() {
        let readings = vec![
            SensorReading {
                device_type: Some("lora_node".into()),
                device_id: Some("node-1".into()),
                client_id: "c".into(),
                ..Default::default()
            },
            SensorReading {
                client_id: "c".into(),
                ..Default::default()
            },
        ];
        let groups = group_readings(&readings);
        assert_eq!(groups[0].device_type, "lora_node");
        assert_eq!(groups[0].device_id, "node-1");
        assert_eq!(groups[1].device_type, "unknown");
        assert_eq!(groups[1].device_id, "unknown");
    }

    #[test]
    fn test_window_tail() {
        let readings = vec![
            reading("c", "gps", T1),
            reading("c", "gps", T2),
            reading("c", "gps", T3),
        ];
        assert_eq!(window_tail(&readings, 2).len(), 2);
        assert_eq!(window_tail(&readings, 2)[0].timestamp, T2);
        assert_eq!(window_tail(&readings, 10).len(), 3);
        assert!(window_tail(&readings, 0).is_empty());
    }

    #[test]
    fn test_chronological_view() {
        let readings = vec![
            reading("c", "gps", T3),
            reading("c", "gps", "bad"),
            reading("c", "gps", T1),
        ];
        let groups = group_readings(&readings);
        let order: Vec<_> = groups[0]
            .chronological()
            .iter()
            .map(|r| r.timestamp.clone())
            .collect();
        assert_eq!(order, vec![T1.to_string(), T3.to_string(), "bad".to_string()]);
    }

    #[test]
    fn test_groups_for_client() {
        let readings = vec![reading("a", "gps", T1), reading("b", "wifi", T1)];
        let groups = group_readings(&readings);
        let b = groups_for_client(&groups, "b");
        assert_eq!(b.len(), 1);
        assert_eq!(b[0].device_type, "wifi");
    }
}
