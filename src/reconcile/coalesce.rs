//! "First defined value" coalescing for dashboard summary metrics.

use crate::config::{MetricCandidate, MetricConfig};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

/// Returns the first present candidate, scanning in order.
///
/// ```
/// use sensor_reconcile::reconcile::coalesce::first_defined;
///
/// assert_eq!(first_defined([None, Some(5), Some(10)]), Some(5));
/// assert_eq!(first_defined::<i32, _>([None, None]), None);
/// ```
pub fn first_defined<T, I>(candidates: I) -> Option<T>
where
    I: IntoIterator<Item = Option<T>>,
{
    candidates.into_iter().flatten().next()
}

/// Looks up `pointer` in `source`, treating JSON null as absent.
fn lookup<'v>(source: &'v Value, pointer: &str) -> Option<&'v Value> {
    source.pointer(pointer).filter(|v| !v.is_null())
}

/// One coalesced metric together with the candidate that supplied it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricValue {
    pub value: Option<Value>,
    pub source: Option<String>,
}

/// Canonical metric values for the summary cards, keyed by metric name.
#[derive(Debug, Default, Serialize)]
pub struct DashboardSummary {
    pub metrics: BTreeMap<String, MetricValue>,
}

impl DashboardSummary {
    pub fn get(&self, metric: &str) -> Option<&Value> {
        self.metrics.get(metric).and_then(|m| m.value.as_ref())
    }

    /// The metric as a number, or `default` when absent or non-numeric.
    pub fn number_or(&self, metric: &str, default: f64) -> f64 {
        self.get(metric).and_then(Value::as_f64).unwrap_or(default)
    }

    /// The metric rendered for display, or `placeholder` when absent.
    pub fn display_or(&self, metric: &str, placeholder: &str) -> String {
        match self.get(metric) {
            Some(Value::String(s)) => s.clone(),
            Some(v) => v.to_string(),
            None => placeholder.to_string(),
        }
    }
}

/// Coalesces every metric in `config` over the named `sources`.
///
/// Candidates naming a source that was not supplied are skipped.
pub fn summarize(sources: &BTreeMap<String, Value>, config: &MetricConfig) -> DashboardSummary {
    let mut summary = DashboardSummary::default();

    for (metric, candidates) in config.iter() {
        let found = first_defined(candidates.iter().map(|c: &MetricCandidate| {
            let source = sources.get(&c.source)?;
            lookup(source, &c.pointer).map(|v| (v.clone(), c.source.clone()))
        }));

        debug!(
            metric,
            source = found.as_ref().map(|(_, s)| s.as_str()),
            "Coalesced metric"
        );

        let (value, source) = match found {
            Some((v, s)) => (Some(v), Some(s)),
            None => (None, None),
        };
        summary
            .metrics
            .insert(metric.to_string(), MetricValue { value, source });
    }

    summary
}
