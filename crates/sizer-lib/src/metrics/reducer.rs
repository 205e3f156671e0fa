//! Reduction of instant vectors into one value per container

use super::client::QueryResult;
use crate::error::MetricsError;
use crate::models::ContainerUsage;
use std::collections::HashMap;

/// Label carrying the container name on cAdvisor series
pub const CONTAINER_LABEL: &str = "container";

/// Reduce an instant vector to one value per container.
///
/// Samples without a `container` label and NaN samples are dropped. The
/// remaining values are grouped by container, sorted ascending and the last
/// element is kept; a container whose samples were all NaN has no entry. The
/// same rule applies to the base and the peak queries, so the "average" maps
/// also hold the highest sampled value across the workload's pods.
///
/// Any unparseable sample fails the whole query. Non-vector results are
/// rejected.
pub fn reduce_vector(result: &QueryResult) -> Result<ContainerUsage, MetricsError> {
    let samples = match result {
        QueryResult::Vector(samples) => samples,
        other => return Err(MetricsError::UnsupportedResultType(other.kind())),
    };

    let mut grouped: HashMap<&str, Vec<f64>> = HashMap::new();
    for sample in samples {
        let raw = &sample.value.1;
        let value: f64 = raw.parse().map_err(|source| MetricsError::SampleParse {
            value: raw.clone(),
            source,
        })?;

        if value.is_nan() {
            continue;
        }
        if let Some(container) = sample.metric.get(CONTAINER_LABEL) {
            grouped.entry(container.as_str()).or_default().push(value);
        }
    }

    let mut usage = ContainerUsage::with_capacity(grouped.len());
    for (container, mut values) in grouped {
        values.sort_by(f64::total_cmp);
        if let Some(&last) = values.last() {
            usage.insert(container.to_string(), last);
        }
    }

    Ok(usage)
}
