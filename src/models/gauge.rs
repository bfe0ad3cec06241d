// Gauge samples: raw (weight 1) or pre-rolled (weight = number of raw samples folded in)

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GaugeValue {
    pub capture_time: i64,
    pub value: f64,
    pub weight: i64,
}

impl GaugeValue {
    pub fn new(capture_time: i64, value: f64, weight: i64) -> Self {
        Self {
            capture_time,
            value,
            weight,
        }
    }

    /// A single raw observation.
    pub fn raw(capture_time: i64, value: f64) -> Self {
        Self::new(capture_time, value, 1)
    }
}

/// A gauge value tagged with the gauge it belongs to (collector and ingest wire format).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GaugeReading {
    pub gauge_name: String,
    pub capture_time: i64,
    pub value: f64,
    #[serde(default = "default_weight")]
    pub weight: i64,
}

fn default_weight() -> i64 {
    1
}

impl GaugeReading {
    pub fn gauge_value(&self) -> GaugeValue {
        GaugeValue::new(self.capture_time, self.value, self.weight)
    }
}

/// Weighted average of a run of gauge values; `None` when the total weight is zero.
pub fn weighted_average(values: &[GaugeValue]) -> Option<f64> {
    let (total, weight) = values.iter().fold((0.0, 0i64), |(total, weight), v| {
        (total + v.value * v.weight as f64, weight + v.weight)
    });
    (weight > 0).then(|| total / weight as f64)
}
