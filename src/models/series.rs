// Chart series: ordered points with explicit null gap markers

use serde::{Deserialize, Serialize};

/// `(captureTime, value)`; serializes as a two-element JSON array.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DataPoint(pub i64, pub f64);

impl DataPoint {
    pub fn capture_time(&self) -> i64 {
        self.0
    }

    pub fn value(&self) -> f64 {
        self.1
    }
}

/// A named series. `name == None` is the aggregate "Other" series.
/// A `None` entry in `data` is a rendering gap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSeries {
    pub name: Option<String>,
    pub data: Vec<Option<DataPoint>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overall: Option<f64>,
}

impl DataSeries {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            data: Vec::new(),
            overall: None,
        }
    }

    pub fn other() -> Self {
        Self {
            name: None,
            data: Vec::new(),
            overall: None,
        }
    }

    pub fn add(&mut self, capture_time: i64, value: f64) {
        self.data.push(Some(DataPoint(capture_time, value)));
    }

    pub fn add_null(&mut self) {
        self.data.push(None);
    }

    pub fn set_overall(&mut self, overall: f64) {
        self.overall = Some(overall);
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Non-null points in order.
    pub fn points(&self) -> impl Iterator<Item = &DataPoint> {
        self.data.iter().flatten()
    }
}
