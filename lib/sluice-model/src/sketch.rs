//! Distribution sketches.

use serde::{Deserialize, Serialize};

/// A sketch in the agent summary form.
///
/// Besides the summary statistics, the sketch carries its bins as two parallel arrays: `k` holds the bin keys and `n`
/// the number of samples that landed in each bin.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Dogsketch {
    /// Number of samples.
    pub cnt: i64,

    /// Minimum sample value.
    pub min: f64,

    /// Maximum sample value.
    pub max: f64,

    /// Average sample value.
    pub avg: f64,

    /// Sum of all sample values.
    pub sum: f64,

    /// Bin keys.
    #[serde(default)]
    pub k: Vec<i32>,

    /// Bin counts.
    #[serde(default)]
    pub n: Vec<u32>,
}

impl Dogsketch {
    /// Returns `true` if the bin keys and bin counts line up.
    pub fn bins_consistent(&self) -> bool {
        self.k.len() == self.n.len()
    }
}

/// A sketch at a point in time.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct SketchPoint {
    /// Timestamp, in seconds since the Unix epoch.
    pub ts: i64,

    /// The sketch itself.
    #[serde(flatten)]
    pub sketch: Dogsketch,
}

/// A sketch series.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct SketchSeries {
    #[serde(rename = "metric")]
    name: String,

    #[serde(default)]
    tags: Vec<String>,

    #[serde(default)]
    host: String,

    #[serde(default)]
    interval: i64,

    #[serde(default)]
    sketches: Vec<SketchPoint>,
}

impl SketchSeries {
    /// Creates an empty `SketchSeries` with the given metric name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Returns the metric name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the tags of the series.
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Returns the host the series was collected on.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the flush interval, in seconds.
    pub fn interval(&self) -> i64 {
        self.interval
    }

    /// Returns the sketches of the series.
    pub fn sketches(&self) -> &[SketchPoint] {
        &self.sketches
    }

    /// Set the tags.
    pub fn with_tags<I, T>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Set the host.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the flush interval, in seconds.
    pub fn with_interval(mut self, interval: i64) -> Self {
        self.interval = interval;
        self
    }

    /// Adds a sketch taken at the given timestamp.
    pub fn with_sketch(mut self, ts: i64, sketch: Dogsketch) -> Self {
        self.sketches.push(SketchPoint { ts, sketch });
        self
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use similar_asserts::assert_eq;

    use super::*;

    #[test]
    fn sketch_point_is_flattened() {
        let series = SketchSeries::new("request.latency")
            .with_host("web-01")
            .with_tags(["endpoint:/login"])
            .with_interval(10)
            .with_sketch(
                1_700_000_000,
                Dogsketch {
                    cnt: 3,
                    min: 1.0,
                    max: 4.0,
                    avg: 2.5,
                    sum: 7.5,
                    k: vec![1338, 1400],
                    n: vec![2, 1],
                },
            );

        let value = serde_json::to_value(&series).unwrap();
        assert_eq!(
            value,
            json!({
                "metric": "request.latency",
                "tags": ["endpoint:/login"],
                "host": "web-01",
                "interval": 10,
                "sketches": [{
                    "ts": 1_700_000_000i64,
                    "cnt": 3,
                    "min": 1.0,
                    "max": 4.0,
                    "avg": 2.5,
                    "sum": 7.5,
                    "k": [1338, 1400],
                    "n": [2, 1],
                }],
            })
        );

        let decoded: SketchSeries = serde_json::from_value(value).unwrap();
        assert_eq!(decoded, series);
    }

    #[test]
    fn bins_consistency() {
        let mut sketch = Dogsketch {
            k: vec![1, 2],
            n: vec![1, 1],
            ..Default::default()
        };
        assert!(sketch.bins_consistent());

        sketch.n.pop();
        assert!(!sketch.bins_consistent());
    }
}
