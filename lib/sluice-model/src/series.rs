//! Metric series.

use serde::{Deserialize, Serialize};

/// Metric type.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricType {
    /// A point-in-time value.
    #[default]
    Gauge,

    /// A number of occurrences over the flush interval.
    Count,

    /// A per-second rate over the flush interval.
    Rate,
}

impl MetricType {
    /// Returns the string representation of the metric type.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Gauge => "gauge",
            Self::Count => "count",
            Self::Rate => "rate",
        }
    }
}

/// A single data point: a timestamp, in seconds since the Unix epoch, and a value.
///
/// Serialized as a two-element array, `[timestamp, value]`.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
#[serde(from = "(i64, f64)", into = "(i64, f64)")]
pub struct Point {
    /// Timestamp, in seconds since the Unix epoch.
    pub timestamp: i64,

    /// Value.
    pub value: f64,
}

impl From<(i64, f64)> for Point {
    fn from((timestamp, value): (i64, f64)) -> Self {
        Self { timestamp, value }
    }
}

impl From<Point> for (i64, f64) {
    fn from(point: Point) -> Self {
        (point.timestamp, point.value)
    }
}

/// A metric series.
///
/// A series is a named metric, with its tags and originating host, and the points collected for it during a flush.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Serie {
    #[serde(rename = "metric")]
    name: String,

    points: Vec<Point>,

    #[serde(default)]
    tags: Vec<String>,

    #[serde(default)]
    host: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    device: String,

    #[serde(rename = "type", default)]
    metric_type: MetricType,

    #[serde(default)]
    interval: i64,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    source_type_name: String,
}

impl Serie {
    /// Creates a `Serie` with the given name and metric type, and no points.
    pub fn new(name: impl Into<String>, metric_type: MetricType) -> Self {
        Self {
            name: name.into(),
            metric_type,
            ..Default::default()
        }
    }

    /// Creates a gauge series with a single point.
    pub fn gauge(name: impl Into<String>, timestamp: i64, value: f64) -> Self {
        Self::new(name, MetricType::Gauge).with_points([Point { timestamp, value }])
    }

    /// Returns the metric name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the points of the series.
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Returns the tags of the series.
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Returns the host the series was collected on.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the device the series was collected for, if any.
    pub fn device(&self) -> Option<&str> {
        if self.device.is_empty() {
            None
        } else {
            Some(&self.device)
        }
    }

    /// Returns the metric type.
    pub fn metric_type(&self) -> MetricType {
        self.metric_type
    }

    /// Returns the flush interval, in seconds.
    pub fn interval(&self) -> i64 {
        self.interval
    }

    /// Returns the source type name, if any.
    pub fn source_type_name(&self) -> Option<&str> {
        if self.source_type_name.is_empty() {
            None
        } else {
            Some(&self.source_type_name)
        }
    }

    /// Set the points.
    pub fn with_points(mut self, points: impl IntoIterator<Item = Point>) -> Self {
        self.points = points.into_iter().collect();
        self
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

    /// Set the device.
    pub fn with_device(mut self, device: impl Into<String>) -> Self {
        self.device = device.into();
        self
    }

    /// Set the flush interval, in seconds.
    pub fn with_interval(mut self, interval: i64) -> Self {
        self.interval = interval;
        self
    }

    /// Set the source type name.
    pub fn with_source_type_name(mut self, source_type_name: impl Into<String>) -> Self {
        self.source_type_name = source_type_name.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use similar_asserts::assert_eq;

    use super::*;

    #[test]
    fn points_as_pairs() {
        let serie = Serie::new("system.load.1", MetricType::Gauge)
            .with_points([
                Point {
                    timestamp: 1_700_000_000,
                    value: 0.5,
                },
                Point {
                    timestamp: 1_700_000_015,
                    value: 0.75,
                },
            ])
            .with_tags(["env:prod"])
            .with_host("web-01")
            .with_interval(15);

        let value = serde_json::to_value(&serie).unwrap();
        assert_eq!(
            value,
            json!({
                "metric": "system.load.1",
                "points": [[1_700_000_000i64, 0.5], [1_700_000_015i64, 0.75]],
                "tags": ["env:prod"],
                "host": "web-01",
                "type": "gauge",
                "interval": 15,
            })
        );

        let decoded: Serie = serde_json::from_value(value).unwrap();
        assert_eq!(decoded, serie);
    }

    #[test]
    fn device_and_source_type_when_set() {
        let serie = Serie::new("disk.used", MetricType::Rate)
            .with_device("/dev/sda1")
            .with_source_type_name("system");

        let value = serde_json::to_value(&serie).unwrap();
        assert_eq!(value["device"], json!("/dev/sda1"));
        assert_eq!(value["source_type_name"], json!("system"));
        assert_eq!(value["type"], json!("rate"));
    }
}
