use protobuf::CodedOutputStream;
use serde::Serialize;
use sluice_model::{MetricType, Serie};
use snafu::ResultExt as _;

use super::{
    split_by_halving,
    wire::{encode_message, write_message, write_non_empty_string, write_repeated_string},
    Json, MarshalError, Marshaler, Protobuf, TelemetryKind,
};

const KIND: TelemetryKind = TelemetryKind::Series;

const PAYLOAD_SERIES_FIELD_NUMBER: u32 = 1;

const RESOURCES_TYPE_FIELD_NUMBER: u32 = 1;
const RESOURCES_NAME_FIELD_NUMBER: u32 = 2;

const METRIC_POINT_VALUE_FIELD_NUMBER: u32 = 1;
const METRIC_POINT_TIMESTAMP_FIELD_NUMBER: u32 = 2;

const SERIES_RESOURCES_FIELD_NUMBER: u32 = 1;
const SERIES_METRIC_FIELD_NUMBER: u32 = 2;
const SERIES_TAGS_FIELD_NUMBER: u32 = 3;
const SERIES_POINTS_FIELD_NUMBER: u32 = 4;
const SERIES_TYPE_FIELD_NUMBER: u32 = 5;
const SERIES_SOURCE_TYPE_NAME_FIELD_NUMBER: u32 = 7;
const SERIES_INTERVAL_FIELD_NUMBER: u32 = 8;

#[derive(Serialize)]
struct SeriesPayload<'a> {
    series: &'a [Serie],
}

/// A batch of metric series.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Series {
    series: Vec<Serie>,
}

impl Series {
    /// Creates a batch from the given series.
    pub fn new(series: Vec<Serie>) -> Self {
        Self { series }
    }

    /// Returns the series in the batch.
    pub fn series(&self) -> &[Serie] {
        &self.series
    }
}

impl From<Vec<Serie>> for Series {
    fn from(series: Vec<Serie>) -> Self {
        Self::new(series)
    }
}

impl Marshaler for Series {
    fn item_count(&self) -> usize {
        self.series.len()
    }

    fn marshal_json(&self) -> Result<Vec<u8>, MarshalError> {
        encode_json(&self.series)
    }

    fn marshal_protobuf(&self) -> Result<Vec<u8>, MarshalError> {
        encode_message(|os| {
            for serie in &self.series {
                write_message(os, PAYLOAD_SERIES_FIELD_NUMBER, |ss| write_serie(ss, serie))?;
            }
            Ok(())
        })
        .context(Protobuf { kind: KIND })
    }

    fn split(&self, max_chunk_size: usize) -> Result<Vec<Self>, MarshalError> {
        let chunks = split_by_halving(KIND, &self.series, max_chunk_size, encode_json)?;
        Ok(chunks.into_iter().map(Self::new).collect())
    }
}

fn encode_json(series: &[Serie]) -> Result<Vec<u8>, MarshalError> {
    serde_json::to_vec(&SeriesPayload { series }).context(Json { kind: KIND })
}

const fn metric_type_to_proto(metric_type: MetricType) -> i32 {
    match metric_type {
        MetricType::Count => 1,
        MetricType::Rate => 2,
        MetricType::Gauge => 3,
    }
}

fn write_resource(os: &mut CodedOutputStream<'_>, resource_type: &str, name: &str) -> Result<(), protobuf::Error> {
    write_message(os, SERIES_RESOURCES_FIELD_NUMBER, |rs| {
        rs.write_string(RESOURCES_TYPE_FIELD_NUMBER, resource_type)?;
        rs.write_string(RESOURCES_NAME_FIELD_NUMBER, name)
    })
}

fn write_serie(os: &mut CodedOutputStream<'_>, serie: &Serie) -> Result<(), protobuf::Error> {
    // Host and device travel as resources rather than as dedicated fields.
    write_resource(os, "host", serie.host())?;
    if let Some(device) = serie.device() {
        write_resource(os, "device", device)?;
    }

    os.write_string(SERIES_METRIC_FIELD_NUMBER, serie.name())?;
    write_repeated_string(os, SERIES_TAGS_FIELD_NUMBER, serie.tags())?;

    for point in serie.points() {
        write_message(os, SERIES_POINTS_FIELD_NUMBER, |ps| {
            ps.write_double(METRIC_POINT_VALUE_FIELD_NUMBER, point.value)?;
            ps.write_int64(METRIC_POINT_TIMESTAMP_FIELD_NUMBER, point.timestamp)
        })?;
    }

    os.write_enum(SERIES_TYPE_FIELD_NUMBER, metric_type_to_proto(serie.metric_type()))?;
    write_non_empty_string(
        os,
        SERIES_SOURCE_TYPE_NAME_FIELD_NUMBER,
        serie.source_type_name().unwrap_or_default(),
    )?;
    if serie.interval() > 0 {
        os.write_int64(SERIES_INTERVAL_FIELD_NUMBER, serie.interval())?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use similar_asserts::assert_eq;
    use sluice_model::Point;

    use super::*;

    #[test]
    fn json_envelope() {
        let series = Series::new(vec![Serie::gauge("load", 10, 1.5).with_host("h")]);
        let encoded = series.marshal_json().unwrap();

        assert_eq!(
            String::from_utf8(encoded).unwrap(),
            r#"{"series":[{"metric":"load","points":[[10,1.5]],"tags":[],"host":"h","type":"gauge","interval":0}]}"#
        );
    }

    #[test]
    fn protobuf_fields() {
        let series = Series::new(vec![Serie::new("m", MetricType::Count)
            .with_host("h")
            .with_device("d")
            .with_points([Point {
                timestamp: 1,
                value: 0.0,
            }])
            .with_interval(10)]);
        let encoded = series.marshal_protobuf().unwrap();

        #[rustfmt::skip]
        let expected = vec![
            0x0a, 0x2c,
                // host resource
                0x0a, 0x09,
                    0x0a, 0x04, b'h', b'o', b's', b't',
                    0x12, 0x01, b'h',
                // device resource
                0x0a, 0x0b,
                    0x0a, 0x06, b'd', b'e', b'v', b'i', b'c', b'e',
                    0x12, 0x01, b'd',
                0x12, 0x01, b'm',
                // point
                0x22, 0x0b,
                    0x09, 0, 0, 0, 0, 0, 0, 0, 0,
                    0x10, 0x01,
                0x28, 0x01,
                0x40, 0x0a,
        ];
        assert_eq!(encoded, expected);
    }

    #[test]
    fn split_preserves_order() {
        let series = Series::new(
            (0..16)
                .map(|i| Serie::gauge(format!("metric.{}", i), 1_700_000_000, i as f64))
                .collect(),
        );
        let limit = series.marshal_json().unwrap().len() / 3;

        let chunks = series.split(limit).unwrap();
        assert!(chunks.len() >= 4);

        let rejoined = chunks.iter().flat_map(|chunk| chunk.series().to_vec()).collect::<Vec<_>>();
        assert_eq!(rejoined, series.series().to_vec());
    }
}
