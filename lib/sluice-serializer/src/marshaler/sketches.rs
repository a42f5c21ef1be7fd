use protobuf::CodedOutputStream;
use serde::Serialize;
use sluice_model::{SketchPoint, SketchSeries};
use snafu::ResultExt as _;

use super::{
    split_by_halving,
    wire::{encode_message, write_message, write_packed_sint32, write_packed_uint32, write_repeated_string},
    Json, MarshalError, Marshaler, Protobuf, TelemetryKind,
};

const KIND: TelemetryKind = TelemetryKind::Sketches;

const PAYLOAD_SKETCHES_FIELD_NUMBER: u32 = 1;

const SKETCH_METRIC_FIELD_NUMBER: u32 = 1;
const SKETCH_HOST_FIELD_NUMBER: u32 = 2;
const SKETCH_TAGS_FIELD_NUMBER: u32 = 4;
const SKETCH_DOGSKETCHES_FIELD_NUMBER: u32 = 7;

const DOGSKETCH_TS_FIELD_NUMBER: u32 = 1;
const DOGSKETCH_CNT_FIELD_NUMBER: u32 = 2;
const DOGSKETCH_MIN_FIELD_NUMBER: u32 = 3;
const DOGSKETCH_MAX_FIELD_NUMBER: u32 = 4;
const DOGSKETCH_AVG_FIELD_NUMBER: u32 = 5;
const DOGSKETCH_SUM_FIELD_NUMBER: u32 = 6;
const DOGSKETCH_K_FIELD_NUMBER: u32 = 7;
const DOGSKETCH_N_FIELD_NUMBER: u32 = 8;

#[derive(Serialize)]
struct SketchesPayload<'a> {
    sketches: &'a [SketchSeries],
}

/// A batch of sketch series.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Sketches {
    sketches: Vec<SketchSeries>,
}

impl Sketches {
    /// Creates a batch from the given sketch series.
    pub fn new(sketches: Vec<SketchSeries>) -> Self {
        Self { sketches }
    }

    /// Returns the sketch series in the batch.
    pub fn sketches(&self) -> &[SketchSeries] {
        &self.sketches
    }

    fn validate(&self) -> Result<(), MarshalError> {
        for series in &self.sketches {
            for point in series.sketches() {
                if !point.sketch.bins_consistent() {
                    return Err(MarshalError::Invalid {
                        kind: KIND,
                        reason: format!(
                            "sketch for '{}' at {} has {} bin keys but {} bin counts",
                            series.name(),
                            point.ts,
                            point.sketch.k.len(),
                            point.sketch.n.len()
                        ),
                    });
                }
            }
        }
        Ok(())
    }
}

impl From<Vec<SketchSeries>> for Sketches {
    fn from(sketches: Vec<SketchSeries>) -> Self {
        Self::new(sketches)
    }
}

impl Marshaler for Sketches {
    fn item_count(&self) -> usize {
        self.sketches.len()
    }

    fn marshal_json(&self) -> Result<Vec<u8>, MarshalError> {
        self.validate()?;
        encode_json(&self.sketches)
    }

    fn marshal_protobuf(&self) -> Result<Vec<u8>, MarshalError> {
        self.validate()?;
        encode_message(|os| {
            for series in &self.sketches {
                write_message(os, PAYLOAD_SKETCHES_FIELD_NUMBER, |ss| write_sketch(ss, series))?;
            }
            Ok(())
        })
        .context(Protobuf { kind: KIND })
    }

    fn split(&self, max_chunk_size: usize) -> Result<Vec<Self>, MarshalError> {
        let chunks = split_by_halving(KIND, &self.sketches, max_chunk_size, encode_json)?;
        Ok(chunks.into_iter().map(Self::new).collect())
    }
}

fn encode_json(sketches: &[SketchSeries]) -> Result<Vec<u8>, MarshalError> {
    serde_json::to_vec(&SketchesPayload { sketches }).context(Json { kind: KIND })
}

fn write_sketch(os: &mut CodedOutputStream<'_>, series: &SketchSeries) -> Result<(), protobuf::Error> {
    os.write_string(SKETCH_METRIC_FIELD_NUMBER, series.name())?;
    os.write_string(SKETCH_HOST_FIELD_NUMBER, series.host())?;
    write_repeated_string(os, SKETCH_TAGS_FIELD_NUMBER, series.tags())?;

    for point in series.sketches() {
        write_message(os, SKETCH_DOGSKETCHES_FIELD_NUMBER, |ds| write_dogsketch(ds, point))?;
    }

    Ok(())
}

fn write_dogsketch(os: &mut CodedOutputStream<'_>, point: &SketchPoint) -> Result<(), protobuf::Error> {
    let sketch = &point.sketch;
    os.write_int64(DOGSKETCH_TS_FIELD_NUMBER, point.ts)?;
    os.write_int64(DOGSKETCH_CNT_FIELD_NUMBER, sketch.cnt)?;
    os.write_double(DOGSKETCH_MIN_FIELD_NUMBER, sketch.min)?;
    os.write_double(DOGSKETCH_MAX_FIELD_NUMBER, sketch.max)?;
    os.write_double(DOGSKETCH_AVG_FIELD_NUMBER, sketch.avg)?;
    os.write_double(DOGSKETCH_SUM_FIELD_NUMBER, sketch.sum)?;
    write_packed_sint32(os, DOGSKETCH_K_FIELD_NUMBER, &sketch.k)?;
    write_packed_uint32(os, DOGSKETCH_N_FIELD_NUMBER, &sketch.n)
}

#[cfg(test)]
mod tests {
    use similar_asserts::assert_eq;
    use sluice_model::Dogsketch;

    use super::*;

    fn sketch(k: Vec<i32>, n: Vec<u32>) -> Dogsketch {
        Dogsketch {
            cnt: n.iter().map(|count| i64::from(*count)).sum(),
            min: 1.0,
            max: 2.0,
            avg: 1.5,
            sum: 3.0,
            k,
            n,
        }
    }

    #[test]
    fn protobuf_dogsketch() {
        let sketches = Sketches::new(vec![SketchSeries::new("m")
            .with_host("h")
            .with_sketch(5, sketch(vec![-1, 1], vec![1, 1]))]);
        let encoded = sketches.marshal_protobuf().unwrap();

        let mut expected_dogsketch = vec![0x08, 0x05, 0x10, 0x02];
        for (field, value) in [(3u8, 1.0f64), (4, 2.0), (5, 1.5), (6, 3.0)] {
            expected_dogsketch.push((field << 3) | 1);
            expected_dogsketch.extend_from_slice(&value.to_le_bytes());
        }
        expected_dogsketch.extend_from_slice(&[0x3a, 0x02, 0x01, 0x02, 0x42, 0x02, 0x01, 0x01]);

        let mut expected_sketch = vec![0x0a, 0x01, b'm', 0x12, 0x01, b'h', 0x3a, expected_dogsketch.len() as u8];
        expected_sketch.extend_from_slice(&expected_dogsketch);

        let mut expected = vec![0x0a, expected_sketch.len() as u8];
        expected.extend_from_slice(&expected_sketch);

        assert_eq!(encoded, expected);
    }

    #[test]
    fn json_envelope() {
        let sketches = Sketches::new(vec![SketchSeries::new("m")]);
        let encoded = sketches.marshal_json().unwrap();
        assert_eq!(
            String::from_utf8(encoded).unwrap(),
            r#"{"sketches":[{"metric":"m","tags":[],"host":"","interval":0,"sketches":[]}]}"#
        );
    }

    #[test]
    fn mismatched_bins_rejected() {
        let sketches = Sketches::new(vec![SketchSeries::new("m").with_sketch(5, sketch(vec![1, 2], vec![1]))]);

        assert!(matches!(
            sketches.marshal_protobuf(),
            Err(MarshalError::Invalid {
                kind: TelemetryKind::Sketches,
                ..
            })
        ));
        assert!(matches!(sketches.marshal_json(), Err(MarshalError::Invalid { .. })));
    }

    #[test]
    fn split_preserves_order() {
        let sketches = Sketches::new(
            (0..16)
                .map(|i| {
                    SketchSeries::new(format!("latency.{}", i))
                        .with_host("h")
                        .with_sketch(1_700_000_000, sketch(vec![i], vec![1]))
                })
                .collect(),
        );
        let limit = sketches.marshal_json().unwrap().len() / 3;

        let chunks = sketches.split(limit).unwrap();
        assert!(chunks.len() >= 4);
        assert!(chunks
            .iter()
            .all(|chunk| chunk.marshal_json().unwrap().len() <= limit));

        let rejoined = chunks
            .iter()
            .flat_map(|chunk| chunk.sketches().to_vec())
            .collect::<Vec<_>>();
        assert_eq!(rejoined, sketches.sketches().to_vec());
    }
}
