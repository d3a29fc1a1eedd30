//! Decoding of the MessagePack input record.

use std::{fmt, io::Read};

use serde::{
    Deserialize, Deserializer,
    de::{self, IgnoredAny, MapAccess, SeqAccess, Visitor},
};
use thiserror::Error;

#[derive(Clone, Debug, PartialEq)]
/// Flat array record with its shape metadata, as read from the input file.
///
/// The record is a MessagePack map with at least a `data` and a `shape`
/// entry. Any other entries, including those with non-string keys, are
/// skipped.
pub struct InputRecord {
    /// The row-major flattened array values, coerced to `f32`
    pub data: Vec<f32>,
    /// The dimensions of the array, in row-major order
    pub shape: Vec<usize>,
}

impl<'de> Deserialize<'de> for InputRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct InputRecordVisitor;

        impl<'de> Visitor<'de> for InputRecordVisitor {
            type Value = InputRecord;

            fn expecting(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
                fmt.write_str("a map with `data` and `shape` entries")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut data = None;
                let mut shape = None;

                while let Some(field) = map.next_key::<Field>()? {
                    match field {
                        Field::Data => {
                            if data.is_some() {
                                return Err(de::Error::duplicate_field("data"));
                            }
                            let Values(values) = map.next_value()?;
                            data = Some(values);
                        }
                        Field::Shape => {
                            if shape.is_some() {
                                return Err(de::Error::duplicate_field("shape"));
                            }
                            shape = Some(map.next_value()?);
                        }
                        Field::Other => {
                            let IgnoredAny = map.next_value()?;
                        }
                    }
                }

                let data = data.ok_or_else(|| de::Error::missing_field("data"))?;
                let shape = shape.ok_or_else(|| de::Error::missing_field("shape"))?;

                Ok(InputRecord { data, shape })
            }
        }

        deserializer.deserialize_map(InputRecordVisitor)
    }
}

/// Key of an [`InputRecord`] map entry.
///
/// Only the string keys `"data"` and `"shape"` are recognized, every other
/// key of any type is [`Field::Other`].
enum Field {
    Data,
    Shape,
    Other,
}

impl<'de> Deserialize<'de> for Field {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct FieldVisitor;

        impl<'de> Visitor<'de> for FieldVisitor {
            type Value = Field;

            fn expecting(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
                fmt.write_str("a map key")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                Ok(match v {
                    "data" => Field::Data,
                    "shape" => Field::Shape,
                    _ => Field::Other,
                })
            }

            fn visit_bytes<E: de::Error>(self, _v: &[u8]) -> Result<Self::Value, E> {
                Ok(Field::Other)
            }

            fn visit_bool<E: de::Error>(self, _v: bool) -> Result<Self::Value, E> {
                Ok(Field::Other)
            }

            fn visit_i64<E: de::Error>(self, _v: i64) -> Result<Self::Value, E> {
                Ok(Field::Other)
            }

            fn visit_u64<E: de::Error>(self, _v: u64) -> Result<Self::Value, E> {
                Ok(Field::Other)
            }

            fn visit_f64<E: de::Error>(self, _v: f64) -> Result<Self::Value, E> {
                Ok(Field::Other)
            }

            fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(Field::Other)
            }

            fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(Field::Other)
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
                while let Some(IgnoredAny) = seq.next_element()? {}
                Ok(Field::Other)
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                while let Some((IgnoredAny, IgnoredAny)) = map.next_entry()? {}
                Ok(Field::Other)
            }
        }

        deserializer.deserialize_any(FieldVisitor)
    }
}

/// Array values coerced to `f32`.
///
/// Integers and floats are cast with `as`, booleans become `1.0` or `0.0`.
struct Values(Vec<f32>);

impl<'de> Deserialize<'de> for Values {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ValuesVisitor;

        impl<'de> Visitor<'de> for ValuesVisitor {
            type Value = Values;

            fn expecting(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
                fmt.write_str("an array of numbers")
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
                let mut values = Vec::with_capacity(seq.size_hint().unwrap_or(0).min(1 << 16));
                while let Some(Value(value)) = seq.next_element()? {
                    values.push(value);
                }
                Ok(Values(values))
            }
        }

        deserializer.deserialize_seq(ValuesVisitor)
    }
}

struct Value(f32);

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ValueVisitor;

        impl Visitor<'_> for ValueVisitor {
            type Value = Value;

            fn expecting(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
                fmt.write_str("a number or a boolean")
            }

            fn visit_bool<E: de::Error>(self, v: bool) -> Result<Self::Value, E> {
                Ok(Value(if v { 1.0 } else { 0.0 }))
            }

            #[allow(clippy::cast_precision_loss)]
            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
                Ok(Value(v as f32))
            }

            #[allow(clippy::cast_precision_loss)]
            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
                Ok(Value(v as f32))
            }

            fn visit_f32<E: de::Error>(self, v: f32) -> Result<Self::Value, E> {
                Ok(Value(v))
            }

            #[allow(clippy::cast_possible_truncation)]
            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
                Ok(Value(v as f32))
            }
        }

        deserializer.deserialize_any(ValueVisitor)
    }
}

#[derive(Debug, Error)]
/// Errors that may occur when reading an [`InputRecord`].
pub enum RecordError {
    /// The input could not be read or is not a MessagePack map with `data`
    /// and `shape` entries of the expected types
    #[error("input is not a MessagePack map with numeric `data` and integer `shape` entries")]
    Format {
        /// The source of the error
        #[from]
        source: rmp_serde::decode::Error,
    },
    /// The input contains `len` bytes after the end of the record
    #[error("input contains {len} unexpected trailing bytes after the record")]
    TrailingBytes {
        /// The number of trailing bytes
        len: usize,
    },
}

/// Reads one [`InputRecord`] from the entire contents of the `reader`.
///
/// # Errors
///
/// Errors with
/// - [`RecordError::Format`] if the contents cannot be read, are not valid
///   MessagePack, or are not a map with a numeric `data` array and an
///   integer `shape` array
/// - [`RecordError::TrailingBytes`] if any bytes follow the record
pub fn read_record<R: Read>(mut reader: R) -> Result<InputRecord, RecordError> {
    let mut bytes = Vec::new();
    reader
        .read_to_end(&mut bytes)
        .map_err(|err| RecordError::Format {
            source: rmp_serde::decode::Error::InvalidDataRead(err),
        })?;

    let mut remaining = bytes.as_slice();
    let record: InputRecord = rmp_serde::from_read(&mut remaining)?;

    if !remaining.is_empty() {
        return Err(RecordError::TrailingBytes {
            len: remaining.len(),
        });
    }

    log::debug!(
        "read a record with {} values and shape {:?}",
        record.data.len(),
        record.shape
    );

    Ok(record)
}
