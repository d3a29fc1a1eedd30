//! Encoding of the channel-last output stream.
//!
//! The stream consists of two back-to-back MessagePack values that are not
//! wrapped in any enclosing structure: the `(height, width, channels)` shape
//! tuple, followed by the row-major flattened values as an array of
//! single-precision `float32`s.

use std::io::{Read, Write};

use thiserror::Error;

use crate::layout::ChannelLastShape;

#[derive(Debug, Error)]
/// Errors that may occur when writing or reading the output stream.
pub enum OutputError {
    /// The output stream could not be encoded
    #[error("failed to encode the output as MessagePack")]
    Encode {
        /// The source of the error
        #[from]
        source: rmp_serde::encode::Error,
    },
    /// The output stream could not be decoded
    #[error("failed to decode the output from MessagePack")]
    Decode {
        /// The source of the error
        #[from]
        source: rmp_serde::decode::Error,
    },
    /// The number of decoded `values` does not match the decoded `shape`
    #[error("output with shape {shape} cannot contain {len} values")]
    LengthMismatch {
        /// The decoded shape
        shape: ChannelLastShape,
        /// The number of decoded values
        len: usize,
    },
}

/// Writes the channel-last `shape` and the flattened `values` to the
/// `writer`.
///
/// # Errors
///
/// Errors with [`OutputError::Encode`] if encoding or writing fails.
pub fn write_output<W: Write>(
    mut writer: W,
    shape: ChannelLastShape,
    values: &[f32],
) -> Result<(), OutputError> {
    rmp_serde::encode::write(&mut writer, &shape)?;
    rmp_serde::encode::write(&mut writer, values)?;

    Ok(())
}

/// Encodes the channel-last `shape` and the flattened `values` into a new
/// byte buffer.
///
/// # Errors
///
/// Errors with [`OutputError::Encode`] if encoding fails.
pub fn encode_output(shape: ChannelLastShape, values: &[f32]) -> Result<Vec<u8>, OutputError> {
    // shape header + array header + one marker byte per value
    let mut bytes = Vec::with_capacity(32 + values.len() * (1 + size_of::<f32>()));
    write_output(&mut bytes, shape, values)?;

    Ok(bytes)
}

/// Reads the channel-last shape and the flattened values back from the
/// `reader`.
///
/// # Errors
///
/// Errors with
/// - [`OutputError::Decode`] if reading or decoding fails
/// - [`OutputError::LengthMismatch`] if the number of values does not match
///   the shape
pub fn read_output<R: Read>(mut reader: R) -> Result<(ChannelLastShape, Vec<f32>), OutputError> {
    let shape: ChannelLastShape = rmp_serde::from_read(&mut reader)?;
    let values: Vec<f32> = rmp_serde::from_read(&mut reader)?;

    let expected = shape
        .height
        .checked_mul(shape.width)
        .and_then(|len| len.checked_mul(shape.channels));
    if expected != Some(values.len()) {
        return Err(OutputError::LengthMismatch {
            shape,
            len: values.len(),
        });
    }

    Ok((shape, values))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn single_precision_floats() {
        let shape = ChannelLastShape {
            height: 1,
            width: 2,
            channels: 1,
        };

        let bytes = encode_output(shape, &[1.0, -0.5]).unwrap();

        assert_eq!(
            bytes,
            [
                0x93, 1, 2, 1, // shape
                0x92, // two values
                0xca, 0x3f, 0x80, 0x00, 0x00, // 1.0_f32
                0xca, 0xbf, 0x00, 0x00, 0x00, // -0.5_f32
            ]
        );
    }

    #[test]
    fn read_back() {
        let shape = ChannelLastShape {
            height: 2,
            width: 3,
            channels: 2,
        };
        let values = (0..12).map(|x| x as f32 / 4.0).collect::<Vec<_>>();

        let bytes = encode_output(shape, &values).unwrap();
        let (decoded_shape, decoded_values) = read_output(bytes.as_slice()).unwrap();

        assert_eq!(decoded_shape, shape);
        assert_eq!(decoded_values, values);
    }

    #[test]
    fn read_mismatched_length() {
        let mut bytes = rmp_serde::to_vec(&(2_u8, 2_u8, 1_u8)).unwrap();
        bytes.extend(rmp_serde::to_vec(&[1.0_f32, 2.0, 3.0]).unwrap());

        assert!(matches!(
            read_output(bytes.as_slice()),
            Err(OutputError::LengthMismatch { len: 3, .. })
        ));
    }

    #[test]
    fn read_truncated() {
        let bytes = encode_output(
            ChannelLastShape {
                height: 1,
                width: 1,
                channels: 2,
            },
            &[1.0, 2.0],
        )
        .unwrap();

        assert!(matches!(
            read_output(&bytes[..bytes.len() - 2]),
            Err(OutputError::Decode { .. })
        ));
    }
}
