//! [![CI Status]][workflow] [![MSRV]][repo] [![Latest Version]][crates.io] [![Rust Doc Crate]][docs.rs] [![Rust Doc Main]][docs]
//!
//! [CI Status]: https://img.shields.io/github/actions/workflow/status/juntyr/reshape-msgpack/ci.yml?branch=main
//! [workflow]: https://github.com/juntyr/reshape-msgpack/actions/workflows/ci.yml?query=branch%3Amain
//!
//! [MSRV]: https://img.shields.io/badge/MSRV-1.85.0-blue
//! [repo]: https://github.com/juntyr/reshape-msgpack
//!
//! [Latest Version]: https://img.shields.io/crates/v/reshape-msgpack
//! [crates.io]: https://crates.io/crates/reshape-msgpack
//!
//! [Rust Doc Crate]: https://img.shields.io/docsrs/reshape-msgpack
//! [docs.rs]: https://docs.rs/reshape-msgpack/
//!
//! [Rust Doc Main]: https://img.shields.io/badge/docs-main-blue
//! [docs]: https://juntyr.github.io/reshape-msgpack/reshape_msgpack
//!
//! Conversion of channel-first MessagePack array records into channel-last
//! shape and data sequences.
//!
//! The input is a single MessagePack map with a row-major flattened `data`
//! array and its `shape`. Three-dimensional `(channels, height, width)`
//! arrays, optionally with an additional leading batch dimension of size 1,
//! are swizzled into `(height, width, channels)` layout. The output is the
//! new shape tuple immediately followed by the flattened `float32` data, as
//! two separate MessagePack values in one stream.
//!
//! ```rust
//! # use reshape_msgpack::convert_reader;
//! # #[derive(serde::Serialize)]
//! # struct Record { data: Vec<f32>, shape: Vec<usize> }
//! let input = rmp_serde::to_vec_named(&Record {
//!     data: (1..=12).map(|x| x as f32).collect(),
//!     shape: vec![1, 2, 2, 3],
//! })?;
//!
//! let conversion = convert_reader(input.as_slice())?;
//!
//! assert_eq!(conversion.shape.dims(), [2, 3, 2]);
//! assert_eq!(
//!     conversion.values,
//!     [1.0, 7.0, 2.0, 8.0, 3.0, 9.0, 4.0, 10.0, 5.0, 11.0, 6.0, 12.0]
//! );
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::{
    fs::{self, File},
    io::{self, BufReader, Read},
    path::{Path, PathBuf},
};

use thiserror::Error;

pub mod layout;
pub mod output;
pub mod record;

use layout::{ChannelLastShape, LayoutError};
use output::OutputError;
use record::RecordError;

/// Name of the element type of the converted values.
pub const DTYPE: &str = "float32";

#[derive(Clone, Debug, PartialEq)]
/// Channel-last array produced by a conversion.
pub struct Conversion {
    /// The `(height, width, channels)` shape of the array
    pub shape: ChannelLastShape,
    /// The row-major flattened values of the array
    pub values: Vec<f32>,
}

impl Conversion {
    #[must_use]
    /// The total size of the [`values`][`Self::values`] in bytes
    pub fn nbytes(&self) -> usize {
        self.values.len() * size_of::<f32>()
    }

    #[must_use]
    /// The name of the element type, always [`DTYPE`]
    pub const fn dtype(&self) -> &'static str {
        DTYPE
    }

    /// Encodes the conversion into the output stream format, see
    /// [`output::write_output`].
    ///
    /// # Errors
    ///
    /// Errors with [`OutputError::Encode`] if encoding fails.
    pub fn encode(&self) -> Result<Vec<u8>, OutputError> {
        output::encode_output(self.shape, &self.values)
    }
}

#[derive(Debug, Error)]
/// Errors that may occur when converting an input record.
pub enum ConvertError {
    /// The input file at `path` could not be opened
    #[error("failed to read the input file {path:?}")]
    Read {
        /// The path of the input file
        path: PathBuf,
        /// The source of the error
        source: io::Error,
    },
    /// The output file at `path` could not be written
    #[error("failed to write the output file {path:?}")]
    Write {
        /// The path of the output file
        path: PathBuf,
        /// The source of the error
        source: io::Error,
    },
    /// The input is not a valid record
    #[error("failed to decode the input record")]
    Record {
        /// The source of the error
        #[from]
        source: RecordError,
    },
    /// The input record has an invalid shape
    #[error("failed to validate the input record")]
    Layout {
        /// The source of the error
        #[from]
        source: LayoutError,
    },
    /// The output could not be encoded
    #[error("failed to encode the output")]
    Output {
        /// The source of the error
        #[from]
        source: OutputError,
    },
}

/// Converts the record read from the `reader` into channel-last layout.
///
/// The shape, size in bytes, and element type of the converted array are
/// logged at the info level.
///
/// # Errors
///
/// Errors with
/// - [`ConvertError::Record`] if the input is not a MessagePack map with
///   `data` and `shape` entries
/// - [`ConvertError::Layout`] if the shape is unsupported or does not match
///   the number of data elements
pub fn convert_reader<R: Read>(reader: R) -> Result<Conversion, ConvertError> {
    let record = record::read_record(reader)?;

    let (shape, swizzled) = layout::to_channel_last(record.data, &record.shape)?;
    let values = swizzled.iter().copied().collect::<Vec<_>>();

    let conversion = Conversion { shape, values };

    log::info!("shape: {}", conversion.shape);
    log::info!("nbytes: {}", conversion.nbytes());
    log::info!("dtype: {}", conversion.dtype());

    Ok(conversion)
}

/// Converts the record in the `input` file into channel-last layout and
/// writes the result to the `output` file.
///
/// The output file is only created once the conversion has succeeded and
/// the output has been fully encoded.
///
/// # Errors
///
/// Errors with
/// - [`ConvertError::Read`] if the `input` file cannot be opened
/// - [`ConvertError::Record`] if the input is not a MessagePack map with
///   `data` and `shape` entries
/// - [`ConvertError::Layout`] if the shape is unsupported or does not match
///   the number of data elements
/// - [`ConvertError::Output`] if encoding the output fails
/// - [`ConvertError::Write`] if the `output` file cannot be written
pub fn convert(input: &Path, output: &Path) -> Result<Conversion, ConvertError> {
    let file = File::open(input).map_err(|source| ConvertError::Read {
        path: input.to_path_buf(),
        source,
    })?;

    let conversion = convert_reader(BufReader::new(file))?;
    let bytes = conversion.encode()?;

    fs::write(output, &bytes).map_err(|source| ConvertError::Write {
        path: output.to_path_buf(),
        source,
    })?;

    log::debug!("wrote {} bytes to {output:?}", bytes.len());

    Ok(conversion)
}

/// Returns the default output path for the `input` path, which replaces its
/// extension with `seq.msgpack`.
#[must_use]
pub fn default_output_path(input: &Path) -> PathBuf {
    input.with_extension("seq.msgpack")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde::Serialize;

    use super::*;

    #[derive(Serialize)]
    struct Record<'a> {
        data: &'a [i64],
        shape: &'a [u64],
    }

    fn twelve() -> Vec<i64> {
        (1..=12).collect()
    }

    #[test]
    fn channel_first_three_dimensions() {
        std::mem::drop(simple_logger::init());

        let input = rmp_serde::to_vec_named(&Record {
            data: &twelve(),
            shape: &[2, 2, 3],
        })
        .unwrap();

        let conversion = convert_reader(input.as_slice()).unwrap();

        assert_eq!(conversion.shape.dims(), [2, 3, 2]);
        assert_eq!(
            conversion.values,
            [1.0, 7.0, 2.0, 8.0, 3.0, 9.0, 4.0, 10.0, 5.0, 11.0, 6.0, 12.0]
        );
        assert_eq!(conversion.nbytes(), 48);
        assert_eq!(conversion.dtype(), "float32");
    }

    #[test]
    fn batch_of_one() {
        std::mem::drop(simple_logger::init());

        let unbatched = convert_reader(
            rmp_serde::to_vec_named(&Record {
                data: &twelve(),
                shape: &[2, 2, 3],
            })
            .unwrap()
            .as_slice(),
        )
        .unwrap();
        let batched = convert_reader(
            rmp_serde::to_vec_named(&Record {
                data: &twelve(),
                shape: &[1, 2, 2, 3],
            })
            .unwrap()
            .as_slice(),
        )
        .unwrap();

        assert_eq!(batched, unbatched);
        assert_eq!(batched.encode().unwrap(), unbatched.encode().unwrap());
    }

    #[test]
    fn rejected_shapes() {
        std::mem::drop(simple_logger::init());

        for shape in [&[2, 2, 3, 1][..], &[12, 1][..], &[1, 1, 2, 2, 3][..]] {
            let input = rmp_serde::to_vec_named(&Record {
                data: &twelve(),
                shape,
            })
            .unwrap();

            assert!(matches!(
                convert_reader(input.as_slice()),
                Err(ConvertError::Layout { .. })
            ));
        }

        let input = rmp_serde::to_vec_named(&Record {
            data: &twelve(),
            shape: &[2, 2, 2],
        })
        .unwrap();
        assert!(matches!(
            convert_reader(input.as_slice()),
            Err(ConvertError::Layout {
                source: LayoutError::ElementCountMismatch { len: 12, .. }
            })
        ));
    }

    #[test]
    fn default_output() {
        assert_eq!(
            default_output_path(Path::new("frames/frame.msgpack")),
            Path::new("frames/frame.seq.msgpack")
        );
        assert_eq!(
            default_output_path(Path::new("frame")),
            Path::new("frame.seq.msgpack")
        );
    }
}
