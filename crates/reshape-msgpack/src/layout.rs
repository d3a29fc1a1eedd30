//! Shape normalization and the channel-first to channel-last axis swizzle.

use std::fmt;

use ndarray::{Array3, ArrayBase, Data, Ix3};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Permutation that moves the leading (channel) axis to the back.
pub const CHANNEL_LAST_AXES: [usize; 3] = [1, 2, 0];

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
/// Shape of a three-dimensional channel-first `(channels, height, width)`
/// array.
pub struct ChannelFirstShape {
    /// Length of the leading axis
    pub channels: usize,
    /// Length of the middle axis
    pub height: usize,
    /// Length of the trailing axis
    pub width: usize,
}

impl ChannelFirstShape {
    /// Normalizes the `shape` of an input array to three dimensions.
    ///
    /// A four-dimensional `shape` is only accepted if its leading (batch)
    /// dimension is 1, which is then dropped. Singleton dimensions at any
    /// other position are kept.
    ///
    /// # Errors
    ///
    /// Errors with
    /// - [`LayoutError::NonSingletonLeadingDimension`] if a four-dimensional
    ///   `shape` has a leading dimension other than 1
    /// - [`LayoutError::UnsupportedRank`] if the `shape` has neither three nor
    ///   four dimensions
    pub fn normalize(shape: &[usize]) -> Result<Self, LayoutError> {
        match *shape {
            [1, channels, height, width] | [channels, height, width] => Ok(Self {
                channels,
                height,
                width,
            }),
            [_, _, _, _] => Err(LayoutError::NonSingletonLeadingDimension {
                shape: shape.to_vec(),
            }),
            _ => Err(LayoutError::UnsupportedRank {
                shape: shape.to_vec(),
            }),
        }
    }

    #[must_use]
    /// The total number of elements, or [`None`] if it overflows a [`usize`]
    pub fn checked_len(&self) -> Option<usize> {
        self.channels
            .checked_mul(self.height)?
            .checked_mul(self.width)
    }

    #[must_use]
    /// The shape after swizzling with [`CHANNEL_LAST_AXES`]
    pub const fn channel_last(&self) -> ChannelLastShape {
        ChannelLastShape {
            height: self.height,
            width: self.width,
            channels: self.channels,
        }
    }

    #[must_use]
    /// The shape as `ndarray` dimensions
    pub const fn dims(&self) -> [usize; 3] {
        [self.channels, self.height, self.width]
    }
}

impl fmt::Display for ChannelFirstShape {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "({}, {}, {})", self.channels, self.height, self.width)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
/// Shape of a three-dimensional channel-last `(height, width, channels)`
/// array.
///
/// The shape is serialized as a `(height, width, channels)` tuple.
pub struct ChannelLastShape {
    /// Length of the leading axis
    pub height: usize,
    /// Length of the middle axis
    pub width: usize,
    /// Length of the trailing axis
    pub channels: usize,
}

impl ChannelLastShape {
    #[must_use]
    /// The shape as `ndarray` dimensions
    pub const fn dims(&self) -> [usize; 3] {
        [self.height, self.width, self.channels]
    }
}

impl fmt::Display for ChannelLastShape {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "({}, {}, {})", self.height, self.width, self.channels)
    }
}

impl Serialize for ChannelLastShape {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (self.height, self.width, self.channels).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ChannelLastShape {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let (height, width, channels) = Deserialize::deserialize(deserializer)?;

        Ok(Self {
            height,
            width,
            channels,
        })
    }
}

#[derive(Debug, Error)]
/// Errors that may occur when normalizing and reshaping an input array.
pub enum LayoutError {
    /// The array `shape` has neither three nor four dimensions
    #[error("cannot convert an array with shape {shape:?}, only three or four dimensions are supported")]
    UnsupportedRank {
        /// The offending shape
        shape: Vec<usize>,
    },
    /// The four-dimensional array `shape` has a leading dimension other than 1
    #[error("cannot convert a four-dimensional array with shape {shape:?} whose leading dimension is not 1")]
    NonSingletonLeadingDimension {
        /// The offending shape
        shape: Vec<usize>,
    },
    /// The number of data elements `len` does not match the `shape`
    #[error("cannot reshape {len} data elements into an array with shape {shape}")]
    ElementCountMismatch {
        /// The number of data elements
        len: usize,
        /// The normalized shape
        shape: ChannelFirstShape,
    },
}

/// Reshapes the row-major flattened `data` into a three-dimensional array of
/// the channel-first `shape`.
///
/// # Errors
///
/// Errors with [`LayoutError::ElementCountMismatch`] if the length of `data`
/// does not equal the number of elements in the `shape`.
pub fn reshape<T>(data: Vec<T>, shape: ChannelFirstShape) -> Result<Array3<T>, LayoutError> {
    let len = data.len();

    if shape.checked_len() != Some(len) {
        return Err(LayoutError::ElementCountMismatch { len, shape });
    }

    Array3::from_shape_vec(shape.dims(), data)
        .map_err(|_| LayoutError::ElementCountMismatch { len, shape })
}

/// Swizzles the axes of the channel-first `data` array with
/// [`CHANNEL_LAST_AXES`] and returns a new array in standard (row-major)
/// layout.
///
/// The element at `[c, h, w]` of the input ends up at `[h, w, c]` in the
/// output.
pub fn swizzle_channel_last<T: Clone, S: Data<Elem = T>>(data: ArrayBase<S, Ix3>) -> Array3<T> {
    data.permuted_axes(CHANNEL_LAST_AXES)
        .as_standard_layout()
        .into_owned()
}

/// Normalizes the `shape`, reshapes the row-major flattened `data` into it,
/// and swizzles the result into channel-last layout.
///
/// # Errors
///
/// Errors with
/// - [`LayoutError::UnsupportedRank`] if the `shape` has neither three nor
///   four dimensions
/// - [`LayoutError::NonSingletonLeadingDimension`] if a four-dimensional
///   `shape` has a leading dimension other than 1
/// - [`LayoutError::ElementCountMismatch`] if the length of `data` does not
///   match the normalized `shape`
pub fn to_channel_last<T: Clone>(
    data: Vec<T>,
    shape: &[usize],
) -> Result<(ChannelLastShape, Array3<T>), LayoutError> {
    let shape = ChannelFirstShape::normalize(shape)?;
    let array = reshape(data, shape)?;

    let swizzled = swizzle_channel_last(array);

    Ok((shape.channel_last(), swizzled))
}
