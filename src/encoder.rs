//! Bitmap encoding for the doodle model.
//!
//! A bitmap arrives as a row-major string of `'0'`/`'1'` characters covering a
//! fixed 64x64 grid. The encoder validates it and lays it out as the
//! `[1, 1, 64, 64]` float tensor the model was trained on.

use thiserror::Error;

/// Grid height in pixels.
pub const BITMAP_HEIGHT: usize = 64;
/// Grid width in pixels.
pub const BITMAP_WIDTH: usize = 64;
/// Number of characters a bitmap must contain.
pub const BITMAP_LEN: usize = BITMAP_HEIGHT * BITMAP_WIDTH;
/// Tensor shape in `(batch, channel, height, width)` order.
pub const TENSOR_SHAPE: [usize; 4] = [1, 1, BITMAP_HEIGHT, BITMAP_WIDTH];

/// Errors raised for malformed client bitmaps.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InputError {
    /// The bitmap does not contain exactly [`BITMAP_LEN`] characters.
    #[error("bitmap must contain {expected} characters but found {actual}")]
    Length { expected: usize, actual: usize },
    /// A character outside `{'0', '1'}` was found.
    #[error("bitmap contains invalid character {found:?} at position {position}")]
    InvalidCharacter { position: usize, found: char },
}

/// Dense `[1, 1, 64, 64]` input tensor.
///
/// Every element is exactly `0.0` or `1.0`.
#[derive(Debug, Clone, PartialEq)]
pub struct InputTensor {
    data: Box<[f32]>,
}

impl InputTensor {
    /// Logical tensor shape.
    #[must_use]
    pub const fn shape(&self) -> [usize; 4] {
        TENSOR_SHAPE
    }

    /// Flat row-major view of the tensor values.
    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Number of inked pixels.
    #[must_use]
    pub fn ink_count(&self) -> usize {
        self.data.iter().filter(|value| **value > 0.0).count()
    }
}

/// Encode a bitmap string into the model's input tensor.
///
/// # Examples
///
/// ```
/// use doodle_classifier::encoder::{BITMAP_LEN, encode};
///
/// let bitmap = "0".repeat(BITMAP_LEN);
/// let tensor = encode(&bitmap).unwrap();
/// assert_eq!(tensor.ink_count(), 0);
/// ```
///
/// # Errors
///
/// Returns [`InputError::Length`] when the bitmap is not exactly
/// [`BITMAP_LEN`] characters long and [`InputError::InvalidCharacter`] when a
/// character is neither `'0'` nor `'1'`. No tensor is built in either case.
pub fn encode(bitmap: &str) -> Result<InputTensor, InputError> {
    let actual = bitmap.chars().count();
    if actual != BITMAP_LEN {
        return Err(InputError::Length {
            expected: BITMAP_LEN,
            actual,
        });
    }
    let data = bitmap
        .chars()
        .enumerate()
        .map(|(position, found)| match found {
            '1' => Ok(1.0),
            '0' => Ok(0.0),
            _ => Err(InputError::InvalidCharacter { position, found }),
        })
        .collect::<Result<Box<[f32]>, _>>()?;
    Ok(InputTensor { data })
}

/// Split a bitmap into rows of [`BITMAP_WIDTH`] characters.
///
/// Used for debug output; a trailing partial row is kept as-is.
#[must_use]
pub fn render_rows(bitmap: &str) -> String {
    let chars: Vec<char> = bitmap.chars().collect();
    chars
        .chunks(BITMAP_WIDTH)
        .map(|row| row.iter().collect::<String>())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Remove ASCII whitespace so a bitmap laid out as rows can be encoded.
#[must_use]
pub fn strip_layout(text: &str) -> String {
    text.chars().filter(|c| !c.is_ascii_whitespace()).collect()
}
