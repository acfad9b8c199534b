//! ROI analysis algorithms
//!
//! Pure, synchronous functions over decoded pixel matrices. The request
//! layer treats these as opaque collaborators: it hands them a `PixelArray`
//! and gets back a mask (and, for `compute_features`, a measurement map).
//! Everything here is deterministic so repeated requests over the same
//! image produce bit-identical output.

pub mod measurements;
pub mod segmentation;

pub use measurements::compute_features;
pub use segmentation::segment_roi;

use ndarray::Array2;

use crate::extract::types::PixelArray;

/// Reduce a pixel matrix to single-channel intensity (Rec. 601 weights for
/// color inputs, identity for grayscale).
pub(crate) fn luminance(pixels: &PixelArray) -> Array2<u8> {
    match pixels {
        PixelArray::Gray(gray) => gray.clone(),
        PixelArray::Rgb(rgb) => {
            let (height, width, _) = rgb.dim();
            Array2::from_shape_fn((height, width), |(y, x)| {
                let r = rgb[[y, x, 0]] as u32;
                let g = rgb[[y, x, 1]] as u32;
                let b = rgb[[y, x, 2]] as u32;
                ((299 * r + 587 * g + 114 * b) / 1000) as u8
            })
        }
    }
}
