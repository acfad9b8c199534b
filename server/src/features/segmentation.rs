//! Blob segmentation for IFCB ROI images
//!
//! Global Otsu thresholding with polarity chosen from the image border.
//! IFCB ROIs are dark particles on a light flow-cell background, so the
//! border intensity tells us which side of the threshold is background.

use ndarray::Array2;

use crate::extract::types::{MaskArray, PixelArray};

use super::luminance;

/// Compute a binary foreground mask for a ROI image.
///
/// Output values are exactly 0 (background) and 1 (foreground), aligned
/// pixel-for-pixel with the input. A uniform image yields an all-background
/// mask.
pub fn segment_roi(pixels: &PixelArray) -> MaskArray {
    let gray = luminance(pixels);
    let threshold = otsu_threshold(&gray);
    // Otsu splits into v <= threshold and v > threshold; the border tells
    // us which class is background.
    let background_is_light = border_mean(&gray) > threshold as f64;

    gray.map(|&v| {
        if background_is_light {
            u8::from(v <= threshold)
        } else {
            u8::from(v > threshold)
        }
    })
}

/// Otsu's method: the threshold maximizing between-class variance.
fn otsu_threshold(gray: &Array2<u8>) -> u8 {
    let mut histogram = [0u64; 256];
    for &v in gray.iter() {
        histogram[v as usize] += 1;
    }
    let total = gray.len() as f64;
    let total_sum: f64 = histogram
        .iter()
        .enumerate()
        .map(|(v, &count)| v as f64 * count as f64)
        .sum();

    let mut best_threshold = 0u8;
    let mut best_variance = 0.0f64;
    let mut weight_below = 0.0f64;
    let mut sum_below = 0.0f64;

    for (value, &count) in histogram.iter().enumerate() {
        weight_below += count as f64;
        if weight_below == 0.0 {
            continue;
        }
        let weight_above = total - weight_below;
        if weight_above == 0.0 {
            break;
        }
        sum_below += value as f64 * count as f64;

        let mean_below = sum_below / weight_below;
        let mean_above = (total_sum - sum_below) / weight_above;
        let variance = weight_below * weight_above * (mean_below - mean_above).powi(2);
        if variance > best_variance {
            best_variance = variance;
            best_threshold = value as u8;
        }
    }
    best_threshold
}

/// Mean intensity of the one-pixel image border.
fn border_mean(gray: &Array2<u8>) -> f64 {
    let (height, width) = gray.dim();
    let mut sum = 0u64;
    let mut count = 0u64;
    for ((y, x), &v) in gray.indexed_iter() {
        if y == 0 || x == 0 || y == height - 1 || x == width - 1 {
            sum += v as u64;
            count += 1;
        }
    }
    if count == 0 { 0.0 } else { sum as f64 / count as f64 }
}
