//! Region measurements over a segmented ROI
//!
//! Computes the blob mask plus a named set of scalar features. Feature
//! names and insertion order are stable; downstream consumers serialize the
//! map as-is.

use crate::extract::types::{FeatureSet, FeatureValue, MaskArray, PixelArray};

use super::{luminance, segment_roi};

/// Segment a ROI and measure its blob.
///
/// Always returns a non-empty feature map; measurements that need a
/// non-empty blob are zero when segmentation finds nothing.
pub fn compute_features(pixels: &PixelArray) -> (MaskArray, FeatureSet) {
    let mask = segment_roi(pixels);
    let gray = luminance(pixels);
    let (height, width) = mask.dim();

    let mut features = FeatureSet::new();
    let mut push = |name: &str, value: f64| {
        features.insert(name.to_string(), FeatureValue::Number(value));
    };

    push("width", width as f64);
    push("height", height as f64);

    // First pass: area, bounding box, intensity, centroid
    let mut area = 0u64;
    let mut intensity_sum = 0u64;
    let mut sum_y = 0f64;
    let mut sum_x = 0f64;
    let (mut min_y, mut min_x) = (usize::MAX, usize::MAX);
    let (mut max_y, mut max_x) = (0usize, 0usize);
    for ((y, x), &v) in mask.indexed_iter() {
        if v == 0 {
            continue;
        }
        area += 1;
        intensity_sum += gray[[y, x]] as u64;
        sum_y += y as f64;
        sum_x += x as f64;
        min_y = min_y.min(y);
        min_x = min_x.min(x);
        max_y = max_y.max(y);
        max_x = max_x.max(x);
    }

    push("area", area as f64);
    if area == 0 {
        push("bbox_width", 0.0);
        push("bbox_height", 0.0);
        push("extent", 0.0);
        push("equiv_diameter", 0.0);
        push("perimeter", 0.0);
        push("centroid_row", 0.0);
        push("centroid_col", 0.0);
        push("major_axis_length", 0.0);
        push("minor_axis_length", 0.0);
        push("orientation", 0.0);
        push("mean_intensity", 0.0);
        return (mask, features);
    }

    let bbox_width = (max_x - min_x + 1) as f64;
    let bbox_height = (max_y - min_y + 1) as f64;
    let centroid_y = sum_y / area as f64;
    let centroid_x = sum_x / area as f64;

    push("bbox_width", bbox_width);
    push("bbox_height", bbox_height);
    push("extent", area as f64 / (bbox_width * bbox_height));
    push("equiv_diameter", (4.0 * area as f64 / std::f64::consts::PI).sqrt());
    push("perimeter", boundary_pixel_count(&mask) as f64);
    push("centroid_row", centroid_y);
    push("centroid_col", centroid_x);

    // Second pass: central moments for the axis measurements
    let mut mu20 = 0f64;
    let mut mu02 = 0f64;
    let mut mu11 = 0f64;
    for ((y, x), &v) in mask.indexed_iter() {
        if v == 0 {
            continue;
        }
        let dy = y as f64 - centroid_y;
        let dx = x as f64 - centroid_x;
        mu20 += dx * dx;
        mu02 += dy * dy;
        mu11 += dx * dy;
    }
    mu20 /= area as f64;
    mu02 /= area as f64;
    mu11 /= area as f64;

    let common = ((mu20 - mu02) / 2.0).hypot(mu11);
    let lambda1 = (mu20 + mu02) / 2.0 + common;
    let lambda2 = ((mu20 + mu02) / 2.0 - common).max(0.0);

    push("major_axis_length", 4.0 * lambda1.sqrt());
    push("minor_axis_length", 4.0 * lambda2.sqrt());
    push("orientation", 0.5 * (2.0 * mu11).atan2(mu20 - mu02));
    push("mean_intensity", intensity_sum as f64 / area as f64);

    (mask, features)
}

/// Count foreground pixels touching the background or the image edge.
fn boundary_pixel_count(mask: &MaskArray) -> u64 {
    let (height, width) = mask.dim();
    let mut count = 0u64;
    for ((y, x), &v) in mask.indexed_iter() {
        if v == 0 {
            continue;
        }
        let on_edge = y == 0 || x == 0 || y == height - 1 || x == width - 1;
        if on_edge
            || mask[[y - 1, x]] == 0
            || mask[[y + 1, x]] == 0
            || mask[[y, x - 1]] == 0
            || mask[[y, x + 1]] == 0
        {
            count += 1;
        }
    }
    count
}
