//! Base64 PNG <-> pixel matrix codec
//!
//! Pure transformations between the wire representation (base64-encoded PNG
//! bytes) and in-memory `ndarray` matrices. Malformed input surfaces as
//! `ExtractError::Decode`; a bad mask handed to the 1-bit encoder is a
//! caller contract violation and surfaces as `ExtractError::Internal`.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use image::DynamicImage;
use ndarray::{Array2, Array3};

use super::types::{ExtractError, PixelArray};

/// Output bit depth for `encode_png`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PngBitDepth {
    /// 1-bit grayscale, for binary masks
    One,
    /// 8-bit grayscale
    Eight,
}

/// Decode a base64-encoded PNG into a pixel matrix.
///
/// Grayscale-family images materialize as a 2D matrix, color images as
/// height x width x 3. Images larger than `max_dim` on either side are
/// rejected before any further work.
pub fn decode_image(encoded: &str, max_dim: u32) -> Result<PixelArray, ExtractError> {
    let bytes = BASE64
        .decode(encoded.trim())
        .map_err(|e| ExtractError::Decode(format!("invalid base64: {e}")))?;

    // Read the dimensions from the header before materializing any pixels,
    // so a tiny payload claiming a huge image is rejected without the
    // allocation it asks for.
    let (width, height) =
        image::ImageReader::with_format(std::io::Cursor::new(&bytes), image::ImageFormat::Png)
            .into_dimensions()
            .map_err(|e| ExtractError::Decode(format!("invalid PNG: {e}")))?;
    if width == 0 || height == 0 {
        return Err(ExtractError::Decode("empty image".to_string()));
    }
    if width > max_dim || height > max_dim {
        return Err(ExtractError::ImageTooLarge { width, height, max_dim });
    }

    let img = image::load_from_memory_with_format(&bytes, image::ImageFormat::Png)
        .map_err(|e| ExtractError::Decode(format!("invalid PNG: {e}")))?;

    if img.color().has_color() {
        let rgb = img.to_rgb8();
        let raw = rgb.into_raw();
        let arr = Array3::from_shape_vec((height as usize, width as usize, 3), raw)
            .map_err(|e| ExtractError::Internal(format!("pixel buffer shape mismatch: {e}")))?;
        Ok(PixelArray::Rgb(arr))
    } else {
        let gray = match img {
            DynamicImage::ImageLuma8(g) => g,
            other => other.to_luma8(),
        };
        let raw = gray.into_raw();
        let arr = Array2::from_shape_vec((height as usize, width as usize), raw)
            .map_err(|e| ExtractError::Internal(format!("pixel buffer shape mismatch: {e}")))?;
        Ok(PixelArray::Gray(arr))
    }
}

/// Encode a grayscale matrix as PNG bytes at the requested bit depth.
pub fn encode_png(pixels: &Array2<u8>, depth: PngBitDepth) -> Result<Vec<u8>, ExtractError> {
    let (height, width) = pixels.dim();
    if height == 0 || width == 0 {
        return Err(ExtractError::Internal("cannot encode an empty matrix".to_string()));
    }

    let (png_depth, data) = match depth {
        PngBitDepth::One => (png::BitDepth::One, pack_mask_bits(pixels)?),
        PngBitDepth::Eight => (png::BitDepth::Eight, pixels.iter().copied().collect()),
    };

    let mut out = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut out, width as u32, height as u32);
        encoder.set_color(png::ColorType::Grayscale);
        encoder.set_depth(png_depth);
        let mut writer = encoder
            .write_header()
            .map_err(|e| ExtractError::Internal(format!("PNG encoding failed: {e}")))?;
        writer
            .write_image_data(&data)
            .map_err(|e| ExtractError::Internal(format!("PNG encoding failed: {e}")))?;
    }
    Ok(out)
}

/// Base64-encode compressed image bytes for a JSON response body.
pub fn to_base64(bytes: &[u8]) -> String {
    BASE64.encode(bytes)
}

/// Pack a {0,1} mask into PNG 1-bit scanlines, MSB first, rows padded to a
/// byte boundary. Values outside {0,1} mean the algorithm broke its output
/// contract, which is an internal failure rather than a client error.
fn pack_mask_bits(mask: &Array2<u8>) -> Result<Vec<u8>, ExtractError> {
    if let Some(bad) = mask.iter().find(|&&v| v > 1) {
        return Err(ExtractError::Internal(format!(
            "mask contains value {bad} outside {{0,1}}, cannot encode at bit depth 1"
        )));
    }

    let (height, width) = mask.dim();
    let row_bytes = width.div_ceil(8);
    let mut packed = Vec::with_capacity(height * row_bytes);
    for row in mask.outer_iter() {
        let mut byte = 0u8;
        let mut bits = 0u32;
        for &v in row.iter() {
            byte = (byte << 1) | v;
            bits += 1;
            if bits == 8 {
                packed.push(byte);
                byte = 0;
                bits = 0;
            }
        }
        if bits > 0 {
            packed.push(byte << (8 - bits));
        }
    }
    Ok(packed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn encode_gray_fixture(pixels: &Array2<u8>) -> String {
        let png = encode_png(pixels, PngBitDepth::Eight).unwrap();
        to_base64(&png)
    }

    #[test]
    fn test_gray_round_trip() {
        let pixels = array![[0u8, 50, 100], [150, 200, 250]];
        let encoded = encode_gray_fixture(&pixels);
        match decode_image(&encoded, 4096).unwrap() {
            PixelArray::Gray(decoded) => assert_eq!(decoded, pixels),
            other => panic!("expected grayscale, got {other:?}"),
        }
    }

    #[test]
    fn test_mask_round_trip_at_one_bit() {
        // Width of 11 exercises the row padding path
        let mask = Array2::from_shape_fn((5, 11), |(y, x)| ((x + y) % 2) as u8);
        let png = encode_png(&mask, PngBitDepth::One).unwrap();
        let encoded = to_base64(&png);

        // 1-bit PNGs materialize as 0/255 grayscale
        match decode_image(&encoded, 4096).unwrap() {
            PixelArray::Gray(decoded) => {
                assert_eq!(decoded.map(|&v| u8::from(v > 0)), mask);
            }
            other => panic!("expected grayscale, got {other:?}"),
        }
    }

    #[test]
    fn test_one_bit_png_reports_depth_one() {
        let mask = Array2::from_elem((4, 4), 1u8);
        let png_bytes = encode_png(&mask, PngBitDepth::One).unwrap();
        let decoder = png::Decoder::new(std::io::Cursor::new(png_bytes));
        let reader = decoder.read_info().unwrap();
        assert_eq!(reader.info().bit_depth, png::BitDepth::One);
        assert_eq!(reader.info().color_type, png::ColorType::Grayscale);
    }

    #[test]
    fn test_decode_rejects_invalid_base64() {
        let err = decode_image("not-base64!!", 4096).unwrap_err();
        assert!(matches!(err, ExtractError::Decode(_)), "got {err:?}");
    }

    #[test]
    fn test_decode_rejects_non_png_bytes() {
        let encoded = to_base64(b"these bytes are not a PNG image");
        let err = decode_image(&encoded, 4096).unwrap_err();
        match err {
            ExtractError::Decode(msg) => assert!(msg.contains("PNG"), "message: {msg}"),
            other => panic!("expected Decode, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_rejects_oversized_image() {
        let pixels = Array2::from_elem((16, 16), 128u8);
        let encoded = encode_gray_fixture(&pixels);
        let err = decode_image(&encoded, 8).unwrap_err();
        assert!(matches!(err, ExtractError::ImageTooLarge { .. }), "got {err:?}");
    }

    #[test]
    fn test_oversized_header_rejected_without_decoding_pixels() {
        // A header claiming a huge image with no pixel data behind it: the
        // cap must trip on the header alone. A full decode of these bytes
        // would fail as malformed instead. Header parsing stops at the first
        // IDAT chunk boundary, so an empty IDAT must sit between IHDR and
        // the IEND the encoder writes on drop for the dimensions to be
        // readable at all.
        let mut bytes = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut bytes, 60_000, 60_000);
            encoder.set_color(png::ColorType::Grayscale);
            encoder.set_depth(png::BitDepth::Eight);
            let _writer = encoder.write_header().unwrap();
        }
        // Zero-length IDAT chunk (length, type, CRC of "IDAT")
        let iend_at = bytes.len() - 12;
        let idat = [0u8, 0, 0, 0, b'I', b'D', b'A', b'T', 0x35, 0xAF, 0x06, 0x1E];
        bytes.splice(iend_at..iend_at, idat);
        let encoded = to_base64(&bytes);
        let err = decode_image(&encoded, 4096).unwrap_err();
        assert!(matches!(err, ExtractError::ImageTooLarge { .. }), "got {err:?}");
    }

    #[test]
    fn test_one_bit_encode_rejects_non_binary_values() {
        let not_a_mask = array![[0u8, 1], [2, 1]];
        let err = encode_png(&not_a_mask, PngBitDepth::One).unwrap_err();
        assert!(matches!(err, ExtractError::Internal(_)), "got {err:?}");
    }
}
