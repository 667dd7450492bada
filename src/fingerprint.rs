// src/fingerprint.rs

//! Content fingerprints used as change sensors.
//!
//! Where a storefront exposes no version field, a stable digest of the
//! content stands in for one. Both fingerprints are deterministic and
//! never fail: the image path degrades to hashing the raw bytes when
//! decoding fails, and the text path yields `None` for empty input so
//! that absence is never read as "changed to empty".

use image::imageops::FilterType;
use sha2::{Digest, Sha256};

/// Edge length of the normalized thumbnail hashed for image identity.
///
/// Normalizing to a small fixed-size RGB buffer strips re-encoding and
/// compression noise, so only visible changes move the fingerprint.
const NORMALIZED_SIZE: u32 = 128;

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Fingerprint image bytes.
///
/// Decodable images are resized to a fixed thumbnail and converted to
/// RGB before hashing. Undecodable payloads fall back to a digest of
/// the raw bytes, so a binary swap still registers as a change.
pub fn image_fingerprint(bytes: &[u8]) -> String {
    match image::load_from_memory(bytes) {
        Ok(img) => {
            let normalized = img
                .resize_exact(NORMALIZED_SIZE, NORMALIZED_SIZE, FilterType::Triangle)
                .to_rgb8();
            sha256_hex(normalized.as_raw())
        }
        Err(_) => sha256_hex(bytes),
    }
}

/// Fingerprint visible text.
///
/// Whitespace runs collapse to a single space and the result is
/// trimmed before hashing, so markup reflow alone does not move the
/// fingerprint. Empty or whitespace-only input yields `None`.
pub fn text_fingerprint(text: &str) -> Option<String> {
    let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if normalized.is_empty() {
        return None;
    }
    Some(sha256_hex(normalized.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, RgbImage};
    use std::io::Cursor;

    fn png_bytes(pixel: [u8; 3]) -> Vec<u8> {
        let img = RgbImage::from_pixel(4, 4, image::Rgb(pixel));
        let mut buf = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut buf, ImageFormat::Png)
            .unwrap();
        buf.into_inner()
    }

    #[test]
    fn image_fingerprint_is_deterministic() {
        let bytes = png_bytes([200, 10, 10]);
        assert_eq!(image_fingerprint(&bytes), image_fingerprint(&bytes));
    }

    #[test]
    fn image_fingerprint_distinguishes_content() {
        let red = png_bytes([200, 10, 10]);
        let blue = png_bytes([10, 10, 200]);
        assert_ne!(image_fingerprint(&red), image_fingerprint(&blue));
    }

    #[test]
    fn image_fingerprint_survives_reencoding() {
        // Same pixels through two encoders must collide after normalization.
        let img = RgbImage::from_pixel(4, 4, image::Rgb([50, 100, 150]));
        let dynamic = image::DynamicImage::ImageRgb8(img);

        let mut png = Cursor::new(Vec::new());
        dynamic.write_to(&mut png, ImageFormat::Png).unwrap();
        let mut bmp = Cursor::new(Vec::new());
        dynamic.write_to(&mut bmp, ImageFormat::Bmp).unwrap();

        assert_ne!(png.get_ref(), bmp.get_ref());
        assert_eq!(
            image_fingerprint(png.get_ref()),
            image_fingerprint(bmp.get_ref())
        );
    }

    #[test]
    fn image_fingerprint_falls_back_on_raw_bytes() {
        let not_an_image = b"<html>403 Forbidden</html>";
        let fp = image_fingerprint(not_an_image);
        assert_eq!(fp.len(), 64);
        assert_eq!(fp, image_fingerprint(not_an_image));
        assert_ne!(fp, image_fingerprint(b"something else"));
    }

    #[test]
    fn text_fingerprint_normalizes_whitespace() {
        let a = text_fingerprint("Velo  Ice\n Cool \t 4mg");
        let b = text_fingerprint(" Velo Ice Cool 4mg ");
        assert!(a.is_some());
        assert_eq!(a, b);
    }

    #[test]
    fn text_fingerprint_detects_changes() {
        assert_ne!(
            text_fingerprint("CHF 10.00 in stock"),
            text_fingerprint("CHF 12.00 in stock")
        );
    }

    #[test]
    fn text_fingerprint_empty_is_none() {
        assert_eq!(text_fingerprint(""), None);
        assert_eq!(text_fingerprint("   \n\t "), None);
    }
}
