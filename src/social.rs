use crate::crop::{self, PRESETS};
use crate::model::FocalPoint;
use anyhow::Result;
use image::DynamicImage;
use tracing::warn;

const JPEG_QUALITY: u8 = 90;

/// One JPEG per platform preset, cropped around the focal point, in preset
/// declaration order so archive entries come out the same every time. A
/// source that will not decode yields no variants; callers treat each
/// missing preset as "skip this file", not as an error.
pub fn social_variants(
    source: &[u8],
    focal: Option<FocalPoint>,
) -> Vec<(&'static str, Vec<u8>)> {
    let image = match image::load_from_memory(source) {
        Ok(image) => image,
        Err(err) => {
            warn!(error = ?err, "social pack source failed to decode");
            return Vec::new();
        }
    };
    let mut variants = Vec::new();
    for preset in PRESETS {
        let Some(cropped) = crop::crop_cover(&image, preset.width, preset.height, focal) else {
            continue;
        };
        match encode_jpeg(&cropped) {
            Ok(bytes) => {
                variants.push((preset.id, bytes));
            }
            Err(err) => {
                warn!(error = ?err, preset = preset.id, "social variant encode failed");
            }
        }
    }
    variants
}

pub fn encode_jpeg(image: &DynamicImage) -> Result<Vec<u8>> {
    let rgb = image.to_rgb8();
    let mut bytes = Vec::new();
    let mut encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut bytes, JPEG_QUALITY);
    encoder.encode(
        rgb.as_raw(),
        rgb.width(),
        rgb.height(),
        image::ColorType::Rgb8.into(),
    )?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use std::io::Cursor;

    fn png_fixture(width: u32, height: u32) -> Vec<u8> {
        let image = RgbaImage::from_pixel(width, height, Rgba([120, 40, 200, 255]));
        let mut bytes = Vec::new();
        DynamicImage::ImageRgba8(image)
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn produces_every_preset_at_exact_size() {
        let variants = social_variants(&png_fixture(1600, 900), None);
        assert_eq!(variants.len(), 3);
        for (preset, (id, bytes)) in PRESETS.iter().zip(&variants) {
            assert_eq!(*id, preset.id);
            let decoded = image::load_from_memory(bytes).unwrap();
            assert_eq!(decoded.width(), preset.width);
            assert_eq!(decoded.height(), preset.height);
        }
    }

    #[test]
    fn variants_follow_preset_declaration_order() {
        let first = social_variants(&png_fixture(1600, 900), None);
        let second = social_variants(&png_fixture(1600, 900), None);
        let ids: Vec<&str> = first.iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec!["square", "portrait", "wide"]);
        let again: Vec<&str> = second.iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, again);
    }

    #[test]
    fn undecodable_source_yields_no_variants() {
        let variants = social_variants(b"definitely not an image", None);
        assert!(variants.is_empty());
    }
}
