use crate::model::FocalPoint;
use image::imageops::FilterType;
use image::DynamicImage;

/// Crop window in source-pixel space. Always fully contained in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
}

/// Named target raster geometry for one social platform.
#[derive(Debug, Clone, Copy)]
pub struct PlatformPreset {
    pub id: &'static str,
    pub width: u32,
    pub height: u32,
}

pub const PRESETS: [PlatformPreset; 3] = [
    PlatformPreset {
        id: "square",
        width: 1080,
        height: 1080,
    },
    PlatformPreset {
        id: "portrait",
        width: 1080,
        height: 1350,
    },
    PlatformPreset {
        id: "wide",
        width: 1200,
        height: 675,
    },
];

/// Largest window of the target aspect ratio that fits the source, anchored
/// on the focal point (center when absent) and clamped to the source bounds.
/// Declines on empty sources or targets instead of dividing by zero.
pub fn crop_rect(
    source_width: u32,
    source_height: u32,
    target_width: u32,
    target_height: u32,
    focal: Option<FocalPoint>,
) -> Option<CropRect> {
    if source_width == 0 || source_height == 0 || target_width == 0 || target_height == 0 {
        return None;
    }
    let w = source_width as f64;
    let h = source_height as f64;
    let aspect = target_width as f64 / target_height as f64;
    let (crop_w, crop_h) = if w / h >= aspect {
        (h * aspect, h)
    } else {
        (w, w / aspect)
    };
    let (anchor_x, anchor_y) = match focal {
        Some(focal) => (focal.x / 100.0 * w, focal.y / 100.0 * h),
        None => (w / 2.0, h / 2.0),
    };
    let width = (crop_w.round() as u32).clamp(1, source_width);
    let height = (crop_h.round() as u32).clamp(1, source_height);
    let left = (anchor_x - crop_w / 2.0)
        .round()
        .clamp(0.0, (source_width - width) as f64) as u32;
    let top = (anchor_y - crop_h / 2.0)
        .round()
        .clamp(0.0, (source_height - height) as f64) as u32;
    Some(CropRect {
        left,
        top,
        width,
        height,
    })
}

/// Extracts the focal crop window and resizes it to exactly
/// `target_width × target_height`.
pub fn crop_cover(
    image: &DynamicImage,
    target_width: u32,
    target_height: u32,
    focal: Option<FocalPoint>,
) -> Option<DynamicImage> {
    let rect = crop_rect(
        image.width(),
        image.height(),
        target_width,
        target_height,
        focal,
    )?;
    let cropped = image.crop_imm(rect.left, rect.top, rect.width, rect.height);
    Some(cropped.resize_exact(target_width, target_height, FilterType::Lanczos3))
}
