use crate::caption;
use anyhow::{anyhow, Result};
use printpdf::image_crate::GenericImageView;
use printpdf::{
    image_crate, BuiltinFont, Image, ImageTransform, IndirectFontRef, Mm, PdfDocument,
    PdfDocumentReference, PdfLayerReference,
};
use tracing::warn;

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const MARGIN_MM: f32 = 20.0;
const CONTENT_WIDTH_MM: f32 = PAGE_WIDTH_MM - 2.0 * MARGIN_MM;
const IMAGE_BOX_HEIGHT_MM: f32 = 150.0;
const IMAGE_GAP_MM: f32 = 12.0;
const TITLE_SIZE_PT: f32 = 20.0;
const BODY_SIZE_PT: f32 = 12.0;
const LINE_SPACING: f32 = 1.5;
const PT_TO_MM: f32 = 0.3528;
const IMAGE_DPI: f32 = 300.0;
// Rough advance width of the builtin faces, used for centering and wrapping.
const AVG_CHAR_WIDTH_EM: f32 = 0.5;

const BODY_FONTS: [BuiltinFont; 3] = [
    BuiltinFont::Helvetica,
    BuiltinFont::TimesRoman,
    BuiltinFont::Courier,
];
const TITLE_FONTS: [BuiltinFont; 3] = [
    BuiltinFont::HelveticaBold,
    BuiltinFont::TimesBold,
    BuiltinFont::CourierBold,
];

/// Single-page PDF: the submission image scaled into the content box and
/// centered, the title in bold below it, then the stripped body text. An
/// image that fails to decode is dropped with a warning; fonts fall back
/// through the builtin faces so rendering never fails on the primary alone.
pub fn submission_pdf(
    title: Option<&str>,
    body_html: Option<&str>,
    image_bytes: Option<&[u8]>,
) -> Result<Vec<u8>> {
    let title_text = title
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or("Untitled");
    let (doc, page, layer) =
        PdfDocument::new(title_text, Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "content");
    let layer = doc.get_page(page).get_layer(layer);
    let title_font = builtin_font(&doc, &TITLE_FONTS)?;
    let body_font = builtin_font(&doc, &BODY_FONTS)?;

    let mut cursor_mm = PAGE_HEIGHT_MM - MARGIN_MM;
    if let Some(bytes) = image_bytes {
        // Embedding goes through printpdf's re-exported image crate, which is
        // a different major version than the one the rest of the crate uses.
        match image_crate::load_from_memory(bytes) {
            Ok(decoded) => {
                cursor_mm = draw_image(&layer, &decoded, cursor_mm);
            }
            Err(err) => {
                warn!(error = ?err, "pdf image failed to decode, rendering text only");
            }
        }
    }

    cursor_mm -= line_height_mm(TITLE_SIZE_PT);
    draw_centered(&layer, title_text, TITLE_SIZE_PT, cursor_mm, &title_font);

    if let Some(body) = body_html {
        let stripped = caption::strip_html(body);
        if !stripped.is_empty() {
            cursor_mm -= line_height_mm(TITLE_SIZE_PT) / 2.0;
            let max_chars = wrap_width_chars(BODY_SIZE_PT);
            for paragraph_line in stripped.lines() {
                for line in wrap_line(paragraph_line, max_chars) {
                    cursor_mm -= line_height_mm(BODY_SIZE_PT);
                    if cursor_mm < MARGIN_MM {
                        break;
                    }
                    draw_centered(&layer, &line, BODY_SIZE_PT, cursor_mm, &body_font);
                }
                if cursor_mm < MARGIN_MM {
                    break;
                }
            }
        }
    }

    doc.save_to_bytes().map_err(|err| anyhow!("save pdf: {err}"))
}

fn builtin_font(
    doc: &PdfDocumentReference,
    candidates: &[BuiltinFont],
) -> Result<IndirectFontRef> {
    for candidate in candidates {
        match doc.add_builtin_font(*candidate) {
            Ok(font) => return Ok(font),
            Err(err) => {
                warn!(error = %err, font = ?candidate, "pdf font unavailable, trying fallback");
            }
        }
    }
    Err(anyhow!("no usable pdf font"))
}

/// Draws the image scaled to fit the content box, centered horizontally,
/// anchored at `top_mm`. Returns the new cursor position below the image.
fn draw_image(layer: &PdfLayerReference, decoded: &image_crate::DynamicImage, top_mm: f32) -> f32 {
    let (width_px, height_px) = decoded.dimensions();
    let native_w_mm = width_px as f32 * 25.4 / IMAGE_DPI;
    let native_h_mm = height_px as f32 * 25.4 / IMAGE_DPI;
    if native_w_mm <= 0.0 || native_h_mm <= 0.0 {
        return top_mm;
    }
    let scale = (CONTENT_WIDTH_MM / native_w_mm).min(IMAGE_BOX_HEIGHT_MM / native_h_mm);
    let draw_w = native_w_mm * scale;
    let draw_h = native_h_mm * scale;
    let translate_x = MARGIN_MM + (CONTENT_WIDTH_MM - draw_w) / 2.0;
    let translate_y = top_mm - draw_h;
    // Alpha channels do not survive the XObject path, flatten to RGB first.
    let rgb = image_crate::DynamicImage::ImageRgb8(decoded.to_rgb8());
    let pdf_image = Image::from_dynamic_image(&rgb);
    pdf_image.add_to_layer(
        layer.clone(),
        ImageTransform {
            translate_x: Some(Mm(translate_x)),
            translate_y: Some(Mm(translate_y)),
            scale_x: Some(scale),
            scale_y: Some(scale),
            dpi: Some(IMAGE_DPI),
            ..Default::default()
        },
    );
    translate_y - IMAGE_GAP_MM
}

fn draw_centered(
    layer: &PdfLayerReference,
    text: &str,
    size_pt: f32,
    baseline_mm: f32,
    font: &IndirectFontRef,
) {
    let width_mm = text.chars().count() as f32 * size_pt * AVG_CHAR_WIDTH_EM * PT_TO_MM;
    let x = ((PAGE_WIDTH_MM - width_mm) / 2.0).max(MARGIN_MM);
    layer.use_text(text, size_pt, Mm(x), Mm(baseline_mm), font);
}

fn line_height_mm(size_pt: f32) -> f32 {
    size_pt * LINE_SPACING * PT_TO_MM
}

fn wrap_width_chars(size_pt: f32) -> usize {
    (CONTENT_WIDTH_MM / (size_pt * AVG_CHAR_WIDTH_EM * PT_TO_MM)).floor() as usize
}

fn wrap_line(line: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in line.split_whitespace() {
        if current.is_empty() {
            current = word.to_string();
        } else if current.chars().count() + 1 + word.chars().count() <= max_chars {
            current.push(' ');
            current.push_str(word);
        } else {
            lines.push(std::mem::take(&mut current));
            current = word.to_string();
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}
