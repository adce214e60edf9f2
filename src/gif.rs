use crate::crop;
use anyhow::{anyhow, bail, Context, Result};
use bytes::Bytes;
use image::codecs::gif::{GifEncoder, Repeat};
use image::{Delay, Frame};

/// Every frame is normalized to this canvas before quantization so the
/// animation has a single resolution regardless of snapshot sizes.
pub const CANVAS_WIDTH: u32 = 800;
pub const CANVAS_HEIGHT: u32 = 600;
pub const FRAME_DELAY_MS: u32 = 1000;

/// Encodes work-in-progress snapshots (final image last) into a looping
/// animation. Unlike the archive assemblers this is all-or-nothing: a frame
/// that fails to decode aborts the export, since a partial progression is
/// meaningless.
pub fn progression_gif(frames: &[Bytes]) -> Result<Vec<u8>> {
    if frames.len() < 2 {
        bail!("progression gif needs at least 2 frames, got {}", frames.len());
    }
    let mut bytes = Vec::new();
    let mut encoder = GifEncoder::new_with_speed(&mut bytes, 10);
    encoder.set_repeat(Repeat::Infinite)?;
    for (index, raw) in frames.iter().enumerate() {
        let decoded = image::load_from_memory(raw)
            .with_context(|| format!("decode progression frame {}", index + 1))?;
        let canvas = crop::crop_cover(&decoded, CANVAS_WIDTH, CANVAS_HEIGHT, None)
            .ok_or_else(|| anyhow!("progression frame {} has no pixels", index + 1))?;
        let frame = Frame::from_parts(
            canvas.to_rgba8(),
            0,
            0,
            Delay::from_numer_denom_ms(FRAME_DELAY_MS, 1),
        );
        encoder
            .encode_frame(frame)
            .with_context(|| format!("encode progression frame {}", index + 1))?;
    }
    drop(encoder);
    Ok(bytes)
}
