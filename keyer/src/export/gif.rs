use frame_key_common::frame::EncodedFrame;
use image::codecs::gif::{GifEncoder, Repeat};
use image::{Delay, Frame as AnimFrame};
use tracing::{debug, info, warn};

use super::ExportError;
use crate::pipeline::ProcessedFrame;

/// GIF encoder speed, 1 (best quantization) to 30 (fastest).
const GIF_SPEED: i32 = 10;

pub struct EncodedGif {
    pub bytes: Vec<u8>,
    pub frame_count: u32,
    /// Size exceeded the configured budget. Reported, not enforced.
    pub over_budget: bool,
}

/// Encode frames into an endlessly looping GIF at `fps`.
///
/// Frames that cannot be decoded are dropped with a warning. The first
/// decodable frame sets the canvas size and later frames of another size are
/// resized to it. Alpha 0 pixels become the GIF's transparent index.
pub fn encode_gif(frames: &[ProcessedFrame], fps: u32, max_bytes: u64) -> Result<EncodedGif, ExportError> {
    if fps == 0 {
        return Err(ExportError::InvalidFps);
    }
    let delay = Delay::from_numer_denom_ms(1000, fps);

    let mut bytes = Vec::new();
    let mut frame_count = 0u32;
    let mut canvas: Option<(u32, u32)> = None;
    {
        let mut encoder = GifEncoder::new_with_speed(&mut bytes, GIF_SPEED);
        encoder
            .set_repeat(Repeat::Infinite)
            .map_err(|e| ExportError::Gif(e.to_string()))?;

        for processed in frames {
            let decoded = match EncodedFrame::new(processed.seq, processed.data.clone()).decode() {
                Ok(f) => f,
                Err(e) => {
                    warn!(seq = processed.seq, error = %e, "dropping undecodable frame from GIF");
                    continue;
                }
            };
            let (width, height) = *canvas.get_or_insert(decoded.image.dimensions());
            if decoded.image.dimensions() != (width, height) {
                warn!(
                    seq = processed.seq,
                    width = decoded.width(),
                    height = decoded.height(),
                    canvas_width = width,
                    canvas_height = height,
                    "frame size differs from GIF canvas, resizing"
                );
            }
            let image = decoded.resized(width, height).image;
            encoder
                .encode_frame(AnimFrame::from_parts(image, 0, 0, delay))
                .map_err(|e| ExportError::Gif(e.to_string()))?;
            frame_count += 1;
            debug!(seq = processed.seq, frame_count, "pushed frame to GIF encoder");
        }
    }

    if frame_count == 0 {
        return Err(ExportError::NoFrames);
    }

    let over_budget = bytes.len() as u64 > max_bytes;
    if over_budget {
        warn!(
            bytes = bytes.len(),
            max_bytes,
            "GIF exceeds size budget; lower the fps or trim the clip"
        );
    }
    info!(frame_count, bytes = bytes.len(), fps, "GIF encoding complete");

    Ok(EncodedGif {
        bytes,
        frame_count,
        over_budget,
    })
}
