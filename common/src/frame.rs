use image::imageops::{self, FilterType};
use image::{ImageFormat, ImageReader, Rgba, RgbaImage};
use std::io::Cursor;

/// Edge length of the frames produced by the clip extraction step.
pub const DEFAULT_FRAME_SIZE: u32 = 240;

/// A frame as delivered by the external extraction step: encoded image bytes
/// (PNG or JPEG) plus the frame's position in the clip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedFrame {
    pub seq: u64,
    pub data: Vec<u8>,
}

/// A decoded frame. Pixels are straight (non-premultiplied) RGBA.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub seq: u64,
    pub image: RgbaImage,
}

impl EncodedFrame {
    pub fn new(seq: u64, data: Vec<u8>) -> Self {
        Self { seq, data }
    }

    /// Decode to RGBA. Format is sniffed from the bytes.
    pub fn decode(&self) -> Result<Frame, FrameError> {
        if self.data.is_empty() {
            return Err(FrameError::Empty { seq: self.seq });
        }
        let img = ImageReader::new(Cursor::new(&self.data))
            .with_guessed_format()
            .map_err(|e| FrameError::Decode {
                seq: self.seq,
                reason: e.to_string(),
            })?
            .decode()
            .map_err(|e| FrameError::Decode {
                seq: self.seq,
                reason: e.to_string(),
            })?;
        Ok(Frame {
            seq: self.seq,
            image: img.to_rgba8(),
        })
    }
}

impl Frame {
    pub fn new(seq: u64, image: RgbaImage) -> Self {
        Self { seq, image }
    }

    /// A frame filled with one opaque colour.
    pub fn solid(seq: u64, width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let px = Rgba([rgb[0], rgb[1], rgb[2], 255]);
        Self {
            seq,
            image: RgbaImage::from_pixel(width, height, px),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn pixel_count(&self) -> u64 {
        self.image.width() as u64 * self.image.height() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.pixel_count() == 0
    }

    /// Resize to exactly `width` x `height`. Nearest-neighbour sampling, so a
    /// flat background keeps its exact colour. Frames already that size are
    /// returned untouched.
    pub fn resized(self, width: u32, height: u32) -> Frame {
        if self.image.dimensions() == (width, height) {
            return self;
        }
        let image = imageops::resize(&self.image, width, height, FilterType::Nearest);
        Frame { seq: self.seq, image }
    }

    /// Count of pixels whose alpha is exactly zero.
    pub fn transparent_count(&self) -> u64 {
        self.image.pixels().filter(|p| p.0[3] == 0).count() as u64
    }

    /// Encode as PNG, the only format here that keeps the alpha channel.
    pub fn encode_png(&self) -> Result<EncodedFrame, FrameError> {
        let mut buf = Cursor::new(Vec::new());
        self.image
            .write_to(&mut buf, ImageFormat::Png)
            .map_err(|e| FrameError::Encode {
                seq: self.seq,
                reason: e.to_string(),
            })?;
        Ok(EncodedFrame {
            seq: self.seq,
            data: buf.into_inner(),
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("frame {seq} has no payload")]
    Empty { seq: u64 },
    #[error("failed to decode frame {seq}: {reason}")]
    Decode { seq: u64, reason: String },
    #[error("failed to encode frame {seq}: {reason}")]
    Encode { seq: u64, reason: String },
}
