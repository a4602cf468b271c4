use std::sync::Arc;

use frame_key_common::color::Rgb;
use frame_key_common::config::{Config, TargetColor};
use frame_key_common::frame::{EncodedFrame, Frame};
use futures_util::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::chroma::{self, ChromaPolicy, Threshold};
use crate::detect::{BackgroundDetector, BorderDetector, FALLBACK_COLOR};

/// What the caller wants keyed out of a clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeyRequest {
    pub target: TargetColor,
    pub threshold: Threshold,
}

/// Where the colour used for a batch came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorSource {
    Manual,
    /// Detected on the frame with this sequence number.
    Detected { seq: u64 },
    /// No frame could be decoded for detection.
    Fallback,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FrameStatus {
    Keyed { transparent: u64, total: u64 },
    /// The frame could not be keyed; `data` holds the original bytes.
    Passthrough { reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedFrame {
    pub seq: u64,
    /// PNG bytes when keyed, the untouched input bytes on passthrough.
    pub data: Vec<u8>,
    pub status: FrameStatus,
}

impl ProcessedFrame {
    pub fn is_passthrough(&self) -> bool {
        matches!(self.status, FrameStatus::Passthrough { .. })
    }
}

/// Non-fatal findings the caller may want to show the user.
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// Too little of the clip went transparent; the colour is probably wrong
    /// and the user should pick one by hand.
    LowConfidence { ratio: f64, min_ratio: f64 },
    /// These frames were passed through unkeyed.
    PassthroughFrames { seqs: Vec<u64> },
}

#[derive(Debug, Clone)]
pub struct BatchReport {
    /// Same length and order as the input.
    pub frames: Vec<ProcessedFrame>,
    pub background: Rgb,
    pub source: ColorSource,
    pub max_distance: f64,
    pub transparent: u64,
    pub total: u64,
    pub diagnostics: Vec<Diagnostic>,
}

impl BatchReport {
    pub fn transparent_ratio(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.transparent as f64 / self.total as f64
    }

    pub fn is_low_confidence(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| matches!(d, Diagnostic::LowConfidence { .. }))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("frame sequence is empty")]
    EmptySequence,
    #[error("batch cancelled")]
    Cancelled,
    #[error("frame worker failed: {0}")]
    Join(String),
}

/// Called on the blocking pool as each frame finishes, in completion order.
pub type FrameCallback = Arc<dyn Fn(&ProcessedFrame) + Send + Sync>;

/// Keys a whole clip: one background colour for the clip, then every frame
/// independently on the blocking pool.
///
/// The input slice is never modified, so re-keying with a different
/// threshold is just another `run` over the same originals.
pub struct KeyPipeline {
    detector: Arc<dyn BackgroundDetector>,
    policy: ChromaPolicy,
    low_confidence_ratio: f64,
    /// Target size every decoded frame is resized to; `None` keeps each
    /// frame's own size.
    frame_size: Option<(u32, u32)>,
    on_frame: Option<FrameCallback>,
}

impl KeyPipeline {
    pub fn new(
        detector: Arc<dyn BackgroundDetector>,
        policy: ChromaPolicy,
        low_confidence_ratio: f64,
    ) -> Self {
        Self {
            detector,
            policy,
            low_confidence_ratio,
            frame_size: None,
            on_frame: None,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Arc::new(BorderDetector::new(config.detection.clone())),
            ChromaPolicy::from(&config.chroma),
            config.chroma.low_confidence_ratio,
        )
        .with_frame_size(config.input.width, config.input.height)
    }

    /// Resize every frame to `width` x `height` before detection and keying,
    /// so the exported clip has one frame size.
    pub fn with_frame_size(mut self, width: u32, height: u32) -> Self {
        self.frame_size = Some((width, height));
        self
    }

    pub fn with_frame_callback(mut self, callback: FrameCallback) -> Self {
        self.on_frame = Some(callback);
        self
    }

    pub fn policy(&self) -> &ChromaPolicy {
        &self.policy
    }

    /// Resolve the colour for the whole clip. Detection runs on frame 0, or on
    /// the first frame that decodes if frame 0 is unreadable.
    pub async fn resolve_target(
        &self,
        frames: &[EncodedFrame],
        target: TargetColor,
    ) -> Result<(Rgb, ColorSource), PipelineError> {
        if let TargetColor::Manual(color) = target {
            return Ok((color, ColorSource::Manual));
        }

        for (i, encoded) in frames.iter().enumerate() {
            let encoded = encoded.clone();
            let detector = Arc::clone(&self.detector);
            let frame_size = self.frame_size;
            let result = tokio::task::spawn_blocking(move || {
                encoded
                    .decode()
                    .map(|frame| normalize(frame, frame_size))
                    .map(|frame| (frame.seq, detector.detect(&frame)))
            })
            .await
            .map_err(|e| PipelineError::Join(e.to_string()))?;

            match result {
                Ok((seq, color)) => {
                    if i > 0 {
                        warn!(seq, skipped = i, "leading frames unreadable, detected on a later frame");
                    }
                    info!(seq, color = %color, detector = self.detector.name(), "background detected");
                    return Ok((color, ColorSource::Detected { seq }));
                }
                Err(e) => {
                    warn!(error = %e, "cannot decode frame for detection, trying next");
                }
            }
        }

        warn!(color = %FALLBACK_COLOR, "no decodable frame for detection, using fallback colour");
        Ok((FALLBACK_COLOR, ColorSource::Fallback))
    }

    /// Key every frame. Nothing is returned until all frames are done; on
    /// cancellation in-flight work is discarded and no frames are returned.
    pub async fn run(
        &self,
        frames: &[EncodedFrame],
        request: &KeyRequest,
        cancel: &CancellationToken,
    ) -> Result<BatchReport, PipelineError> {
        if frames.is_empty() {
            return Err(PipelineError::EmptySequence);
        }
        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        let (background, source) = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(PipelineError::Cancelled),
            resolved = self.resolve_target(frames, request.target) => resolved?,
        };
        let max_distance = self.policy.max_distance(request.threshold);
        info!(
            frames = frames.len(),
            color = %background,
            threshold = request.threshold.get(),
            max_distance,
            "keying clip"
        );

        let handles: Vec<_> = frames
            .iter()
            .cloned()
            .map(|encoded| {
                let cancel = cancel.clone();
                let on_frame = self.on_frame.clone();
                let frame_size = self.frame_size;
                tokio::task::spawn_blocking(move || {
                    let processed = key_frame(encoded, background, max_distance, frame_size, &cancel);
                    if let Some(callback) = &on_frame {
                        callback(&processed);
                    }
                    processed
                })
            })
            .collect();

        let results = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(PipelineError::Cancelled),
            results = join_all(handles) => results,
        };
        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        let mut processed = Vec::with_capacity(results.len());
        for result in results {
            processed.push(result.map_err(|e| PipelineError::Join(e.to_string()))?);
        }

        Ok(self.summarize(processed, background, source, max_distance))
    }

    fn summarize(
        &self,
        frames: Vec<ProcessedFrame>,
        background: Rgb,
        source: ColorSource,
        max_distance: f64,
    ) -> BatchReport {
        let mut transparent = 0;
        let mut total = 0;
        let mut passthrough = Vec::new();
        for frame in &frames {
            match &frame.status {
                FrameStatus::Keyed {
                    transparent: t,
                    total: n,
                } => {
                    transparent += t;
                    total += n;
                }
                FrameStatus::Passthrough { .. } => passthrough.push(frame.seq),
            }
        }

        let mut diagnostics = Vec::new();
        if !passthrough.is_empty() {
            warn!(count = passthrough.len(), seqs = ?passthrough, "frames passed through unkeyed");
            diagnostics.push(Diagnostic::PassthroughFrames { seqs: passthrough });
        }
        if total > 0 {
            let ratio = transparent as f64 / total as f64;
            if ratio < self.low_confidence_ratio {
                warn!(
                    ratio = format!("{:.3}", ratio),
                    min_ratio = self.low_confidence_ratio,
                    color = %background,
                    "little of the clip went transparent; consider picking the colour manually"
                );
                diagnostics.push(Diagnostic::LowConfidence {
                    ratio,
                    min_ratio: self.low_confidence_ratio,
                });
            }
        }

        info!(
            frames = frames.len(),
            transparent,
            total,
            "clip keyed"
        );

        BatchReport {
            frames,
            background,
            source,
            max_distance,
            transparent,
            total,
            diagnostics,
        }
    }
}

fn normalize(frame: Frame, frame_size: Option<(u32, u32)>) -> Frame {
    match frame_size {
        Some((width, height)) => frame.resized(width, height),
        None => frame,
    }
}

/// Decode, resize, key and re-encode one frame. Any failure hands back the
/// original bytes instead.
fn key_frame(
    encoded: EncodedFrame,
    target: Rgb,
    max_distance: f64,
    frame_size: Option<(u32, u32)>,
    cancel: &CancellationToken,
) -> ProcessedFrame {
    let passthrough = |encoded: EncodedFrame, reason: String| ProcessedFrame {
        seq: encoded.seq,
        data: encoded.data,
        status: FrameStatus::Passthrough { reason },
    };

    if cancel.is_cancelled() {
        return passthrough(encoded, "cancelled".into());
    }

    let mut frame = match encoded.decode() {
        Ok(f) => normalize(f, frame_size),
        Err(e) => {
            warn!(seq = encoded.seq, error = %e, "failed to decode frame, passing through");
            return passthrough(encoded, e.to_string());
        }
    };

    let stats = chroma::apply_in_place(&mut frame.image, target, max_distance);
    match frame.encode_png() {
        Ok(out) => {
            debug!(
                seq = encoded.seq,
                keyed = stats.keyed,
                transparent = stats.transparent,
                total = stats.total,
                "frame keyed"
            );
            ProcessedFrame {
                seq: out.seq,
                data: out.data,
                status: FrameStatus::Keyed {
                    transparent: stats.transparent,
                    total: stats.total,
                },
            }
        }
        Err(e) => {
            warn!(seq = encoded.seq, error = %e, "failed to encode keyed frame, passing through");
            passthrough(encoded, e.to_string())
        }
    }
}
