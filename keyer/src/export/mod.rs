pub mod gif;
pub mod keys;

use frame_key_common::config::ExportConfig;
use frame_key_common::frame::EncodedFrame;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::pipeline::{BatchReport, ProcessedFrame};

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("fps must be greater than zero")]
    InvalidFps,
    #[error("no decodable frames to export")]
    NoFrames,
    #[error("GIF encoding failed: {0}")]
    Gif(String),
    #[error("failed to write {0}: {1}")]
    Write(String, std::io::Error),
}

#[derive(Debug, Clone, Default)]
pub struct ExportSummary {
    pub frames_dir: Option<PathBuf>,
    pub frames_written: usize,
    pub gif_path: Option<PathBuf>,
    pub gif_bytes: usize,
    pub gif_over_budget: bool,
}

async fn write_file(path: &Path, data: &[u8]) -> Result<(), ExportError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| ExportError::Write(parent.display().to_string(), e))?;
    }
    tokio::fs::write(path, data)
        .await
        .map_err(|e| ExportError::Write(path.display().to_string(), e))
}

/// Write every frame as `frame_NNNNNN.png` under `dir`. Passthrough frames
/// are re-encoded to PNG; ones that cannot be decoded are skipped.
pub async fn write_png_sequence(dir: &Path, frames: &[ProcessedFrame]) -> Result<usize, ExportError> {
    let mut written = 0;
    for frame in frames {
        let png = if frame.is_passthrough() {
            match EncodedFrame::new(frame.seq, frame.data.clone())
                .decode()
                .and_then(|f| f.encode_png())
            {
                Ok(encoded) => encoded.data,
                Err(e) => {
                    warn!(seq = frame.seq, error = %e, "skipping unreadable passthrough frame");
                    continue;
                }
            }
        } else {
            frame.data.clone()
        };
        write_file(&dir.join(keys::frame_file_name(frame.seq)), &png).await?;
        written += 1;
    }
    Ok(written)
}

/// Write the PNG sequence and/or GIF for a keyed clip under
/// `config.output_dir`, named after `started_ms`.
pub async fn export_report(
    report: &BatchReport,
    config: &ExportConfig,
    started_ms: i64,
) -> Result<ExportSummary, ExportError> {
    let mut summary = ExportSummary::default();

    if config.write_png {
        let dir = config.output_dir.join(keys::frames_dir_key(started_ms));
        summary.frames_written = write_png_sequence(&dir, &report.frames).await?;
        info!(dir = %dir.display(), frames = summary.frames_written, "PNG sequence written");
        summary.frames_dir = Some(dir);
    }

    if config.write_gif {
        let frames = report.frames.clone();
        let (fps, max_bytes) = (config.fps, config.max_bytes);
        let encoded = tokio::task::spawn_blocking(move || gif::encode_gif(&frames, fps, max_bytes))
            .await
            .map_err(|e| ExportError::Gif(e.to_string()))??;
        let path = config.output_dir.join(keys::gif_key(started_ms));
        write_file(&path, &encoded.bytes).await?;
        info!(path = %path.display(), bytes = encoded.bytes.len(), "GIF written");
        summary.gif_bytes = encoded.bytes.len();
        summary.gif_over_budget = encoded.over_budget;
        summary.gif_path = Some(path);
    }

    Ok(summary)
}
