use frame_key_common::frame::EncodedFrame;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const FRAME_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("failed to read frame directory {0}: {1}")]
    ReadDir(String, std::io::Error),
}

fn is_frame_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| FRAME_EXTENSIONS.iter().any(|x| e.eq_ignore_ascii_case(x)))
}

/// Sort key that orders `frame_2.png` before `frame_10.png`: the stem's
/// non-digit prefix, then its trailing number, then the full name.
fn frame_order_key(path: &Path) -> (String, Option<u64>, String) {
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
    let prefix = stem.trim_end_matches(|c: char| c.is_ascii_digit());
    let number = stem[prefix.len()..].parse().ok();
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    (prefix.to_string(), number, name)
}

/// Load up to `max_frames` frame images from `dir`, in natural file-name
/// order. Sequence numbers follow that order. Unreadable files are skipped
/// with a warning and do not count toward the cap.
pub async fn load_frames(dir: &Path, max_frames: usize) -> Result<Vec<EncodedFrame>, SourceError> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| SourceError::ReadDir(dir.display().to_string(), e))?;

    let mut paths: Vec<PathBuf> = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| SourceError::ReadDir(dir.display().to_string(), e))?
    {
        let path = entry.path();
        if is_frame_file(&path) {
            paths.push(path);
        } else {
            debug!(path = %path.display(), "ignoring non-frame file");
        }
    }
    paths.sort_by_cached_key(|p| frame_order_key(p));

    let mut frames = Vec::with_capacity(paths.len().min(max_frames));
    for (i, path) in paths.iter().enumerate() {
        if frames.len() == max_frames {
            warn!(
                dir = %dir.display(),
                max_frames,
                dropped = paths.len() - i,
                "clip has more frames than the cap, truncating"
            );
            break;
        }
        match tokio::fs::read(path).await {
            Ok(data) => frames.push(EncodedFrame::new(frames.len() as u64, data)),
            Err(e) => warn!(path = %path.display(), error = %e, "failed to read frame file, skipping"),
        }
    }

    info!(dir = %dir.display(), frames = frames.len(), "frames loaded");
    Ok(frames)
}
