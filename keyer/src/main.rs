use frame_key::chroma::Threshold;
use frame_key::export;
use frame_key::pipeline::{Diagnostic, FrameCallback, KeyPipeline, KeyRequest, ProcessedFrame};
use frame_key::source;
use frame_key_common::config::Config;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    let config = match Config::load(&config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {e}", config_path.display());
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.parse().unwrap_or_default()),
        )
        .init();

    info!(
        frames_dir = %config.input.frames_dir.display(),
        width = config.input.width,
        height = config.input.height,
        max_frames = config.input.max_frames,
        threshold = config.chroma.threshold,
        target = ?config.chroma.target,
        base_distance = config.chroma.base_distance,
        scale_range = config.chroma.scale_range,
        output_dir = %config.export.output_dir.display(),
        "starting frame-key"
    );

    let frames = match source::load_frames(&config.input.frames_dir, config.input.max_frames).await {
        Ok(f) => f,
        Err(e) => {
            error!(error = %e, "failed to load frames");
            std::process::exit(1);
        }
    };

    // Ctrl-C abandons the batch without writing partial output.
    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling");
            on_signal.cancel();
        }
    });

    let started_ms = chrono::Utc::now().timestamp_millis();
    let total = frames.len();
    let done = Arc::new(AtomicUsize::new(0));
    let progress: FrameCallback = Arc::new(move |frame: &ProcessedFrame| {
        let n = done.fetch_add(1, Ordering::Relaxed) + 1;
        if n % 10 == 0 || n == total {
            info!(done = n, total, last_seq = frame.seq, "keying progress");
        }
    });
    let pipeline = KeyPipeline::from_config(&config).with_frame_callback(progress);
    let request = KeyRequest {
        target: config.chroma.target,
        threshold: Threshold::new(config.chroma.threshold),
    };

    let report = match pipeline.run(&frames, &request, &cancel).await {
        Ok(r) => r,
        Err(e) => {
            error!(error = %e, "keying failed");
            std::process::exit(1);
        }
    };

    for diagnostic in &report.diagnostics {
        match diagnostic {
            Diagnostic::LowConfidence { ratio, min_ratio } => warn!(
                ratio = format!("{:.3}", ratio),
                min_ratio,
                color = %report.background,
                "low confidence: set chroma.target to the background colour by hand"
            ),
            Diagnostic::PassthroughFrames { seqs } => {
                warn!(count = seqs.len(), "some frames were exported unkeyed")
            }
        }
    }

    match export::export_report(&report, &config.export, started_ms).await {
        Ok(summary) => info!(
            color = %report.background,
            source = ?report.source,
            transparent_ratio = format!("{:.3}", report.transparent_ratio()),
            frames_written = summary.frames_written,
            gif = ?summary.gif_path,
            gif_bytes = summary.gif_bytes,
            over_budget = summary.gif_over_budget,
            "done"
        ),
        Err(e) => {
            error!(error = %e, "export failed");
            std::process::exit(1);
        }
    }
}
