use frame_key_common::color::Rgb;
use frame_key_common::frame::Frame;

/// Background colour estimator run once per clip.
///
/// Implementations must be pure: the same frame always yields the same
/// colour, and every input (including an empty frame) yields some colour.
pub trait BackgroundDetector: Send + Sync {
    fn detect(&self, frame: &Frame) -> Rgb;

    /// Human-readable name for logging.
    fn name(&self) -> &str {
        "unnamed"
    }
}
