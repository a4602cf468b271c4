pub mod border;
pub mod bucket;
pub mod traits;

use frame_key_common::color::Rgb;
use frame_key_common::config::DetectionConfig;
use frame_key_common::frame::Frame;
use tracing::debug;

use bucket::ColorHistogram;
pub use traits::BackgroundDetector;

/// Colour returned when nothing on the border stands out.
pub const FALLBACK_COLOR: Rgb = Rgb::GREEN;

/// How a detection pass arrived at its colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionPath {
    Dominant,
    GreenBias,
    BlueBias,
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Detection {
    pub color: Rgb,
    pub path: DetectionPath,
    /// Count of the winning bucket (summed hue count for the biased paths).
    pub support: u64,
    pub samples: u64,
}

/// Border-histogram background detector.
///
/// Assumes the subject sits in the middle of the frame and the background
/// dominates the edges:
/// 1. Sample a ring of `border_width` pixels (plus the corner squares when
///    `sample_corners` is on).
/// 2. Quantize to `quantization_step` and count buckets.
/// 3. Take the top bucket if it holds enough of the samples.
/// 4. Otherwise sum distinctly green, then distinctly blue buckets, and take
///    the top bucket of the first hue with enough support.
/// 5. Otherwise pure green.
pub struct BorderDetector {
    config: DetectionConfig,
}

impl BorderDetector {
    pub fn new(config: DetectionConfig) -> Self {
        Self { config }
    }

    pub fn detect_with_details(&self, frame: &Frame) -> Detection {
        let cfg = &self.config;
        let mut hist = ColorHistogram::new(cfg.quantization_step);
        border::sample_border(&frame.image, cfg.border_width, &mut hist);
        if cfg.sample_corners {
            border::sample_corners(&frame.image, cfg.corner_size, &mut hist);
        }

        let samples = hist.samples();
        if samples == 0 {
            debug!(seq = frame.seq, "no border samples, using fallback colour");
            return Detection {
                color: FALLBACK_COLOR,
                path: DetectionPath::Fallback,
                support: 0,
                samples,
            };
        }

        let min_support = required(samples, cfg.min_support_ratio).max(cfg.min_support_floor);
        if let Some((color, count)) = hist.dominant() {
            debug!(
                seq = frame.seq,
                color = %color,
                count,
                min_support,
                buckets = hist.len(),
                "dominant border bucket"
            );
            if count >= min_support {
                return Detection {
                    color,
                    path: DetectionPath::Dominant,
                    support: count,
                    samples,
                };
            }
        }

        let hue_support = required(samples, cfg.hue_min_support_ratio).max(cfg.min_support_floor);
        let (high, low) = (cfg.hue_high, cfg.hue_low);
        let is_green = |c: &Rgb| c.g >= high && c.r <= low && c.b <= low;
        let is_blue = |c: &Rgb| c.b >= high && c.r <= low && c.g <= low;

        for (path, pred) in [
            (DetectionPath::GreenBias, &is_green as &dyn Fn(&Rgb) -> bool),
            (DetectionPath::BlueBias, &is_blue as &dyn Fn(&Rgb) -> bool),
        ] {
            let total = hist.total_where(pred);
            if total >= hue_support {
                if let Some((color, _)) = hist.dominant_where(pred) {
                    debug!(seq = frame.seq, color = %color, total, hue_support, ?path, "hue-biased match");
                    return Detection {
                        color,
                        path,
                        support: total,
                        samples,
                    };
                }
            }
        }

        debug!(seq = frame.seq, samples, "border inconclusive, using fallback colour");
        Detection {
            color: FALLBACK_COLOR,
            path: DetectionPath::Fallback,
            support: 0,
            samples,
        }
    }
}

impl BackgroundDetector for BorderDetector {
    fn detect(&self, frame: &Frame) -> Rgb {
        self.detect_with_details(frame).color
    }

    fn name(&self) -> &str {
        "border-histogram"
    }
}

fn required(samples: u64, ratio: f64) -> u64 {
    (samples as f64 * ratio).ceil() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use frame_key_common::frame::DEFAULT_FRAME_SIZE;
    use image::{Rgba, RgbaImage};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    const SIZE: u32 = DEFAULT_FRAME_SIZE;

    fn detector() -> BorderDetector {
        BorderDetector::new(DetectionConfig::default())
    }

    /// Background `bg` everywhere except a centred square of `subject`.
    fn framed(bg: [u8; 3], subject: [u8; 3], margin: u32) -> Frame {
        let mut frame = Frame::solid(0, SIZE, SIZE, bg);
        for y in margin..SIZE - margin {
            for x in margin..SIZE - margin {
                frame
                    .image
                    .put_pixel(x, y, Rgba([subject[0], subject[1], subject[2], 255]));
            }
        }
        frame
    }

    fn noise(seed: u64) -> Frame {
        let mut rng = StdRng::seed_from_u64(seed);
        let image = RgbaImage::from_fn(SIZE, SIZE, |_, _| {
            Rgba([rng.random(), rng.random(), rng.random(), 255])
        });
        Frame::new(0, image)
    }

    #[test]
    fn green_border_detected() {
        let frame = framed([0, 255, 0], [200, 40, 90], 30);
        let d = detector().detect_with_details(&frame);
        assert_eq!(d.color, Rgb::GREEN);
        assert_eq!(d.path, DetectionPath::Dominant);
        assert_eq!(d.samples, 9_200);
    }

    #[test]
    fn dominant_non_green_background() {
        let frame = framed([240, 240, 240], [10, 10, 10], 40);
        assert_eq!(detector().detect(&frame), Rgb::new(240, 240, 240));
    }

    #[test]
    fn noisy_background_quantized() {
        let mut rng = StdRng::seed_from_u64(7);
        let image = RgbaImage::from_fn(SIZE, SIZE, |_, _| {
            Rgba([rng.random_range(0..6), rng.random_range(250..=255), rng.random_range(0..6), 255])
        });
        assert_eq!(detector().detect(&Frame::new(0, image)), Rgb::GREEN);
    }

    #[test]
    fn random_noise_falls_back_to_green() {
        for seed in [1, 2, 3] {
            let d = detector().detect_with_details(&noise(seed));
            assert_eq!(d.path, DetectionPath::Fallback, "seed {seed}");
            assert_eq!(d.color, FALLBACK_COLOR);
        }
    }

    #[test]
    fn detection_is_deterministic() {
        let frame = noise(42);
        let det = detector();
        assert_eq!(det.detect(&frame), det.detect(&frame));
        let frame = framed([0, 0, 255], [255, 255, 0], 50);
        assert_eq!(det.detect(&frame), det.detect(&frame));
    }

    #[test]
    fn split_green_shades_use_hue_bias() {
        // Two shades of green alternate so neither bucket alone has support,
        // but together they clear the hue threshold.
        let cfg = DetectionConfig {
            min_support_ratio: 0.6,
            ..Default::default()
        };
        let image = RgbaImage::from_fn(SIZE, SIZE, |x, y| {
            if (x + y) % 2 == 0 {
                Rgba([0, 200, 0, 255])
            } else {
                Rgba([20, 240, 40, 255])
            }
        });
        let d = BorderDetector::new(cfg).detect_with_details(&Frame::new(0, image));
        assert_eq!(d.path, DetectionPath::GreenBias);
        assert_eq!(d.support, d.samples);
        assert!(d.color == Rgb::new(0, 200, 0) || d.color == Rgb::new(20, 240, 40));
    }

    #[test]
    fn split_blue_shades_use_hue_bias() {
        let cfg = DetectionConfig {
            min_support_ratio: 0.6,
            ..Default::default()
        };
        let image = RgbaImage::from_fn(SIZE, SIZE, |x, _| {
            if x % 2 == 0 {
                Rgba([0, 0, 255, 255])
            } else {
                Rgba([30, 60, 200, 255])
            }
        });
        let d = BorderDetector::new(cfg).detect_with_details(&Frame::new(0, image));
        assert_eq!(d.path, DetectionPath::BlueBias);
    }

    #[test]
    fn fixed_count_support() {
        // ratio 0 leaves the absolute floor as the only support requirement
        for floor in [3, 20] {
            let cfg = DetectionConfig {
                min_support_ratio: 0.0,
                hue_min_support_ratio: 0.0,
                min_support_floor: floor,
                ..Default::default()
            };
            let det = BorderDetector::new(cfg);

            let d = det.detect_with_details(&framed([0, 255, 0], [200, 40, 90], 30));
            assert_eq!((d.color, d.path), (Rgb::GREEN, DetectionPath::Dominant), "floor {floor}");
            assert_eq!(d.support, 9_200);

            let d = det.detect_with_details(&framed([240, 240, 240], [10, 10, 10], 40));
            assert_eq!(d.color, Rgb::new(240, 240, 240), "floor {floor}");
        }

        // with a floor of 20 no single noise bucket qualifies, but the green-ish
        // buckets together do
        let cfg = DetectionConfig {
            min_support_ratio: 0.0,
            hue_min_support_ratio: 0.0,
            min_support_floor: 20,
            ..Default::default()
        };
        let d = BorderDetector::new(cfg).detect_with_details(&noise(1));
        assert_eq!(d.path, DetectionPath::GreenBias);
        assert!(d.color.g >= 180 && d.color.r <= 80 && d.color.b <= 80);
    }

    #[test]
    fn corners_add_weight() {
        let cfg = DetectionConfig {
            sample_corners: true,
            ..Default::default()
        };
        let frame = framed([0, 255, 0], [255, 0, 0], 30);
        let d = BorderDetector::new(cfg).detect_with_details(&frame);
        assert_eq!(d.color, Rgb::GREEN);
        assert_eq!(d.samples, 9_200 + 4 * 20 * 20);
    }

    #[test]
    fn empty_frame_falls_back() {
        let frame = Frame::new(0, RgbaImage::new(0, 0));
        let d = detector().detect_with_details(&frame);
        assert_eq!(d.path, DetectionPath::Fallback);
        assert_eq!(d.color, FALLBACK_COLOR);
    }
}
