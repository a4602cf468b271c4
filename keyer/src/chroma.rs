use frame_key_common::color::Rgb;
use frame_key_common::config::ChromaConfig;
use frame_key_common::frame::Frame;
use image::RgbaImage;

/// User-facing keying tolerance, 0 (tightest) to 100 (loosest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Threshold(u8);

impl Threshold {
    pub const MAX: Threshold = Threshold(100);

    /// Values above 100 are clamped.
    pub fn new(value: u8) -> Self {
        Self(value.min(100))
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl Default for Threshold {
    fn default() -> Self {
        Self(30)
    }
}

/// Maps a [`Threshold`] to a maximum RGB distance:
/// `base_distance + threshold / 100 * scale_range`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChromaPolicy {
    pub base_distance: f64,
    pub scale_range: f64,
}

impl Default for ChromaPolicy {
    fn default() -> Self {
        Self {
            base_distance: 50.0,
            scale_range: 200.0,
        }
    }
}

impl From<&ChromaConfig> for ChromaPolicy {
    fn from(cfg: &ChromaConfig) -> Self {
        Self {
            base_distance: cfg.base_distance,
            scale_range: cfg.scale_range,
        }
    }
}

impl ChromaPolicy {
    pub fn max_distance(&self, threshold: Threshold) -> f64 {
        self.base_distance + (threshold.get() as f64 / 100.0) * self.scale_range
    }
}

/// A frame with the background keyed out, plus how much of it went transparent.
#[derive(Debug, Clone)]
pub struct KeyedFrame {
    pub frame: Frame,
    /// Pixels this pass set to alpha 0.
    pub keyed: u64,
    /// Pixels with alpha 0 after the pass, including ones that already were.
    pub transparent: u64,
    pub total: u64,
}

impl KeyedFrame {
    pub fn transparent_ratio(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.transparent as f64 / self.total as f64
    }

    /// True when less than `min_ratio` of the frame came out transparent,
    /// which usually means the wrong colour was keyed.
    pub fn is_low_confidence(&self, min_ratio: f64) -> bool {
        self.transparent_ratio() < min_ratio
    }
}

/// Counts returned by [`apply_in_place`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyStats {
    pub keyed: u64,
    pub transparent: u64,
    pub total: u64,
}

/// Set alpha to 0 on every pixel within `max_distance` of `target`. Pixels
/// outside the distance are left untouched, alpha included.
pub fn apply_in_place(image: &mut RgbaImage, target: Rgb, max_distance: f64) -> KeyStats {
    // Compare squared distances; a negative limit keys nothing.
    let limit_sq = if max_distance < 0.0 {
        -1.0
    } else {
        max_distance * max_distance
    };
    let mut stats = KeyStats {
        keyed: 0,
        transparent: 0,
        total: 0,
    };
    for px in image.pixels_mut() {
        stats.total += 1;
        let d = Rgb::new(px.0[0], px.0[1], px.0[2]).distance_sq(&target) as f64;
        if d <= limit_sq && px.0[3] != 0 {
            px.0[3] = 0;
            stats.keyed += 1;
        }
        if px.0[3] == 0 {
            stats.transparent += 1;
        }
    }
    stats
}

/// Key a copy of `frame`. The input is never touched.
pub fn apply(frame: &Frame, target: Rgb, threshold: Threshold, policy: &ChromaPolicy) -> KeyedFrame {
    let mut out = frame.clone();
    let stats = apply_in_place(&mut out.image, target, policy.max_distance(threshold));
    KeyedFrame {
        frame: out,
        keyed: stats.keyed,
        transparent: stats.transparent,
        total: stats.total,
    }
}
