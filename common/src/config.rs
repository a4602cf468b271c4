use serde::{Deserialize, Deserializer};
use std::path::{Path, PathBuf};

use crate::color::Rgb;
use crate::frame::DEFAULT_FRAME_SIZE;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub input: InputConfig,
    #[serde(default)]
    pub chroma: ChromaConfig,
    #[serde(default)]
    pub detection: DetectionConfig,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InputConfig {
    pub frames_dir: PathBuf,
    /// Every frame is resized to this size before detection and keying.
    #[serde(default = "default_frame_size")]
    pub width: u32,
    #[serde(default = "default_frame_size")]
    pub height: u32,
    /// Longer clips are truncated to this many frames.
    #[serde(default = "default_max_frames")]
    pub max_frames: usize,
}

/// Which colour to key out of the clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TargetColor {
    /// Detect from the border of the first frame.
    #[default]
    Auto,
    Manual(Rgb),
}

impl<'de> Deserialize<'de> for TargetColor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        if s.trim().eq_ignore_ascii_case("auto") {
            return Ok(TargetColor::Auto);
        }
        s.parse()
            .map(TargetColor::Manual)
            .map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChromaConfig {
    /// Distance keyed out even at threshold 0.
    #[serde(default = "default_base_distance")]
    pub base_distance: f64,
    /// Extra distance added at threshold 100.
    #[serde(default = "default_scale_range")]
    pub scale_range: f64,
    #[serde(default = "default_threshold")]
    pub threshold: u8,
    #[serde(default)]
    pub target: TargetColor,
    #[serde(default = "default_low_confidence_ratio")]
    pub low_confidence_ratio: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DetectionConfig {
    #[serde(default = "default_border_width")]
    pub border_width: u32,
    #[serde(default = "default_quantization_step")]
    pub quantization_step: u8,
    #[serde(default = "default_min_support_floor")]
    pub min_support_floor: u64,
    #[serde(default = "default_min_support_ratio")]
    pub min_support_ratio: f64,
    #[serde(default = "default_hue_min_support_ratio")]
    pub hue_min_support_ratio: f64,
    #[serde(default = "default_hue_high")]
    pub hue_high: u8,
    #[serde(default = "default_hue_low")]
    pub hue_low: u8,
    #[serde(default)]
    pub sample_corners: bool,
    #[serde(default = "default_corner_size")]
    pub corner_size: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExportConfig {
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_fps")]
    pub fps: u32,
    #[serde(default = "default_max_bytes")]
    pub max_bytes: u64,
    #[serde(default = "default_true")]
    pub write_png: bool,
    #[serde(default = "default_true")]
    pub write_gif: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for ChromaConfig {
    fn default() -> Self {
        Self {
            base_distance: default_base_distance(),
            scale_range: default_scale_range(),
            threshold: default_threshold(),
            target: TargetColor::Auto,
            low_confidence_ratio: default_low_confidence_ratio(),
        }
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            border_width: default_border_width(),
            quantization_step: default_quantization_step(),
            min_support_floor: default_min_support_floor(),
            min_support_ratio: default_min_support_ratio(),
            hue_min_support_ratio: default_hue_min_support_ratio(),
            hue_high: default_hue_high(),
            hue_low: default_hue_low(),
            sample_corners: false,
            corner_size: default_corner_size(),
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            fps: default_fps(),
            max_bytes: default_max_bytes(),
            write_png: true,
            write_gif: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadFile(path.display().to_string(), e))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.input.width == 0 || self.input.height == 0 {
            return Err(ConfigError::Invalid("input.width and input.height must be > 0".into()));
        }
        if self.input.max_frames == 0 {
            return Err(ConfigError::Invalid("input.max_frames must be > 0".into()));
        }
        if self.detection.quantization_step == 0 {
            return Err(ConfigError::Invalid("detection.quantization_step must be > 0".into()));
        }
        if self.export.fps == 0 {
            return Err(ConfigError::Invalid("export.fps must be > 0".into()));
        }
        // NaN fails both comparisons, so check finiteness explicitly
        for (name, value) in [
            ("chroma.base_distance", self.chroma.base_distance),
            ("chroma.scale_range", self.chroma.scale_range),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be a finite non-negative number, got {value}"
                )));
            }
        }
        if self.chroma.threshold > 100 {
            return Err(ConfigError::Invalid("chroma.threshold must be within 0..=100".into()));
        }
        for (name, value) in [
            ("chroma.low_confidence_ratio", self.chroma.low_confidence_ratio),
            ("detection.min_support_ratio", self.detection.min_support_ratio),
            ("detection.hue_min_support_ratio", self.detection.hue_min_support_ratio),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Invalid(format!("{name} must be within 0..=1, got {value}")));
            }
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {0}: {1}")]
    ReadFile(String, std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(String),
    #[error("invalid config: {0}")]
    Invalid(String),
}

// Default value functions
fn default_frame_size() -> u32 {
    DEFAULT_FRAME_SIZE
}
fn default_max_frames() -> usize {
    120
}
fn default_base_distance() -> f64 {
    50.0
}
fn default_scale_range() -> f64 {
    200.0
}
fn default_threshold() -> u8 {
    30
}
fn default_low_confidence_ratio() -> f64 {
    0.10
}
fn default_border_width() -> u32 {
    10
}
fn default_quantization_step() -> u8 {
    20
}
fn default_min_support_floor() -> u64 {
    3
}
fn default_min_support_ratio() -> f64 {
    0.05
}
fn default_hue_min_support_ratio() -> f64 {
    0.10
}
fn default_hue_high() -> u8 {
    180
}
fn default_hue_low() -> u8 {
    80
}
fn default_corner_size() -> u32 {
    20
}
fn default_output_dir() -> PathBuf {
    "keyed".into()
}
fn default_fps() -> u32 {
    12
}
fn default_max_bytes() -> u64 {
    500 * 1024
}
fn default_true() -> bool {
    true
}
fn default_log_level() -> String {
    "info".into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_uses_defaults() {
        let config = Config::from_toml("[input]\nframes_dir = \"clip\"\n").unwrap();
        assert_eq!(config.input.frames_dir, PathBuf::from("clip"));
        assert_eq!((config.input.width, config.input.height), (240, 240));
        assert_eq!(config.input.max_frames, 120);
        assert_eq!(config.chroma.base_distance, 50.0);
        assert_eq!(config.chroma.scale_range, 200.0);
        assert_eq!(config.chroma.threshold, 30);
        assert_eq!(config.chroma.target, TargetColor::Auto);
        assert_eq!(config.detection.quantization_step, 20);
        assert!(!config.detection.sample_corners);
        assert_eq!(config.export.fps, 12);
        assert_eq!(config.export.max_bytes, 512_000);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn manual_target_colour() {
        let toml = r##"
            [input]
            frames_dir = "clip"
            [chroma]
            target = "#0000ff"
            threshold = 55
        "##;
        let config = Config::from_toml(toml).unwrap();
        assert_eq!(config.chroma.target, TargetColor::Manual(Rgb::BLUE));
        assert_eq!(config.chroma.threshold, 55);
    }

    #[test]
    fn bad_target_is_parse_error() {
        let toml = "[input]\nframes_dir = \"x\"\n[chroma]\ntarget = \"greenish\"\n";
        assert!(matches!(Config::from_toml(toml), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn zero_quantization_step_rejected() {
        let toml = "[input]\nframes_dir = \"x\"\n[detection]\nquantization_step = 0\n";
        assert!(matches!(Config::from_toml(toml), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn threshold_out_of_range_rejected() {
        let toml = "[input]\nframes_dir = \"x\"\n[chroma]\nthreshold = 101\n";
        assert!(matches!(Config::from_toml(toml), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn frame_size_and_cap() {
        let toml = "[input]\nframes_dir = \"x\"\nwidth = 320\nheight = 180\nmax_frames = 48\n";
        let config = Config::from_toml(toml).unwrap();
        assert_eq!((config.input.width, config.input.height), (320, 180));
        assert_eq!(config.input.max_frames, 48);

        for bad in ["width = 0", "height = 0", "max_frames = 0"] {
            let toml = format!("[input]\nframes_dir = \"x\"\n{bad}\n");
            assert!(
                matches!(Config::from_toml(&toml), Err(ConfigError::Invalid(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn non_finite_distances_rejected() {
        for bad in ["base_distance = nan", "scale_range = inf", "base_distance = -1.0"] {
            let toml = format!("[input]\nframes_dir = \"x\"\n[chroma]\n{bad}\n");
            assert!(
                matches!(Config::from_toml(&toml), Err(ConfigError::Invalid(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn ratios_must_be_fractions() {
        for (section, bad) in [
            ("chroma", "low_confidence_ratio = 1.5"),
            ("chroma", "low_confidence_ratio = nan"),
            ("detection", "min_support_ratio = -0.1"),
            ("detection", "hue_min_support_ratio = 2.0"),
        ] {
            let toml = format!("[input]\nframes_dir = \"x\"\n[{section}]\n{bad}\n");
            assert!(
                matches!(Config::from_toml(&toml), Err(ConfigError::Invalid(_))),
                "{section}.{bad} should be rejected"
            );
        }

        // the edges are allowed; a zero ratio leaves only the absolute floor
        let toml = "[input]\nframes_dir = \"x\"\n[detection]\nmin_support_ratio = 0.0\nhue_min_support_ratio = 1.0\n";
        assert!(Config::from_toml(toml).is_ok());
    }

    #[test]
    fn missing_file() {
        let err = Config::load(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::ReadFile(..)));
    }
}
