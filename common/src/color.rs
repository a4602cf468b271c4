use serde::{Deserialize, Deserializer};
use std::fmt;
use std::str::FromStr;

/// Largest possible Euclidean distance between two 8-bit RGB colours
/// (`sqrt(3 * 255^2)`).
pub const MAX_RGB_DISTANCE: f64 = 441.672_955_930_063_7;

/// An opaque RGB colour, one byte per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const GREEN: Rgb = Rgb::new(0, 255, 0);
    pub const BLUE: Rgb = Rgb::new(0, 0, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Squared Euclidean distance in RGB space. Exact, no rounding.
    pub fn distance_sq(&self, other: &Rgb) -> u32 {
        let dr = self.r as i32 - other.r as i32;
        let dg = self.g as i32 - other.g as i32;
        let db = self.b as i32 - other.b as i32;
        (dr * dr + dg * dg + db * db) as u32
    }

    /// Euclidean distance in RGB space, in `[0, MAX_RGB_DISTANCE]`.
    pub fn distance(&self, other: &Rgb) -> f64 {
        (self.distance_sq(other) as f64).sqrt()
    }

    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl From<[u8; 3]> for Rgb {
    fn from(c: [u8; 3]) -> Self {
        Self::new(c[0], c[1], c[2])
    }
}

impl From<image::Rgba<u8>> for Rgb {
    fn from(p: image::Rgba<u8>) -> Self {
        Self::new(p.0[0], p.0[1], p.0[2])
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ColorParseError {
    #[error("invalid hex colour {0:?}: expected #rrggbb")]
    Hex(String),
    #[error("invalid colour triple {0:?}: expected r,g,b with each channel in 0..=255")]
    Triple(String),
}

/// Accepts `#rrggbb`, `rrggbb` or `r,g,b`.
impl FromStr for Rgb {
    type Err = ColorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.contains(',') {
            let parts: Vec<&str> = s.split(',').map(str::trim).collect();
            if parts.len() != 3 {
                return Err(ColorParseError::Triple(s.to_string()));
            }
            let mut channels = [0u8; 3];
            for (slot, part) in channels.iter_mut().zip(&parts) {
                *slot = part
                    .parse()
                    .map_err(|_| ColorParseError::Triple(s.to_string()))?;
            }
            return Ok(channels.into());
        }

        let hex = s.strip_prefix('#').unwrap_or(s);
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(ColorParseError::Hex(s.to_string()));
        }
        let channel = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| ColorParseError::Hex(s.to_string()))
        };
        Ok(Rgb::new(channel(0)?, channel(2)?, channel(4)?))
    }
}

impl<'de> Deserialize<'de> for Rgb {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_extremes() {
        let black = Rgb::new(0, 0, 0);
        let white = Rgb::new(255, 255, 255);
        assert_eq!(black.distance(&black), 0.0);
        assert!((black.distance(&white) - MAX_RGB_DISTANCE).abs() < 1e-9);
    }

    #[test]
    fn distance_is_symmetric() {
        let a = Rgb::new(12, 200, 40);
        let b = Rgb::new(90, 10, 255);
        assert_eq!(a.distance_sq(&b), b.distance_sq(&a));
    }

    #[test]
    fn parse_hex() {
        assert_eq!("#00ff00".parse::<Rgb>().unwrap(), Rgb::GREEN);
        assert_eq!("0000FF".parse::<Rgb>().unwrap(), Rgb::BLUE);
        assert!("#00ff0".parse::<Rgb>().is_err());
        assert!("#zzzzzz".parse::<Rgb>().is_err());
    }

    #[test]
    fn parse_triple() {
        assert_eq!(" 0, 255 ,0".parse::<Rgb>().unwrap(), Rgb::GREEN);
        assert!("0,256,0".parse::<Rgb>().is_err());
        assert!("1,2".parse::<Rgb>().is_err());
    }

    #[test]
    fn hex_display() {
        assert_eq!(Rgb::new(1, 2, 255).to_string(), "#0102ff");
    }
}
