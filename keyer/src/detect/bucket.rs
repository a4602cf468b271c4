use frame_key_common::color::Rgb;
use std::collections::BTreeMap;

/// Round one channel to the nearest multiple of `step`, clamped to 255.
pub fn quantize_channel(value: u8, step: u8) -> u8 {
    let step = step.max(1) as u32;
    let rounded = (value as u32 + step / 2) / step * step;
    rounded.min(255) as u8
}

pub fn quantize(color: Rgb, step: u8) -> Rgb {
    Rgb::new(
        quantize_channel(color.r, step),
        quantize_channel(color.g, step),
        quantize_channel(color.b, step),
    )
}

/// Occurrence counts of quantized colours for one detection pass.
///
/// Backed by a `BTreeMap` so iteration order, and therefore tie-breaking,
/// does not depend on hashing.
pub struct ColorHistogram {
    step: u8,
    buckets: BTreeMap<Rgb, u64>,
    samples: u64,
}

impl ColorHistogram {
    pub fn new(step: u8) -> Self {
        Self {
            step: step.max(1),
            buckets: BTreeMap::new(),
            samples: 0,
        }
    }

    pub fn add(&mut self, color: Rgb) {
        *self.buckets.entry(quantize(color, self.step)).or_insert(0) += 1;
        self.samples += 1;
    }

    /// Total pixels added, including repeats.
    pub fn samples(&self) -> u64 {
        self.samples
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Highest-count bucket. Ties go to the smallest key.
    pub fn dominant(&self) -> Option<(Rgb, u64)> {
        self.dominant_where(|_| true)
    }

    /// Highest-count bucket among those matching `pred`.
    pub fn dominant_where<F>(&self, pred: F) -> Option<(Rgb, u64)>
    where
        F: Fn(&Rgb) -> bool,
    {
        let mut best: Option<(Rgb, u64)> = None;
        for (&color, &count) in self.buckets.iter().filter(|&(c, _)| pred(c)) {
            match best {
                Some((_, best_count)) if count <= best_count => {}
                _ => best = Some((color, count)),
            }
        }
        best
    }

    pub fn total_where<F>(&self, pred: F) -> u64
    where
        F: Fn(&Rgb) -> bool,
    {
        self.buckets
            .iter()
            .filter(|&(c, _)| pred(c))
            .map(|(_, &n)| n)
            .sum()
    }
}
