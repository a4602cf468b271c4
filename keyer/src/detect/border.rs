use frame_key_common::color::Rgb;
use image::RgbaImage;

use super::bucket::ColorHistogram;

/// Add every pixel of a `band`-wide ring around the image edge to `hist`.
///
/// Top and bottom strips span the full width; left and right strips only
/// cover the rows between them, so each pixel is counted once. The band is
/// clamped so opposite strips never overlap.
pub fn sample_border(image: &RgbaImage, band: u32, hist: &mut ColorHistogram) {
    let (w, h) = image.dimensions();
    if w == 0 || h == 0 || band == 0 {
        return;
    }
    let bv = band.min(h.div_ceil(2));
    let bh = band.min(w.div_ceil(2));
    let bottom_start = (h - bv).max(bv);
    let right_start = (w - bh).max(bh);

    for y in (0..bv).chain(bottom_start..h) {
        for x in 0..w {
            hist.add(Rgb::from(*image.get_pixel(x, y)));
        }
    }
    for y in bv..bottom_start {
        for x in (0..bh).chain(right_start..w) {
            hist.add(Rgb::from(*image.get_pixel(x, y)));
        }
    }
}

/// Add the four `size`×`size` corner squares to `hist`. Squares that would
/// overlap on a small image are clamped, not double counted.
pub fn sample_corners(image: &RgbaImage, size: u32, hist: &mut ColorHistogram) {
    let (w, h) = image.dimensions();
    if w == 0 || h == 0 || size == 0 {
        return;
    }
    let cw = size.min(w.div_ceil(2));
    let ch = size.min(h.div_ceil(2));
    let right_start = (w - cw).max(cw);
    let bottom_start = (h - ch).max(ch);

    for y in (0..ch).chain(bottom_start..h) {
        for x in (0..cw).chain(right_start..w) {
            hist.add(Rgb::from(*image.get_pixel(x, y)));
        }
    }
}
