use frame_key_common::color::Rgb;
use frame_key_common::frame::Frame;

/// Colour under a single pixel, or `None` outside the frame.
pub fn pick_color(frame: &Frame, x: u32, y: u32) -> Option<Rgb> {
    frame.image.get_pixel_checked(x, y).map(|p| Rgb::from(*p))
}

/// Mean colour of the `(2 * radius + 1)`² square around `(x, y)`, clipped to
/// the frame. Smooths out sensor noise when picking from a touch position.
pub fn pick_color_averaged(frame: &Frame, x: u32, y: u32, radius: u32) -> Option<Rgb> {
    let (w, h) = frame.image.dimensions();
    if x >= w || y >= h {
        return None;
    }
    let x0 = x.saturating_sub(radius);
    let y0 = y.saturating_sub(radius);
    let x1 = x.saturating_add(radius).min(w - 1);
    let y1 = y.saturating_add(radius).min(h - 1);

    let mut sum = [0u64; 3];
    let mut n = 0u64;
    for py in y0..=y1 {
        for px in x0..=x1 {
            let p = frame.image.get_pixel(px, py).0;
            sum[0] += p[0] as u64;
            sum[1] += p[1] as u64;
            sum[2] += p[2] as u64;
            n += 1;
        }
    }
    let mean = |s: u64| ((s + n / 2) / n) as u8;
    Some(Rgb::new(mean(sum[0]), mean(sum[1]), mean(sum[2])))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn pick_inside_and_outside() {
        let mut frame = Frame::solid(0, 10, 10, [0, 255, 0]);
        frame.image.put_pixel(3, 4, Rgba([9, 8, 7, 255]));
        assert_eq!(pick_color(&frame, 3, 4), Some(Rgb::new(9, 8, 7)));
        assert_eq!(pick_color(&frame, 0, 0), Some(Rgb::GREEN));
        assert_eq!(pick_color(&frame, 10, 0), None);
    }

    #[test]
    fn averaged_pick_smooths_outlier() {
        let mut frame = Frame::solid(0, 10, 10, [0, 250, 0]);
        frame.image.put_pixel(5, 5, Rgba([90, 250, 90, 255]));
        // 9 pixels, one outlier: 90 / 9 = 10
        assert_eq!(pick_color_averaged(&frame, 5, 5, 1), Some(Rgb::new(10, 250, 10)));
    }

    #[test]
    fn averaged_pick_clips_at_corner() {
        let frame = Frame::solid(0, 4, 4, [20, 40, 60]);
        assert_eq!(pick_color_averaged(&frame, 0, 0, 5), Some(Rgb::new(20, 40, 60)));
        assert_eq!(pick_color_averaged(&frame, 4, 0, 1), None);
    }
}
