//! Pixel color-space conversions.
//!
//! Hue/saturation/value use the 8-bit convention the palette is tuned in:
//! hue is degrees halved (0..=180), saturation and value span 0..=255.

/// A pixel in 8-bit HSV.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Hsv {
    pub h: u8,
    pub s: u8,
    pub v: u8,
}

impl Hsv {
    pub const fn new(h: u8, s: u8, v: u8) -> Self {
        Self { h, s, v }
    }
}

/// Converts an RGB pixel to 8-bit HSV.
pub fn rgb_to_hsv(r: u8, g: u8, b: u8) -> Hsv {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let chroma = (max - min) as f32;

    let v = max;
    let s = if max == 0 {
        0
    } else {
        clamp_to_u8(chroma * 255.0 / max as f32)
    };

    if chroma == 0.0 {
        return Hsv::new(0, s, v);
    }

    let (r, g, b) = (r as f32, g as f32, b as f32);
    let mut degrees = if max as f32 == r {
        60.0 * (g - b) / chroma
    } else if max as f32 == g {
        60.0 * (b - r) / chroma + 120.0
    } else {
        60.0 * (r - g) / chroma + 240.0
    };
    if degrees < 0.0 {
        degrees += 360.0;
    }

    Hsv::new(clamp_to_u8(degrees / 2.0).min(180), s, v)
}

/// Converts an 8-bit HSV pixel back to RGB.
pub fn hsv_to_rgb(hsv: Hsv) -> [u8; 3] {
    let v = hsv.v as f32;
    let s = hsv.s as f32 / 255.0;
    let degrees = (hsv.h as f32 * 2.0) % 360.0;

    let chroma = v * s;
    let sector = degrees / 60.0;
    let x = chroma * (1.0 - ((sector % 2.0) - 1.0).abs());
    let (r, g, b) = match sector as u32 {
        0 => (chroma, x, 0.0),
        1 => (x, chroma, 0.0),
        2 => (0.0, chroma, x),
        3 => (0.0, x, chroma),
        4 => (x, 0.0, chroma),
        _ => (chroma, 0.0, x),
    };
    let m = v - chroma;
    [clamp_to_u8(r + m), clamp_to_u8(g + m), clamp_to_u8(b + m)]
}

/// Rec. 601 luma of an RGB pixel.
pub fn luminance(r: u8, g: u8, b: u8) -> u8 {
    clamp_to_u8(0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32)
}

fn clamp_to_u8(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primaries_map_to_expected_hues() {
        assert_eq!(rgb_to_hsv(255, 0, 0), Hsv::new(0, 255, 255));
        assert_eq!(rgb_to_hsv(0, 255, 0), Hsv::new(60, 255, 255));
        assert_eq!(rgb_to_hsv(0, 0, 255), Hsv::new(120, 255, 255));
        assert_eq!(rgb_to_hsv(255, 255, 0), Hsv::new(30, 255, 255));
    }

    #[test]
    fn grays_have_zero_hue_and_saturation() {
        assert_eq!(rgb_to_hsv(0, 0, 0), Hsv::new(0, 0, 0));
        assert_eq!(rgb_to_hsv(128, 128, 128), Hsv::new(0, 0, 128));
    }

    #[test]
    fn magenta_red_wraps_near_top_of_hue_range() {
        let hsv = rgb_to_hsv(255, 0, 40);
        assert!(hsv.h >= 170, "hue {} should sit in the upper red band", hsv.h);
    }

    #[test]
    fn hsv_round_trip_stays_close() {
        for hsv in [Hsv::new(5, 200, 200), Hsv::new(27, 220, 230), Hsv::new(110, 90, 180)] {
            let [r, g, b] = hsv_to_rgb(hsv);
            let back = rgb_to_hsv(r, g, b);
            assert!((back.h as i16 - hsv.h as i16).abs() <= 1, "{:?} vs {:?}", back, hsv);
            assert!((back.s as i16 - hsv.s as i16).abs() <= 2, "{:?} vs {:?}", back, hsv);
            assert!((back.v as i16 - hsv.v as i16).abs() <= 1, "{:?} vs {:?}", back, hsv);
        }
    }

    #[test]
    fn luminance_uses_rec601_weights() {
        assert_eq!(luminance(255, 255, 255), 255);
        assert_eq!(luminance(0, 0, 0), 0);
        assert_eq!(luminance(100, 0, 0), 30);
        assert_eq!(luminance(0, 100, 0), 59);
    }
}
