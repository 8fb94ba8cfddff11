//! Pixel colors and the per-tick frame buffer.

/// An 8-bit RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const BLACK: Rgb = Rgb(0, 0, 0);
    pub const WHITE: Rgb = Rgb(255, 255, 255);
    pub const RED: Rgb = Rgb(255, 0, 0);

    /// Scale every channel by `factor` (clamped to `[0, 1]`).
    pub fn scale(self, factor: f32) -> Rgb {
        let f = factor.clamp(0.0, 1.0);
        Rgb(
            (self.0 as f32 * f).round() as u8,
            (self.1 as f32 * f).round() as u8,
            (self.2 as f32 * f).round() as u8,
        )
    }

    /// Linear interpolation towards `other`; `t = 0` is `self`, `t = 1` is `other`.
    pub fn lerp(self, other: Rgb, t: f32) -> Rgb {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round() as u8;
        Rgb(mix(self.0, other.0), mix(self.1, other.1), mix(self.2, other.2))
    }

    /// Convert hue/saturation/value (all in `[0, 1]`) to RGB.
    pub fn from_hsv(hue: f32, saturation: f32, value: f32) -> Rgb {
        let h = hue.rem_euclid(1.0) * 6.0;
        let s = saturation.clamp(0.0, 1.0);
        let v = value.clamp(0.0, 1.0);
        let sector = h.floor();
        let f = h - sector;
        let p = v * (1.0 - s);
        let q = v * (1.0 - s * f);
        let t = v * (1.0 - s * (1.0 - f));
        let (r, g, b) = match sector as u8 {
            0 => (v, t, p),
            1 => (q, v, p),
            2 => (p, v, t),
            3 => (p, q, v),
            4 => (t, p, v),
            _ => (v, p, q),
        };
        Rgb(
            (r * 255.0).round() as u8,
            (g * 255.0).round() as u8,
            (b * 255.0).round() as u8,
        )
    }

    /// Parse `#rrggbb` (the leading `#` is optional).
    pub fn parse_hex(value: &str) -> Option<Rgb> {
        let hex = value.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&hex[range], 16).ok();
        Some(Rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }

    pub fn is_black(self) -> bool {
        self == Rgb::BLACK
    }
}

/// A full-grid RGB buffer, row-major with the origin at the top-left pixel.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    width: usize,
    height: usize,
    pixels: Vec<Rgb>,
}

impl Frame {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![Rgb::BLACK; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn clear(&mut self) {
        self.fill(Rgb::BLACK);
    }

    pub fn fill(&mut self, color: Rgb) {
        self.pixels.iter_mut().for_each(|p| *p = color);
    }

    /// Set a pixel using signed coordinates; writes outside the grid are dropped.
    pub fn set(&mut self, x: i32, y: i32, color: Rgb) {
        if x < 0 || y < 0 {
            return;
        }
        let (x, y) = (x as usize, y as usize);
        if x < self.width && y < self.height {
            self.pixels[y * self.width + x] = color;
        }
    }

    pub fn get(&self, x: usize, y: usize) -> Option<Rgb> {
        if x < self.width && y < self.height {
            Some(self.pixels[y * self.width + x])
        } else {
            None
        }
    }

    /// Iterate pixels as `(x, y, color)` in row-major order.
    pub fn pixels(&self) -> impl Iterator<Item = (usize, usize, Rgb)> + '_ {
        let width = self.width;
        self.pixels
            .iter()
            .enumerate()
            .map(move |(i, c)| (i % width, i / width, *c))
    }

    pub fn lit_pixel_count(&self) -> usize {
        self.pixels.iter().filter(|p| !p.is_black()).count()
    }

    pub(crate) fn as_slice(&self) -> &[Rgb] {
        &self.pixels
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [Rgb] {
        &mut self.pixels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_ignores_out_of_bounds() {
        let mut frame = Frame::new(4, 2);
        frame.set(-1, 0, Rgb::WHITE);
        frame.set(4, 1, Rgb::WHITE);
        frame.set(0, 2, Rgb::WHITE);
        assert_eq!(frame.lit_pixel_count(), 0);

        frame.set(3, 1, Rgb::RED);
        assert_eq!(frame.get(3, 1), Some(Rgb::RED));
        assert_eq!(frame.lit_pixel_count(), 1);
    }

    #[test]
    fn lerp_hits_endpoints() {
        let a = Rgb(10, 20, 30);
        let b = Rgb(200, 100, 0);
        assert_eq!(a.lerp(b, 0.0), a);
        assert_eq!(a.lerp(b, 1.0), b);
        assert_eq!(Rgb(0, 0, 0).lerp(Rgb(100, 200, 50), 0.5), Rgb(50, 100, 25));
    }

    #[test]
    fn hsv_primaries() {
        assert_eq!(Rgb::from_hsv(0.0, 1.0, 1.0), Rgb(255, 0, 0));
        assert_eq!(Rgb::from_hsv(1.0 / 3.0, 1.0, 1.0), Rgb(0, 255, 0));
        assert_eq!(Rgb::from_hsv(2.0 / 3.0, 1.0, 1.0), Rgb(0, 0, 255));
    }

    #[test]
    fn parse_hex_colors() {
        assert_eq!(Rgb::parse_hex("#ff8000"), Some(Rgb(255, 128, 0)));
        assert_eq!(Rgb::parse_hex("00ff00"), Some(Rgb(0, 255, 0)));
        assert_eq!(Rgb::parse_hex("#fff"), None);
        assert_eq!(Rgb::parse_hex("#gg0000"), None);
    }

    #[test]
    fn pixels_iterate_row_major() {
        let mut frame = Frame::new(3, 2);
        frame.set(2, 0, Rgb::WHITE);
        let coords: Vec<(usize, usize)> = frame.pixels().map(|(x, y, _)| (x, y)).collect();
        assert_eq!(coords[2], (2, 0));
        assert_eq!(coords[3], (0, 1));
    }
}
