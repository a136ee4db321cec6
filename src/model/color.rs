use std::fmt;

use serde::{Deserialize, Serialize};

/// RGBA color with 8-bit color channels and a fractional alpha in `[0, 1]`,
/// matching the CSS `rgba()` notation drawing surfaces consume.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f64,
}

impl Color {
    pub const BLACK: Color = Color { r: 0, g: 0, b: 0, a: 1.0 };
    pub const WHITE: Color = Color { r: 255, g: 255, b: 255, a: 1.0 };
    pub const TRANSPARENT: Color = Color { r: 0, g: 0, b: 0, a: 0.0 };

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub fn rgba(r: u8, g: u8, b: u8, a: f64) -> Self {
        Self { r, g, b, a: a.clamp(0.0, 1.0) }
    }

    /// Build a color from script numbers, clamping each channel into range.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn from_channels(r: f64, g: f64, b: f64, a: f64) -> Self {
        let channel = |v: f64| v.round().clamp(0.0, 255.0) as u8;
        Self::rgba(channel(r), channel(g), channel(b), a)
    }

    /// Parse `#rgb` or `#rrggbb`. Short form expands each digit (`#f00` == `#ff0000`).
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex.strip_prefix('#')?;
        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        match digits.len() {
            3 => {
                let r = u8::from_str_radix(digits.get(0..1)?, 16).ok()?;
                let g = u8::from_str_radix(digits.get(1..2)?, 16).ok()?;
                let b = u8::from_str_radix(digits.get(2..3)?, 16).ok()?;
                Some(Self::rgb(r * 17, g * 17, b * 17))
            }
            6 => {
                let r = u8::from_str_radix(digits.get(0..2)?, 16).ok()?;
                let g = u8::from_str_radix(digits.get(2..4)?, 16).ok()?;
                let b = u8::from_str_radix(digits.get(4..6)?, 16).ok()?;
                Some(Self::rgb(r, g, b))
            }
            _ => None,
        }
    }

    pub fn with_alpha(self, a: f64) -> Self {
        Self::rgba(self.r, self.g, self.b, a)
    }

    pub fn is_transparent(self) -> bool {
        self.a <= 0.0
    }

    /// CSS form: `rgba(255,0,0,1)`.
    pub fn to_css(self) -> String {
        format!("rgba({},{},{},{})", self.r, self.g, self.b, self.a)
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::BLACK
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_css())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_and_long_hex_agree() {
        let short = Color::from_hex("#f00");
        let long = Color::from_hex("#ff0000");
        assert_eq!(short, Some(Color::rgb(255, 0, 0)));
        assert_eq!(short, long);
    }

    #[test]
    fn hex_alpha_is_opaque() {
        let c = Color::from_hex("#abc");
        assert_eq!(c, Some(Color { r: 170, g: 187, b: 204, a: 1.0 }));
    }

    #[test]
    fn hex_rejects_bad_input() {
        assert_eq!(Color::from_hex("ff0000"), None);
        assert_eq!(Color::from_hex("#ff00"), None);
        assert_eq!(Color::from_hex("#gg0000"), None);
    }

    #[test]
    fn channels_clamp_into_range() {
        let c = Color::from_channels(300.0, -4.0, 127.6, 2.0);
        assert_eq!(c, Color { r: 255, g: 0, b: 128, a: 1.0 });
    }

    #[test]
    fn css_form() {
        assert_eq!(Color::rgba(1, 2, 3, 0.5).to_css(), "rgba(1,2,3,0.5)");
        assert_eq!(Color::TRANSPARENT.to_string(), "rgba(0,0,0,0)");
    }
}
