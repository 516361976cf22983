//! Integer RGB color math.
//!
//! Every palette operation in the sky works on 8-bit channels and rounds
//! after each step, so repeated darken/blend chains stay reproducible.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Lerp trait
// ---------------------------------------------------------------------------

/// Trait for types that can be linearly interpolated.
pub trait Lerp: Clone {
    fn lerp(&self, other: &Self, t: f32) -> Self;
}

impl Lerp for f32 {
    #[inline]
    fn lerp(&self, other: &Self, t: f32) -> Self {
        self + (other - self) * t
    }
}

impl Lerp for Rgb {
    #[inline]
    fn lerp(&self, other: &Self, t: f32) -> Self {
        self.blend(*other, t)
    }
}

// ---------------------------------------------------------------------------
// Rgb
// ---------------------------------------------------------------------------

/// An 8-bit-per-channel color.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);

    #[inline]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Build from a packed `0xRRGGBB` value. Bits above 24 are ignored.
    #[inline]
    pub const fn hex(value: u32) -> Self {
        Self {
            r: ((value >> 16) & 0xff) as u8,
            g: ((value >> 8) & 0xff) as u8,
            b: (value & 0xff) as u8,
        }
    }

    /// Packed `0xRRGGBB` value.
    #[inline]
    pub const fn to_hex(self) -> u32 {
        ((self.r as u32) << 16) | ((self.g as u32) << 8) | self.b as u32
    }

    /// Scale every channel toward black by `amount` (0 = unchanged, 1 = black).
    pub fn darken(self, amount: f32) -> Self {
        let f = |c: u8| round_channel((c as f32 * (1.0 - amount)).max(0.0));
        Self::new(f(self.r), f(self.g), f(self.b))
    }

    /// Move every channel toward white by `amount` (0 = unchanged, 1 = white).
    pub fn lighten(self, amount: f32) -> Self {
        let f = |c: u8| {
            let c = c as f32;
            round_channel((c + (255.0 - c) * amount).min(255.0))
        };
        Self::new(f(self.r), f(self.g), f(self.b))
    }

    /// Linear blend toward `other` in RGB space.
    pub fn blend(self, other: Rgb, t: f32) -> Self {
        let f = |a: u8, b: u8| {
            let a = a as f32;
            round_channel(a + (b as f32 - a) * t)
        };
        Self::new(f(self.r, other.r), f(self.g, other.g), f(self.b, other.b))
    }

    /// CSS `rgba()` notation with the given alpha.
    pub fn to_rgba_css(self, alpha: f32) -> String {
        format!("rgba({}, {}, {}, {})", self.r, self.g, self.b, alpha)
    }

    /// Channels as normalized floats, for GPU upload.
    pub fn to_linear(self) -> [f32; 3] {
        [self.r as f32 / 255.0, self.g as f32 / 255.0, self.b as f32 / 255.0]
    }
}

/// `#rrggbb`
impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl From<u32> for Rgb {
    fn from(value: u32) -> Self {
        Self::hex(value)
    }
}

impl From<[u8; 3]> for Rgb {
    fn from(c: [u8; 3]) -> Self {
        Self::new(c[0], c[1], c[2])
    }
}

impl From<Rgb> for [u8; 3] {
    fn from(c: Rgb) -> Self {
        [c.r, c.g, c.b]
    }
}

#[inline]
fn round_channel(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_round_trip_preserves_channels() {
        let c = Rgb::hex(0x5a9fc8);
        assert_eq!((c.r, c.g, c.b), (0x5a, 0x9f, 0xc8));
        assert_eq!(c.to_hex(), 0x5a9fc8);
    }

    #[test]
    fn test_darken() {
        let c = Rgb::new(200, 100, 50).darken(0.5);
        assert_eq!(c, Rgb::new(100, 50, 25));
        assert_eq!(Rgb::WHITE.darken(1.0), Rgb::BLACK);
        assert_eq!(Rgb::new(10, 20, 30).darken(0.0), Rgb::new(10, 20, 30));
    }

    #[test]
    fn test_lighten() {
        let c = Rgb::new(0, 100, 255).lighten(0.5);
        // 0 + 255*0.5 = 127.5 -> 128; 100 + 155*0.5 = 177.5 -> 178
        assert_eq!(c, Rgb::new(128, 178, 255));
        assert_eq!(Rgb::BLACK.lighten(1.0), Rgb::WHITE);
    }

    #[test]
    fn test_blend_endpoints_and_midpoint() {
        let a = Rgb::new(0, 0, 0);
        let b = Rgb::new(100, 200, 50);
        assert_eq!(a.blend(b, 0.0), a);
        assert_eq!(a.blend(b, 1.0), b);
        assert_eq!(a.blend(b, 0.5), Rgb::new(50, 100, 25));
    }

    #[test]
    fn test_blend_downward() {
        let a = Rgb::new(200, 200, 200);
        let b = Rgb::new(100, 0, 200);
        assert_eq!(a.blend(b, 0.25), Rgb::new(175, 150, 200));
    }

    #[test]
    fn test_display_is_css_hex() {
        assert_eq!(Rgb::hex(0x0a1628).to_string(), "#0a1628");
        assert_eq!(Rgb::new(170, 175, 180).to_rgba_css(0.95), "rgba(170, 175, 180, 0.95)");
    }

    #[test]
    fn test_lerp_trait_matches_blend() {
        let a = Rgb::hex(0x102030);
        let b = Rgb::hex(0x405060);
        assert_eq!(a.lerp(&b, 0.3), a.blend(b, 0.3));
        assert!((2.0_f32.lerp(&4.0, 0.25) - 2.5).abs() < 1e-6);
    }
}
