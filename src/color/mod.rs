//! Color algebra
//!
//! Fixed-point ARGB colors with 8 bits per channel, plus the compositing
//! operators the surface rasterizer and the tile pyramid are built from.
//! Every operator returns a new value.

use std::fmt;
use std::str::FromStr;

use image::Rgba;

const MAX: i32 = 255;

/// An ARGB color, 8 bits per component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Color {
    pub a: u8,
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const TRANSPARENT: Color = Color::from_argb(0x0000_0000);
    pub const BLACK: Color = Color::from_argb(0xff00_0000);
    pub const WHITE: Color = Color::from_argb(0xffff_ffff);
    pub const RED: Color = Color::from_argb(0xffff_0000);
    pub const GREEN: Color = Color::from_argb(0xff00_ff00);
    pub const BLUE: Color = Color::from_argb(0xff00_00ff);
    pub const YELLOW: Color = Color::from_argb(0xffff_ff00);
    pub const MAGENTA: Color = Color::from_argb(0xffff_00ff);
    pub const CYAN: Color = Color::from_argb(0xff00_ffff);

    /// Decode a packed `0xAARRGGBB` value
    pub const fn from_argb(argb: u32) -> Self {
        Self {
            a: (argb >> 24) as u8,
            r: (argb >> 16) as u8,
            g: (argb >> 8) as u8,
            b: argb as u8,
        }
    }

    /// Build a color from components, clamping each to 0..=255
    pub fn clamped(a: i32, r: i32, g: i32, b: i32) -> Self {
        Self {
            a: clamp_byte(a),
            r: clamp_byte(r),
            g: clamp_byte(g),
            b: clamp_byte(b),
        }
    }

    /// Packed `0xAARRGGBB` value
    pub const fn to_argb(&self) -> u32 {
        (self.a as u32) << 24 | (self.r as u32) << 16 | (self.g as u32) << 8 | self.b as u32
    }

    pub fn to_rgba(&self) -> Rgba<u8> {
        Rgba([self.r, self.g, self.b, self.a])
    }

    pub fn from_rgba(pixel: &Rgba<u8>) -> Self {
        let [r, g, b, a] = pixel.0;
        Self { a, r, g, b }
    }

    /// Amount of transparency, the complement of alpha
    pub fn transparency(&self) -> u8 {
        255 - self.a
    }

    pub fn is_fully_opaque(&self) -> bool {
        self.a == 255
    }

    pub fn is_transparent(&self) -> bool {
        self.a == 0
    }

    /// Hex form `0xaarrggbb`
    pub fn hex(&self) -> String {
        format!("0x{:08x}", self.to_argb())
    }

    /// Add `amount` to each of R, G and B; alpha is untouched
    pub fn shade(&self, amount: i32) -> Self {
        Self::clamped(
            self.a as i32,
            self.r as i32 + amount,
            self.g as i32 + amount,
            self.b as i32 + amount,
        )
    }

    /// Porter-Duff "over": `overlay` drawn on top of `self`
    pub fn overlay(&self, overlay: Color) -> Self {
        let opacity = overlay.a as i32;
        let showing = overlay.transparency() as i32;
        let channel = |over: u8, base: u8| (over as i32 * opacity + base as i32 * showing) / MAX;

        Self::clamped(
            opacity + self.a as i32 * showing / MAX,
            channel(overlay.r, self.r),
            channel(overlay.g, self.g),
            channel(overlay.b, self.b),
        )
    }

    /// Overlay the same color `count` times
    pub fn overlay_repeat(&self, overlay: Color, count: usize) -> Self {
        (0..count).fold(*self, |acc, _| acc.overlay(overlay))
    }

    /// Divide the color channels by alpha, turning an accumulated
    /// premultiplied color into a straight-alpha one.
    pub fn demultiply_alpha(&self) -> Self {
        if self.a == 0 {
            return Color::TRANSPARENT;
        }
        let alpha = self.a as i32;
        let demult = |c: u8| c as i32 * MAX / alpha;
        Self::clamped(alpha, demult(self.r), demult(self.g), demult(self.b))
    }

    /// Scale the color channels by alpha
    pub fn premultiply_alpha(&self) -> Self {
        let alpha = self.a as i32;
        let mult = |c: u8| c as i32 * alpha / MAX;
        Self::clamped(alpha, mult(self.r), mult(self.g), mult(self.b))
    }

    /// Component-wise multiply of all four channels
    pub fn multiply(&self, m: Color) -> Self {
        Self::clamped(
            mul(self.a, m.a),
            mul(self.r, m.r),
            mul(self.g, m.g),
            mul(self.b, m.b),
        )
    }

    /// Component-wise multiply of R, G and B, keeping this color's alpha
    pub fn multiply_solid(&self, m: Color) -> Self {
        Self::clamped(
            self.a as i32,
            mul(self.r, m.r),
            mul(self.g, m.g),
            mul(self.b, m.b),
        )
    }

    /// Unweighted average of packed ARGB values, per component
    pub fn average(argb: &[u32]) -> Self {
        match argb {
            [] => Color::TRANSPARENT,
            [single] => Color::from_argb(*single),
            many => {
                let mut sums = [0u32; 4];
                for &packed in many {
                    let c = Color::from_argb(packed);
                    sums[0] += c.a as u32;
                    sums[1] += c.r as u32;
                    sums[2] += c.g as u32;
                    sums[3] += c.b as u32;
                }
                let n = many.len() as u32;
                Color {
                    a: (sums[0] / n) as u8,
                    r: (sums[1] / n) as u8,
                    g: (sums[2] / n) as u8,
                    b: (sums[3] / n) as u8,
                }
            }
        }
    }
}

fn clamp_byte(value: i32) -> u8 {
    value.clamp(0, MAX) as u8
}

fn mul(c: u8, m: u8) -> i32 {
    c as i32 * m as i32 / MAX
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Color{{a={},r={},g={},b={}}}", self.a, self.r, self.g, self.b)
    }
}

impl From<u32> for Color {
    fn from(argb: u32) -> Self {
        Color::from_argb(argb)
    }
}

/// Error returned when a hex color string cannot be parsed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Not a hex color: {0:?}")]
pub struct ParseColorError(pub String);

impl FromStr for Color {
    type Err = ParseColorError;

    /// Parse `0xAARRGGBB` (the `0x` prefix is optional)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        u32::from_str_radix(digits, 16)
            .map(Color::from_argb)
            .map_err(|_| ParseColorError(s.to_string()))
    }
}
