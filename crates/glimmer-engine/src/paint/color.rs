use thiserror::Error;

/// Error returned by [`Rgb::from_hex`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ColorParseError {
    #[error("hex color `{0}` must have 3 or 6 digits")]
    Length(String),
    #[error("hex color `{0}` contains non-hex digits")]
    Digits(String),
}

/// RGB color with channels in `[0, 1]`.
///
/// Channels are the 8-bit sRGB bytes divided by 255 and are fed to the shader
/// as-is; no transfer function is applied.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub const WHITE: Self = Self { r: 1.0, g: 1.0, b: 1.0 };

    #[inline]
    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    #[inline]
    pub fn from_u8(r: u8, g: u8, b: u8) -> Self {
        Self::new(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0)
    }

    /// Parses `#rrggbb`, `rrggbb`, `#rgb` or `rgb`.
    ///
    /// Shorthand digits are doubled (`#4fa` is `#44ffaa`).
    pub fn from_hex(hex: &str) -> Result<Self, ColorParseError> {
        let digits = hex.trim().trim_start_matches('#');

        let expanded: String = match digits.len() {
            3 => digits.chars().flat_map(|c| [c, c]).collect(),
            6 => digits.to_string(),
            _ => return Err(ColorParseError::Length(hex.to_string())),
        };

        // `from_str_radix` accepts a leading sign; the digit check rejects it.
        if !expanded.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ColorParseError::Digits(hex.to_string()));
        }

        let int = u32::from_str_radix(&expanded, 16)
            .map_err(|_| ColorParseError::Digits(hex.to_string()))?;

        Ok(Self::from_u8(
            ((int >> 16) & 0xff) as u8,
            ((int >> 8) & 0xff) as u8,
            (int & 0xff) as u8,
        ))
    }

    /// Converts back to 8-bit channels, rounding to nearest.
    #[inline]
    pub fn to_u8(self) -> [u8; 3] {
        let q = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        [q(self.r), q(self.g), q(self.b)]
    }

    /// Straight-alpha RGBA bytes, used when painting CPU-side images.
    #[inline]
    pub fn to_rgba8(self, alpha: u8) -> image::Rgba<u8> {
        let [r, g, b] = self.to_u8();
        image::Rgba([r, g, b, alpha])
    }

    #[inline]
    pub fn to_array(self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }
}
