use rand::Rng;

use super::Rgb;

/// Hex colors used when no palette is configured.
pub const DEFAULT_PALETTE: [&str; 3] = ["#ffffff", "#ffffff", "#ffffff"];

/// Non-empty list of particle tint colors.
#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
    colors: Vec<Rgb>,
}

impl Palette {
    /// Builds a palette from hex strings.
    ///
    /// Invalid entries are skipped with a warning. An empty result falls back
    /// to [`DEFAULT_PALETTE`].
    pub fn from_hex<S: AsRef<str>>(hex: &[S]) -> Self {
        let colors: Vec<Rgb> = hex
            .iter()
            .filter_map(|h| match Rgb::from_hex(h.as_ref()) {
                Ok(c) => Some(c),
                Err(e) => {
                    log::warn!("ignoring palette entry: {e}");
                    None
                }
            })
            .collect();

        if colors.is_empty() {
            return Self::default();
        }
        Self { colors }
    }

    pub fn colors(&self) -> &[Rgb] {
        &self.colors
    }

    /// Picks one color uniformly at random.
    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> Rgb {
        self.colors[rng.random_range(0..self.colors.len())]
    }
}

impl Default for Palette {
    fn default() -> Self {
        let colors = DEFAULT_PALETTE
            .iter()
            .filter_map(|h| Rgb::from_hex(h).ok())
            .collect();
        Self { colors }
    }
}
