use std::ops::{Add, BitOr, Mul, Sub};

/// Three-channel color where each channel may be unset.
///
/// Unset channels let independent red/green/blue commands be merged with
/// [`BitOr`] (`partial | trailing`), the left operand winning wherever it is set.
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Color {
    pub red: Option<f64>,
    pub green: Option<f64>,
    pub blue: Option<f64>,
}

impl Color {
    pub const BLACK: Self = Self::new(0.0, 0.0, 0.0);

    pub const fn new(red: f64, green: f64, blue: f64) -> Self {
        Self {
            red: Some(red),
            green: Some(green),
            blue: Some(blue),
        }
    }

    pub fn from_ints(rgb: [i64; 3]) -> Self {
        Self::new(rgb[0] as f64, rgb[1] as f64, rgb[2] as f64)
    }

    pub fn channels(&self) -> [Option<f64>; 3] {
        [self.red, self.green, self.blue]
    }

    fn from_channels(c: [Option<f64>; 3]) -> Self {
        Self {
            red: c[0],
            green: c[1],
            blue: c[2],
        }
    }

    fn map(self, f: impl Fn(f64) -> f64) -> Self {
        Self::from_channels(self.channels().map(|c| c.map(&f)))
    }

    fn zip(self, other: Self, f: impl Fn(f64, f64) -> f64) -> Self {
        let a = self.channels();
        let b = other.channels();
        Self::from_channels([0, 1, 2].map(|i| match (a[i], b[i]) {
            (Some(x), Some(y)) => Some(f(x, y)),
            _ => None,
        }))
    }

    pub fn is_complete(&self) -> bool {
        self.channels().iter().all(Option::is_some)
    }

    /// Round every set channel to the nearest integer, ties to even.
    pub fn round(self) -> Self {
        self.map(f64::round_ties_even)
    }

    pub fn abs(self) -> Self {
        self.map(f64::abs)
    }

    /// Euclidean distance; unset channels count as 0.
    pub fn distance(&self, other: &Self) -> f64 {
        self.channels()
            .iter()
            .zip(other.channels().iter())
            .map(|(a, b)| {
                let d = a.unwrap_or(0.0) - b.unwrap_or(0.0);
                d * d
            })
            .sum::<f64>()
            .sqrt()
    }

    /// Linear interpolation: `self * (1 - t) + other * t`.
    pub fn lerp(self, other: Self, t: f64) -> Self {
        self * (1.0 - t) + other * t
    }

    /// Integer channels, or `None` if any channel is unset.
    pub fn to_ints(&self) -> Option<[i64; 3]> {
        let r = self.red?;
        let g = self.green?;
        let b = self.blue?;
        Some([r, g, b].map(|c| c.round_ties_even() as i64))
    }

    /// Clamp to displayable 8-bit channels.
    ///
    /// With `amplify`, dim values are lifted by `sqrt(c * 255)` so previews of
    /// low-intensity programs remain visible.
    pub fn to_rgb8(&self, amplify: bool) -> [u8; 3] {
        self.channels().map(|c| {
            let v = c.unwrap_or(0.0).clamp(0.0, 255.0);
            let v = if amplify { (v * 255.0).sqrt() } else { v };
            v.round_ties_even() as u8
        })
    }
}

impl Add for Color {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        self.zip(rhs, |a, b| a + b)
    }
}

impl Sub for Color {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        self.zip(rhs, |a, b| a - b)
    }
}

impl Mul<f64> for Color {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self {
        self.map(|c| c * rhs)
    }
}

impl BitOr for Color {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self {
            red: self.red.or(rhs.red),
            green: self.green.or(rhs.green),
            blue: self.blue.or(rhs.blue),
        }
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ch = |c: Option<f64>| c.map_or_else(|| "-".to_string(), |v| v.to_string());
        write!(
            f,
            "{}, {}, {}",
            ch(self.red),
            ch(self.green),
            ch(self.blue)
        )
    }
}
