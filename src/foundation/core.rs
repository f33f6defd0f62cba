use crate::foundation::error::{ExportError, ExportResult};
use std::str::FromStr;

/// Clear the low bit so a dimension is usable with 4:2:0 chroma subsampling.
///
/// Odd sizes corrupt planar chroma planes (a visible color cast in the output), so the
/// pipeline drops the last column/row instead.
pub fn even_floor(v: u32) -> u32 {
    v & !1
}

/// Rational number used for time bases (`num/den` seconds per tick).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Rational {
    /// Numerator, must be > 0.
    pub num: i32,
    /// Denominator, must be > 0.
    pub den: i32,
}

impl Rational {
    /// Create a validated, strictly positive rational.
    pub fn new(num: i32, den: i32) -> ExportResult<Self> {
        if den <= 0 {
            return Err(ExportError::validation("Rational den must be > 0"));
        }
        if num <= 0 {
            return Err(ExportError::validation("Rational num must be > 0"));
        }
        Ok(Self { num, den })
    }

    /// Swap numerator and denominator.
    pub fn inverse(self) -> Self {
        Self {
            num: self.den,
            den: self.num,
        }
    }

    /// Convert to floating point.
    pub fn as_f64(self) -> f64 {
        f64::from(self.num) / f64::from(self.den)
    }

    /// Rescale a tick count from one time base to another.
    ///
    /// Rounds half away from zero and saturates at the `i64` range.
    pub fn rescale(ts: i64, from: Rational, to: Rational) -> i64 {
        let n = i128::from(ts) * i128::from(from.num) * i128::from(to.den);
        let d = i128::from(from.den) * i128::from(to.num);
        let q = div_round_half_away(n, d);
        q.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64
    }
}

impl std::fmt::Display for Rational {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

fn div_round_half_away(n: i128, d: i128) -> i128 {
    let (n, d) = if d < 0 { (-n, -d) } else { (n, d) };
    if n >= 0 {
        (n + d / 2) / d
    } else {
        -((-n + d / 2) / d)
    }
}

/// Pixel rectangle inside a source image.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CropRect {
    /// Left edge in pixels.
    pub x: u32,
    /// Top edge in pixels.
    pub y: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl CropRect {
    /// Create a rectangle at `(x, y)` with the given size.
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Clip the rectangle to an image of `width` x `height`.
    ///
    /// Returns `None` when nothing of the rectangle lies inside the image.
    pub fn clip_to(self, width: u32, height: u32) -> Option<Self> {
        if self.x >= width || self.y >= height {
            return None;
        }
        let w = self.width.min(width - self.x);
        let h = self.height.min(height - self.y);
        if w == 0 || h == 0 {
            return None;
        }
        Some(Self::new(self.x, self.y, w, h))
    }
}

impl FromStr for CropRect {
    type Err = ExportError;

    /// Parse `x,y,width,height`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts = s
            .split(',')
            .map(|p| p.trim().parse::<u32>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| ExportError::validation(format!("invalid crop rect '{s}': {e}")))?;
        let [x, y, width, height] = parts[..] else {
            return Err(ExportError::validation(format!(
                "crop rect '{s}' must have the form x,y,width,height"
            )));
        };
        Ok(Self::new(x, y, width, height))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
