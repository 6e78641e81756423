//! Terrain extent: the output raster size, one pixel per surface unit.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Errors returned when parsing a terrain extent.
#[derive(Debug, Error, PartialEq)]
pub enum ExtentError {
    /// The text is not of the form `WIDTHxHEIGHT`.
    #[error("malformed terrain size {0:?}, expected WIDTHxHEIGHT (e.g. 4096x4096)")]
    Malformed(String),

    /// One of the dimensions rounds to zero.
    #[error("terrain size {width}x{height} has a zero dimension")]
    Empty {
        /// Parsed width.
        width: u32,
        /// Parsed height.
        height: u32,
    },
}

/// Width and height of the terrain in surface units.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TerrainExtent {
    /// Width in surface units (pixels).
    pub width: u32,
    /// Height in surface units (pixels).
    pub height: u32,
}

impl TerrainExtent {
    /// Creates an extent.
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Returns `(width, height)`.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Number of pixels covered.
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

impl fmt::Display for TerrainExtent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Parses `WIDTHxHEIGHT`. Fractional sizes are rounded to whole units.
impl FromStr for TerrainExtent {
    type Err = ExtentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || ExtentError::Malformed(s.to_string());
        let (w, h) = s.trim().split_once(['x', 'X']).ok_or_else(malformed)?;

        let parse = |v: &str| {
            v.trim()
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite() && *v >= 0.0 && *v <= u32::MAX as f64)
                .map(|v| v.round() as u32)
        };
        let width = parse(w).ok_or_else(malformed)?;
        let height = parse(h).ok_or_else(malformed)?;

        if width == 0 || height == 0 {
            return Err(ExtentError::Empty { width, height });
        }
        Ok(Self { width, height })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_integer_size() {
        let extent: TerrainExtent = "4096x2048".parse().unwrap();
        assert_eq!(extent, TerrainExtent::new(4096, 2048));
        assert_eq!(extent.pixel_count(), 4096 * 2048);
    }

    #[test]
    fn test_parse_rounds_fractions() {
        let extent: TerrainExtent = " 1023.6 x 511.2 ".parse().unwrap();
        assert_eq!(extent.dimensions(), (1024, 511));
    }

    #[test]
    fn test_parse_accepts_uppercase_separator() {
        assert_eq!("8X8".parse::<TerrainExtent>().unwrap(), TerrainExtent::new(8, 8));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for bad in ["", "4096", "axb", "12x", "-5x5", "x10"] {
            assert!(
                matches!(bad.parse::<TerrainExtent>(), Err(ExtentError::Malformed(_))),
                "{bad:?} should be malformed"
            );
        }
    }

    #[test]
    fn test_parse_rejects_zero_dimension() {
        assert_eq!(
            "0x10".parse::<TerrainExtent>(),
            Err(ExtentError::Empty { width: 0, height: 10 })
        );
        assert!("0.2x10".parse::<TerrainExtent>().is_err());
    }

    #[test]
    fn test_display_round_trips() {
        let extent = TerrainExtent::new(300, 200);
        assert_eq!(extent.to_string().parse::<TerrainExtent>().unwrap(), extent);
    }
}
