//! Byte quantities written either as a raw integer or with a decimal unit.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::ConfigError;

/// A number of bytes.
///
/// Deserializes from an integer (`1000000000000`), a whole-valued float
/// (`1e12`) or a string with a decimal (SI) unit (`"1TB"`, `"1.5 TB"`,
/// `"500GB"`). Always serializes as an integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "RawByteSize", into = "u64")]
pub struct ByteSize(u64);

const UNITS: [(&str, u64); 6] = [
    ("PB", 1_000_000_000_000_000),
    ("TB", 1_000_000_000_000),
    ("GB", 1_000_000_000),
    ("MB", 1_000_000),
    ("KB", 1_000),
    ("B", 1),
];

impl ByteSize {
    pub const fn from_bytes(bytes: u64) -> Self {
        Self(bytes)
    }

    pub const fn terabytes(tb: u64) -> Self {
        Self(tb * 1_000_000_000_000)
    }

    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// The value as the float Cloud Monitoring expects for `thresholdValue`.
    pub fn as_f64(self) -> f64 {
        self.0 as f64
    }
}

impl From<ByteSize> for u64 {
    fn from(value: ByteSize) -> Self {
        value.0
    }
}

impl FromStr for ByteSize {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let upper = trimmed.to_ascii_uppercase();

        let (number, multiplier) = UNITS
            .iter()
            .find_map(|(suffix, mult)| upper.strip_suffix(suffix).map(|n| (n.trim(), *mult)))
            .unwrap_or((upper.as_str(), 1));

        if number.is_empty() {
            return Err(ConfigError::Invalid(format!("invalid byte size '{s}'")));
        }

        if let Ok(whole) = number.parse::<u64>() {
            return whole
                .checked_mul(multiplier)
                .map(Self)
                .ok_or_else(|| ConfigError::Invalid(format!("byte size '{s}' overflows")));
        }

        let value: f64 = number
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("invalid byte size '{s}'")))?;
        if !value.is_finite() || value < 0.0 {
            return Err(ConfigError::Invalid(format!("invalid byte size '{s}'")));
        }
        let bytes = (value * multiplier as f64).round();
        if bytes > u64::MAX as f64 {
            return Err(ConfigError::Invalid(format!("byte size '{s}' overflows")));
        }
        Ok(Self(bytes as u64))
    }
}

impl fmt::Display for ByteSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (suffix, mult) in UNITS {
            if mult > 1 && self.0 >= mult && self.0 % mult == 0 {
                return write!(f, "{}{}", self.0 / mult, suffix);
            }
        }
        write!(f, "{}B", self.0)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawByteSize {
    Int(u64),
    Float(f64),
    Text(String),
}

impl TryFrom<RawByteSize> for ByteSize {
    type Error = ConfigError;

    fn try_from(raw: RawByteSize) -> Result<Self, Self::Error> {
        match raw {
            RawByteSize::Int(n) => Ok(Self(n)),
            RawByteSize::Float(v)
                if v.is_finite() && v >= 0.0 && v.fract() == 0.0 && v <= u64::MAX as f64 =>
            {
                Ok(Self(v as u64))
            }
            RawByteSize::Float(v) => Err(ConfigError::Invalid(format!(
                "byte size {v} is not a whole number of bytes; use an integer or a unit like 1TB"
            ))),
            RawByteSize::Text(s) => s.parse(),
        }
    }
}
