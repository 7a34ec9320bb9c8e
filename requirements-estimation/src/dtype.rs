use std::fmt;
use std::str::FromStr;

use crate::error::EstimationError;

/// Numeric precision a model is served in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DataType {
    Float16,
    Int8,
    Int4,
}

impl DataType {
    /// Every supported type, in display order.
    pub const ALL: [Self; 3] = [Self::Float16, Self::Int8, Self::Int4];

    /// Spellings accepted on input, for error messages.
    pub const ACCEPTED: &'static str = "fp16/f16/float16, int8/q8, int4/q4";

    /// Normalizes any accepted alias (case-insensitive) to its canonical type.
    pub fn normalize(raw: &str) -> Result<Self, EstimationError> {
        match raw.trim().to_lowercase().as_str() {
            "fp16" | "f16" | "float16" => Ok(Self::Float16),
            "int8" | "q8" => Ok(Self::Int8),
            "int4" | "q4" => Ok(Self::Int4),
            _ => Err(EstimationError::UnsupportedDataType(raw.to_string())),
        }
    }

    pub fn is_supported(raw: &str) -> bool {
        Self::normalize(raw).is_ok()
    }

    pub const fn bytes_per_param(self) -> f64 {
        match self {
            Self::Float16 => 2.0,
            Self::Int8 => 1.0,
            Self::Int4 => 0.5,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Float16 => "fp16",
            Self::Int8 => "int8",
            Self::Int4 => "int4",
        }
    }
}

impl FromStr for DataType {
    type Err = EstimationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::normalize(s)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
