//! Integer-preferred point values
//!
//! `^points 2` and `^points 2.0` both produce `Points::Whole(2)`; only genuinely fractional
//! values stay fractional. The coercion is silent.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Points {
    Whole(u32),
    Fraction(f64),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PointsError {
    #[error("'{0}' is not a number")]
    NotANumber(String),
    #[error("points must be greater than zero, got {0}")]
    NotPositive(String),
}

impl Points {
    pub fn parse(raw: &str) -> Result<Self, PointsError> {
        let trimmed = raw.trim();
        let value: f64 = trimmed
            .replace(',', ".")
            .parse()
            .map_err(|_| PointsError::NotANumber(trimmed.to_string()))?;
        if !value.is_finite() {
            return Err(PointsError::NotANumber(trimmed.to_string()));
        }
        if value <= 0.0 {
            return Err(PointsError::NotPositive(trimmed.to_string()));
        }
        Ok(Self::from_f64(value))
    }

    pub fn from_f64(value: f64) -> Self {
        if value.fract() == 0.0 && value >= 0.0 && value <= u32::MAX as f64 {
            Points::Whole(value as u32)
        } else {
            Points::Fraction(value)
        }
    }

    pub fn value(&self) -> f64 {
        match self {
            Points::Whole(n) => *n as f64,
            Points::Fraction(v) => *v,
        }
    }
}

impl Default for Points {
    fn default() -> Self {
        Points::Whole(1)
    }
}

impl fmt::Display for Points {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Points::Whole(n) => write!(f, "{}", n),
            Points::Fraction(v) => write!(f, "{}", v),
        }
    }
}

/// Format a score for markup: integral values drop the decimal part.
pub fn format_score(value: f64) -> String {
    let magnitude = Points::from_f64(value.abs());
    if value < 0.0 {
        format!("-{}", magnitude)
    } else {
        magnitude.to_string()
    }
}
