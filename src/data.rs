use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Prior-session OHLC inputs for the pivot calculator.
///
/// `today_open` and `yesterday_open` are optional; formulas that require an
/// absent one report "not applicable" instead of computing a degenerate value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct OhlcInput {
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub today_open: Option<f64>,
    pub yesterday_open: Option<f64>,
}

#[derive(Debug, Error, PartialEq)]
pub enum InputError {
    #[error("field '{0}' must be a finite number")]
    NonFinite(&'static str),

    #[error("high ({high}) cannot be less than low ({low})")]
    HighBelowLow { high: f64, low: f64 },

    #[error("select at least one formula before calculating")]
    EmptySelection,
}

impl OhlcInput {
    pub fn new(high: f64, low: f64, close: f64) -> Self {
        Self {
            high,
            low,
            close,
            today_open: None,
            yesterday_open: None,
        }
    }

    /// Reject non-numeric fields and inverted ranges before any formula runs.
    pub fn validate(&self) -> Result<(), InputError> {
        for (name, value) in [
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
        ] {
            if !value.is_finite() {
                return Err(InputError::NonFinite(name));
            }
        }
        for (name, value) in [
            ("today_open", self.today_open),
            ("yesterday_open", self.yesterday_open),
        ] {
            if let Some(v) = value {
                if !v.is_finite() {
                    return Err(InputError::NonFinite(name));
                }
            }
        }
        if self.high < self.low {
            return Err(InputError::HighBelowLow {
                high: self.high,
                low: self.low,
            });
        }
        Ok(())
    }

    pub fn range(&self) -> f64 {
        self.high - self.low
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LevelType {
    Pivot,
    Resistance,
    Support,
}

impl LevelType {
    /// Level type is derived from the label alone: "PP" is the pivot,
    /// a leading 'R' marks resistance, anything else is support.
    pub fn from_label(label: &str) -> Self {
        if label == "PP" {
            LevelType::Pivot
        } else if label.starts_with('R') {
            LevelType::Resistance
        } else {
            LevelType::Support
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LevelType::Pivot => "pivot",
            LevelType::Resistance => "resistance",
            LevelType::Support => "support",
        }
    }
}

/// One price level produced by one formula for one calculation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComputedLevel {
    pub formula: String,
    pub label: String,
    pub value: f64,
    pub level_type: LevelType,
}

/// A group of levels from independent formulas that landed close together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvergenceCluster {
    /// Arithmetic mean of the member values.
    pub value: f64,
    /// Member count; one formula may contribute more than one member.
    pub count: usize,
    /// Sorted distinct member labels.
    pub labels: Vec<String>,
    /// Sorted distinct contributing formula names.
    pub formulas: Vec<String>,
    /// Majority-vote type over members.
    pub level_type: LevelType,
}

/// Round to the fixed 2-decimal precision used for every surfaced price,
/// so tolerance comparisons and clipboard copies agree with the display.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_accepts_ordinary_session() {
        let input = OhlcInput::new(100.0, 90.0, 95.0);
        assert!(input.validate().is_ok());
    }

    #[test]
    fn validate_rejects_inverted_range() {
        let input = OhlcInput::new(90.0, 100.0, 95.0);
        assert_eq!(
            input.validate(),
            Err(InputError::HighBelowLow {
                high: 90.0,
                low: 100.0
            })
        );
    }

    #[test]
    fn validate_rejects_non_finite_fields() {
        let mut input = OhlcInput::new(f64::NAN, 90.0, 95.0);
        assert_eq!(input.validate(), Err(InputError::NonFinite("high")));

        input = OhlcInput::new(100.0, 90.0, 95.0);
        input.today_open = Some(f64::INFINITY);
        assert_eq!(input.validate(), Err(InputError::NonFinite("today_open")));
    }

    #[test]
    fn level_type_follows_label() {
        assert_eq!(LevelType::from_label("PP"), LevelType::Pivot);
        assert_eq!(LevelType::from_label("R0.5"), LevelType::Resistance);
        assert_eq!(LevelType::from_label("S2.5"), LevelType::Support);
        // Composite pivot labels fall through to support, matching the
        // label-prefix rule rather than any special case.
        assert_eq!(LevelType::from_label("PP-HIGH"), LevelType::Support);
    }

    #[test]
    fn round2_matches_display_precision() {
        assert_eq!(round2(95.128), 95.13);
        assert_eq!(round2(100.0), 100.0);
        assert_eq!(round2(33.333333), 33.33);
    }
}
