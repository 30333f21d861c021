use serde::{Deserialize, Serialize};

/// Accuracy (meters) at or below which the fix counts as a strong signal.
pub const STRONG_ACCURACY_M: f64 = 20.0;
/// Accuracy (meters) at or below which the fix counts as a moderate signal.
pub const MODERATE_ACCURACY_M: f64 = 100.0;

/// Qualitative bucket derived from the positional accuracy of a fix.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalLevel {
    Strong,
    Moderate,
    Weak,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BadgeColor {
    Green,
    Yellow,
    Red,
}

impl SignalLevel {
    /// NaN accuracy fails both comparisons and lands in `Weak`.
    pub fn from_accuracy(accuracy: f64) -> Self {
        if accuracy <= STRONG_ACCURACY_M {
            SignalLevel::Strong
        } else if accuracy <= MODERATE_ACCURACY_M {
            SignalLevel::Moderate
        } else {
            SignalLevel::Weak
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SignalLevel::Strong => "Strong Signal",
            SignalLevel::Moderate => "Moderate Signal",
            SignalLevel::Weak => "Weak Signal",
        }
    }

    pub fn color(&self) -> BadgeColor {
        match self {
            SignalLevel::Strong => BadgeColor::Green,
            SignalLevel::Moderate => BadgeColor::Yellow,
            SignalLevel::Weak => BadgeColor::Red,
        }
    }
}

impl BadgeColor {
    pub fn css(&self) -> &'static str {
        match self {
            BadgeColor::Green => "#22c55e",
            BadgeColor::Yellow => "#eab308",
            BadgeColor::Red => "#ef4444",
        }
    }
}
