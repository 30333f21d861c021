use serde::Serialize;

use crate::live_status::LiveStatus;
use crate::signal::BadgeColor;
use crate::tracker::{ChangeDirection, KPH_TO_MPH};

/// Presentation values for one frame, shared by the terminal and web renderers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpeedView {
    pub kph: String,
    pub mph: String,
    pub arrow: Option<char>,
    pub badge: &'static str,
    #[serde(skip)]
    pub badge_color: BadgeColor,
    pub badge_css: &'static str,
    pub pointer: f64,
}

impl SpeedView {
    pub fn from_status(status: &LiveStatus) -> Self {
        Self {
            kph: format!("{:.2}", status.speed_kph),
            mph: format!("{:.2}", status.speed_kph * KPH_TO_MPH),
            arrow: status.change.arrow(),
            badge: status.signal.label(),
            badge_color: status.signal.color(),
            badge_css: status.signal.color().css(),
            pointer: status.speed_kph,
        }
    }

    pub fn arrow_color(change: ChangeDirection) -> Option<BadgeColor> {
        match change {
            ChangeDirection::Increase => Some(BadgeColor::Green),
            ChangeDirection::Decrease => Some(BadgeColor::Red),
            ChangeDirection::Unchanged => None,
        }
    }
}
