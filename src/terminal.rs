use crossterm::{
    cursor, execute, queue,
    style::{Attribute, Color, Print, ResetColor, SetAttribute, SetBackgroundColor, SetForegroundColor},
    terminal::{self, ClearType, EnterAlternateScreen, LeaveAlternateScreen},
};
use std::io::{self, Stdout, Write};
use tokio::time::{sleep, Duration};

use crate::gauge::{render_dial, GaugeAxis};
use crate::live_status::{LiveStatus, SharedStatus};
use crate::signal::BadgeColor;
use crate::view::SpeedView;

const DIAL_RADIUS: usize = 10;

impl From<BadgeColor> for Color {
    fn from(color: BadgeColor) -> Self {
        match color {
            BadgeColor::Green => Color::Green,
            BadgeColor::Yellow => Color::Yellow,
            BadgeColor::Red => Color::Red,
        }
    }
}

pub struct TerminalRenderer {
    out: Stdout,
    axis: GaugeAxis,
}

impl TerminalRenderer {
    pub fn new(axis: GaugeAxis) -> io::Result<Self> {
        let mut out = io::stdout();
        execute!(out, EnterAlternateScreen, cursor::Hide)?;
        Ok(Self { out, axis })
    }

    pub fn draw(&mut self, status: &LiveStatus) -> io::Result<()> {
        let view = SpeedView::from_status(status);
        let (width, _) = terminal::size().unwrap_or((80, 24));

        queue!(
            self.out,
            cursor::MoveTo(0, 0),
            terminal::Clear(ClearType::All),
            SetAttribute(Attribute::Bold),
            Print("GPS Speedometer"),
            SetAttribute(Attribute::Reset),
        )?;

        let badge = format!(" {} ", view.badge);
        let badge_col = width.saturating_sub(badge.chars().count() as u16 + 1);
        queue!(
            self.out,
            cursor::MoveTo(badge_col, 0),
            SetBackgroundColor(view.badge_color.into()),
            SetForegroundColor(Color::White),
            SetAttribute(Attribute::Bold),
            Print(&badge),
            SetAttribute(Attribute::Reset),
            ResetColor,
        )?;

        let mut row = 2u16;
        for line in render_dial(&self.axis, view.pointer, DIAL_RADIUS) {
            queue!(self.out, cursor::MoveTo(0, row))?;
            for c in line.chars() {
                match c {
                    '*' | 'O' => queue!(self.out, SetForegroundColor(Color::DarkRed), Print(c), ResetColor)?,
                    _ => queue!(self.out, Print(c))?,
                }
            }
            row += 1;
        }

        row += 1;
        queue!(
            self.out,
            cursor::MoveTo(2, row),
            SetAttribute(Attribute::Bold),
            Print(format!("{} km/h", view.kph)),
            SetAttribute(Attribute::Reset),
        )?;
        if let (Some(arrow), Some(color)) = (view.arrow, SpeedView::arrow_color(status.change)) {
            queue!(
                self.out,
                Print(" "),
                SetForegroundColor(color.into()),
                Print(arrow),
                ResetColor,
            )?;
        }

        queue!(
            self.out,
            cursor::MoveTo(2, row + 1),
            Print(format!("{} mph", view.mph)),
            cursor::MoveTo(0, row + 3),
            SetForegroundColor(Color::DarkGrey),
            Print(format!(
                "fixes {}/{} accepted | location errors {} | telemetry {} sent, {} failed | accuracy {:.1} m",
                status.readings_accepted,
                status.readings_observed,
                status.location_errors,
                status.telemetry_sent,
                status.telemetry_failed,
                status.gps_accuracy
            )),
            ResetColor,
        )?;

        self.out.flush()
    }
}

/// Leave the alternate screen and show the cursor again.
pub fn restore() -> io::Result<()> {
    let mut out = io::stdout();
    execute!(out, ResetColor, cursor::Show, LeaveAlternateScreen)
}

/// Redraw whenever the shared snapshot changes. Runs until aborted.
pub async fn run_terminal(status: SharedStatus, axis: GaugeAxis, refresh: Duration) -> io::Result<()> {
    let mut renderer = TerminalRenderer::new(axis)?;
    let mut last: Option<LiveStatus> = None;

    loop {
        let snapshot = status.read().await.clone();
        let changed = last
            .as_ref()
            .map(|prev| {
                prev.readings_observed != snapshot.readings_observed
                    || prev.location_errors != snapshot.location_errors
                    || prev.telemetry_sent != snapshot.telemetry_sent
                    || prev.telemetry_failed != snapshot.telemetry_failed
            })
            .unwrap_or(true);

        if changed {
            renderer.draw(&snapshot)?;
            last = Some(snapshot);
        }

        sleep(refresh).await;
    }
}
