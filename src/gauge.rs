//! Dial geometry and a character-grid rendering of the gauge.
//!
//! Angles are in degrees, 0 at 12 o'clock, increasing clockwise. The default
//! axis runs 0..100 from 270 (9 o'clock) over the top to 90 (3 o'clock).

pub const ANNOTATION: &str = "Speedometer";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaugeAxis {
    pub minimum: f64,
    pub maximum: f64,
    pub start_angle: f64,
    pub end_angle: f64,
}

impl Default for GaugeAxis {
    fn default() -> Self {
        Self {
            minimum: 0.0,
            maximum: 100.0,
            start_angle: 270.0,
            end_angle: 90.0,
        }
    }
}

impl GaugeAxis {
    pub fn with_maximum(maximum: f64) -> Self {
        Self {
            maximum,
            ..Self::default()
        }
    }

    /// Pointer values are pinned to the axis range.
    pub fn clamp(&self, value: f64) -> f64 {
        if value.is_nan() {
            return self.minimum;
        }
        value.clamp(self.minimum, self.maximum)
    }

    /// Clockwise sweep from start to end angle.
    pub fn sweep(&self) -> f64 {
        let sweep = (self.end_angle - self.start_angle).rem_euclid(360.0);
        if sweep == 0.0 {
            360.0
        } else {
            sweep
        }
    }

    pub fn angle_for(&self, value: f64) -> f64 {
        let span = self.maximum - self.minimum;
        let fraction = if span > 0.0 {
            (self.clamp(value) - self.minimum) / span
        } else {
            0.0
        };
        (self.start_angle + self.sweep() * fraction).rem_euclid(360.0)
    }

    /// Evenly spaced major tick values, both ends included.
    pub fn ticks(&self, count: usize) -> Vec<f64> {
        if count < 2 {
            return vec![self.minimum];
        }
        let step = (self.maximum - self.minimum) / (count - 1) as f64;
        (0..count).map(|i| self.minimum + step * i as f64).collect()
    }
}

/// Fixed-size character grid holding one rendered dial.
///
/// Terminal cells are about twice as tall as wide, so the horizontal radius
/// is twice the vertical one.
pub struct DialCanvas {
    grid: Vec<Vec<char>>,
    center_x: f64,
    center_y: f64,
    radius_y: f64,
}

impl DialCanvas {
    pub fn new(radius_y: usize) -> Self {
        let radius_x = radius_y * 2;
        let width = radius_x * 2 + 11;
        let height = radius_y + 5;
        Self {
            grid: vec![vec![' '; width]; height],
            center_x: (width / 2) as f64,
            center_y: (radius_y + 2) as f64,
            radius_y: radius_y as f64,
        }
    }

    pub fn char_at(&self, x: usize, y: usize) -> Option<char> {
        self.grid.get(y).and_then(|row| row.get(x)).copied()
    }

    pub fn center(&self) -> (usize, usize) {
        (self.center_x as usize, self.center_y as usize)
    }

    /// Grid position of a point at `angle` and `radius` (fraction of the dial radius).
    fn project(&self, angle: f64, radius: f64) -> (f64, f64) {
        let theta = angle.to_radians();
        let x = self.center_x + theta.sin() * radius * self.radius_y * 2.0;
        let y = self.center_y - theta.cos() * radius * self.radius_y;
        (x, y)
    }

    fn plot(&mut self, x: f64, y: f64, c: char) {
        let (x, y) = (x.round(), y.round());
        if x < 0.0 || y < 0.0 {
            return;
        }
        if let Some(cell) = self
            .grid
            .get_mut(y as usize)
            .and_then(|row| row.get_mut(x as usize))
        {
            *cell = c;
        }
    }

    fn text(&mut self, x: f64, y: f64, text: &str) {
        let start = x - (text.chars().count() as f64 - 1.0) / 2.0;
        for (i, c) in text.chars().enumerate() {
            self.plot(start + i as f64, y, c);
        }
    }

    pub fn draw(&mut self, axis: &GaugeAxis, value: f64) {
        let steps = (axis.sweep() * 2.0) as usize;
        for i in 0..=steps {
            let angle = axis.start_angle + i as f64 * 0.5;
            let (x, y) = self.project(angle, 1.0);
            self.plot(x, y, '·');
        }

        for tick in axis.ticks(6) {
            let angle = axis.angle_for(tick);
            let (x, y) = self.project(angle, 1.0);
            self.plot(x, y, '┼');
            let (lx, ly) = self.project(angle, 1.25);
            self.text(lx, ly, &format!("{}", tick.round() as i64));
        }

        let angle = axis.angle_for(value);
        let samples = (self.radius_y * 4.0) as usize;
        for i in 1..=samples {
            let (x, y) = self.project(angle, 0.8 * i as f64 / samples as f64);
            self.plot(x, y, '*');
        }
        self.plot(self.center_x, self.center_y, 'O');

        let (ax, ay) = self.project(180.0, 0.2);
        self.text(ax, ay, ANNOTATION);
    }

    pub fn lines(&self) -> Vec<String> {
        self.grid
            .iter()
            .map(|row| row.iter().collect::<String>().trim_end().to_string())
            .collect()
    }
}

pub fn render_dial(axis: &GaugeAxis, value: f64, radius_y: usize) -> Vec<String> {
    let mut canvas = DialCanvas::new(radius_y);
    canvas.draw(axis, value);
    canvas.lines()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_default_axis_is_upper_half() {
        let axis = GaugeAxis::default();
        assert_relative_eq!(axis.sweep(), 180.0);
        assert_relative_eq!(axis.angle_for(0.0), 270.0);
        assert_relative_eq!(axis.angle_for(50.0), 0.0);
        assert_relative_eq!(axis.angle_for(100.0), 90.0);
        assert_relative_eq!(axis.angle_for(25.0), 315.0);
    }

    #[test]
    fn test_pointer_is_bounded() {
        let axis = GaugeAxis::default();
        assert_relative_eq!(axis.angle_for(250.0), axis.angle_for(100.0));
        assert_relative_eq!(axis.angle_for(-5.0), axis.angle_for(0.0));
        assert_relative_eq!(axis.clamp(f64::NAN), 0.0);
    }

    #[test]
    fn test_ticks() {
        let axis = GaugeAxis::with_maximum(200.0);
        assert_eq!(axis.ticks(6), vec![0.0, 40.0, 80.0, 120.0, 160.0, 200.0]);
    }

    fn needle_cells(value: f64) -> (DialCanvas, (usize, usize)) {
        let mut canvas = DialCanvas::new(8);
        canvas.draw(&GaugeAxis::default(), value);
        let center = canvas.center();
        (canvas, center)
    }

    #[test]
    fn test_needle_points_left_at_zero() {
        let (canvas, (cx, cy)) = needle_cells(0.0);
        assert_eq!(canvas.char_at(cx - 3, cy), Some('*'));
        assert_ne!(canvas.char_at(cx + 3, cy), Some('*'));
    }

    #[test]
    fn test_needle_points_up_at_midpoint() {
        let (canvas, (cx, cy)) = needle_cells(50.0);
        assert_eq!(canvas.char_at(cx, cy - 3), Some('*'));
        assert_ne!(canvas.char_at(cx - 3, cy), Some('*'));
    }

    #[test]
    fn test_needle_points_right_at_maximum() {
        let (canvas, (cx, cy)) = needle_cells(100.0);
        assert_eq!(canvas.char_at(cx + 3, cy), Some('*'));
    }

    #[test]
    fn test_annotation_below_center() {
        let lines = render_dial(&GaugeAxis::default(), 0.0, 8);
        let label_row = lines.iter().position(|l| l.contains(ANNOTATION)).unwrap();
        assert!(label_row > 8 + 2);
        assert!(lines[0].contains("40"));
        assert!(lines[0].contains("60"));
    }
}
