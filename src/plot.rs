// SPDX: CC0-1.0

use crate::{engine, Number, Point};
use core::{fmt, num::NonZeroU16, ops::Range};
use std::sync::Arc;

/// Number of user functions a plot can hold.
pub const MAX_FUNCTIONS: usize = 5;

/// One slot per function, then one per derivative at `MAX_FUNCTIONS` offset.
pub const CURVE_SLOTS: usize = 2 * MAX_FUNCTIONS;

/// Blank border around the plotting area, in pixels.
pub const PAD: Number = 20.0;

pub const POINT_SIZE: Number = 4.0;
pub const TICK_SIZE: Number = 3.0;

/// Upper bound on tick marks per axis.
pub const MAX_TICKS: usize = 1000;

#[derive(Clone, Debug, PartialEq)]
pub struct PlotConfig {
    pub x: Range<Number>,
    pub y: Range<Number>,
    pub points: NonZeroU16,
    pub rectangles: NonZeroU16,
    /// Bounds `a..b` of the rectangle-rule integral.
    pub integral: Range<Number>,
    pub show_derivative: bool,
    pub logarithmic: bool,
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            x: -5.0..5.0,
            y: -5.0..5.0,
            points: NonZeroU16::MIN.saturating_add(9),
            rectangles: NonZeroU16::MIN.saturating_add(9),
            integral: 0.0..0.0,
            show_derivative: false,
            logarithmic: false,
        }
    }
}

impl PlotConfig {
    /// Values printed at the ends of the y axis. On a logarithmic plot the
    /// geometry uses the log range while the labels show `10^y`.
    pub fn y_labels(&self) -> Range<Number> {
        if self.logarithmic {
            let (min, max) = engine::log_extremes(self.y.start, self.y.end);
            min..max
        } else {
            self.y.clone()
        }
    }
}

impl fmt::Display for PlotConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlotConfig")
            .field("x range", &self.x)
            .field("y range", &self.y)
            .field("points", &self.points)
            .field("rectangles", &self.rectangles)
            .field("integral", &self.integral)
            .field("show derivative", &self.show_derivative)
            .field("logarithmic", &self.logarithmic)
            .finish()
    }
}

/// Paired samples. The x values are shared between the curves of one redraw.
#[derive(Clone, Debug, PartialEq)]
pub struct Curve {
    x: Arc<[Number]>,
    y: Vec<Number>,
}

impl Curve {
    /// `None` unless both sequences have the same length.
    pub fn new(x: Arc<[Number]>, y: Vec<Number>) -> Option<Self> {
        (x.len() == y.len()).then_some(Self { x, y })
    }

    pub fn x(&self) -> &[Number] {
        &self.x
    }

    pub fn y(&self) -> &[Number] {
        &self.y
    }

    pub fn len(&self) -> usize {
        self.y.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn points(&self) -> impl Iterator<Item = Point<Number>> + '_ {
        self.x
            .iter()
            .zip(&self.y)
            .map(|(&x, &y)| Point::new(x, y))
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct CurveSet {
    slots: [Option<Curve>; CURVE_SLOTS],
}

impl CurveSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub const fn derivative_slot(function: usize) -> usize {
        function + MAX_FUNCTIONS
    }

    /// Puts `curve` in `slot`, returning it back if the slot does not exist.
    pub fn insert(&mut self, slot: usize, curve: Curve) -> Result<(), Curve> {
        match self.slots.get_mut(slot) {
            Some(dst) => {
                *dst = Some(curve);
                Ok(())
            }
            None => Err(curve),
        }
    }

    pub fn get(&self, slot: usize) -> Option<&Curve> {
        self.slots.get(slot)?.as_ref()
    }

    /// Occupied slots in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &Curve)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(slot, curve)| Some((slot, curve.as_ref()?)))
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub const BLACK: Self = Self::rgb(0, 0, 0);
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

pub const PALETTE: [Color; 10] = [
    Color::rgb(0, 0, 255),     // blue
    Color::rgb(0, 255, 0),     // green
    Color::rgb(0, 255, 255),   // cyan
    Color::rgb(255, 0, 0),     // red
    Color::rgb(255, 255, 0),   // yellow
    Color::rgb(0, 0, 0),       // black
    Color::rgb(255, 0, 255),   // magenta
    Color::rgb(255, 200, 0),   // orange
    Color::rgb(255, 175, 175), // pink
    Color::rgb(255, 255, 255), // white
];

pub const fn curve_color(slot: usize) -> Color {
    PALETTE[slot % PALETTE.len()]
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Canvas {
    pub width: Number,
    pub height: Number,
}

impl Default for Canvas {
    fn default() -> Self {
        Self {
            width: 1100.0,
            height: 500.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Line {
    pub from: Point<Number>,
    pub to: Point<Number>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Anchor {
    Start,
    End,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Baseline {
    /// text sits on top of the point
    Above,
    /// text hangs below the point
    Below,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Label {
    pub text: String,
    pub at: Point<Number>,
    pub anchor: Anchor,
    pub baseline: Baseline,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CurvePath {
    pub slot: usize,
    pub color: Color,
    pub points: Vec<Point<Number>>,
}

impl CurvePath {
    /// Lines between consecutive samples, in sample order, snapped to whole
    /// pixels by truncation.
    pub fn segments(&self) -> impl Iterator<Item = (Point<i32>, Point<i32>)> + '_ {
        let snap = |p: &Point<Number>| Point::new(p.x as i32, p.y as i32);
        self.points
            .windows(2)
            .map(move |pair| (snap(&pair[0]), snap(&pair[1])))
    }
}

/// Pixel-space geometry of one plot. Pixel y grows downwards.
#[derive(Clone, Debug, PartialEq)]
pub struct Scene {
    pub canvas: Canvas,
    pub x_axis: Line,
    pub y_axis: Line,
    pub x_ticks: Vec<Point<Number>>,
    pub y_ticks: Vec<Point<Number>>,
    pub curves: Vec<CurvePath>,
    pub labels: Vec<Label>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlotErr {
    EmptyRange { axis: char },
    CanvasTooSmall,
}

impl fmt::Display for PlotErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyRange { axis } => {
                write!(f, "{axis} max must be a number greater than {axis} min")
            }
            Self::CanvasTooSmall => write!(f, "canvas leaves no room inside the padding"),
        }
    }
}

impl std::error::Error for PlotErr {}

/// Pixel position of the axis along one dimension (`origin`, measured from
/// the low edge) and the pixel position of data value zero (`offset`).
///
/// When zero is outside the range the axis is clamped to the nearer edge.
fn place_axis(range: &Range<Number>, scale: Number, extent: Number) -> (Number, Number) {
    if range.end < 0.0 {
        let origin = extent - PAD;
        (origin, origin - scale * range.end)
    } else if range.start < 0.0 {
        let origin = PAD - scale * range.start;
        (origin, origin)
    } else {
        (PAD, PAD - scale * range.start)
    }
}

// integer data values inside the range
fn integer_ticks(range: &Range<Number>) -> impl Iterator<Item = Number> {
    let first = range.start.ceil();
    let end = range.end;
    (0..MAX_TICKS)
        .map(move |k| first + k as Number)
        .take_while(move |v| *v <= end)
}

fn check_range(range: &Range<Number>, axis: char) -> Result<(), PlotErr> {
    if range.start.is_finite() && range.end.is_finite() && range.end > range.start {
        Ok(())
    } else {
        Err(PlotErr::EmptyRange { axis })
    }
}

/// Maps the curves and bounds of `config` onto `canvas`.
///
/// Samples are connected in the order they are stored; nothing is sorted.
pub fn map(config: &PlotConfig, curves: &CurveSet, canvas: Canvas) -> Result<Scene, PlotErr> {
    check_range(&config.x, 'x')?;
    check_range(&config.y, 'y')?;
    if canvas.width <= 2.0 * PAD || canvas.height <= 2.0 * PAD {
        return Err(PlotErr::CanvasTooSmall);
    }

    let Canvas { width: w, height: h } = canvas;
    let (x, y) = (&config.x, &config.y);
    let scale = Point::new(
        (w - 2.0 * PAD) / (x.end - x.start),
        (h - 2.0 * PAD) / (y.end - y.start),
    );
    let (origin_x, offset_x) = place_axis(x, scale.x, w);
    let (origin_y, offset_y) = place_axis(y, scale.y, h);

    // screen row of the x axis
    let axis_row = h - origin_y;

    let x_axis = Line {
        from: Point::new(PAD, axis_row),
        to: Point::new(w - PAD, axis_row),
    };
    let y_axis = Line {
        from: Point::new(origin_x, PAD),
        to: Point::new(origin_x, h - PAD),
    };

    let x_ticks = integer_ticks(x)
        .map(|v| Point::new(offset_x + scale.x * v, axis_row))
        .collect();
    let y_ticks = integer_ticks(y)
        .map(|v| Point::new(origin_x, h - offset_y - scale.y * v))
        .collect();

    let curves = curves
        .iter()
        .map(|(slot, curve)| CurvePath {
            slot,
            color: curve_color(slot),
            points: curve
                .points()
                .map(|p| Point::new(offset_x + scale.x * p.x, h - offset_y - scale.y * p.y))
                .collect(),
        })
        .collect();

    let y_labels = config.y_labels();
    let labels = vec![
        Label {
            text: format!("{:.1}", x.start),
            at: Point::new(offset_x + scale.x * x.start, axis_row),
            anchor: Anchor::Start,
            baseline: Baseline::Below,
        },
        Label {
            text: format!("{:.1}", x.end),
            at: Point::new(offset_x + scale.x * x.end, axis_row),
            anchor: Anchor::End,
            baseline: Baseline::Below,
        },
        Label {
            text: format!("{:.1}", y_labels.end),
            at: Point::new(origin_x + 1.0, offset_y + scale.y * y.start),
            anchor: Anchor::Start,
            baseline: Baseline::Below,
        },
        Label {
            text: format!("{:.1}", y_labels.start),
            at: Point::new(origin_x + 1.0, offset_y + scale.y * y.end),
            anchor: Anchor::Start,
            baseline: Baseline::Above,
        },
    ];

    Ok(Scene {
        canvas,
        x_axis,
        y_axis,
        x_ticks,
        y_ticks,
        curves,
        labels,
    })
}
