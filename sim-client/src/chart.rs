//! Chart frames and drawing surfaces.
//!
//! Rendering produces a [`Frame`]: an ordered list of primitives that always
//! starts with a full clear, so painting the same frame twice gives the same
//! picture. A [`Surface`] turns a frame into pixels, markup or anything else.

use sim_core::DayBar;
use std::fmt::Write as _;

use crate::config::ChartConfig;
use crate::scale::{PlotArea, Range, ScaleEngine, ScaleMode};

// ═══════════════════════════════════════════════════════════════
// LAYOUT CONSTANTS
// ═══════════════════════════════════════════════════════════════

pub const GRID_ROWS: u32 = 6;
pub const GRID_COLS: u32 = 10;

pub const TICK_PAD_X: f64 = 26.0;
pub const TICK_PAD_Y: f64 = 18.0;

pub const DAY_PAD_LEFT: f64 = 26.0;
pub const DAY_PAD_RIGHT: f64 = 26.0;
pub const DAY_PAD_TOP: f64 = 18.0;
pub const DAY_PAD_BOTTOM: f64 = 44.0;

/// Most recent bars shown in day mode
pub const DAY_WINDOW: usize = 60;
/// Candle body width as a share of the per-bar slot
pub const BODY_RATIO: f64 = 0.55;
pub const MIN_BODY_WIDTH: f64 = 3.0;
pub const MIN_BODY_HEIGHT: f64 = 2.0;

pub const DAY_PLACEHOLDER: &str = "no day bars yet (advance past a day roll)";

// ═══════════════════════════════════════════════════════════════
// COLORS
// ═══════════════════════════════════════════════════════════════

pub const GRID_COLOR: &str = "rgba(31,42,58,0.8)";
pub const SERIES_COLOR: &str = "rgba(255,255,255,0.85)";
pub const LIMIT_COLOR: &str = "rgba(255,204,102,0.55)";
pub const LABEL_COLOR: &str = "rgba(143,162,186,0.9)";
pub const WICK_COLOR: &str = "rgba(255,255,255,0.55)";
pub const UP_COLOR: &str = "rgba(120,220,160,0.75)";
pub const DOWN_COLOR: &str = "rgba(255,120,120,0.75)";

/// Line style
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stroke {
    pub color: &'static str,
    pub width: f64,
    /// Dash and gap lengths
    pub dash: Option<(f64, f64)>,
}

impl Stroke {
    pub const fn solid(color: &'static str, width: f64) -> Self {
        Self {
            color,
            width,
            dash: None,
        }
    }

    pub const fn dashed(color: &'static str, width: f64, dash: f64, gap: f64) -> Self {
        Self {
            color,
            width,
            dash: Some((dash, gap)),
        }
    }
}

/// One drawing primitive
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCmd {
    Clear {
        width: f64,
        height: f64,
    },
    Line {
        from: (f64, f64),
        to: (f64, f64),
        stroke: Stroke,
    },
    Polyline {
        points: Vec<(f64, f64)>,
        stroke: Stroke,
    },
    FillRect {
        x: f64,
        y: f64,
        w: f64,
        h: f64,
        color: &'static str,
    },
    Text {
        x: f64,
        y: f64,
        text: String,
        size: f64,
        color: &'static str,
    },
}

/// Complete redraw of one chart
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub width: f64,
    pub height: f64,
    pub commands: Vec<DrawCmd>,
}

impl Frame {
    fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            commands: vec![DrawCmd::Clear { width, height }],
        }
    }

    fn push(&mut self, cmd: DrawCmd) {
        self.commands.push(cmd);
    }

    /// Every text primitive in draw order
    pub fn texts(&self) -> Vec<&str> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                DrawCmd::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Every filled rectangle as `(x, y, w, h, color)`
    pub fn rects(&self) -> Vec<(f64, f64, f64, f64, &'static str)> {
        self.commands
            .iter()
            .filter_map(|c| match *c {
                DrawCmd::FillRect { x, y, w, h, color } => Some((x, y, w, h, color)),
                _ => None,
            })
            .collect()
    }

    /// Paint the whole frame onto `surface`
    pub fn paint<S: Surface + ?Sized>(&self, surface: &mut S) {
        surface.begin_frame(self.width, self.height);
        for cmd in &self.commands {
            match cmd {
                DrawCmd::Clear { .. } => {}
                DrawCmd::Line { from, to, stroke } => surface.draw_line(*from, *to, stroke),
                DrawCmd::Polyline { points, stroke } => surface.draw_polyline(points, stroke),
                DrawCmd::FillRect { x, y, w, h, color } => surface.fill_rect(*x, *y, *w, *h, color),
                DrawCmd::Text {
                    x,
                    y,
                    text,
                    size,
                    color,
                } => surface.fill_text(*x, *y, text, *size, color),
            }
        }
    }
}

/// Anything a frame can be painted on
pub trait Surface {
    /// Reset to an empty `width` x `height` canvas
    fn begin_frame(&mut self, width: f64, height: f64);
    fn draw_line(&mut self, from: (f64, f64), to: (f64, f64), stroke: &Stroke);
    fn draw_polyline(&mut self, points: &[(f64, f64)], stroke: &Stroke);
    fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64, color: &str);
    fn fill_text(&mut self, x: f64, y: f64, text: &str, size: f64, color: &str);
}

/// Renders frames as standalone SVG documents
#[derive(Debug, Default)]
pub struct SvgSurface {
    body: String,
    width: f64,
    height: f64,
}

impl SvgSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Finished document for the last painted frame
    pub fn to_svg(&self) -> String {
        format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\">\n\
             <rect width=\"{w}\" height=\"{h}\" fill=\"#0b1220\"/>\n{body}</svg>\n",
            w = self.width,
            h = self.height,
            body = self.body
        )
    }

    fn stroke_attrs(stroke: &Stroke) -> String {
        let mut attrs = format!(
            "stroke=\"{}\" stroke-width=\"{}\" fill=\"none\"",
            stroke.color, stroke.width
        );
        if let Some((dash, gap)) = stroke.dash {
            let _ = write!(attrs, " stroke-dasharray=\"{},{}\"", dash, gap);
        }
        attrs
    }
}

impl Surface for SvgSurface {
    fn begin_frame(&mut self, width: f64, height: f64) {
        self.body.clear();
        self.width = width;
        self.height = height;
    }

    fn draw_line(&mut self, from: (f64, f64), to: (f64, f64), stroke: &Stroke) {
        let _ = writeln!(
            self.body,
            "<line x1=\"{:.2}\" y1=\"{:.2}\" x2=\"{:.2}\" y2=\"{:.2}\" {}/>",
            from.0,
            from.1,
            to.0,
            to.1,
            Self::stroke_attrs(stroke)
        );
    }

    fn draw_polyline(&mut self, points: &[(f64, f64)], stroke: &Stroke) {
        if points.len() < 2 {
            return;
        }
        let pts: Vec<String> = points
            .iter()
            .map(|(x, y)| format!("{:.2},{:.2}", x, y))
            .collect();
        let _ = writeln!(
            self.body,
            "<polyline points=\"{}\" {}/>",
            pts.join(" "),
            Self::stroke_attrs(stroke)
        );
    }

    fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64, color: &str) {
        let _ = writeln!(
            self.body,
            "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" fill=\"{}\"/>",
            x, y, w, h, color
        );
    }

    fn fill_text(&mut self, x: f64, y: f64, text: &str, size: f64, color: &str) {
        let escaped = text
            .replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;");
        let _ = writeln!(
            self.body,
            "<text x=\"{:.2}\" y=\"{:.2}\" font-family=\"monospace\" font-size=\"{}\" fill=\"{}\">{}</text>",
            x, y, size, color, escaped
        );
    }
}

/// Produces tick and day chart frames for a fixed surface size
#[derive(Debug, Clone, Copy)]
pub struct ChartRenderer {
    width: f64,
    height: f64,
}

impl ChartRenderer {
    pub fn new(config: &ChartConfig) -> Self {
        Self {
            width: config.width,
            height: config.height,
        }
    }

    fn frame_with_grid(&self) -> Frame {
        let (w, h) = (self.width, self.height);
        let mut frame = Frame::new(w, h);
        let stroke = Stroke::solid(GRID_COLOR, 1.0);

        for i in 1..GRID_ROWS {
            let y = (h * i as f64 / GRID_ROWS as f64).round();
            frame.push(DrawCmd::Line {
                from: (0.0, y),
                to: (w, y),
                stroke,
            });
        }
        for i in 1..GRID_COLS {
            let x = (w * i as f64 / GRID_COLS as f64).round();
            frame.push(DrawCmd::Line {
                from: (x, 0.0),
                to: (x, h),
                stroke,
            });
        }
        frame
    }

    fn label(frame: &mut Frame, x: f64, y: f64, text: String, size: f64) {
        frame.push(DrawCmd::Text {
            x,
            y,
            text,
            size,
            color: LABEL_COLOR,
        });
    }

    /// Intraday line chart with dashed limit lines mapped through the series scale
    pub fn render_tick(&self, series: &[f64], limit_down: f64, limit_up: f64, mode: ScaleMode) -> Frame {
        let mut frame = self.frame_with_grid();
        let area = PlotArea::symmetric(self.width, self.height, TICK_PAD_X, TICK_PAD_Y);
        let scale = ScaleEngine::new(series, limit_down, limit_up, mode, area);

        frame.push(DrawCmd::Polyline {
            points: scale.map_series(series),
            stroke: Stroke::solid(SERIES_COLOR, 2.2),
        });

        let limit_stroke = Stroke::dashed(LIMIT_COLOR, 1.2, 6.0, 6.0);
        for price in [limit_up, limit_down] {
            let y = scale.y(price);
            frame.push(DrawCmd::Line {
                from: (TICK_PAD_X, y),
                to: (self.width - TICK_PAD_X, y),
                stroke: limit_stroke,
            });
        }

        Self::label(&mut frame, 12.0, 14.0, format!("limit up {:.2}", limit_up), 12.0);
        Self::label(&mut frame, 12.0, self.height - 6.0, format!("limit down {:.2}", limit_down), 12.0);
        frame
    }

    /// Candlesticks over the newest [`DAY_WINDOW`] bars. No padding and no band clamp.
    pub fn render_day(&self, bars: &[DayBar]) -> Frame {
        let mut frame = self.frame_with_grid();

        if bars.is_empty() {
            Self::label(&mut frame, 18.0, 26.0, DAY_PLACEHOLDER.to_string(), 14.0);
            return frame;
        }

        let window = &bars[bars.len().saturating_sub(DAY_WINDOW)..];
        let range = day_range(window);
        let area = PlotArea {
            width: self.width,
            height: self.height,
            pad_left: DAY_PAD_LEFT,
            pad_right: DAY_PAD_RIGHT,
            pad_top: DAY_PAD_TOP,
            pad_bottom: DAY_PAD_BOTTOM,
        };

        let x_step = area.inner_width() / window.len() as f64;
        let body_w = (x_step * BODY_RATIO).max(MIN_BODY_WIDTH);
        let wick = Stroke::solid(WICK_COLOR, 1.0);

        for (i, bar) in window.iter().enumerate() {
            let x = area.pad_left + i as f64 * x_step + x_step / 2.0;
            let y_open = area.y_of(bar.open, range);
            let y_close = area.y_of(bar.close, range);

            frame.push(DrawCmd::Line {
                from: (x, area.y_of(bar.high, range)),
                to: (x, area.y_of(bar.low, range)),
                stroke: wick,
            });

            let top = y_open.min(y_close);
            let bottom = y_open.max(y_close);
            frame.push(DrawCmd::FillRect {
                x: x - body_w / 2.0,
                y: top,
                w: body_w,
                h: (bottom - top).max(MIN_BODY_HEIGHT),
                color: if bar.is_up() { UP_COLOR } else { DOWN_COLOR },
            });
        }

        Self::label(&mut frame, 12.0, 14.0, format!("day high {:.2}", range.max), 12.0);
        Self::label(&mut frame, 12.0, self.height - 10.0, format!("day low {:.2}", range.min), 12.0);
        frame
    }
}

/// `[min(low), max(high)]` over `bars`, guarded against a zero span
fn day_range(bars: &[DayBar]) -> Range {
    let (lo, hi) = bars
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), b| (lo.min(b.low), hi.max(b.high)));
    Range::new(lo, hi).guarded()
}
