//! Value-to-pixel mapping for time-series charts.
//!
//! A [`ScaleEngine`] is built from a series, the limit band and a
//! [`ScaleMode`]. It fixes the visible value range once and then maps
//! `(index, value)` pairs affinely onto a padded drawing area.

/// Share of the series span added above and below in auto mode
pub const AUTO_PAD_RATIO: f64 = 0.06;

/// How far past the limit band the auto range may reach, as a share of the band span
pub const BAND_CLAMP_RATIO: f64 = 0.02;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScaleMode {
    /// Visible range is the limit band verbatim
    Fixed,
    /// Visible range follows the series, padded, then held near the band
    #[default]
    Auto,
}

impl ScaleMode {
    pub fn toggled(self) -> Self {
        match self {
            ScaleMode::Fixed => ScaleMode::Auto,
            ScaleMode::Auto => ScaleMode::Fixed,
        }
    }
}

/// Closed value interval `[min, max]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Range {
    pub min: f64,
    pub max: f64,
}

impl Range {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn span(&self) -> f64 {
        self.max - self.min
    }

    pub fn contains(&self, v: f64) -> bool {
        self.min <= v && v <= self.max
    }

    /// Guarantee a positive span: `max = min + 1` when `max <= min`
    pub fn guarded(self) -> Self {
        if self.max > self.min {
            self
        } else {
            Self::new(self.min, self.min + 1.0)
        }
    }
}

/// Padded drawing area inside a `width` x `height` surface
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlotArea {
    pub width: f64,
    pub height: f64,
    pub pad_left: f64,
    pub pad_right: f64,
    pub pad_top: f64,
    pub pad_bottom: f64,
}

impl PlotArea {
    /// Equal horizontal and equal vertical padding
    pub fn symmetric(width: f64, height: f64, pad_x: f64, pad_y: f64) -> Self {
        Self {
            width,
            height,
            pad_left: pad_x,
            pad_right: pad_x,
            pad_top: pad_y,
            pad_bottom: pad_y,
        }
    }

    pub fn inner_width(&self) -> f64 {
        self.width - self.pad_left - self.pad_right
    }

    pub fn inner_height(&self) -> f64 {
        self.height - self.pad_top - self.pad_bottom
    }

    /// `y` of `v` within `range`; larger values sit higher (smaller `y`)
    pub fn y_of(&self, v: f64, range: Range) -> f64 {
        let t = (v - range.min) / (range.max - range.min);
        self.pad_top + (1.0 - t) * self.inner_height()
    }
}

/// Visible range for `series` under `mode`, given the band `[lower, upper]`.
/// An empty series always falls back to the band.
pub fn visible_range(series: &[f64], lower: f64, upper: f64, mode: ScaleMode) -> Range {
    let range = match mode {
        ScaleMode::Auto if !series.is_empty() => auto_range(series, lower, upper),
        _ => Range::new(lower, upper),
    };
    range.guarded()
}

fn auto_range(series: &[f64], lower: f64, upper: f64) -> Range {
    let (smin, smax) = series
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));

    let mut span = smax - smin;
    if !(span > 0.0) {
        span = 1.0;
    }
    let pad = span * AUTO_PAD_RATIO;

    let band_pad = (upper - lower) * BAND_CLAMP_RATIO;
    Range::new(
        (smin - pad).max(lower - band_pad),
        (smax + pad).min(upper + band_pad),
    )
}

/// Affine mapping of a fixed-length series onto a plot area
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleEngine {
    range: Range,
    len: usize,
    area: PlotArea,
}

impl ScaleEngine {
    pub fn new(series: &[f64], lower: f64, upper: f64, mode: ScaleMode, area: PlotArea) -> Self {
        Self {
            range: visible_range(series, lower, upper, mode),
            len: series.len(),
            area,
        }
    }

    pub fn range(&self) -> Range {
        self.range
    }

    pub fn area(&self) -> PlotArea {
        self.area
    }

    /// `x = leftPad + i/(N-1) * innerWidth`. A single point sits on the left pad.
    pub fn x(&self, i: usize) -> f64 {
        if self.len < 2 {
            return self.area.pad_left;
        }
        self.area.pad_left + (i as f64 / (self.len - 1) as f64) * self.area.inner_width()
    }

    pub fn y(&self, v: f64) -> f64 {
        self.area.y_of(v, self.range)
    }

    pub fn point(&self, i: usize, v: f64) -> (f64, f64) {
        (self.x(i), self.y(v))
    }

    /// Map a whole series
    pub fn map_series(&self, series: &[f64]) -> Vec<(f64, f64)> {
        series
            .iter()
            .enumerate()
            .map(|(i, &v)| self.point(i, v))
            .collect()
    }
}
