use mzpeaks::coordinate::SimpleInterval;
use thiserror::Error;

use crate::io::source::interval_contains;

/// The relative slack allowed when checking that a spectrum's start time lies
/// inside the resolved time range
pub const TIME_TOLERANCE: f64 = 1e-9;

/// Reasons a [`GridRequest`] is rejected before any state is touched
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    #[error("The number of time bins must be positive")]
    ZeroTimeBins,
    #[error("The number of m/z bins must be positive")]
    ZeroMZBins,
    #[error("The time range {start} to {end} is inverted")]
    InvertedTimeRange { start: f64, end: f64 },
    #[error("The m/z range {start} to {end} is empty or inverted")]
    InvertedMZRange { start: f64, end: f64 },
    #[error("Range bounds must be numbers and m/z bounds must be finite")]
    NonFiniteBound,
}

/// What a caller asks for: which spectra to select and how finely to sample them.
///
/// The time range only selects spectra. The resolved [`GridGeometry`] spans the
/// start times of the spectra actually found, and may use fewer time bins than
/// requested.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GridRequest {
    pub ms_level: u8,
    pub time_range: SimpleInterval<f64>,
    pub mz_range: SimpleInterval<f64>,
    pub time_bins: usize,
    pub mz_bins: usize,
    pub interpolate: bool,
}

impl GridRequest {
    pub fn new(
        ms_level: u8,
        time_range: SimpleInterval<f64>,
        mz_range: SimpleInterval<f64>,
        time_bins: usize,
        mz_bins: usize,
    ) -> Self {
        Self {
            ms_level,
            time_range,
            mz_range,
            time_bins,
            mz_bins,
            interpolate: false,
        }
    }

    pub fn with_ms_level(mut self, ms_level: u8) -> Self {
        self.ms_level = ms_level;
        self
    }

    pub fn with_time_range(mut self, time_range: SimpleInterval<f64>) -> Self {
        self.time_range = time_range;
        self
    }

    pub fn with_mz_range(mut self, mz_range: SimpleInterval<f64>) -> Self {
        self.mz_range = mz_range;
        self
    }

    pub fn with_resolution(mut self, time_bins: usize, mz_bins: usize) -> Self {
        self.time_bins = time_bins;
        self.mz_bins = mz_bins;
        self
    }

    pub fn with_interpolate(mut self, interpolate: bool) -> Self {
        self.interpolate = interpolate;
        self
    }

    /// Check the request is usable.
    ///
    /// The time range may be unbounded, but not inverted. The m/z range must be
    /// finite and non-empty since it defines the bin width directly.
    pub fn validate(&self) -> Result<(), GeometryError> {
        if self.time_bins == 0 {
            return Err(GeometryError::ZeroTimeBins);
        }
        if self.mz_bins == 0 {
            return Err(GeometryError::ZeroMZBins);
        }
        let time = &self.time_range;
        let mz = &self.mz_range;
        if time.start.is_nan() || time.end.is_nan() || !mz.start.is_finite() || !mz.end.is_finite()
        {
            return Err(GeometryError::NonFiniteBound);
        }
        if time.start > time.end {
            return Err(GeometryError::InvertedTimeRange {
                start: time.start,
                end: time.end,
            });
        }
        if mz.start >= mz.end {
            return Err(GeometryError::InvertedMZRange {
                start: mz.start,
                end: mz.end,
            });
        }
        Ok(())
    }
}

/// The resolved bounds, steps and bin counts of one grid pass. Everything needed
/// to map between data coordinates and cell indices.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GridGeometry {
    pub time_min: f64,
    pub time_max: f64,
    pub time_step: f64,
    pub mz_min: f64,
    pub mz_max: f64,
    pub mz_step: f64,
    pub time_bins: usize,
    pub mz_bins: usize,
    pub ms_level: u8,
    pub interpolate: bool,
}

impl GridGeometry {
    /// Resolve `request` against the start times of the spectra it selected.
    ///
    /// The time bin count is clamped to the number of spectra, and the time bounds
    /// become the earliest and latest of `start_times`. With no spectra the grid has
    /// no time bins and keeps the finite parts of the requested time range.
    pub fn resolve(request: &GridRequest, start_times: &[f64]) -> Self {
        let time_bins = request.time_bins.min(start_times.len());
        let (time_min, time_max) = if start_times.is_empty() {
            let finite_or_zero = |v: f64| if v.is_finite() { v } else { 0.0 };
            (
                finite_or_zero(request.time_range.start),
                finite_or_zero(request.time_range.end),
            )
        } else {
            start_times
                .iter()
                .copied()
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), t| {
                    (lo.min(t), hi.max(t))
                })
        };
        let time_step = if time_bins > 1 {
            (time_max - time_min) / (time_bins - 1) as f64
        } else {
            0.0
        };
        let mz_min = request.mz_range.start;
        let mz_max = request.mz_range.end;
        Self {
            time_min,
            time_max,
            time_step,
            mz_min,
            mz_max,
            mz_step: (mz_max - mz_min) / request.mz_bins as f64,
            time_bins,
            mz_bins: request.mz_bins,
            ms_level: request.ms_level,
            interpolate: request.interpolate,
        }
    }

    /// Whether the grid has no cells at all
    pub fn is_empty(&self) -> bool {
        self.time_bins == 0 || self.mz_bins == 0
    }

    /// `(time_bins, mz_bins)`
    pub fn dimensions(&self) -> (usize, usize) {
        (self.time_bins, self.mz_bins)
    }

    pub fn time_range(&self) -> SimpleInterval<f64> {
        SimpleInterval::new(self.time_min, self.time_max)
    }

    pub fn mz_range(&self) -> SimpleInterval<f64> {
        SimpleInterval::new(self.mz_min, self.mz_max)
    }

    /// Whether `time` lies in `[time_min, time_max]`, up to [`TIME_TOLERANCE`]
    /// relative to the magnitude of the bounds
    pub fn contains_time(&self, time: f64) -> bool {
        let scale = 1.0 + self.time_min.abs().max(self.time_max.abs());
        let slack = TIME_TOLERANCE * scale;
        let widened = SimpleInterval::new(self.time_min - slack, self.time_max + slack);
        interval_contains(&widened, time)
    }

    /// The time bin `time` falls in, clamped to the grid. `None` for a grid with no
    /// time bins.
    pub fn time_bin_of(&self, time: f64) -> Option<usize> {
        if self.time_bins == 0 {
            return None;
        }
        if !(self.time_step > 0.0) {
            return Some(0);
        }
        let i = ((time - self.time_min) / self.time_step).floor().max(0.0) as usize;
        Some(i.min(self.time_bins - 1))
    }

    /// The time at the lower edge of time bin `index`
    pub fn time_of_bin(&self, index: usize) -> f64 {
        self.time_min + index as f64 * self.time_step
    }

    /// The m/z bin `mz` falls in, counted from the lowest m/z. `mz_max` falls in the
    /// last bin, anything outside the range has no bin.
    pub fn mz_bin_of(&self, mz: f64) -> Option<usize> {
        if self.mz_bins == 0 || !interval_contains(&self.mz_range(), mz) {
            return None;
        }
        let j = ((mz - self.mz_min) / self.mz_step) as usize;
        Some(j.min(self.mz_bins - 1))
    }

    /// Grid columns run from high m/z to low m/z, so m/z bin `j` is stored in
    /// column `mz_bins - 1 - j`. The mapping is its own inverse.
    #[inline]
    pub fn column_of_mz_bin(&self, mz_bin: usize) -> usize {
        self.mz_bins - 1 - mz_bin
    }

    /// The `[lower, upper)` m/z bounds of grid column `column`
    pub fn mz_bounds_of_column(&self, column: usize) -> (f64, f64) {
        let j = self.column_of_mz_bin(column);
        let lower = self.mz_min + j as f64 * self.mz_step;
        (lower, lower + self.mz_step)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn request() -> GridRequest {
        GridRequest::new(
            1,
            SimpleInterval::new(0.0, 100.0),
            SimpleInterval::new(100.0, 600.0),
            20,
            50,
        )
    }

    #[test]
    fn test_validate() {
        assert!(request().validate().is_ok());
        assert_eq!(
            request().with_resolution(0, 10).validate(),
            Err(GeometryError::ZeroTimeBins)
        );
        assert_eq!(
            request().with_resolution(10, 0).validate(),
            Err(GeometryError::ZeroMZBins)
        );
        assert_eq!(
            request()
                .with_time_range(SimpleInterval::new(5.0, 1.0))
                .validate(),
            Err(GeometryError::InvertedTimeRange {
                start: 5.0,
                end: 1.0
            })
        );
        assert!(matches!(
            request()
                .with_mz_range(SimpleInterval::new(600.0, 600.0))
                .validate(),
            Err(GeometryError::InvertedMZRange { .. })
        ));
        assert_eq!(
            request()
                .with_mz_range(SimpleInterval::new(0.0, f64::INFINITY))
                .validate(),
            Err(GeometryError::NonFiniteBound)
        );
        assert!(request()
            .with_time_range(SimpleInterval::new(f64::NEG_INFINITY, f64::INFINITY))
            .validate()
            .is_ok());
    }

    #[test]
    fn test_resolve_clamps_to_spectra() {
        let times: Vec<f64> = (0..10).map(|i| i as f64 + 2.0).collect();
        let geom = GridGeometry::resolve(&request(), &times);
        assert_eq!(geom.time_bins, 10);
        assert_eq!(geom.mz_bins, 50);
        assert_eq!(geom.time_min, 2.0);
        assert_eq!(geom.time_max, 11.0);
        assert_eq!(geom.time_step, 1.0);
        assert_eq!(geom.mz_step, 10.0);

        let geom = GridGeometry::resolve(&request().with_resolution(4, 50), &times);
        assert_eq!(geom.time_bins, 4);
        assert_eq!(geom.time_step, 3.0);
    }

    #[test]
    fn test_resolve_empty() {
        let geom = GridGeometry::resolve(&request(), &[]);
        assert_eq!(geom.time_bins, 0);
        assert!(geom.is_empty());
        assert_eq!(geom.time_min, 0.0);
        assert_eq!(geom.time_max, 100.0);
        assert_eq!(geom.time_bin_of(5.0), None);
    }

    #[test]
    fn test_time_bins() {
        let times: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let geom = GridGeometry::resolve(&request().with_resolution(4, 50), &times);
        assert_eq!(geom.time_bin_of(0.0), Some(0));
        assert_eq!(geom.time_bin_of(2.9), Some(0));
        assert_eq!(geom.time_bin_of(3.0), Some(1));
        assert_eq!(geom.time_bin_of(9.0), Some(3));
        assert_eq!(geom.time_bin_of(-4.0), Some(0));
        assert_eq!(geom.time_bin_of(40.0), Some(3));
        assert_eq!(geom.time_of_bin(2), 6.0);
        assert!(geom.contains_time(9.0));
        assert!(!geom.contains_time(9.1));

        let single = GridGeometry::resolve(&request(), &[4.0, 4.0]);
        assert_eq!(single.time_step, 0.0);
        assert_eq!(single.time_bin_of(4.0), Some(0));
    }

    #[test]
    fn test_mz_columns() {
        let geom = GridGeometry::resolve(&request(), &[1.0]);
        assert_eq!(geom.mz_bin_of(100.0), Some(0));
        assert_eq!(geom.mz_bin_of(600.0), Some(49));
        assert_eq!(geom.mz_bin_of(99.0), None);
        assert_eq!(geom.column_of_mz_bin(0), 49);
        assert_eq!(geom.column_of_mz_bin(49), 0);
        assert_eq!(geom.mz_bounds_of_column(49), (100.0, 110.0));
        assert_eq!(geom.mz_bounds_of_column(0), (590.0, 600.0));
    }
}
