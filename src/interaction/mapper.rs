//! Conversions between widget pixels, grid bins and data coordinates.
//!
//! Pixel `x` grows with retention time. Pixel `y` grows downward while m/z grows
//! upward, so the top edge of the viewport is the highest m/z, matching the grid's
//! reversed column order.
use crate::grid::GridGeometry;
use crate::interaction::selection::{DataRect, PixelPoint, PixelRect};

/// The size of the widget the grid is drawn into, in pixels
#[derive(Debug, Default, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Whether either dimension is zero, negative or NaN
    pub fn is_empty(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }

    pub fn midpoint(&self) -> PixelPoint {
        PixelPoint::new(self.width / 2.0, self.height / 2.0)
    }
}

/// The time bin under pixel column `px`, clamped to `[0, time_bins - 1]`
pub fn pixel_x_to_time_bin_index(px: f64, viewport_width: f64, time_bins: usize) -> usize {
    if time_bins == 0 || !(viewport_width > 0.0) {
        return 0;
    }
    let index = (px / viewport_width * time_bins as f64).floor();
    (index.max(0.0) as usize).min(time_bins - 1)
}

/// Snap `px` to the nearest of the `time_bins` bin boundaries `k * viewport_width / time_bins`
/// for `k` in `0..time_bins`, returning the boundary's own pixel coordinate rounded to a
/// whole pixel. A point equidistant from two boundaries snaps to the lower one.
pub fn quantize_pixel_x(px: f64, viewport_width: f64, time_bins: usize) -> f64 {
    if time_bins == 0 || !(viewport_width > 0.0) {
        return 0.0;
    }
    let step = viewport_width / time_bins as f64;
    let k = (px / step - 0.5).ceil().clamp(0.0, (time_bins - 1) as f64);
    (k * step).round()
}

pub fn pixel_x_to_time(px: f64, viewport_width: f64, time_min: f64, time_max: f64) -> f64 {
    px / viewport_width * (time_max - time_min) + time_min
}

pub fn pixel_y_to_mz(py: f64, viewport_height: f64, mz_min: f64, mz_max: f64) -> f64 {
    (viewport_height - py) / viewport_height * (mz_max - mz_min) + mz_min
}

/// The inverse of [`pixel_x_to_time`]. A zero-width time range maps to pixel 0.
pub fn time_to_pixel_x(time: f64, viewport_width: f64, time_min: f64, time_max: f64) -> f64 {
    let span = time_max - time_min;
    if span == 0.0 {
        return 0.0;
    }
    (time - time_min) / span * viewport_width
}

/// The inverse of [`pixel_y_to_mz`]
pub fn mz_to_pixel_y(mz: f64, viewport_height: f64, mz_min: f64, mz_max: f64) -> f64 {
    let span = mz_max - mz_min;
    if span == 0.0 {
        return viewport_height;
    }
    viewport_height - (mz - mz_min) / span * viewport_height
}

/// Binds a [`Viewport`] to the [`GridGeometry`] currently shown in it, so that the
/// renderer and the pointer handling share one mapping.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct InteractionMapper {
    pub viewport: Viewport,
    pub geometry: GridGeometry,
}

impl InteractionMapper {
    pub fn new(viewport: Viewport, geometry: GridGeometry) -> Self {
        Self { viewport, geometry }
    }

    pub fn with_viewport(mut self, viewport: Viewport) -> Self {
        self.viewport = viewport;
        self
    }

    pub fn with_geometry(mut self, geometry: GridGeometry) -> Self {
        self.geometry = geometry;
        self
    }

    pub fn time_bin_at(&self, px: f64) -> usize {
        pixel_x_to_time_bin_index(px, self.viewport.width, self.geometry.time_bins)
    }

    pub fn quantize_x(&self, px: f64) -> f64 {
        quantize_pixel_x(px, self.viewport.width, self.geometry.time_bins)
    }

    pub fn time_at(&self, px: f64) -> f64 {
        pixel_x_to_time(
            px,
            self.viewport.width,
            self.geometry.time_min,
            self.geometry.time_max,
        )
    }

    pub fn mz_at(&self, py: f64) -> f64 {
        pixel_y_to_mz(
            py,
            self.viewport.height,
            self.geometry.mz_min,
            self.geometry.mz_max,
        )
    }

    pub fn pixel_x_of(&self, time: f64) -> f64 {
        time_to_pixel_x(
            time,
            self.viewport.width,
            self.geometry.time_min,
            self.geometry.time_max,
        )
    }

    pub fn pixel_y_of(&self, mz: f64) -> f64 {
        mz_to_pixel_y(
            mz,
            self.viewport.height,
            self.geometry.mz_min,
            self.geometry.mz_max,
        )
    }

    /// The `(time_bin, column)` grid cell drawn under `point`, or `None` if the
    /// grid or viewport is empty
    pub fn pixel_to_cell(&self, point: PixelPoint) -> Option<(usize, usize)> {
        if self.geometry.is_empty() || self.viewport.is_empty() {
            return None;
        }
        let time_bin = self.time_bin_at(point.x);
        let column = (point.y / self.viewport.height * self.geometry.mz_bins as f64).floor();
        let column = (column.max(0.0) as usize).min(self.geometry.mz_bins - 1);
        Some((time_bin, column))
    }

    /// Convert a pixel rectangle to the data-space region it covers. The top edge
    /// gives the upper m/z bound and the bottom edge the lower.
    pub fn selection_to_data(&self, rect: &PixelRect) -> DataRect {
        DataRect {
            time_min: self.time_at(rect.x0),
            time_max: self.time_at(rect.x1),
            mz_min: self.mz_at(rect.y1),
            mz_max: self.mz_at(rect.y0),
        }
    }
}
