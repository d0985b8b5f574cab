//! Turning an [`IntensityGrid`](crate::grid::IntensityGrid) into an 8-bit grayscale
//! raster with one sample per cell.

mod projector;

pub use projector::{project, project_snapshot, shade_of, Raster, SATURATION_FRACTION};
