//! `mzgrid` bins a stream of mass spectra into a dense retention time by m/z
//! intensity grid for display as a heat map, and maps pointer interaction on that
//! display back into data coordinates.
//!
//! The pieces, from data to screen:
//!
//! - [`io`] holds the [`SpectrumCatalog`] trait for anything that can list and
//!   fetch spectra by time and MS level, and the [`SpectrumDelivery`] strategies
//!   that feed them to a grid off the interactive thread.
//! - [`binning`] compresses one spectrum into fixed-width m/z bins.
//! - [`grid`] resolves a [`GridRequest`] into a [`GridGeometry`] and accumulates
//!   delivered spectra into an [`IntensityGrid`] through a [`GridAccumulator`].
//! - [`render`] projects a grid onto an 8-bit grayscale [`Raster`].
//! - [`interaction`] converts between pixels, bins and data coordinates, tracks the
//!   drag selection, and zooms by reconfiguring the accumulator.
//!
//! ```
//! use std::sync::Arc;
//! use mzpeaks::coordinate::SimpleInterval;
//! use mzgrid::{
//!     project_snapshot, GridAccumulator, GridRequest, GridStatus, InlineDelivery,
//!     MemorySpectrumSource, Spectrum,
//! };
//!
//! let source: MemorySpectrumSource = (0..10)
//!     .map(|i| Spectrum::new(0, format!("scan={i}"), 1, i as f64, vec![120.0, 450.0], vec![5.0, 1.0]))
//!     .collect();
//! let accumulator = GridAccumulator::with_delivery(Arc::new(source), InlineDelivery);
//! let request = GridRequest::new(1, SimpleInterval::new(0.0, 9.0), SimpleInterval::new(100.0, 600.0), 20, 50);
//! accumulator.configure(request).unwrap();
//! assert_eq!(accumulator.status(), GridStatus::DataReady);
//!
//! let raster = project_snapshot(&accumulator.snapshot());
//! assert_eq!((raster.width, raster.height), (10, 50));
//! ```
pub mod binning;
pub mod grid;
pub mod interaction;
pub mod io;
pub mod prelude;
pub mod render;
pub mod spectrum;

pub use crate::binning::{bin_values, BinningType};
pub use crate::grid::{
    GeometryError, GridAccumulator, GridError, GridEvent, GridGeometry, GridRequest,
    GridSnapshot, GridStatus, IngestionState, IntensityGrid,
};
pub use crate::interaction::{
    zoom_out_by, zoom_out_full, zoom_to_selection, DragState, InteractionMapper, PixelPoint,
    PixelRect, PointerButton, Viewport,
};
pub use crate::io::{
    InlineDelivery, ManualDelivery, MemorySpectrumSource, SpectrumAccessError, SpectrumCatalog,
    SpectrumDelivery, ThreadedDelivery,
};
pub use crate::render::{project, project_snapshot, Raster};
pub use crate::spectrum::{DataShapeError, Spectrum};
