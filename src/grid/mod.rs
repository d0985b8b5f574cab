//! The two-dimensional retention time by m/z intensity grid, its geometry, and
//! the accumulator that fills it from a stream of spectra.
//!
//! A pass starts with [`GridAccumulator::configure`], which resolves a
//! [`GridRequest`] into a [`GridGeometry`] against the spectra actually available,
//! allocates a zeroed [`IntensityGrid`] and hands the matching spectra to a
//! delivery thread. Each delivered spectrum is binned along the m/z axis and added
//! into the row of its time bin. Progress is broadcast as [`GridEvent`]s, and the
//! current state can be read at any time as a [`GridSnapshot`] without waiting on
//! the pass.

use thiserror::Error;

use crate::io::SpectrumAccessError;
use crate::spectrum::DataShapeError;

mod accumulator;
mod events;
mod geometry;
mod matrix;

pub use accumulator::{GridAccumulator, GridSnapshot, GridStatus, IngestionState};
pub use events::GridEvent;
pub use geometry::{GeometryError, GridGeometry, GridRequest, TIME_TOLERANCE};
pub use matrix::IntensityGrid;

/// Errors raised while configuring or filling a grid. None of them outlive the
/// pass they occurred in.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GridError {
    #[error("Invalid grid geometry: {0}")]
    InvalidGeometry(
        #[from]
        #[source]
        GeometryError,
    ),
    #[error("Spectrum {index} could not be binned: {source}")]
    DataShape {
        index: usize,
        #[source]
        source: DataShapeError,
    },
    #[error("An error occurred while retrieving spectra: {0}")]
    Access(
        #[from]
        #[source]
        SpectrumAccessError,
    ),
}
