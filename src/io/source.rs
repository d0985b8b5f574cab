use std::ops::Index;

use log::warn;
use mzpeaks::coordinate::SimpleInterval;
use thiserror::Error;

use crate::spectrum::Spectrum;

/// Errors that may occur when reading a spectrum from a [`SpectrumCatalog`]
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SpectrumAccessError {
    /// An error resolving a spectrum by it's index
    #[error("The requested spectrum index {0} was not found")]
    SpectrumIndexNotFound(usize),
    /// The spectrum is known but could not be read
    #[error("The spectrum could not be read: {0}")]
    Unavailable(String),
}

/// The full time and m/z range covered by the spectra of one MS level
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DataExtent {
    pub time_min: f64,
    pub time_max: f64,
    pub mz_min: f64,
    pub mz_max: f64,
}

impl DataExtent {
    fn update(&mut self, spectrum: &Spectrum) {
        self.time_min = self.time_min.min(spectrum.start_time);
        self.time_max = self.time_max.max(spectrum.start_time);
        for mz in spectrum.mzs.iter().copied() {
            self.mz_min = self.mz_min.min(mz);
            self.mz_max = self.mz_max.max(mz);
        }
    }

    fn empty() -> Self {
        Self {
            time_min: f64::INFINITY,
            time_max: f64::NEG_INFINITY,
            mz_min: f64::INFINITY,
            mz_max: f64::NEG_INFINITY,
        }
    }

    pub fn time_range(&self) -> SimpleInterval<f64> {
        SimpleInterval::new(self.time_min, self.time_max)
    }

    pub fn mz_range(&self) -> SimpleInterval<f64> {
        SimpleInterval::new(self.mz_min, self.mz_max)
    }
}

#[inline]
pub(crate) fn interval_contains(interval: &SimpleInterval<f64>, value: f64) -> bool {
    interval.start <= value && value <= interval.end
}

/// A base trait defining the behaviors of a shared, indexable store of spectra.
///
/// Unlike a reader, a catalog is queried through `&self` so that it can be
/// shared with a delivery thread behind an [`Arc`](std::sync::Arc).
pub trait SpectrumCatalog: Send + Sync {
    /// List the indices of every spectrum at `ms_level` whose start time lies
    /// in the closed interval `time_range`, ordered by start time.
    fn enumerate(&self, ms_level: u8, time_range: &SimpleInterval<f64>) -> Vec<usize>;

    /// Retrieve a spectrum by its index
    fn fetch(&self, index: usize) -> Result<Spectrum, SpectrumAccessError>;

    /// Retrieve only the start time of a spectrum.
    ///
    /// The default implementation reads the whole spectrum, implementations
    /// that keep an index of times should override it.
    fn start_time_of(&self, index: usize) -> Option<f64> {
        self.fetch(index).ok().map(|s| s.start_time)
    }

    /// Compute the full time and m/z range of all spectra at `ms_level`,
    /// or `None` if there are none.
    fn extent(&self, ms_level: u8) -> Option<DataExtent> {
        let everything = SimpleInterval::new(f64::NEG_INFINITY, f64::INFINITY);
        let mut extent = DataExtent::empty();
        let mut seen = false;
        for index in self.enumerate(ms_level, &everything) {
            match self.fetch(index) {
                Ok(spectrum) => {
                    extent.update(&spectrum);
                    seen = true;
                }
                Err(err) => {
                    warn!("Skipping spectrum {index} while computing extent: {err}");
                }
            }
        }
        if !seen {
            return None;
        }
        if extent.mz_min > extent.mz_max {
            extent.mz_min = 0.0;
            extent.mz_max = 0.0;
        }
        Some(extent)
    }
}

/// A collection of spectra held in memory but providing an interface
/// identical to a data file. This structure owns its data, so in order
/// to yield ownership from [`SpectrumCatalog::fetch`], spectra are cloned.
///
/// Spectra are kept sorted by start time and each one's
/// [`Spectrum::index`] is rewritten to its position in that order.
#[derive(Debug, Default, Clone)]
pub struct MemorySpectrumSource {
    spectra: Vec<Spectrum>,
}

impl MemorySpectrumSource {
    pub fn new(mut spectra: Vec<Spectrum>) -> Self {
        spectra.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));
        spectra.iter_mut().enumerate().for_each(|(i, s)| {
            s.index = i;
        });
        Self { spectra }
    }

    pub fn len(&self) -> usize {
        self.spectra.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spectra.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Spectrum> {
        self.spectra.iter()
    }
}

impl Index<usize> for MemorySpectrumSource {
    type Output = Spectrum;

    fn index(&self, index: usize) -> &Self::Output {
        &self.spectra[index]
    }
}

impl SpectrumCatalog for MemorySpectrumSource {
    fn enumerate(&self, ms_level: u8, time_range: &SimpleInterval<f64>) -> Vec<usize> {
        let start = self
            .spectra
            .partition_point(|s| s.start_time < time_range.start);
        self.spectra[start..]
            .iter()
            .take_while(|s| s.start_time <= time_range.end)
            .filter(|s| s.ms_level == ms_level && interval_contains(time_range, s.start_time))
            .map(|s| s.index)
            .collect()
    }

    fn fetch(&self, index: usize) -> Result<Spectrum, SpectrumAccessError> {
        self.spectra
            .get(index)
            .cloned()
            .ok_or(SpectrumAccessError::SpectrumIndexNotFound(index))
    }

    fn start_time_of(&self, index: usize) -> Option<f64> {
        self.spectra.get(index).map(|s| s.start_time)
    }
}

impl From<Vec<Spectrum>> for MemorySpectrumSource {
    fn from(value: Vec<Spectrum>) -> Self {
        Self::new(value)
    }
}

impl FromIterator<Spectrum> for MemorySpectrumSource {
    fn from_iter<T: IntoIterator<Item = Spectrum>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
