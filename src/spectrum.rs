//! A minimal spectrum data model: one acquisition's parallel m/z and intensity
//! arrays, tagged with its scan start time and MS level.
use mzpeaks::{prelude::*, CentroidLike};
use thiserror::Error;

/// Errors describing a spectrum whose arrays cannot be binned
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DataShapeError {
    #[error("m/z array ({mz_len}) does not match size of intensity array ({intensity_len})")]
    MZIntensityArraySizeMismatch { mz_len: usize, intensity_len: usize },
    #[error("The spectrum start time {0} is not a finite number")]
    NonFiniteTime(f64),
}

#[derive(Default, Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
/// A single acquisition. The m/z values are not required to be sorted.
pub struct Spectrum {
    /// The position of the spectrum in its source
    pub index: usize,
    /// The native ID string of the spectrum
    pub id: String,
    /// The MS exponentiation level
    pub ms_level: u8,
    /// The scan start time
    pub start_time: f64,
    pub mzs: Vec<f64>,
    pub intensities: Vec<f32>,
}

impl Spectrum {
    pub fn new(
        index: usize,
        id: String,
        ms_level: u8,
        start_time: f64,
        mzs: Vec<f64>,
        intensities: Vec<f32>,
    ) -> Self {
        Self {
            index,
            id,
            ms_level,
            start_time,
            mzs,
            intensities,
        }
    }

    /// Build a spectrum from any collection of centroid peaks.
    pub fn from_centroids<C: CentroidLike, I: IntoIterator<Item = C>>(
        index: usize,
        id: String,
        ms_level: u8,
        start_time: f64,
        peaks: I,
    ) -> Self {
        let (mzs, intensities) = peaks.into_iter().map(|p| (p.mz(), p.intensity())).unzip();
        Self::new(index, id, ms_level, start_time, mzs, intensities)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.mzs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.mzs.is_empty()
    }

    /// The summed intensity of all points in the spectrum
    pub fn total_ion_current(&self) -> f32 {
        self.intensities.iter().sum()
    }

    /// Check that the spectrum can be binned.
    ///
    /// # Errors
    /// [`DataShapeError::MZIntensityArraySizeMismatch`] if the parallel arrays differ
    /// in length, [`DataShapeError::NonFiniteTime`] if the start time is NaN or infinite.
    pub fn validate(&self) -> Result<(), DataShapeError> {
        if self.mzs.len() != self.intensities.len() {
            return Err(DataShapeError::MZIntensityArraySizeMismatch {
                mz_len: self.mzs.len(),
                intensity_len: self.intensities.len(),
            });
        }
        if !self.start_time.is_finite() {
            return Err(DataShapeError::NonFiniteTime(self.start_time));
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use mzpeaks::CentroidPeak;

    #[test]
    fn test_from_centroids() {
        let peaks = vec![
            CentroidPeak::new(200.0, 10.0, 0),
            CentroidPeak::new(100.0, 5.0, 1),
        ];
        let spec = Spectrum::from_centroids(3, "scan=4".to_string(), 1, 12.5, peaks);
        assert_eq!(spec.len(), 2);
        assert_eq!(spec.mzs, vec![200.0, 100.0]);
        assert_eq!(spec.intensities, vec![10.0, 5.0]);
        assert_eq!(spec.total_ion_current(), 15.0);
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn test_validate_shape() {
        let spec = Spectrum::new(0, "scan=1".to_string(), 1, 1.0, vec![100.0, 101.0], vec![1.0]);
        assert_eq!(
            spec.validate(),
            Err(DataShapeError::MZIntensityArraySizeMismatch {
                mz_len: 2,
                intensity_len: 1
            })
        );

        let spec = Spectrum::new(0, "scan=1".to_string(), 1, f64::NAN, vec![], vec![]);
        assert!(matches!(spec.validate(), Err(DataShapeError::NonFiniteTime(_))));
    }
}
