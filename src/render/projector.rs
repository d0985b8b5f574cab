#[cfg(feature = "parallelism")]
use rayon::prelude::*;

use crate::grid::{GridSnapshot, IntensityGrid};

/// Cells at or above this fraction of the maximum intensity render black
pub const SATURATION_FRACTION: f64 = 0.20;

/// An 8-bit grayscale image, one sample per grid cell.
///
/// `x` runs over time bins and `y` over grid columns, so `y = 0` is the highest m/z.
/// Samples are stored row by row in `y`.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Raster {
    pub width: usize,
    pub height: usize,
    pub samples: Vec<u8>,
}

impl Raster {
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn get(&self, x: usize, y: usize) -> Option<u8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.samples.get(y * self.width + x).copied()
    }

    pub fn row(&self, y: usize) -> Option<&[u8]> {
        if y >= self.height {
            return None;
        }
        let start = y * self.width;
        self.samples.get(start..start + self.width)
    }
}

/// The grayscale sample for `value` given the grid's `max_intensity`.
///
/// Zero maps to white (255), anything at or above [`SATURATION_FRACTION`] of the
/// maximum maps to black (0). A non-positive maximum renders everything white.
pub fn shade_of(value: f32, max_intensity: f32) -> u8 {
    if !(max_intensity > 0.0) {
        return u8::MAX;
    }
    let ceiling = SATURATION_FRACTION * max_intensity as f64;
    let shade = ((ceiling - value as f64) / ceiling).clamp(0.0, 1.0);
    (shade * u8::MAX as f64).round() as u8
}

fn fill_raster_row(grid: &IntensityGrid, column: usize, max_intensity: f32, out: &mut [u8]) {
    for (time_bin, sample) in out.iter_mut().enumerate() {
        *sample = shade_of(grid.get(time_bin, column).unwrap_or_default(), max_intensity);
    }
}

/// Project `grid` onto a [`Raster`] of the same dimensions.
///
/// When the `parallelism` feature is enabled, raster rows are filled on the rayon
/// thread pool.
pub fn project(grid: &IntensityGrid, max_intensity: f32) -> Raster {
    let (width, height) = grid.dimensions();
    if width == 0 || height == 0 {
        return Raster {
            width,
            height,
            samples: Vec::new(),
        };
    }
    let mut samples = vec![u8::MAX; width * height];

    #[cfg(not(feature = "parallelism"))]
    samples
        .chunks_mut(width)
        .enumerate()
        .for_each(|(column, out)| fill_raster_row(grid, column, max_intensity, out));

    #[cfg(feature = "parallelism")]
    samples
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(column, out)| fill_raster_row(grid, column, max_intensity, out));

    Raster {
        width,
        height,
        samples,
    }
}

/// Project the grid of `snapshot` using the maximum intensity it has seen so far
pub fn project_snapshot(snapshot: &GridSnapshot) -> Raster {
    project(&snapshot.grid, snapshot.max_intensity())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_all_zero_is_white() {
        let grid = IntensityGrid::new(3, 4);
        let raster = project(&grid, 0.0);
        assert_eq!((raster.width, raster.height), (3, 4));
        assert!(raster.samples.iter().all(|s| *s == 255));

        let raster = project(&grid, 10.0);
        assert!(raster.samples.iter().all(|s| *s == 255));
    }

    #[test]
    fn test_tone_curve() {
        assert_eq!(shade_of(100.0, 100.0), 0);
        assert_eq!(shade_of(20.0, 100.0), 0);
        assert_eq!(shade_of(10.0, 100.0), 128);
        assert_eq!(shade_of(0.0, 100.0), 255);
        assert_eq!(shade_of(5.0, f32::NAN), 255);
    }

    #[test]
    fn test_layout() {
        let mut grid = IntensityGrid::new(2, 3);
        // m/z bin 0 is the last grid column, the bottom raster row
        grid.accumulate_reversed(1, &[50.0, 0.0, 5.0]).unwrap();
        let raster = project(&grid, 50.0);
        assert_eq!(raster.get(1, 2), Some(0));
        assert_eq!(raster.get(1, 0), Some(128));
        assert_eq!(raster.get(0, 2), Some(255));
        assert_eq!(raster.row(2).unwrap(), &[255, 0]);
        assert_eq!(raster.get(2, 0), None);
    }

    #[test]
    fn test_empty_grid() {
        let raster = project(&IntensityGrid::new(0, 50), 1.0);
        assert!(raster.is_empty());
        assert_eq!(raster.height, 50);
        assert_eq!(raster.row(0), Some(&[][..]));
    }
}
