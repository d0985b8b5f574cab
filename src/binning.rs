//! Compress one spectrum's (m/z, intensity) pairs into a fixed number of
//! equal-width m/z bins.
use mzpeaks::coordinate::SimpleInterval;

/// How the intensities of points sharing a bin are combined
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BinningType {
    #[default]
    Sum,
    Max,
    Min,
    Average,
}

#[derive(Debug, Clone, Copy)]
struct Neighbor {
    mz: f64,
    intensity: f64,
}

/// Bin `intensities` by their paired `mzs` into `n_bins` equal-width bins spanning
/// `mz_range`.
///
/// Points outside `mz_range` are not aggregated, though the nearest one on either
/// side serves as an anchor for interpolation. A point exactly at `mz_range.end`
/// falls in the last bin. When `interpolate` is set, bins that received no point are
/// filled linearly from their nearest occupied neighbors, otherwise they are zero.
/// A bin without an occupied neighbor on both sides is left at zero.
///
/// If the arrays differ in length, the extra entries of the longer one are ignored.
pub fn bin_values(
    mzs: &[f64],
    intensities: &[f32],
    mz_range: &SimpleInterval<f64>,
    n_bins: usize,
    interpolate: bool,
    binning_type: BinningType,
) -> Vec<f32> {
    if n_bins == 0 {
        return Vec::new();
    }
    let start = mz_range.start;
    let end = mz_range.end;
    let bin_width = (end - start) / n_bins as f64;
    if !(bin_width > 0.0) {
        return vec![0.0; n_bins];
    }

    let mut bins: Vec<Option<f64>> = vec![None; n_bins];
    let mut counts: Vec<u32> = if matches!(binning_type, BinningType::Average) {
        vec![0; n_bins]
    } else {
        Vec::new()
    };
    let mut before: Option<Neighbor> = None;
    let mut after: Option<Neighbor> = None;

    for (mz, intensity) in mzs.iter().copied().zip(intensities.iter().copied()) {
        let intensity = intensity as f64;
        if mz < start {
            if before.map_or(true, |b| mz > b.mz) {
                before = Some(Neighbor { mz, intensity });
            }
            continue;
        }
        if mz > end {
            if after.map_or(true, |a| mz < a.mz) {
                after = Some(Neighbor { mz, intensity });
            }
            continue;
        }
        let i = (((mz - start) / bin_width) as usize).min(n_bins - 1);
        let slot = &mut bins[i];
        *slot = Some(match (binning_type, *slot) {
            (_, None) => intensity,
            (BinningType::Sum | BinningType::Average, Some(acc)) => acc + intensity,
            (BinningType::Max, Some(acc)) => acc.max(intensity),
            (BinningType::Min, Some(acc)) => acc.min(intensity),
        });
        if let Some(count) = counts.get_mut(i) {
            *count += 1;
        }
    }

    if matches!(binning_type, BinningType::Average) {
        for (slot, count) in bins.iter_mut().zip(counts.iter()) {
            if let Some(acc) = slot.as_mut() {
                *acc /= *count as f64;
            }
        }
    }

    if interpolate {
        fill_gaps(&mut bins, before, after, start, end, bin_width);
    }

    bins.into_iter()
        .map(|v| v.unwrap_or_default() as f32)
        .collect()
}

/// Linear interpolation across runs of empty bins. Anchors outside the binned range
/// sit at their fractional virtual bin positions.
fn fill_gaps(
    bins: &mut [Option<f64>],
    before: Option<Neighbor>,
    after: Option<Neighbor>,
    start: f64,
    end: f64,
    bin_width: f64,
) {
    let last = bins.len() as f64 - 1.0;
    let leading = before.map(|b| ((b.mz - start) / bin_width).floor());
    let trailing = after.map(|a| last + ((a.mz - end) / bin_width).ceil());

    let filled: Vec<(f64, f64)> = bins
        .iter()
        .enumerate()
        .filter_map(|(i, v)| v.map(|v| (i as f64, v)))
        .collect();

    let mut left: Option<(f64, f64)> = before.zip(leading).map(|(b, x)| (x, b.intensity));
    let mut next_filled = 0usize;
    for i in 0..bins.len() {
        if let Some(v) = bins[i] {
            left = Some((i as f64, v));
            next_filled += 1;
            continue;
        }
        let right = filled
            .get(next_filled)
            .copied()
            .or_else(|| after.zip(trailing).map(|(a, x)| (x, a.intensity)));
        if let (Some((x0, y0)), Some((x1, y1))) = (left, right) {
            let slope = (y1 - y0) / (x1 - x0);
            bins[i] = Some(y0 + slope * (i as f64 - x0));
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn range(start: f64, end: f64) -> SimpleInterval<f64> {
        SimpleInterval::new(start, end)
    }

    #[test]
    fn test_sum_binning() {
        let mzs = [100.5, 109.0, 101.0, 150.0, 200.0, 99.0, 201.0];
        let ints = [1.0, 2.0, 3.0, 4.0, 5.0, 100.0, 100.0];
        let bins = bin_values(&mzs, &ints, &range(100.0, 200.0), 10, false, BinningType::Sum);
        assert_eq!(bins.len(), 10);
        assert_eq!(bins[0], 6.0);
        assert_eq!(bins[5], 4.0);
        // The upper bound lands in the last bin
        assert_eq!(bins[9], 5.0);
        let total: f32 = bins.iter().sum();
        assert_eq!(total, 15.0);
    }

    #[test]
    fn test_max_min_average() {
        let mzs = [100.5, 101.0, 102.0];
        let ints = [1.0, 3.0, 8.0];
        let r = range(100.0, 110.0);
        assert_eq!(bin_values(&mzs, &ints, &r, 1, false, BinningType::Max), vec![8.0]);
        assert_eq!(bin_values(&mzs, &ints, &r, 1, false, BinningType::Min), vec![1.0]);
        assert_eq!(bin_values(&mzs, &ints, &r, 1, false, BinningType::Average), vec![4.0]);
    }

    #[test]
    fn test_interpolate_between_bins() {
        let mzs = [100.5, 104.5];
        let ints = [2.0, 10.0];
        let bins = bin_values(&mzs, &ints, &range(100.0, 110.0), 10, true, BinningType::Sum);
        assert_eq!(&bins[..5], &[2.0, 4.0, 6.0, 8.0, 10.0]);
        // Nothing to the right of bin 4, so the tail stays empty
        assert!(bins[5..].iter().all(|v| *v == 0.0));

        let bins = bin_values(&mzs, &ints, &range(100.0, 110.0), 10, false, BinningType::Sum);
        assert_eq!(bins[1], 0.0);
    }

    #[test]
    fn test_interpolate_with_outside_anchor() {
        let mzs = [95.5, 102.5];
        let ints = [0.0, 6.0];
        let bins = bin_values(&mzs, &ints, &range(100.0, 110.0), 10, true, BinningType::Sum);
        // The anchor at 95.5 sits at virtual bin -5, the occupied bin is 2
        let expected_bin_0 = 6.0 * 5.0 / 7.0;
        assert!((bins[0] as f64 - expected_bin_0).abs() < 1e-5);
        assert_eq!(bins[2], 6.0);
    }

    #[test]
    fn test_degenerate_inputs() {
        assert!(bin_values(&[1.0], &[1.0], &range(0.0, 2.0), 0, false, BinningType::Sum).is_empty());
        assert_eq!(
            bin_values(&[1.0], &[1.0], &range(2.0, 2.0), 3, false, BinningType::Sum),
            vec![0.0; 3]
        );
        // Mismatched arrays only use the common prefix
        assert_eq!(
            bin_values(&[0.5, 1.5], &[1.0], &range(0.0, 2.0), 2, false, BinningType::Sum),
            vec![1.0, 0.0]
        );
    }
}
