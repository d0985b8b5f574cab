//! Zooming re-runs the accumulator over a different region rather than resampling
//! the grid already built, so every zoom level is binned at full resolution.
use log::debug;
use mzpeaks::coordinate::SimpleInterval;

use crate::grid::{GridAccumulator, GridError, GridGeometry, GridRequest};
use crate::interaction::mapper::InteractionMapper;
use crate::interaction::selection::PixelRect;
use crate::io::SpectrumCatalog;

/// Build the request covering `rect` in `mapper`'s view, keeping the MS level,
/// requested resolutions and interpolation setting of `base`
pub fn selection_to_request(
    mapper: &InteractionMapper,
    rect: &PixelRect,
    base: &GridRequest,
) -> GridRequest {
    let region = mapper.selection_to_data(rect);
    base.clone()
        .with_time_range(SimpleInterval::new(region.time_min, region.time_max))
        .with_mz_range(SimpleInterval::new(region.mz_min, region.mz_max))
}

/// Reconfigure `accumulator` to the data region under `rect`.
///
/// Returns `Ok(None)` if the accumulator was never configured.
pub fn zoom_to_selection<S: SpectrumCatalog + ?Sized + 'static>(
    accumulator: &GridAccumulator<S>,
    mapper: &InteractionMapper,
    rect: &PixelRect,
) -> Result<Option<GridGeometry>, GridError> {
    let Some(base) = accumulator.request() else {
        return Ok(None);
    };
    let request = selection_to_request(mapper, rect, &base);
    debug!(
        "Zooming to {:?} x {:?}",
        request.time_range, request.mz_range
    );
    accumulator.configure(request).map(Some)
}

/// Reconfigure `accumulator` to everything its source holds at the current MS level.
///
/// Returns `Ok(None)` if the accumulator was never configured or the source has no
/// spectra at that level.
pub fn zoom_out_full<S: SpectrumCatalog + ?Sized + 'static>(
    accumulator: &GridAccumulator<S>,
) -> Result<Option<GridGeometry>, GridError> {
    let Some(base) = accumulator.request() else {
        return Ok(None);
    };
    let Some(extent) = accumulator.source().extent(base.ms_level) else {
        return Ok(None);
    };
    let mut request = base.with_time_range(extent.time_range());
    if extent.mz_min < extent.mz_max {
        request = request.with_mz_range(extent.mz_range());
    }
    accumulator.configure(request).map(Some)
}

fn widen(start: f64, end: f64, factor: f64, lower: f64, upper: f64) -> (f64, f64) {
    let start = start.max(lower);
    let end = end.min(upper);
    let center = (start + end) / 2.0;
    let half = (end - start) / 2.0 * factor;
    ((center - half).max(lower), (center + half).min(upper))
}

/// Widen the current time and m/z window about its centre by `factor`, without
/// leaving the extent of the source. Factors below 1 are treated as 1.
///
/// Returns `Ok(None)` if the accumulator was never configured or the source has no
/// spectra at the current MS level.
pub fn zoom_out_by<S: SpectrumCatalog + ?Sized + 'static>(
    accumulator: &GridAccumulator<S>,
    factor: f64,
) -> Result<Option<GridGeometry>, GridError> {
    let Some(base) = accumulator.request() else {
        return Ok(None);
    };
    let Some(extent) = accumulator.source().extent(base.ms_level) else {
        return Ok(None);
    };
    let factor = factor.max(1.0);
    let (time_min, time_max) = widen(
        base.time_range.start,
        base.time_range.end,
        factor,
        extent.time_min,
        extent.time_max,
    );
    let mut request = base.clone().with_time_range(SimpleInterval::new(time_min, time_max));
    if extent.mz_min < extent.mz_max {
        let (mz_min, mz_max) = widen(
            base.mz_range.start,
            base.mz_range.end,
            factor,
            extent.mz_min.min(base.mz_range.start),
            extent.mz_max.max(base.mz_range.end),
        );
        request = request.with_mz_range(SimpleInterval::new(mz_min, mz_max));
    }
    accumulator.configure(request).map(Some)
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use super::*;
    use crate::interaction::{PixelPoint, Viewport};
    use crate::io::{InlineDelivery, MemorySpectrumSource};
    use crate::spectrum::Spectrum;

    fn make_accumulator() -> GridAccumulator<MemorySpectrumSource> {
        let source: MemorySpectrumSource = (0..20)
            .map(|i| {
                Spectrum::new(
                    0,
                    format!("scan={}", i + 1),
                    1,
                    i as f64,
                    vec![100.0, 300.0, 900.0],
                    vec![1.0, 1.0, 1.0],
                )
            })
            .collect();
        GridAccumulator::with_delivery(Arc::new(source), InlineDelivery)
    }

    fn request() -> GridRequest {
        GridRequest::new(
            1,
            SimpleInterval::new(5.0, 14.0),
            SimpleInterval::new(200.0, 400.0),
            8,
            20,
        )
    }

    #[test_log::test]
    fn test_zoom_to_right_half() {
        let acc = make_accumulator();
        assert!(zoom_out_full(&acc).unwrap().is_none());
        let geometry = acc.configure(request()).unwrap();
        let viewport = Viewport::new(200.0, 100.0);
        let mapper = InteractionMapper::new(viewport, geometry);

        let rect = PixelRect::from_corners(
            PixelPoint::new(viewport.width, viewport.height),
            PixelPoint::new(viewport.midpoint().x, 0.0),
        );
        let zoomed = zoom_to_selection(&acc, &mapper, &rect).unwrap().unwrap();
        let request = acc.request().unwrap();
        assert!((request.time_range.start - mapper.time_at(viewport.midpoint().x)).abs() < 1e-9);
        assert_eq!(request.time_range.end, 14.0);
        assert_eq!(request.mz_range.start, 200.0);
        assert_eq!(request.mz_range.end, 400.0);
        assert_eq!(request.time_bins, 8);
        assert_eq!(request.mz_bins, 20);
        // 9.5 to 14 selects spectra 10 through 14
        assert_eq!(zoomed.time_bins, 5);
        assert_eq!(zoomed.time_min, 10.0);
    }

    #[test_log::test]
    fn test_zoom_out() {
        let acc = make_accumulator();
        acc.configure(request()).unwrap();
        let geometry = zoom_out_by(&acc, 2.0).unwrap().unwrap();
        let request = acc.request().unwrap();
        assert_eq!(request.time_range.start, 0.5);
        assert_eq!(request.time_range.end, 18.5);
        assert_eq!(request.mz_range.start, 100.0);
        assert_eq!(request.mz_range.end, 500.0);
        assert_eq!(geometry.time_bins, 8);

        let geometry = zoom_out_full(&acc).unwrap().unwrap();
        assert_eq!(geometry.time_min, 0.0);
        assert_eq!(geometry.time_max, 19.0);
        assert_eq!(geometry.mz_min, 100.0);
        assert_eq!(geometry.mz_max, 900.0);
        assert_eq!(geometry.mz_bins, 20);
    }
}
