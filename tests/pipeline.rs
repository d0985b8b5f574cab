use std::sync::mpsc::Receiver;
use std::sync::Arc;

use mzpeaks::coordinate::SimpleInterval;

use mzgrid::prelude::*;
use mzgrid::{
    bin_values, project, zoom_to_selection, BinningType, GridAccumulator, GridEvent, GridRequest,
    GridStatus, InlineDelivery, InteractionMapper, MemorySpectrumSource, PixelPoint, PixelRect,
    Spectrum, ThreadedDelivery, Viewport,
};

fn make_source() -> Arc<MemorySpectrumSource> {
    let mut spectra = Vec::new();
    for i in 0..10 {
        let t = i as f64;
        spectra.push(Spectrum::new(
            0,
            format!("scan={}", 2 * i + 1),
            1,
            t,
            vec![640.0, 150.0 + 37.5 * i as f64, 151.0, 580.25, 1000.0],
            vec![3.0, 10.0 * (i + 1) as f32, 4.0, 8.0, 99.0],
        ));
        spectra.push(Spectrum::new(
            0,
            format!("scan={}", 2 * i + 2),
            2,
            t + 0.5,
            vec![200.0],
            vec![500.0],
        ));
    }
    Arc::new(MemorySpectrumSource::new(spectra))
}

fn request() -> GridRequest {
    GridRequest::new(
        1,
        SimpleInterval::new(0.0, 9.0),
        SimpleInterval::new(100.0, 600.0),
        20,
        50,
    )
}

fn accumulators(
    source: &Arc<MemorySpectrumSource>,
) -> Vec<(&'static str, GridAccumulator<MemorySpectrumSource>)> {
    vec![
        (
            "inline",
            GridAccumulator::with_delivery(Arc::clone(source), InlineDelivery),
        ),
        (
            "threaded",
            GridAccumulator::with_delivery(Arc::clone(source), ThreadedDelivery::default()),
        ),
    ]
}

fn ready_count(events: &Receiver<GridEvent>) -> usize {
    events.try_iter().filter(|e| e.is_ready()).count()
}

#[test_log::test]
fn ten_spectra_single_ready() {
    let source = make_source();
    for (name, acc) in accumulators(&source) {
        let events = acc.subscribe();
        let geometry = acc.configure(request()).unwrap();
        assert_eq!(geometry.time_bins, 10, "{name}");
        assert_eq!(geometry.ms_level, 1);
        let snapshot = acc.wait();
        assert_eq!(snapshot.status, GridStatus::DataReady, "{name}");

        let events: Vec<_> = events.try_iter().collect();
        let ready_at = events.iter().position(|e| e.is_ready()).unwrap();
        assert_eq!(ready_at, events.len() - 1, "{name}");
        assert_eq!(events.iter().filter(|e| e.is_ready()).count(), 1, "{name}");
        let updates = events
            .iter()
            .filter(|e| matches!(e, GridEvent::Updating { .. }))
            .count();
        assert_eq!(updates, 9, "{name}");
        assert_eq!(snapshot.ingestion.received, 10);
    }
}

#[test_log::test]
fn time_bins_never_exceed_request() {
    let source = make_source();
    let acc = GridAccumulator::with_delivery(Arc::clone(&source), InlineDelivery);
    for requested in [1, 3, 9, 10, 11, 40] {
        let geometry = acc.configure(request().with_resolution(requested, 50)).unwrap();
        assert!(geometry.time_bins <= requested);
        assert_eq!(geometry.time_bins, requested.min(10));
    }
}

#[test_log::test]
fn empty_range_is_ready_immediately() {
    let source = make_source();
    for (name, acc) in accumulators(&source) {
        let events = acc.subscribe();
        let geometry = acc
            .configure(request().with_time_range(SimpleInterval::new(100.0, 200.0)))
            .unwrap();
        assert_eq!(geometry.time_bins, 0, "{name}");
        assert_eq!(acc.status(), GridStatus::DataReady, "{name}");
        assert_eq!(ready_count(&events), 1, "{name}");
        let raster = project(&acc.snapshot().grid, acc.snapshot().max_intensity());
        assert!(raster.is_empty());
    }
}

#[test_log::test]
fn intensity_is_conserved() {
    let source = make_source();
    for (name, acc) in accumulators(&source) {
        let geometry = acc.configure(request().with_resolution(4, 50)).unwrap();
        let snapshot = acc.wait();
        let expected: f64 = source
            .enumerate(1, &request().time_range)
            .into_iter()
            .map(|i| {
                let spectrum = source.fetch(i).unwrap();
                bin_values(
                    &spectrum.mzs,
                    &spectrum.intensities,
                    &geometry.mz_range(),
                    geometry.mz_bins,
                    false,
                    BinningType::Sum,
                )
                .into_iter()
                .map(|v| v as f64)
                .sum::<f64>()
            })
            .sum();
        assert!((snapshot.grid.total() - expected).abs() < 1e-6, "{name}");
        // Points at m/z 640 and 1000 fall outside the grid
        let raw: f64 = source
            .iter()
            .filter(|s| s.ms_level == 1)
            .map(|s| s.total_ion_current() as f64)
            .sum();
        assert!(snapshot.grid.total() < raw);
    }
}

#[test_log::test]
fn configure_is_idempotent() {
    let source = make_source();
    for (name, acc) in accumulators(&source) {
        let first = acc.configure(request()).unwrap();
        let first_grid = acc.wait().grid;
        let second = acc.configure(request()).unwrap();
        let second_grid = acc.wait().grid;
        assert_eq!(first, second, "{name}");
        assert_eq!(*first_grid, *second_grid, "{name}");
        assert_eq!(acc.generation(), 2);
    }
}

#[test_log::test]
fn reconfigure_discards_previous_pass() {
    let source = make_source();
    let acc = GridAccumulator::new(Arc::clone(&source));
    let events = acc.subscribe();
    acc.configure(request()).unwrap();
    let geometry = acc
        .configure(request().with_time_range(SimpleInterval::new(5.0, 9.0)))
        .unwrap();
    let snapshot = acc.wait();
    assert_eq!(snapshot.generation, 2);
    assert_eq!(snapshot.geometry, geometry);
    assert_eq!(geometry.time_bins, 5);
    assert_eq!(snapshot.grid.rows(), 5);
    assert_eq!(snapshot.ingestion.received, 5);
    // Only the current pass's events count toward its readiness
    let ready: Vec<_> = events
        .try_iter()
        .filter(|e| e.is_ready() && e.generation() == 2)
        .collect();
    assert_eq!(ready.len(), 1);
}

#[test_log::test]
fn zoom_to_right_half() {
    let source = make_source();
    for (name, acc) in accumulators(&source) {
        let geometry = acc.configure(request()).unwrap();
        acc.wait();
        let viewport = Viewport::new(300.0, 200.0);
        let mapper = InteractionMapper::new(viewport, geometry);
        let middle = viewport.midpoint();
        let rect = PixelRect::from_corners(
            PixelPoint::new(middle.x, 0.0),
            PixelPoint::new(viewport.width, viewport.height),
        );
        let zoomed = zoom_to_selection(&acc, &mapper, &rect).unwrap().unwrap();
        acc.wait();

        let zoom_request = acc.request().unwrap();
        let midpoint_time = mapper.time_at(middle.x);
        assert!(
            (zoom_request.time_range.start - midpoint_time).abs() < 1e-9,
            "{name}"
        );
        assert_eq!(zoom_request.time_bins, 20);
        assert_eq!(zoom_request.mz_bins, 50);
        assert_eq!(zoom_request.ms_level, 1);
        assert!(!zoom_request.interpolate);
        assert!(zoomed.time_min >= midpoint_time);
        assert_eq!(acc.status(), GridStatus::DataReady);
    }
}
