use std::sync::mpsc::{channel, Receiver};
use std::sync::{Arc, Weak};

use log::{debug, trace, warn};
use parking_lot::Mutex;

use crate::binning::{bin_values, BinningType};
use crate::grid::events::{GridEvent, Observer};
use crate::grid::geometry::{GridGeometry, GridRequest};
use crate::grid::matrix::IntensityGrid;
use crate::grid::GridError;
use crate::io::{
    DeliveryHandle, DeliveryOutcome, SpectrumAccessError, SpectrumCatalog, SpectrumDelivery,
    SpectrumSink, ThreadedDelivery,
};
use crate::spectrum::Spectrum;

/// Coarse state of the current pass, as a presentation layer would show it
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum GridStatus {
    /// Nothing has been configured yet
    #[default]
    NoData,
    /// Spectra are still being delivered
    LoadingData,
    /// The pass ended, successfully or not. Whatever was accumulated is displayable.
    DataReady,
}

/// Progress of the current pass
#[derive(Debug, Default, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IngestionState {
    /// How many spectra have been handed to this pass, including ones that were
    /// rejected
    pub received: usize,
    /// How many spectra the pass enumerated
    pub expected: usize,
    /// The largest cell value produced so far
    pub max_intensity: f32,
    /// Set once, when the last spectrum arrives or the pass ends early
    pub complete: bool,
}

/// A consistent, read-only view of a pass at one moment.
///
/// Taking a snapshot only clones a reference to the grid. The accumulator copies
/// the grid on its next write instead of mutating what a snapshot holds.
#[derive(Debug, Clone)]
pub struct GridSnapshot {
    pub generation: u64,
    pub geometry: GridGeometry,
    pub grid: Arc<IntensityGrid>,
    pub ingestion: IngestionState,
    pub status: GridStatus,
}

impl GridSnapshot {
    pub fn max_intensity(&self) -> f32 {
        self.ingestion.max_intensity
    }

    pub fn is_complete(&self) -> bool {
        self.ingestion.complete
    }

    /// The value of the cell at `time_bin` and grid `column`
    pub fn intensity_at(&self, time_bin: usize, column: usize) -> Option<f32> {
        self.grid.get(time_bin, column)
    }
}

#[derive(Debug)]
struct PassState {
    generation: u64,
    request: Option<GridRequest>,
    geometry: GridGeometry,
    grid: Arc<IntensityGrid>,
    ingestion: IngestionState,
    delivery: Option<DeliveryHandle>,
    /// A cancel arrived before this pass's delivery handle was installed
    cancel_requested: bool,
}

impl PassState {
    fn status(&self) -> GridStatus {
        if self.request.is_none() {
            GridStatus::NoData
        } else if self.ingestion.complete
            || self
                .delivery
                .as_ref()
                .is_some_and(|d| d.status().is_terminal())
        {
            GridStatus::DataReady
        } else {
            GridStatus::LoadingData
        }
    }

    fn snapshot(&self) -> GridSnapshot {
        GridSnapshot {
            generation: self.generation,
            geometry: self.geometry,
            grid: Arc::clone(&self.grid),
            ingestion: self.ingestion,
            status: self.status(),
        }
    }
}

#[derive(Debug)]
struct Shared {
    state: Mutex<PassState>,
    observers: Mutex<Vec<Arc<Observer>>>,
}

impl Shared {
    fn new() -> Self {
        Self {
            state: Mutex::new(PassState {
                generation: 0,
                request: None,
                geometry: GridGeometry::default(),
                grid: Arc::new(IntensityGrid::default()),
                ingestion: IngestionState::default(),
                delivery: None,
                cancel_requested: false,
            }),
            observers: Mutex::new(Vec::new()),
        }
    }

    /// Must not be called while holding the state lock. No lock is held while
    /// observers run, so they may call back into the accumulator. Observers that
    /// have hung up are dropped.
    fn notify(&self, events: &[GridEvent]) {
        if events.is_empty() {
            return;
        }
        let observers: Vec<Arc<Observer>> = self.observers.lock().clone();
        let gone: Vec<Arc<Observer>> = observers
            .into_iter()
            .filter(|observer| !events.iter().all(|event| observer.notify(event)))
            .collect();
        if !gone.is_empty() {
            self.observers
                .lock()
                .retain(|observer| !gone.iter().any(|g| Arc::ptr_eq(g, observer)));
        }
    }

    fn ingest(
        &self,
        generation: u64,
        spectrum: &Spectrum,
        position: usize,
        total: usize,
    ) -> Result<(), GridError> {
        let geometry = {
            let state = self.state.lock();
            if state.generation != generation {
                trace!(
                    "Dropping spectrum {} from stale pass {generation}",
                    spectrum.index
                );
                return Ok(());
            }
            if state.request.is_none() {
                warn!(
                    "Received spectrum {} before any grid was configured",
                    spectrum.index
                );
                return Ok(());
            }
            if state.ingestion.complete {
                debug!(
                    "Ignoring spectrum {} after pass {generation} completed",
                    spectrum.index
                );
                return Ok(());
            }
            state.geometry
        };

        // Binning is the costly step, so it runs without the lock held
        let binned = match spectrum.validate() {
            Err(source) => Err(GridError::DataShape {
                index: spectrum.index,
                source,
            }),
            Ok(()) if !geometry.contains_time(spectrum.start_time) => {
                warn!(
                    "Spectrum {} at {} lies outside the grid's time range {}-{}",
                    spectrum.index, spectrum.start_time, geometry.time_min, geometry.time_max
                );
                Ok(None)
            }
            Ok(()) => Ok(geometry.time_bin_of(spectrum.start_time).map(|row| {
                let values = bin_values(
                    &spectrum.mzs,
                    &spectrum.intensities,
                    &geometry.mz_range(),
                    geometry.mz_bins,
                    geometry.interpolate,
                    BinningType::Sum,
                );
                (row, values)
            })),
        };

        let mut events = Vec::with_capacity(2);
        let result = {
            let mut guard = self.state.lock();
            if guard.generation != generation || guard.ingestion.complete {
                return Ok(());
            }
            let state = &mut *guard;
            state.ingestion.received += 1;
            let result = match binned {
                Ok(Some((row, values))) => {
                    trace!(
                        "Folding spectrum {} into time bin {row} ({position}/{total})",
                        spectrum.index
                    );
                    let grid = Arc::make_mut(&mut state.grid);
                    if let Some(row_max) = grid.accumulate_reversed(row, &values) {
                        state.ingestion.max_intensity = state.ingestion.max_intensity.max(row_max);
                    }
                    Ok(())
                }
                Ok(None) => Ok(()),
                Err(err) => {
                    warn!("{err}");
                    events.push(GridEvent::Failed {
                        generation,
                        error: err.clone(),
                    });
                    Err(err)
                }
            };
            if position + 1 >= total {
                state.ingestion.complete = true;
                debug!(
                    "Pass {generation} complete after {} spectra",
                    state.ingestion.received
                );
                events.push(GridEvent::Ready { generation });
            } else {
                events.push(GridEvent::Updating {
                    generation,
                    received: state.ingestion.received,
                    expected: state.ingestion.expected,
                });
            }
            result
        };
        self.notify(&events);
        result
    }

    fn finish_pass(&self, generation: u64, outcome: DeliveryOutcome) {
        let mut events = Vec::with_capacity(2);
        {
            let mut state = self.state.lock();
            if state.generation != generation {
                trace!("Pass {generation} ended after being replaced: {outcome:?}");
                return;
            }
            if let DeliveryOutcome::Failed(err) = outcome {
                events.push(GridEvent::Failed {
                    generation,
                    error: err.into(),
                });
            }
            if !state.ingestion.complete {
                debug!(
                    "Pass {generation} stopped early after {} of {} spectra",
                    state.ingestion.received, state.ingestion.expected
                );
                state.ingestion.complete = true;
                events.push(GridEvent::Ready { generation });
            }
        }
        self.notify(&events);
    }
}

/// Feeds one pass's delivered spectra back into the accumulator that started it.
///
/// Holds the accumulator weakly, since a parked sink lives inside the accumulator's
/// own state.
struct PassSink {
    shared: Weak<Shared>,
    generation: u64,
    finished: bool,
}

impl SpectrumSink for PassSink {
    fn accept(&mut self, spectrum: Spectrum, position: usize, total: usize) {
        if let Some(shared) = self.shared.upgrade() {
            // Failures were already broadcast to observers
            let _ = shared.ingest(self.generation, &spectrum, position, total);
        }
    }

    fn finish(&mut self, outcome: DeliveryOutcome) {
        self.finished = true;
        if let Some(shared) = self.shared.upgrade() {
            shared.finish_pass(self.generation, outcome)
        }
    }
}

impl Drop for PassSink {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        // Must never run under the state lock
        if let Some(shared) = self.shared.upgrade() {
            warn!(
                "Delivery of pass {} stopped without finishing",
                self.generation
            );
            shared.finish_pass(
                self.generation,
                DeliveryOutcome::Failed(SpectrumAccessError::Unavailable(
                    "the delivery stopped before finishing".to_string(),
                )),
            );
        }
    }
}

/// Builds a retention time by m/z [`IntensityGrid`] from spectra delivered in the
/// background.
///
/// Every call to [`GridAccumulator::configure`] starts a new pass with a fresh,
/// zeroed grid and a new generation number, cancelling whatever pass was running.
/// Spectra that arrive late from a replaced pass are discarded.
///
/// All methods take `&self`, so an accumulator can be shared between the thread
/// that renders it and the thread that drives it.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use mzpeaks::coordinate::SimpleInterval;
/// use mzgrid::{GridAccumulator, GridRequest, InlineDelivery, MemorySpectrumSource, Spectrum};
///
/// let source: MemorySpectrumSource = (0..10)
///     .map(|i| Spectrum::new(0, format!("scan={i}"), 1, i as f64, vec![150.0], vec![10.0]))
///     .collect();
/// let accumulator = GridAccumulator::with_delivery(Arc::new(source), InlineDelivery);
/// let request = GridRequest::new(
///     1,
///     SimpleInterval::new(0.0, 9.0),
///     SimpleInterval::new(100.0, 200.0),
///     20,
///     50,
/// );
/// let geometry = accumulator.configure(request).unwrap();
/// assert_eq!(geometry.time_bins, 10);
/// assert_eq!(accumulator.snapshot().grid.total(), 100.0);
/// ```
pub struct GridAccumulator<S: SpectrumCatalog + ?Sized + 'static> {
    shared: Arc<Shared>,
    source: Arc<S>,
    delivery: Box<dyn SpectrumDelivery<S>>,
}

impl<S: SpectrumCatalog + ?Sized + 'static> GridAccumulator<S> {
    /// Create an accumulator that delivers each pass on a background thread
    pub fn new(source: Arc<S>) -> Self {
        Self::with_delivery(source, ThreadedDelivery::default())
    }

    pub fn with_delivery<D: SpectrumDelivery<S> + 'static>(source: Arc<S>, delivery: D) -> Self {
        Self {
            shared: Arc::new(Shared::new()),
            source,
            delivery: Box::new(delivery),
        }
    }

    pub fn source(&self) -> &Arc<S> {
        &self.source
    }

    /// Receive every [`GridEvent`] from now on over a channel
    pub fn subscribe(&self) -> Receiver<GridEvent> {
        let (sender, receiver) = channel();
        self.shared
            .observers
            .lock()
            .push(Arc::new(Observer::Channel(sender)));
        receiver
    }

    /// Register a callback for every [`GridEvent`] from now on.
    ///
    /// The callback may run on a delivery thread. It may read, reconfigure or cancel
    /// the accumulator, but must not [`wait`](GridAccumulator::wait) on the pass.
    pub fn add_observer<F: Fn(&GridEvent) + Send + Sync + 'static>(&self, callback: F) {
        self.shared
            .observers
            .lock()
            .push(Arc::new(Observer::Callback(Box::new(callback))));
    }

    /// Start a new pass for `request`, replacing the current one.
    ///
    /// The request is validated before anything changes. The spectra it selects are
    /// enumerated immediately and the resolved geometry returned, while the spectra
    /// themselves are delivered according to this accumulator's
    /// [`SpectrumDelivery`]. If no spectra match, the grid has no time bins and the
    /// pass is complete at once.
    pub fn configure(&self, request: GridRequest) -> Result<GridGeometry, GridError> {
        request.validate()?;
        let mut spectrum_ids = Vec::new();
        let mut start_times = Vec::new();
        for index in self
            .source
            .enumerate(request.ms_level, &request.time_range)
        {
            match self.source.start_time_of(index) {
                Some(time) => {
                    spectrum_ids.push(index);
                    start_times.push(time);
                }
                None => warn!("Skipping spectrum {index}, its start time could not be read"),
            }
        }
        let geometry = GridGeometry::resolve(&request, &start_times);
        if spectrum_ids.is_empty() {
            warn!(
                "No MS{} spectra found between {} and {}",
                request.ms_level, request.time_range.start, request.time_range.end
            );
        }

        let (generation, previous) = {
            let mut state = self.shared.state.lock();
            let previous = state.delivery.take();
            state.generation += 1;
            state.cancel_requested = false;
            state.request = Some(request);
            state.geometry = geometry;
            state.grid = Arc::new(IntensityGrid::new(geometry.time_bins, geometry.mz_bins));
            state.ingestion = IngestionState {
                expected: spectrum_ids.len(),
                complete: spectrum_ids.is_empty(),
                ..Default::default()
            };
            (state.generation, previous)
        };
        // Released outside the lock, a parked sink reports back to this accumulator
        if let Some(previous) = previous {
            previous.cancel();
        }
        debug!("Configured pass {generation}: {geometry:?}");

        let mut events = vec![GridEvent::Configured {
            generation,
            geometry,
        }];
        if spectrum_ids.is_empty() {
            events.push(GridEvent::Ready { generation });
        }
        self.shared.notify(&events);
        if spectrum_ids.is_empty() {
            return Ok(geometry);
        }

        let sink = PassSink {
            shared: Arc::downgrade(&self.shared),
            generation,
            finished: false,
        };
        let handle =
            self.delivery
                .start_delivery(Arc::clone(&self.source), spectrum_ids, Box::new(sink));
        let superseded = {
            let mut state = self.shared.state.lock();
            if state.generation == generation {
                if state.cancel_requested {
                    debug!("Applying a cancel requested while pass {generation} was starting");
                    handle.cancel();
                }
                state.delivery = Some(handle);
                None
            } else {
                Some(handle)
            }
        };
        if let Some(handle) = superseded {
            handle.cancel();
        }
        Ok(geometry)
    }

    /// Re-run the current request from scratch. `None` if nothing was configured.
    pub fn refresh(&self) -> Result<Option<GridGeometry>, GridError> {
        match self.request() {
            Some(request) => self.configure(request).map(Some),
            None => Ok(None),
        }
    }

    /// Re-run the current request with interpolation turned on or off. `None` if
    /// nothing was configured.
    pub fn set_interpolate(&self, interpolate: bool) -> Result<Option<GridGeometry>, GridError> {
        match self.request() {
            Some(request) => self.configure(request.with_interpolate(interpolate)).map(Some),
            None => Ok(None),
        }
    }

    /// Fold one spectrum into the current pass.
    ///
    /// Deliveries started by [`GridAccumulator::configure`] call this already, use it
    /// directly with [`ManualDelivery`](crate::io::ManualDelivery). `position` is the
    /// spectrum's zero-based place in the pass and `total` the pass length, the pass
    /// completes when `position` is the last.
    ///
    /// # Errors
    /// [`GridError::DataShape`] if the spectrum's arrays are malformed. The spectrum
    /// still counts as received and the rest of the grid is unaffected.
    pub fn ingest(&self, spectrum: &Spectrum, position: usize, total: usize) -> Result<(), GridError> {
        let generation = self.shared.state.lock().generation;
        self.shared.ingest(generation, spectrum, position, total)
    }

    pub fn status(&self) -> GridStatus {
        self.shared.state.lock().status()
    }

    pub fn snapshot(&self) -> GridSnapshot {
        self.shared.state.lock().snapshot()
    }

    pub fn geometry(&self) -> GridGeometry {
        self.shared.state.lock().geometry
    }

    pub fn request(&self) -> Option<GridRequest> {
        self.shared.state.lock().request.clone()
    }

    pub fn generation(&self) -> u64 {
        self.shared.state.lock().generation
    }

    /// Ask the current delivery to stop. The grid is marked ready with whatever was
    /// accumulated once the delivery acknowledges. A cancel that arrives while
    /// [`configure`](GridAccumulator::configure) is still starting the delivery is
    /// applied as soon as the delivery exists.
    pub fn cancel(&self) {
        let mut state = self.shared.state.lock();
        state.cancel_requested = true;
        if let Some(delivery) = state.delivery.as_ref() {
            delivery.cancel();
        }
    }

    /// Block until the current delivery stops, then return a snapshot.
    ///
    /// Must not be called from an observer callback.
    pub fn wait(&self) -> GridSnapshot {
        let pending = self
            .shared
            .state
            .lock()
            .delivery
            .as_mut()
            .and_then(DeliveryHandle::split_thread);
        if let Some(mut pending) = pending {
            pending.join();
        }
        self.snapshot()
    }
}

impl<S: SpectrumCatalog + ?Sized + 'static> Drop for GridAccumulator<S> {
    fn drop(&mut self) {
        self.cancel();
    }
}
