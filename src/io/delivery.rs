use std::fmt::Debug;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use log::{debug, error, trace};
use parking_lot::Mutex;

use crate::io::source::{SpectrumAccessError, SpectrumCatalog};
use crate::spectrum::Spectrum;

/// The lifecycle of a single delivery pass
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TaskStatus {
    #[default]
    Waiting,
    Processing,
    Finished,
    Cancelled,
    Error,
}

impl TaskStatus {
    /// Whether the pass has stopped, for any reason
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished | Self::Cancelled | Self::Error)
    }
}

/// How a delivery pass ended, handed to [`SpectrumSink::finish`]
#[derive(Debug, Clone, PartialEq)]
pub enum DeliveryOutcome {
    /// Every requested spectrum was delivered
    Finished,
    /// The pass was cancelled before delivering every spectrum
    Cancelled,
    /// A spectrum could not be read and the pass stopped
    Failed(SpectrumAccessError),
}

impl DeliveryOutcome {
    pub fn status(&self) -> TaskStatus {
        match self {
            DeliveryOutcome::Finished => TaskStatus::Finished,
            DeliveryOutcome::Cancelled => TaskStatus::Cancelled,
            DeliveryOutcome::Failed(_) => TaskStatus::Error,
        }
    }
}

/// The receiving end of a delivery pass.
///
/// `accept` is called once per spectrum, in order, from whichever thread runs the
/// pass. Calls are never concurrent for a single sink. A sink that is dropped
/// without `finish` having been called belongs to a delivery that stopped
/// abnormally, for instance because its thread panicked or could not be spawned.
pub trait SpectrumSink: Send {
    fn accept(&mut self, spectrum: Spectrum, position: usize, total: usize);

    fn finish(&mut self, outcome: DeliveryOutcome) {
        let _ = outcome;
    }
}

impl<F: FnMut(Spectrum, usize, usize) + Send> SpectrumSink for F {
    fn accept(&mut self, spectrum: Spectrum, position: usize, total: usize) {
        (self)(spectrum, position, total)
    }
}

#[derive(Debug, Default)]
struct TaskState {
    cancelled: AtomicBool,
    status: Mutex<TaskStatus>,
}

impl TaskState {
    fn set_status(&self, status: TaskStatus) {
        *self.status.lock() = status;
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Marks the pass as errored if the delivering thread unwinds
struct PanicGuard<'a> {
    task: &'a TaskState,
}

impl Drop for PanicGuard<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            error!("Spectrum delivery panicked");
            self.task.set_status(TaskStatus::Error);
        }
    }
}

/// A cancellable reference to a running (or finished) delivery pass
pub struct DeliveryHandle {
    task: Arc<TaskState>,
    thread: Option<JoinHandle<()>>,
    /// The sink of a pass fed by the caller, kept alive until the pass is abandoned
    parked_sink: Option<Box<dyn SpectrumSink>>,
}

impl Debug for DeliveryHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeliveryHandle")
            .field("task", &self.task)
            .field("thread", &self.thread)
            .field("parked_sink", &self.parked_sink.is_some())
            .finish()
    }
}

impl DeliveryHandle {
    fn new(task: Arc<TaskState>, thread: Option<JoinHandle<()>>) -> Self {
        Self {
            task,
            thread,
            parked_sink: None,
        }
    }

    fn parked(task: Arc<TaskState>, sink: Box<dyn SpectrumSink>) -> Self {
        Self {
            task,
            thread: None,
            parked_sink: Some(sink),
        }
    }

    /// Ask the pass to stop before its next spectrum. Spectra already being
    /// handed to the sink are allowed to finish.
    pub fn cancel(&self) {
        self.task.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.task.is_cancelled()
    }

    pub fn status(&self) -> TaskStatus {
        *self.task.status.lock()
    }

    /// Block until the pass stops. A no-op for passes that ran inline or were
    /// already joined.
    pub fn join(&mut self) {
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("Spectrum delivery thread panicked");
                self.task.set_status(TaskStatus::Error);
            }
        }
    }

    /// Move the thread into a second handle sharing this pass, so it can be joined
    /// without holding on to this one.
    pub(crate) fn split_thread(&mut self) -> Option<DeliveryHandle> {
        self.thread
            .take()
            .map(|thread| DeliveryHandle::new(Arc::clone(&self.task), Some(thread)))
    }
}

fn run_delivery<S: SpectrumCatalog + ?Sized>(
    source: &S,
    spectrum_ids: &[usize],
    sink: &mut dyn SpectrumSink,
    task: &TaskState,
) {
    let _guard = PanicGuard { task };
    task.set_status(TaskStatus::Processing);
    let total = spectrum_ids.len();
    for (position, index) in spectrum_ids.iter().copied().enumerate() {
        if task.is_cancelled() {
            debug!("Delivery cancelled after {position} of {total} spectra");
            sink.finish(DeliveryOutcome::Cancelled);
            task.set_status(TaskStatus::Cancelled);
            return;
        }
        match source.fetch(index) {
            Ok(spectrum) => {
                trace!("Delivering spectrum {index} ({position}/{total})");
                sink.accept(spectrum, position, total);
            }
            Err(err) => {
                error!("Failed to fetch spectrum {index} ({position}/{total}): {err}");
                sink.finish(DeliveryOutcome::Failed(err));
                task.set_status(TaskStatus::Error);
                return;
            }
        }
    }
    sink.finish(DeliveryOutcome::Finished);
    task.set_status(TaskStatus::Finished);
}

/// Walks a list of spectrum indices, fetching each from a catalog and feeding it
/// to a [`SpectrumSink`].
///
/// Implementations call [`SpectrumSink::finish`] exactly once when the pass ends,
/// or hold on to the sink for as long as the pass may still receive spectra.
pub trait SpectrumDelivery<S: SpectrumCatalog + ?Sized>: Send + Sync {
    fn start_delivery(
        &self,
        source: Arc<S>,
        spectrum_ids: Vec<usize>,
        sink: Box<dyn SpectrumSink>,
    ) -> DeliveryHandle;
}

/// Runs each delivery pass on its own background thread
#[derive(Debug, Clone)]
pub struct ThreadedDelivery {
    thread_name: String,
}

impl ThreadedDelivery {
    pub fn new(thread_name: String) -> Self {
        Self { thread_name }
    }
}

impl Default for ThreadedDelivery {
    fn default() -> Self {
        Self::new("mzgrid-delivery".to_string())
    }
}

impl<S: SpectrumCatalog + ?Sized + 'static> SpectrumDelivery<S> for ThreadedDelivery {
    fn start_delivery(
        &self,
        source: Arc<S>,
        spectrum_ids: Vec<usize>,
        mut sink: Box<dyn SpectrumSink>,
    ) -> DeliveryHandle {
        let task = Arc::new(TaskState::default());
        let thread_task = Arc::clone(&task);
        let spawned = thread::Builder::new()
            .name(self.thread_name.clone())
            .spawn(move || run_delivery(source.as_ref(), &spectrum_ids, sink.as_mut(), &thread_task));
        match spawned {
            Ok(thread) => DeliveryHandle::new(task, Some(thread)),
            Err(err) => {
                error!("Failed to spawn delivery thread: {err}");
                task.set_status(TaskStatus::Error);
                DeliveryHandle::new(task, None)
            }
        }
    }
}

/// Runs each delivery pass to completion on the calling thread before
/// returning its handle.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineDelivery;

impl<S: SpectrumCatalog + ?Sized> SpectrumDelivery<S> for InlineDelivery {
    fn start_delivery(
        &self,
        source: Arc<S>,
        spectrum_ids: Vec<usize>,
        mut sink: Box<dyn SpectrumSink>,
    ) -> DeliveryHandle {
        let task = Arc::new(TaskState::default());
        run_delivery(source.as_ref(), &spectrum_ids, sink.as_mut(), &task);
        DeliveryHandle::new(task, None)
    }
}

/// Starts no work at all. The caller pushes spectra itself through
/// [`GridAccumulator::ingest`](crate::grid::GridAccumulator::ingest), and the
/// pass status stays [`TaskStatus::Waiting`]. The sink is parked in the returned
/// handle and released with it.
#[derive(Debug, Default, Clone, Copy)]
pub struct ManualDelivery;

impl<S: SpectrumCatalog + ?Sized> SpectrumDelivery<S> for ManualDelivery {
    fn start_delivery(
        &self,
        _source: Arc<S>,
        spectrum_ids: Vec<usize>,
        sink: Box<dyn SpectrumSink>,
    ) -> DeliveryHandle {
        debug!("Awaiting {} spectra from the caller", spectrum_ids.len());
        DeliveryHandle::parked(Arc::new(TaskState::default()), sink)
    }
}
