//! Sources of spectra and the machinery that delivers them to a grid off the
//! interactive thread.
//!
//! A [`SpectrumCatalog`] answers "which spectra fall in this time range at this
//! MS level" and hands them out by index. A [`SpectrumDelivery`] walks such a list
//! of indices in order, feeding each spectrum to a [`SpectrumSink`] and reporting
//! how the walk ended.

mod delivery;
pub(crate) mod source;

pub use crate::io::delivery::{
    DeliveryHandle, DeliveryOutcome, InlineDelivery, ManualDelivery, SpectrumDelivery,
    SpectrumSink, TaskStatus, ThreadedDelivery,
};
pub use crate::io::source::{DataExtent, MemorySpectrumSource, SpectrumAccessError, SpectrumCatalog};
