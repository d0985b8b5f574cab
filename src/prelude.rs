//! The traits needed to work with spectrum sources and deliveries
pub use crate::io::{SpectrumCatalog, SpectrumDelivery, SpectrumSink};
