use std::fmt::Debug;
use std::sync::mpsc::Sender;

use crate::grid::geometry::GridGeometry;
use crate::grid::GridError;

/// Notifications broadcast by a [`GridAccumulator`](crate::grid::GridAccumulator).
///
/// Every event carries the generation of the pass that produced it so that a
/// listener can ignore stragglers from a pass it no longer cares about.
#[derive(Debug, Clone, PartialEq)]
pub enum GridEvent {
    /// A new pass started with this geometry
    Configured {
        generation: u64,
        geometry: GridGeometry,
    },
    /// A spectrum was folded into the grid and more are expected
    Updating {
        generation: u64,
        received: usize,
        expected: usize,
    },
    /// The pass is complete and the grid will not change again. Sent exactly
    /// once per pass.
    Ready { generation: u64 },
    /// Something went wrong during the pass. The grid remains displayable.
    Failed { generation: u64, error: GridError },
}

impl GridEvent {
    pub fn generation(&self) -> u64 {
        match self {
            Self::Configured { generation, .. }
            | Self::Updating { generation, .. }
            | Self::Ready { generation }
            | Self::Failed { generation, .. } => *generation,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready { .. })
    }
}

pub(crate) type ObserverFn = dyn Fn(&GridEvent) + Send + Sync;

pub(crate) enum Observer {
    Channel(Sender<GridEvent>),
    Callback(Box<ObserverFn>),
}

impl Debug for Observer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Channel(_) => f.write_str("Observer::Channel"),
            Self::Callback(_) => f.write_str("Observer::Callback"),
        }
    }
}

impl Observer {
    /// Deliver `event`, returning `false` if the observer has gone away
    pub(crate) fn notify(&self, event: &GridEvent) -> bool {
        match self {
            Self::Channel(sender) => sender.send(event.clone()).is_ok(),
            Self::Callback(callback) => {
                callback(event);
                true
            }
        }
    }
}
