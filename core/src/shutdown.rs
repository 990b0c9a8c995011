//! Graceful shutdown plumbing: components that need to flush or close
//! something implement [`SyncShutdown`] or [`AsyncShutdown`]; [`Shutdown`]
//! is the signal value threaded through the engine's run loop.

use serde::{Deserialize, Serialize};
use std::future::Future;

/// A component that can shut down immediately, with no async work.
pub trait SyncShutdown {
    type Result;
    fn shutdown(&mut self) -> Self::Result;
}

/// A component whose shutdown involves awaiting something (flushing a
/// sink, cancelling outstanding orders).
pub trait AsyncShutdown {
    type Result;
    fn shutdown(&mut self) -> impl Future<Output = Self::Result>;
}

/// Signal that a graceful shutdown has been requested. Checked by
/// [`crate::engine::Engine::run`] between cycles.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Deserialize, Serialize)]
pub struct Shutdown;
