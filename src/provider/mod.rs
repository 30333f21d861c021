//! Location sources.
//!
//! A provider pushes [`LocationEvent`]s into a channel from its own task and
//! hands back a [`Subscription`] that stops the watcher when it is stopped or
//! dropped.

pub mod replay;
pub mod restart;
pub mod simulated;
pub mod termux;

pub use replay::ReplayProvider;
pub use simulated::SimulatedProvider;
pub use termux::TermuxProvider;

use thiserror::Error;
use tokio::sync::mpsc::Sender;
use tokio::task::JoinHandle;

use crate::types::Reading;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LocationError {
    /// The source cannot be used at all; tracking must not start.
    #[error("Location source unavailable: {0}")]
    Unavailable(String),

    /// A single update failed; the subscription keeps running.
    #[error("Location update failed: {0}")]
    Update(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum LocationEvent {
    Fix(Reading),
    Error(LocationError),
}

#[derive(Debug, Clone, Copy)]
pub struct WatchOptions {
    pub high_accuracy: bool,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            high_accuracy: true,
        }
    }
}

/// Teardown handle for a running location watcher.
#[derive(Debug)]
pub struct Subscription {
    source: &'static str,
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    pub fn new(source: &'static str, task: JoinHandle<()>) -> Self {
        Self {
            source,
            task: Some(task),
        }
    }

    pub fn source(&self) -> &'static str {
        self.source
    }

    pub fn is_active(&self) -> bool {
        self.task.as_ref().map(|t| !t.is_finished()).unwrap_or(false)
    }

    pub fn stop(mut self) {
        self.cancel();
    }

    fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            log::debug!("[{}] location watcher stopped", self.source);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

pub trait LocationProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Start watching. Must be called from inside a tokio runtime.
    fn subscribe(
        &self,
        options: WatchOptions,
        tx: Sender<LocationEvent>,
    ) -> Result<Subscription, LocationError>;
}
