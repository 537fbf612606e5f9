//! Container runtime boundary
//!
//! The watchdog core consumes the container runtime through this trait and
//! never depends on a concrete client; the Docker Engine implementation
//! lives in [`docker`].

mod docker;

pub use docker::DockerRuntimeClient;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::models::{ContainerDescriptor, ContainerState};

/// Raw frames from a container's live stats stream.
///
/// The channel closing signals end-of-stream or transport failure; the
/// watcher does not distinguish the two. Recovery is the reconciler's
/// job: it re-acquires a fresh stream on a later pass if the container
/// still lists as Up.
pub type StatsStream = mpsc::Receiver<Vec<u8>>;

/// Capabilities the core needs from a container runtime
#[async_trait]
pub trait RuntimeClient: Send + Sync {
    /// List containers, optionally including stopped ones.
    async fn list_containers(&self, include_stopped: bool) -> Result<Vec<ContainerDescriptor>>;

    /// Open a live resource-usage stream for one container.
    async fn open_stats_stream(&self, container_id: &str) -> Result<StatsStream>;

    /// Inspect one container's current state.
    async fn inspect(&self, container_id: &str) -> Result<ContainerState>;
}
