//! Error taxonomy for the watchdog core

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Listing containers failed. The reconciliation pass has no ground
    /// truth to diff against and is aborted; retried on the next cadence.
    #[error("failed to list containers")]
    ListContainers(#[source] anyhow::Error),

    /// Opening one container's stats stream failed. Scoped to that
    /// container; logged, skipped, and retried on the next pass.
    #[error("failed to acquire stats stream for container {container_id}")]
    StreamAcquisition {
        container_id: String,
        #[source]
        source: anyhow::Error,
    },

    /// A stream payload was not a well-formed stats frame. Scoped to one
    /// frame: logged and dropped, the stream continues.
    #[error("failed to decode stats frame: {reason}")]
    Decode { reason: String },
}
