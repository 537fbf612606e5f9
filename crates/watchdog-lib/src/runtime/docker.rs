//! Docker Engine implementation of the runtime boundary

use anyhow::{Context, Result};
use async_trait::async_trait;
use bollard::container::{InspectContainerOptions, ListContainersOptions, StatsOptions};
use bollard::Docker;
use futures_util::StreamExt;
use tokio::sync::mpsc;
use tracing::debug;

use super::{RuntimeClient, StatsStream};
use crate::models::{ContainerDescriptor, ContainerState};

/// Frames buffered per stats stream before the relay applies backpressure
const STREAM_BUFFER: usize = 16;

/// Runtime client backed by the local Docker Engine API
pub struct DockerRuntimeClient {
    docker: Docker,
}

impl DockerRuntimeClient {
    /// Connect over a Unix socket (e.g. `/var/run/docker.sock`).
    pub fn connect(socket_path: &str) -> Result<Self> {
        let docker = Docker::connect_with_socket(socket_path, 30, bollard::API_DEFAULT_VERSION)
            .with_context(|| format!("failed to connect to docker socket at {socket_path}"))?;
        Ok(Self { docker })
    }

    /// Connect using the environment's Docker defaults.
    pub fn connect_with_defaults() -> Result<Self> {
        let docker = Docker::connect_with_local_defaults()
            .context("failed to connect to local docker daemon")?;
        Ok(Self { docker })
    }
}

#[async_trait]
impl RuntimeClient for DockerRuntimeClient {
    async fn list_containers(&self, include_stopped: bool) -> Result<Vec<ContainerDescriptor>> {
        let options = ListContainersOptions::<String> {
            all: include_stopped,
            ..Default::default()
        };

        let summaries = self
            .docker
            .list_containers(Some(options))
            .await
            .context("docker list_containers failed")?;

        Ok(summaries
            .into_iter()
            .map(|summary| ContainerDescriptor {
                id: summary.id.unwrap_or_default(),
                name: summary
                    .names
                    .and_then(|names| names.into_iter().next())
                    .map(|name| name.trim_start_matches('/').to_string())
                    .unwrap_or_default(),
                status: summary.status.unwrap_or_default(),
            })
            .collect())
    }

    async fn open_stats_stream(&self, container_id: &str) -> Result<StatsStream> {
        let options = StatsOptions {
            stream: true,
            one_shot: false,
        };
        let mut stats = self.docker.stats(container_id, Some(options));
        let (tx, rx) = mpsc::channel(STREAM_BUFFER);
        let id = container_id.to_string();

        // Relay engine frames into the channel; dropping the receiver
        // (watcher stopped) or a transport error ends the relay, which
        // the watcher observes as a closed channel.
        tokio::spawn(async move {
            while let Some(frame) = stats.next().await {
                let payload = match frame {
                    Ok(stats) => match serde_json::to_vec(&stats) {
                        Ok(bytes) => bytes,
                        Err(err) => {
                            debug!(container_id = %id, error = %err, "failed to encode stats frame");
                            continue;
                        }
                    },
                    Err(err) => {
                        debug!(container_id = %id, error = %err, "stats stream transport error");
                        break;
                    }
                };
                if tx.send(payload).await.is_err() {
                    break;
                }
            }
        });

        Ok(rx)
    }

    async fn inspect(&self, container_id: &str) -> Result<ContainerState> {
        let response = self
            .docker
            .inspect_container(container_id, None::<InspectContainerOptions>)
            .await
            .with_context(|| format!("docker inspect failed for {container_id}"))?;

        let status = response
            .state
            .and_then(|state| state.status)
            .map(|status| status.to_string())
            .unwrap_or_default();

        Ok(ContainerState { status })
    }
}
