//! Registry of active forwarding workers
//!
//! The registry is an explicitly owned object injected into the start/stop
//! entry points; it holds the only state shared across workers. The map lock
//! is held for map operations only, never across stream or network I/O.

use crate::config::StoreConfig;
use crate::errors::{ForwarderError, Result};
use crate::line::{TargetContext, TargetInfo};
use crate::store::StoreClient;
use crate::worker::Worker;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use tokio::fs::File;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

pub struct Registry {
    workers: Mutex<HashMap<String, WorkerHandle>>,
}

struct WorkerHandle {
    container_id: String,
    cancel: CancellationToken,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            workers: Mutex::new(HashMap::new()),
        }
    }

    /// Start forwarding for the target behind `stream_path`.
    ///
    /// Rejects duplicates, opens the stream, resolves the context, connects
    /// the store client (with health probe), registers the worker and spawns
    /// its loop. Any construction failure aborts the start; nothing is
    /// registered partially. Returns as soon as the task is spawned.
    pub async fn start(&self, stream_path: &str, info: TargetInfo) -> Result<()> {
        let target = target_id(stream_path);

        if self.lock().contains_key(&target) {
            return Err(ForwarderError::DuplicateTarget(target));
        }

        info!(id = %info.container_id, path = %stream_path, "start logging");

        let stream = File::open(stream_path)
            .await
            .map_err(|source| ForwarderError::StreamOpen {
                path: stream_path.to_string(),
                source,
            })?;

        let context = TargetContext::resolve(&info)?;
        let store_config = StoreConfig::from_options(&info.config)?;
        let sink = StoreClient::connect(&store_config).await?;

        let cancel = CancellationToken::new();
        let worker = Worker::new(context, stream, sink, cancel.clone());

        {
            let mut workers = self.lock();
            // The construction above ran outside the lock; a concurrent start
            // for the same target may have won the race.
            if workers.contains_key(&target) {
                return Err(ForwarderError::DuplicateTarget(target));
            }
            workers.insert(
                target,
                WorkerHandle {
                    container_id: info.container_id.clone(),
                    cancel,
                },
            );
        }

        tokio::spawn(worker.run());
        Ok(())
    }

    /// Stop forwarding for the target behind `stream_path`.
    ///
    /// Signals the worker and removes it from the registry; the worker task
    /// observes the cancellation on its next iteration. Stopping an unknown
    /// target logs an error but still reports success.
    pub fn stop(&self, stream_path: &str) -> Result<()> {
        let target = target_id(stream_path);

        match self.lock().remove(&target) {
            Some(handle) => {
                info!(id = %handle.container_id, path = %stream_path, "stop logging");
                handle.cancel.cancel();
            }
            None => {
                error!(
                    path = %stream_path,
                    "failed to stop logging, target is not active"
                );
            }
        }

        Ok(())
    }

    /// Number of currently registered targets.
    pub fn active_targets(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, WorkerHandle>> {
        self.workers.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

/// Target identifier: the final segment of the stream path.
fn target_id(stream_path: &str) -> String {
    Path::new(stream_path)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| stream_path.to_string())
}
