use super::{store::TomlFileStore, ConfigStore, Configuration, PersistenceError};
use color_eyre::{eyre::eyre, Result};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc::{channel, error::TrySendError, Receiver, Sender};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

const QUEUE_DEPTH: usize = 32;

macro_rules! handle_action {
    ($action:expr, $response_tx:expr) => {
        if $response_tx.send($action.await).is_err() {
            error!("Failed to send response");
        }
    };
}

// Aktion-Enum für den Persistence-Worker
#[derive(Debug)]
pub enum PersistenceAction {
    Save(Configuration),
    /// Answers once every save queued before it has been written
    Flush {
        response_tx: oneshot::Sender<Result<()>>,
    },
}

/// Background task writing configurations to a TOML file
pub struct PersistenceWorker {
    path: PathBuf,
    rx: Receiver<PersistenceAction>,
    cancel: CancellationToken,
}

impl PersistenceWorker {
    /// Spawns the worker and returns the store the engine should save through.
    pub fn spawn(path: PathBuf, cancel: CancellationToken) -> (WorkerStore, JoinHandle<()>) {
        let (tx, rx) = channel::<PersistenceAction>(QUEUE_DEPTH);
        let worker = Self {
            path: path.clone(),
            rx,
            cancel,
        };
        let handle = tokio::spawn(worker.run());
        (WorkerStore { path, tx }, handle)
    }

    async fn run(mut self) {
        info!("Persistence worker started for {}", self.path.display());
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    info!("Persistence worker cancelled");
                    break;
                }

                action = self.rx.recv() => {
                    let Some(action) = action else {
                        debug!("Persistence channel closed");
                        break;
                    };
                    self.handle(action).await;
                }
            }
        }

        // Whatever is still queued gets written before the task ends
        self.rx.close();
        while let Some(action) = self.rx.recv().await {
            self.handle(action).await;
        }
        info!("Persistence worker stopped");
    }

    async fn handle(&mut self, action: PersistenceAction) {
        match action {
            PersistenceAction::Save(config) => {
                let (latest, flush) = self.coalesce(config);
                let written = write_config(&self.path, &latest).await;
                if let Err(e) = &written {
                    warn!("Failed to persist configuration: {}", e);
                }
                if let Some(response_tx) = flush {
                    if response_tx.send(written).is_err() {
                        error!("Failed to send response");
                    }
                }
            }
            PersistenceAction::Flush { response_tx } => {
                handle_action!(async { Ok(()) }, response_tx);
            }
        }
    }

    /// Skips saves that are already superseded by a newer one in the queue.
    /// Stops at the first flush, which is answered after the write.
    fn coalesce(
        &mut self,
        mut latest: Configuration,
    ) -> (Configuration, Option<oneshot::Sender<Result<()>>>) {
        while let Ok(next) = self.rx.try_recv() {
            match next {
                PersistenceAction::Save(config) => latest = config,
                PersistenceAction::Flush { response_tx } => return (latest, Some(response_tx)),
            }
        }
        (latest, None)
    }
}

async fn write_config(path: &Path, config: &Configuration) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| eyre!("Failed to create config directory: {}", e))?;
    }
    let content = toml::to_string_pretty(config)
        .map_err(|e| eyre!("Failed to serialize configuration: {}", e))?;
    tokio::fs::write(path, content)
        .await
        .map_err(|e| eyre!("Failed to write config file: {}", e))?;
    debug!("Configuration written to {}", path.display());
    Ok(())
}

/// Store handle backed by the [`PersistenceWorker`].
///
/// Loading reads the file directly, saving only enqueues.
#[derive(Debug, Clone)]
pub struct WorkerStore {
    path: PathBuf,
    tx: Sender<PersistenceAction>,
}

impl WorkerStore {
    /// Waits until every save enqueued so far is on disk.
    pub async fn flush(&self) -> Result<()> {
        let (response_tx, response_rx) = oneshot::channel();
        self.tx
            .send(PersistenceAction::Flush { response_tx })
            .await
            .map_err(|e| eyre!("Persistence worker gone: {}", e))?;
        response_rx
            .await
            .map_err(|e| eyre!("No flush response: {}", e))?
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigStore for WorkerStore {
    fn load(&self) -> Result<Option<Configuration>, PersistenceError> {
        TomlFileStore::new(self.path.clone()).load()
    }

    fn save(&self, config: &Configuration) -> Result<(), PersistenceError> {
        self.tx
            .try_send(PersistenceAction::Save(config.clone()))
            .map_err(|e| match e {
                TrySendError::Full(_) => {
                    PersistenceError::WorkerUnavailable("queue full".to_string())
                }
                TrySendError::Closed(_) => {
                    PersistenceError::WorkerUnavailable("worker stopped".to_string())
                }
            })
    }
}
