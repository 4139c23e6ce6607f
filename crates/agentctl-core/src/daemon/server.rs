//! Socket server and periodic check loop.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::protocol::{Request, Response};
use super::state::StatusStore;
use super::{DaemonPaths, UpdateSource, client};

/// Longest request line accepted from a client.
const MAX_REQUEST: u64 = 256;

pub struct DaemonServer {
    paths: DaemonPaths,
    interval: Duration,
    source: Arc<dyn UpdateSource>,
}

#[derive(Clone)]
struct Shared {
    paths: DaemonPaths,
    status: StatusStore,
    source: Arc<dyn UpdateSource>,
    shutdown: Arc<watch::Sender<bool>>,
}

impl DaemonServer {
    pub fn new(paths: DaemonPaths, interval: Duration, source: Arc<dyn UpdateSource>) -> Self {
        Self {
            paths,
            interval,
            source,
        }
    }

    /// Serve until a `stop` command arrives.
    pub async fn run(self) -> anyhow::Result<()> {
        let listener = self.bind().await?;
        let pid = std::process::id();
        std::fs::write(&self.paths.pid, pid.to_string())
            .with_context(|| format!("Failed to write PID file: {}", self.paths.pid.display()))?;

        let status = StatusStore::load_or_default(&self.paths.status)?;
        status
            .update(|s| {
                s.pid = pid;
                s.started_at = Some(Utc::now());
                s.running = true;
                s.checking = false;
                s.last_error = None;
            })
            .await?;
        info!(pid, socket = %self.paths.socket.display(), "Daemon started");

        let (shutdown, mut shutdown_rx) = watch::channel(false);
        let shared = Shared {
            paths: self.paths.clone(),
            status,
            source: self.source,
            shutdown: Arc::new(shutdown),
        };

        let checker = tokio::spawn(check_loop(
            shared.clone(),
            self.interval,
            shared.shutdown.subscribe(),
        ));

        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, _)) => {
                        let shared = shared.clone();
                        tokio::spawn(async move {
                            if let Err(err) = handle_connection(stream, shared).await {
                                debug!(error = %err, "Connection failed");
                            }
                        });
                    }
                    Err(err) => warn!(error = %err, "Accept failed"),
                },
                _ = shutdown_rx.changed() => break,
            }
        }

        drop(listener);
        if let Err(err) = checker.await {
            warn!(error = %err, "Check loop ended abnormally");
        }
        shared.paths.cleanup();
        shared
            .status
            .update(|s| {
                s.running = false;
                s.checking = false;
            })
            .await?;
        info!("Daemon stopped");
        Ok(())
    }

    async fn bind(&self) -> anyhow::Result<UnixListener> {
        if let Some(parent) = self.paths.socket.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        if self.paths.socket.exists() {
            if client::is_running(&self.paths.socket).await {
                anyhow::bail!(
                    "Daemon already running on {}",
                    self.paths.socket.display()
                );
            }
            debug!(socket = %self.paths.socket.display(), "Removing stale socket");
            std::fs::remove_file(&self.paths.socket).with_context(|| {
                format!("Failed to remove stale socket: {}", self.paths.socket.display())
            })?;
        }
        UnixListener::bind(&self.paths.socket)
            .with_context(|| format!("Failed to bind socket: {}", self.paths.socket.display()))
    }
}

async fn handle_connection(stream: UnixStream, shared: Shared) -> anyhow::Result<()> {
    let (read, mut write) = stream.into_split();
    let mut line = String::new();
    BufReader::new(read.take(MAX_REQUEST))
        .read_line(&mut line)
        .await
        .context("Failed to read request")?;

    let request = line.parse::<Request>();
    debug!(request = line.trim(), "Daemon request");
    let response = match &request {
        Ok(Request::Status) => Response::status(shared.status.snapshot().await),
        Ok(Request::Updates) => Response::updates(shared.status.snapshot().await.updates),
        Ok(Request::Check) => match run_check(&shared).await {
            Ok(updates) => Response::updates(updates),
            Err(err) => Response::error(format!("{:#}", err)),
        },
        Ok(Request::Stop) => Response::message("stopping"),
        Err(err) => Response::error(err.to_string()),
    };

    let mut body = serde_json::to_vec(&response).context("Failed to encode response")?;
    body.push(b'\n');
    write.write_all(&body).await.context("Failed to write response")?;
    write.shutdown().await.context("Failed to close response")?;

    if matches!(request, Ok(Request::Stop)) {
        info!("Stop requested");
        shared.paths.cleanup();
        let _ = shared.shutdown.send(true);
    }
    Ok(())
}

async fn check_loop(shared: Shared, interval: Duration, mut shutdown: watch::Receiver<bool>) {
    loop {
        if let Err(err) = run_check(&shared).await {
            warn!(error = %format!("{:#}", err), "Update check failed");
        }
        let next = chrono::Duration::from_std(interval).ok().map(|d| Utc::now() + d);
        if let Err(err) = shared.status.update(|s| s.next_check = next).await {
            warn!(error = %err, "Failed to persist daemon status");
        }
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = shutdown.changed() => break,
        }
    }
}

async fn run_check(shared: &Shared) -> anyhow::Result<Vec<crate::updates::UpdateHint>> {
    shared.status.update(|s| s.checking = true).await?;
    let source = shared.source.clone();
    let result = tokio::task::spawn_blocking(move || source.check())
        .await
        .context("Update check task panicked")
        .and_then(|r| r);

    let now = Utc::now();
    match result {
        Ok(updates) => {
            debug!(count = updates.len(), "Update check finished");
            shared
                .status
                .update(|s| {
                    s.checking = false;
                    s.last_check = Some(now);
                    s.check_count += 1;
                    s.updates = updates.clone();
                    s.last_error = None;
                })
                .await?;
            Ok(updates)
        }
        Err(err) => {
            let message = format!("{:#}", err);
            shared
                .status
                .update(|s| {
                    s.checking = false;
                    s.last_check = Some(now);
                    s.last_error = Some(message);
                })
                .await?;
            Err(err)
        }
    }
}
