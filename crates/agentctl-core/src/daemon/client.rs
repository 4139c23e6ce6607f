//! Client side of the daemon socket.

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;

use super::protocol::{Request, Response};
use super::state::DaemonStatus;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Send one command and wait for the reply, bounded by `timeout`.
pub async fn send_command(
    socket: &Path,
    request: Request,
    timeout: Duration,
) -> anyhow::Result<Response> {
    let exchange = async {
        let mut stream = UnixStream::connect(socket)
            .await
            .with_context(|| format!("Failed to connect to daemon: {}", socket.display()))?;
        stream
            .write_all(format!("{}\n", request).as_bytes())
            .await
            .context("Failed to send daemon command")?;
        stream.shutdown().await.context("Failed to finish daemon request")?;

        let mut reply = Vec::new();
        stream
            .read_to_end(&mut reply)
            .await
            .context("Failed to read daemon reply")?;
        serde_json::from_slice::<Response>(&reply).context("Failed to parse daemon reply")
    };

    tokio::time::timeout(timeout, exchange)
        .await
        .with_context(|| format!("Daemon did not answer '{}' within {:?}", request, timeout))?
}

/// Whether a daemon answers on `socket`.
pub async fn is_running(socket: &Path) -> bool {
    send_command(socket, Request::Status, DEFAULT_TIMEOUT)
        .await
        .is_ok()
}

/// Last persisted status, readable without a live daemon.
pub fn read_status_file(path: &Path) -> anyhow::Result<Option<DaemonStatus>> {
    if !path.exists() {
        return Ok(None);
    }
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read daemon status: {}", path.display()))?;
    let status = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse daemon status: {}", path.display()))?;
    Ok(Some(status))
}
