//! agentctl daemon
//!
//! Runs the background update checker in the foreground until a `stop`
//! command arrives on its socket. `AGENTCTL_CHECK_INTERVAL` overrides the
//! check interval in seconds.

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[cfg(unix)]
#[tokio::main]
async fn main() -> Result<()> {
    use std::sync::Arc;
    use std::time::Duration;

    use agentctl_core::context::AppContext;
    use agentctl_core::daemon::{DEFAULT_CHECK_INTERVAL, DaemonServer};

    init_tracing();

    let interval = std::env::var("AGENTCTL_CHECK_INTERVAL")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_CHECK_INTERVAL);

    let ctx = AppContext::from_env()?;
    let source = Arc::new(ctx.update_source()?);
    DaemonServer::new(ctx.daemon_paths(), interval, source)
        .run()
        .await
}

#[cfg(not(unix))]
fn main() -> Result<()> {
    init_tracing();
    anyhow::bail!("The agentctl daemon requires Unix domain sockets")
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "agentctl=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
