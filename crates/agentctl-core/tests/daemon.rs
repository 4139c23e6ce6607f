#![cfg(unix)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chrono::Utc;
use tempfile::TempDir;

use agentctl_core::daemon::{
    DaemonPaths, DaemonServer, Request, UpdateSource, read_status_file, send_command,
};
use agentctl_core::updates::UpdateHint;

const TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Default)]
struct CountingSource {
    calls: AtomicUsize,
}

impl UpdateSource for CountingSource {
    fn check(&self) -> anyhow::Result<Vec<UpdateHint>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![UpdateHint {
            name: "weather".to_string(),
            current_commit: Some("aaa".to_string()),
            remote_commit: "bbb".to_string(),
            checked_at: Utc::now(),
        }])
    }
}

async fn wait_for_socket(paths: &DaemonPaths) {
    for _ in 0..100 {
        if paths.socket.exists() && paths.pid.exists() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("daemon socket never appeared");
}

#[tokio::test]
async fn status_check_and_stop_over_socket() {
    let temp = TempDir::new().unwrap();
    let paths = DaemonPaths::new(&temp.path().join("state"));
    let source = Arc::new(CountingSource::default());

    let server = DaemonServer::new(paths.clone(), Duration::from_secs(3600), source.clone());
    let handle = tokio::spawn(server.run());
    wait_for_socket(&paths).await;

    let status = send_command(&paths.socket, Request::Status, TIMEOUT)
        .await
        .unwrap();
    assert!(status.ok);
    let snapshot = status.status.unwrap();
    assert!(snapshot.running);
    assert_eq!(snapshot.pid, std::process::id());

    let checked = send_command(&paths.socket, Request::Check, TIMEOUT)
        .await
        .unwrap();
    assert!(checked.ok);
    assert_eq!(checked.updates.unwrap()[0].name, "weather");
    assert!(source.calls.load(Ordering::SeqCst) >= 1);

    let updates = send_command(&paths.socket, Request::Updates, TIMEOUT)
        .await
        .unwrap();
    assert_eq!(updates.updates.unwrap().len(), 1);

    let persisted = read_status_file(&paths.status).unwrap().unwrap();
    assert_eq!(persisted.updates.len(), 1);
    assert!(persisted.check_count >= 1);

    let stopped = send_command(&paths.socket, Request::Stop, TIMEOUT)
        .await
        .unwrap();
    assert!(stopped.ok);

    tokio::time::timeout(TIMEOUT, handle)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert!(!paths.socket.exists());
    assert!(!paths.pid.exists());
    assert!(!read_status_file(&paths.status).unwrap().unwrap().running);
}

#[tokio::test]
async fn unknown_command_gets_error_reply() {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::UnixStream;

    let temp = TempDir::new().unwrap();
    let paths = DaemonPaths::new(&temp.path().join("state"));
    let server = DaemonServer::new(
        paths.clone(),
        Duration::from_secs(3600),
        Arc::new(CountingSource::default()),
    );
    let handle = tokio::spawn(server.run());
    wait_for_socket(&paths).await;

    let mut stream = UnixStream::connect(&paths.socket).await.unwrap();
    stream.write_all(b"restart\n").await.unwrap();
    stream.shutdown().await.unwrap();
    let mut reply = String::new();
    stream.read_to_string(&mut reply).await.unwrap();
    let value: serde_json::Value = serde_json::from_str(&reply).unwrap();
    assert_eq!(value["ok"], false);
    assert!(value["error"].as_str().unwrap().contains("restart"));

    send_command(&paths.socket, Request::Stop, TIMEOUT)
        .await
        .unwrap();
    tokio::time::timeout(TIMEOUT, handle)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
}

#[test]
fn status_file_absent_before_first_run() {
    let temp = TempDir::new().unwrap();
    let paths = DaemonPaths::new(temp.path());
    assert!(read_status_file(&paths.status).unwrap().is_none());
}
