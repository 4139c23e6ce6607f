//! Launch command discovery for built servers.

use std::path::{Path, PathBuf};

/// Entry points relative to the install dir, in probe order.
pub fn candidates(name: &str) -> Vec<String> {
    vec![
        "dist/index.js".to_string(),
        "build/index.js".to_string(),
        "index.js".to_string(),
        "main.py".to_string(),
        "server.py".to_string(),
        "src/server.py".to_string(),
        format!("target/release/{}", name),
        format!("bin/{}", name),
        name.to_string(),
    ]
}

/// First existing entry point under `dir`.
pub fn probe(dir: &Path, name: &str) -> Option<PathBuf> {
    candidates(name)
        .into_iter()
        .map(|rel| dir.join(rel))
        .find(|path| path.is_file())
}

/// Command and args that launch `entry`.
pub fn launch_command(entry: &Path) -> (String, Vec<String>) {
    let path = entry.to_string_lossy().into_owned();
    match entry.extension().and_then(|ext| ext.to_str()) {
        Some("js") | Some("mjs") | Some("cjs") => ("node".to_string(), vec![path]),
        Some("py") => ("python3".to_string(), vec![path]),
        _ => (path, Vec::new()),
    }
}
