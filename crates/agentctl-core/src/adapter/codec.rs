//! Shared pieces of the per-tool entry codecs.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::config::Server;
use crate::types::Transport;

pub fn string_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_string)
}

pub fn string_list(value: &Value, key: &str) -> Vec<String> {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

pub fn string_map(value: &Value, key: &str) -> BTreeMap<String, String> {
    value
        .get(key)
        .and_then(Value::as_object)
        .map(|map| {
            map.iter()
                .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
                .collect()
        })
        .unwrap_or_default()
}

pub fn insert_list(entry: &mut Map<String, Value>, key: &str, items: &[String]) {
    if !items.is_empty() {
        entry.insert(key.to_string(), Value::from(items.to_vec()));
    }
}

pub fn insert_map(entry: &mut Map<String, Value>, key: &str, map: &BTreeMap<String, String>) {
    if !map.is_empty() {
        let object: Map<String, Value> = map
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();
        entry.insert(key.to_string(), Value::Object(object));
    }
}

/// `{command, args, env}` for stdio.
pub fn stdio_entry(server: &Server) -> Map<String, Value> {
    let mut entry = Map::new();
    entry.insert(
        "command".to_string(),
        Value::String(server.command.clone().unwrap_or_default()),
    );
    insert_list(&mut entry, "args", &server.args);
    insert_map(&mut entry, "env", &server.env);
    entry
}

/// `{url, headers}` for remote transports.
pub fn remote_entry(server: &Server, url_key: &str) -> Map<String, Value> {
    let mut entry = Map::new();
    entry.insert(
        url_key.to_string(),
        Value::String(server.url.clone().unwrap_or_default()),
    );
    insert_map(&mut entry, "headers", &server.headers);
    entry
}

/// Guess the transport of an untyped url entry.
pub fn transport_for_url(url: &str) -> Transport {
    if url.trim_end_matches('/').ends_with("/sse") {
        Transport::Sse
    } else {
        Transport::Http
    }
}

/// Canonical server from the shared `command/args/env` or `url/headers` shape.
pub fn decode_common(name: &str, value: &Value, url_key: &str) -> Server {
    let mut server = Server {
        name: name.to_string(),
        ..Default::default()
    };
    if let Some(url) = string_field(value, url_key) {
        server.transport = transport_for_url(&url);
        server.url = Some(url);
        server.headers = string_map(value, "headers");
    } else {
        server.command = string_field(value, "command");
        server.args = string_list(value, "args");
        server.env = string_map(value, "env");
    }
    server
}

/// Untyped entries: stdio shape or a bare `url`.
pub fn encode_plain(server: &Server) -> Value {
    match server.transport {
        Transport::Stdio => Value::Object(stdio_entry(server)),
        Transport::Http | Transport::Sse => Value::Object(remote_entry(server, "url")),
    }
}

pub fn decode_plain(name: &str, value: &Value) -> Server {
    decode_common(name, value, "url")
}

/// Entries carrying an explicit `type` field.
pub fn encode_typed(server: &Server) -> Value {
    let mut entry = match server.transport {
        Transport::Stdio => stdio_entry(server),
        Transport::Http | Transport::Sse => remote_entry(server, "url"),
    };
    entry.insert(
        "type".to_string(),
        Value::String(server.transport.as_str().to_string()),
    );
    Value::Object(entry)
}

pub fn decode_typed(name: &str, value: &Value) -> Server {
    let mut server = decode_common(name, value, "url");
    match value.get("type").and_then(Value::as_str) {
        Some("http") | Some("streamable-http") => server.transport = Transport::Http,
        Some("sse") => server.transport = Transport::Sse,
        _ => {}
    }
    server
}
