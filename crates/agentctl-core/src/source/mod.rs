//! Parsing of user-supplied add targets.
//!
//! Supported forms:
//! - `./path`, `../path`, `/abs/path`, `~/path`: local source used in place
//! - `https://github.com/org/repo[.git]`, `https://host/org/repo.git`: git
//! - `https://github.com/org/repo/tree/<ref>`: git pinned to `<ref>`
//! - `git@host:org/repo.git`: git over ssh
//! - `github:org/repo[@ref]`, `org/repo[@ref]`: GitHub shorthand
//! - any other `http(s)` URL: remote endpoint (`/sse` suffix selects sse)
//! - anything else: alias key resolved through the config's alias table

use serde::Serialize;
use url::Url;

use crate::config::{Server, Source};
use crate::types::{SourceType, Transport};

/// Hosts whose https URLs are treated as repositories rather than endpoints.
pub const GIT_HOSTS: &[&str] = &["github.com", "gitlab.com", "bitbucket.org", "codeberg.org"];

const NAME_SUFFIXES: &[&str] = &[".git", "-mcp-server", "-server", "-mcp"];
const NAME_PREFIXES: &[&str] = &["mcp-server-", "mcp-"];

/// A classified add target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddTarget {
    /// Suggested server name.
    pub name: String,
    pub source: Source,
    pub transport: Transport,
    /// Endpoint for remote targets, kept verbatim.
    pub url: Option<String>,
}

impl AddTarget {
    /// Build a server definition from this target.
    pub fn into_server(self) -> Server {
        Server {
            name: self.name,
            transport: self.transport,
            url: self.url,
            source: self.source,
            ..Default::default()
        }
    }

    pub fn source_type(&self) -> SourceType {
        self.source.r#type
    }
}

/// Classify a raw add target.
pub fn parse_add_target(input: &str) -> anyhow::Result<AddTarget> {
    let raw = input.trim();
    if raw.is_empty() {
        anyhow::bail!("Add target cannot be empty");
    }

    if is_local_path(raw) {
        let segment = raw
            .trim_end_matches(['/', '\\'])
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(raw);
        return Ok(AddTarget {
            name: derive_name(segment, raw)?,
            source: Source::local(raw),
            transport: Transport::Stdio,
            url: None,
        });
    }

    if raw.starts_with("http://") || raw.starts_with("https://") {
        return parse_http(raw);
    }

    if let Some(rest) = raw.strip_prefix("git@") {
        let path = rest
            .split_once(':')
            .map(|(_, path)| path)
            .ok_or_else(|| anyhow::anyhow!("Invalid ssh git URL: {}", raw))?;
        return git_target(raw.to_string(), path, None);
    }

    let shorthand = raw.strip_prefix("github:").unwrap_or(raw);
    if let Some((repo, reference)) = parse_github_shorthand(shorthand) {
        let url = format!("https://github.com/{}", repo);
        return git_target(url, repo, reference);
    }
    if raw.starts_with("github:") {
        anyhow::bail!("Invalid GitHub shorthand: {}", raw);
    }

    if raw.chars().any(char::is_whitespace) || raw.contains('/') {
        anyhow::bail!("Unrecognized add target: {}", raw);
    }
    Ok(AddTarget {
        name: derive_name(raw, raw)?,
        source: Source::alias(raw),
        transport: Transport::Stdio,
        url: None,
    })
}

fn is_local_path(raw: &str) -> bool {
    raw == "."
        || raw == "~"
        || raw.starts_with("./")
        || raw.starts_with("../")
        || raw.starts_with('/')
        || raw.starts_with("~/")
        || raw.starts_with(".\\")
        || raw.starts_with("..\\")
}

fn parse_http(raw: &str) -> anyhow::Result<AddTarget> {
    let parsed = Url::parse(raw).map_err(|e| anyhow::anyhow!("Invalid URL '{}': {}", raw, e))?;
    let host = parsed
        .host_str()
        .ok_or_else(|| anyhow::anyhow!("URL has no host: {}", raw))?
        .to_ascii_lowercase();
    let path = parsed.path().trim_matches('/');

    let git_host = GIT_HOSTS
        .iter()
        .any(|h| host == *h || host.ends_with(&format!(".{}", h)));
    if path.ends_with(".git") || (git_host && path.split('/').count() >= 2) {
        if let Some((repo, reference)) = split_tree_path(path) {
            let url = format!("{}://{}/{}", parsed.scheme(), host, repo);
            return git_target(url, &repo, Some(reference));
        }
        return git_target(raw.trim_end_matches('/').to_string(), path, None);
    }

    let transport = if path.ends_with("sse") && path.rsplit('/').next() == Some("sse") {
        Transport::Sse
    } else {
        Transport::Http
    };
    Ok(AddTarget {
        name: host_name(&host),
        source: Source {
            r#type: SourceType::Remote,
            url: Some(raw.to_string()),
            ..Default::default()
        },
        transport,
        url: Some(raw.to_string()),
    })
}

fn git_target(url: String, repo_path: &str, reference: Option<String>) -> anyhow::Result<AddTarget> {
    let segment = repo_path
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(repo_path);
    let mut source = Source::git(url);
    source.reference = reference;
    Ok(AddTarget {
        name: derive_name(segment, repo_path)?,
        source,
        transport: Transport::Stdio,
        url: None,
    })
}

/// `org/repo` or `org/repo@ref`.
fn parse_github_shorthand(raw: &str) -> Option<(&str, Option<String>)> {
    let (repo, reference) = match raw.split_once('@') {
        Some((repo, reference)) if !reference.is_empty() => (repo, Some(reference.to_string())),
        Some(_) => return None,
        None => (raw, None),
    };
    let (owner, name) = repo.split_once('/')?;
    let valid = |part: &str| {
        !part.is_empty()
            && part
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    };
    (valid(owner) && valid(name)).then_some((repo, reference))
}

/// Split `org/repo/tree/<ref>[/...]` into (`org/repo`, `<ref>`).
fn split_tree_path(path: &str) -> Option<(String, String)> {
    let (repo, rest) = path.split_once("/tree/")?;
    let reference = rest.split('/').next().filter(|r| !r.is_empty())?;
    Some((repo.to_string(), reference.to_string()))
}

/// `mcp.example.com` -> `example`.
fn host_name(host: &str) -> String {
    let labels: Vec<&str> = host
        .split('.')
        .filter(|l| !matches!(*l, "www" | "mcp" | "api"))
        .collect();
    match labels.as_slice() {
        [] => host.to_string(),
        [only] => only.to_string(),
        [.., name, _tld] => name.to_string(),
    }
}

fn derive_name(segment: &str, raw: &str) -> anyhow::Result<String> {
    let mut name = segment.to_string();
    for suffix in NAME_SUFFIXES {
        if let Some(stripped) = name.strip_suffix(suffix)
            && !stripped.is_empty()
        {
            name = stripped.to_string();
        }
    }
    for prefix in NAME_PREFIXES {
        if let Some(stripped) = name.strip_prefix(prefix)
            && !stripped.is_empty()
        {
            name = stripped.to_string();
            break;
        }
    }
    if name.is_empty() || name == "." || name == ".." || name == "~" {
        anyhow::bail!("Cannot derive a server name from '{}'", raw);
    }
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_path() {
        let target = parse_add_target("./tools/filesystem-mcp").unwrap();
        assert_eq!(target.source_type(), SourceType::Local);
        assert_eq!(target.name, "filesystem");
        assert_eq!(target.source.url.as_deref(), Some("./tools/filesystem-mcp"));
        assert_eq!(target.transport, Transport::Stdio);
    }

    #[test]
    fn test_remote_url_is_verbatim() {
        let target = parse_add_target("https://mcp.example.com/api").unwrap();
        assert_eq!(target.source_type(), SourceType::Remote);
        assert_eq!(target.transport, Transport::Http);
        assert_eq!(target.url.as_deref(), Some("https://mcp.example.com/api"));
        assert_eq!(target.name, "example");
    }

    #[test]
    fn test_sse_endpoint() {
        let target = parse_add_target("https://events.example.org/v1/sse").unwrap();
        assert_eq!(target.transport, Transport::Sse);
    }

    #[test]
    fn test_github_url_is_git() {
        let target =
            parse_add_target("https://github.com/modelcontextprotocol/github-mcp-server").unwrap();
        assert_eq!(target.source_type(), SourceType::Git);
        assert_eq!(target.name, "github");
        assert!(target.source.reference.is_none());
    }

    #[test]
    fn test_github_tree_url_pins_ref() {
        let target = parse_add_target("https://github.com/org/weather-mcp/tree/v1.2.0").unwrap();
        assert_eq!(
            target.source.url.as_deref(),
            Some("https://github.com/org/weather-mcp")
        );
        assert_eq!(target.source.reference.as_deref(), Some("v1.2.0"));
        assert_eq!(target.name, "weather");
    }

    #[test]
    fn test_dot_git_on_any_host() {
        let target = parse_add_target("https://git.internal.dev/team/tools.git").unwrap();
        assert_eq!(target.source_type(), SourceType::Git);
        assert_eq!(target.name, "tools");
    }

    #[test]
    fn test_ssh_and_shorthand() {
        let ssh = parse_add_target("git@github.com:org/search-server.git").unwrap();
        assert_eq!(ssh.source_type(), SourceType::Git);
        assert_eq!(ssh.name, "search");

        let short = parse_add_target("org/mcp-server-fetch@main").unwrap();
        assert_eq!(
            short.source.url.as_deref(),
            Some("https://github.com/org/mcp-server-fetch")
        );
        assert_eq!(short.source.reference.as_deref(), Some("main"));
        assert_eq!(short.name, "fetch");
    }

    #[test]
    fn test_alias_fallback() {
        let target = parse_add_target("postgres").unwrap();
        assert_eq!(target.source_type(), SourceType::Alias);
        assert_eq!(target.source.alias.as_deref(), Some("postgres"));
        assert_eq!(target.name, "postgres");
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(parse_add_target("  ").is_err());
        assert!(parse_add_target("two words").is_err());
        assert!(parse_add_target("a/b/c").is_err());
    }

    #[test]
    fn test_into_server_validates() {
        let server = parse_add_target("./servers/notes").unwrap().into_server();
        assert_eq!(server.name, "notes");
        assert!(server.validate().is_ok());
    }
}
