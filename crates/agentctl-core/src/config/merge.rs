//! Configuration layer merging logic
//!
//! Implements the layering used for the effective view:
//! Global -> Project -> Profile

use std::collections::BTreeMap;

use super::schema::{Config, Profile, Server};
use crate::types::ConfigError;

/// Overlay `overlay` onto `base` by name, then drop every name in `disabled`.
pub fn merge_servers(
    base: &BTreeMap<String, Server>,
    overlay: &BTreeMap<String, Server>,
    disabled: &[String],
) -> BTreeMap<String, Server> {
    let mut merged = base.clone();
    for (name, server) in overlay {
        merged.insert(name.clone(), server.clone());
    }
    for name in disabled {
        merged.remove(name);
    }
    merged
}

/// Merge a project config over the global config.
///
/// Project servers and documents override global entries of the same name,
/// and the project's `disabled` list hides global servers. Settings from the
/// project override per key.
pub fn merge_configs(global: Config, local: Config) -> Config {
    let mut merged = global;

    merged.servers = merge_servers(&merged.servers, &local.servers, &local.disabled);

    merged.commands.extend(local.commands);
    merged.rules.extend(local.rules);
    merged.skills.extend(local.skills);

    for (name, profile) in local.profiles {
        merged.profiles.insert(name, profile);
    }
    merged.aliases.extend(local.aliases);

    merged.settings.tools.extend(local.settings.tools);
    if local.settings.default_profile.is_some() {
        merged.settings.default_profile = local.settings.default_profile;
    }
    if local.settings.auto_update.is_some() {
        merged.settings.auto_update = local.settings.auto_update;
    }

    merged.disabled = local.disabled;
    merged
}

/// Apply a named profile as an additive overlay.
pub fn apply_profile(config: &Config, name: &str) -> Result<BTreeMap<String, Server>, ConfigError> {
    let profile: &Profile = config
        .profiles
        .get(name)
        .ok_or_else(|| ConfigError::UnknownProfile(name.to_string()))?;
    Ok(merge_servers(&config.servers, &profile.servers, &profile.disabled))
}

/// Enabled servers after applying `profile`, or the default profile when
/// none is named.
pub fn active_servers(config: &Config, profile: Option<&str>) -> Result<Vec<Server>, ConfigError> {
    let profile = profile.or(config.settings.default_profile.as_deref());
    let servers = match profile {
        Some(name) => apply_profile(config, name)?,
        None => config.servers.clone(),
    };
    Ok(servers.into_values().filter(Server::is_enabled).collect())
}
