//! INI parsing: the single place INI key names map to struct fields.

use std::path::PathBuf;

use ini::{Ini, Properties};

use super::file::ConfigFileError;
use super::settings::ConfigFile;

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Trimmed, non-empty value for `key`.
fn non_empty<'a>(section: &'a Properties, key: &str) -> Option<&'a str> {
    section.get(key).map(str::trim).filter(|v| !v.is_empty())
}

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found in the INI.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [packages] section
    if let Some(section) = ini.section(Some("packages")) {
        if let Some(v) = non_empty(section, "root") {
            config.packages.root = expand_tilde(v);
        }
        if let Some(v) = non_empty(section, "cache_dir") {
            config.packages.cache_dir = expand_tilde(v);
        }
        if let Some(v) = non_empty(section, "download_dir") {
            config.packages.download_dir = expand_tilde(v);
        }
        if let Some(v) = non_empty(section, "archive") {
            config.packages.archive = v
                .parse()
                .map_err(|_| invalid("packages", "archive", v, "must be 'birdwatcher' or 'document'"))?;
        }
    }

    // [control_plane] section
    if let Some(section) = ini.section(Some("control_plane")) {
        if let Some(v) = non_empty(section, "endpoint") {
            if !v.starts_with("http://") && !v.starts_with("https://") {
                return Err(invalid("control_plane", "endpoint", v, "must be an http:// or https:// URL"));
            }
            config.control_plane.endpoint = Some(v.trim_end_matches('/').to_string());
        }
        if let Some(v) = non_empty(section, "timeout") {
            config.control_plane.timeout = v
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or_else(|| invalid("control_plane", "timeout", v, "must be a positive integer (seconds)"))?;
        }
        if let Some(v) = non_empty(section, "max_retries") {
            config.control_plane.max_retries = v
                .parse::<u32>()
                .map_err(|_| invalid("control_plane", "max_retries", v, "must be a non-negative integer"))?;
        }
    }

    // [instance] section
    if let Some(section) = ini.section(Some("instance")) {
        let instance = &mut config.instance;
        for (key, field) in [
            ("instance_id", &mut instance.instance_id),
            ("instance_type", &mut instance.instance_type),
            ("region", &mut instance.region),
            ("availability_zone", &mut instance.availability_zone),
        ] {
            if let Some(v) = non_empty(section, key) {
                *field = v.to_string();
            }
        }
    }

    // [logging] section
    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = non_empty(section, "directory") {
            config.logging.directory = expand_tilde(v);
        }
        if let Some(v) = non_empty(section, "file") {
            config.logging.file = v.to_string();
        }
    }

    Ok(config)
}

/// Expand a leading `~/` to the home directory.
pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}
