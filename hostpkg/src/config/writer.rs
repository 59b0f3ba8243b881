//! INI serialization: the commented representation written to `config.ini`.

use std::path::Path;

use super::settings::ConfigFile;

/// Convert a `ConfigFile` to a commented INI string for saving.
pub(super) fn to_config_string(config: &ConfigFile) -> String {
    let endpoint = config.control_plane.endpoint.as_deref().unwrap_or("");
    let instance = &config.instance;

    format!(
        r#"[packages]
; Root directory for installed packages: <root>/<name>/<version>/
root = {}
; Manifest cache directory
cache_dir = {}
; Directory for downloaded artifacts
download_dir = {}
; Manifest source:
;   birdwatcher - package manifest service (default)
;   document    - versioned documents with attachments
archive = {}

[control_plane]
; Control-plane base URL (required for install and uninstall)
; Example: endpoint = https://ssm.us-east-1.amazonaws.com
endpoint = {}
; Timeout in seconds for each request (default: 30)
timeout = {}
; Retries after a failed request (default: 3)
max_retries = {}

[instance]
; Attributes attached to reported package results
instance_id = {}
instance_type = {}
region = {}
availability_zone = {}

[logging]
; Log directory and file name
directory = {}
file = {}
"#,
        path_to_string(&config.packages.root),
        path_to_string(&config.packages.cache_dir),
        path_to_string(&config.packages.download_dir),
        config.packages.archive,
        endpoint,
        config.control_plane.timeout,
        config.control_plane.max_retries,
        instance.instance_id,
        instance.instance_type,
        instance.region,
        instance.availability_zone,
        path_to_string(&config.logging.directory),
        config.logging.file,
    )
}

/// Display a path, abbreviating the home directory to `~`.
fn path_to_string(path: &Path) -> String {
    if let Some(home) = dirs::home_dir() {
        if let Ok(stripped) = path.strip_prefix(&home) {
            return format!("~/{}", stripped.display());
        }
    }
    path.display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_string_has_all_sections() {
        let content = to_config_string(&ConfigFile::default());
        for section in ["[packages]", "[control_plane]", "[instance]", "[logging]"] {
            assert!(content.contains(section), "missing {}", section);
        }
        assert!(content.contains("archive = birdwatcher"));
        assert!(content.contains("endpoint = \n"));
    }

    #[test]
    fn test_output_parses() {
        let content = to_config_string(&ConfigFile::default());
        let ini = ini::Ini::load_from_str(&content).unwrap();
        let config = super::super::parser::parse_ini(&ini).unwrap();
        assert_eq!(config, ConfigFile::default());
    }
}
