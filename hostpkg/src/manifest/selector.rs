//! Platform selector matching.
//!
//! Resolves `(platform, platform_version, architecture)` against a manifest's
//! selector tree. Each level prefers an exact key; the version level also
//! understands dotted prefix wildcards (`"7.*"`) and Windows Nano versions.
//!
//! Keys are held in sorted maps, so among equally specific wildcard keys the
//! lexicographically smallest one wins.

use std::collections::BTreeMap;

use tracing::debug;

use super::types::{FileInfo, Manifest, ManifestError, ManifestResult, PackageInfo};

/// Matches any value at its level.
pub const ANY_SELECTOR: &str = "_any";

/// Literal catch-all platform version key, consulted after [`ANY_SELECTOR`].
pub const STAR_SELECTOR: &str = "*";

/// Suffix marking a Windows Nano Server platform version.
pub const NANO_SUFFIX: &str = "nano";

const WILDCARD_SUFFIX: &str = ".*";

fn exact_or_any<'m, V>(map: &'m BTreeMap<String, V>, value: &str) -> Option<&'m V> {
    map.get(value).or_else(|| map.get(ANY_SELECTOR))
}

fn strip_nano(version: &str) -> Option<&str> {
    version.strip_suffix(NANO_SUFFIX)
}

/// Number of leading segments a `prefix.*` key shares with the version, or
/// `None` when the key does not apply.
fn wildcard_score(key: &str, version: &str) -> Option<usize> {
    let prefix = key.strip_suffix(WILDCARD_SUFFIX)?;
    let prefix_segments: Vec<&str> = prefix.split('.').collect();
    let version_segments: Vec<&str> = version.split('.').collect();

    if prefix_segments.len() > version_segments.len() {
        return None;
    }
    prefix_segments
        .iter()
        .zip(&version_segments)
        .all(|(p, v)| p == v)
        .then_some(prefix_segments.len())
}

fn match_version<'m, V>(map: &'m BTreeMap<String, V>, version: &str) -> Option<&'m V> {
    if let Some(entry) = map.get(version) {
        return Some(entry);
    }

    let env_nano = strip_nano(version);
    let env_version = env_nano.unwrap_or(version);

    let mut best: Option<(usize, &'m V)> = None;
    for (key, entry) in map {
        let key_nano = strip_nano(key);
        if key_nano.is_some() != env_nano.is_some() {
            continue;
        }
        let key = key_nano.unwrap_or(key);
        if let Some(score) = wildcard_score(key, env_version) {
            if best.map_or(true, |(top, _)| score > top) {
                best = Some((score, entry));
            }
        }
    }
    if let Some((_, entry)) = best {
        return Some(entry);
    }

    // Nano versions only ever resolve against nano keys.
    if env_nano.is_some() {
        return None;
    }
    map.get(ANY_SELECTOR).or_else(|| map.get(STAR_SELECTOR))
}

/// Select the package leaf for the given environment.
///
/// Fails with a single [`ManifestError::NoMatchingPackage`] naming all three
/// inputs, whichever level missed.
pub fn select_package<'m>(
    manifest: &'m Manifest,
    platform: &str,
    platform_version: &str,
    architecture: &str,
) -> ManifestResult<&'m PackageInfo> {
    let selected = exact_or_any(&manifest.packages, platform)
        .and_then(|versions| match_version(versions, platform_version))
        .and_then(|architectures| exact_or_any(architectures, architecture));

    match selected {
        Some(package) => {
            debug!(
                platform,
                platform_version,
                architecture,
                file = %package.file_name,
                "Selected manifest package"
            );
            Ok(package)
        }
        None => Err(ManifestError::NoMatchingPackage {
            platform: platform.to_string(),
            platform_version: platform_version.to_string(),
            architecture: architecture.to_string(),
        }),
    }
}

/// Select the package leaf and resolve it in the file table.
///
/// Returns the file name and its [`FileInfo`]. A leaf naming a file that is
/// absent from the file table is an error.
pub fn find_file<'m>(
    manifest: &'m Manifest,
    platform: &str,
    platform_version: &str,
    architecture: &str,
) -> ManifestResult<(&'m str, &'m FileInfo)> {
    let package = select_package(manifest, platform, platform_version, architecture)?;
    manifest
        .files
        .get_key_value(&package.file_name)
        .map(|(name, info)| (name.as_str(), info))
        .ok_or_else(|| ManifestError::FileNotFound(package.file_name.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(file: &str) -> PackageInfo {
        PackageInfo {
            file_name: file.to_string(),
        }
    }

    /// Build a manifest from `(platform, version, arch, file)` rows.
    fn manifest(rows: &[(&str, &str, &str, &str)]) -> Manifest {
        let mut manifest = Manifest::default();
        for (platform, version, arch, file) in rows {
            manifest
                .packages
                .entry(platform.to_string())
                .or_default()
                .entry(version.to_string())
                .or_default()
                .insert(arch.to_string(), leaf(file));
            manifest
                .files
                .insert(file.to_string(), FileInfo::default());
        }
        manifest
    }

    fn selected(manifest: &Manifest, platform: &str, version: &str, arch: &str) -> Option<String> {
        select_package(manifest, platform, version, arch)
            .ok()
            .map(|p| p.file_name.clone())
    }

    #[test]
    fn test_exact_match_beats_any_everywhere() {
        let m = manifest(&[
            ("ubuntu", "22.04", "amd64", "exact"),
            ("ubuntu", "22.04", "_any", "any-arch"),
            ("ubuntu", "_any", "amd64", "any-version"),
            ("_any", "_any", "_any", "any-all"),
        ]);
        assert_eq!(selected(&m, "ubuntu", "22.04", "amd64").as_deref(), Some("exact"));
    }

    #[test]
    fn test_any_fallbacks() {
        let m = manifest(&[
            ("ubuntu", "22.04", "_any", "any-arch"),
            ("ubuntu", "_any", "amd64", "any-version"),
            ("_any", "_any", "_any", "any-all"),
        ]);
        assert_eq!(selected(&m, "ubuntu", "22.04", "arm64").as_deref(), Some("any-arch"));
        assert_eq!(selected(&m, "ubuntu", "20.04", "amd64").as_deref(), Some("any-version"));
        assert_eq!(selected(&m, "debian", "12", "amd64").as_deref(), Some("any-all"));
    }

    #[test]
    fn test_platform_miss() {
        let m = manifest(&[("ubuntu", "_any", "_any", "a")]);
        let err = select_package(&m, "centos", "7", "amd64").unwrap_err();
        assert_eq!(
            err.to_string(),
            "no manifest found for platform centos, version 7, architecture amd64"
        );
    }

    #[test]
    fn test_architecture_miss_is_aggregate_error() {
        let m = manifest(&[("ubuntu", "22.04", "amd64", "a")]);
        assert!(matches!(
            select_package(&m, "ubuntu", "22.04", "arm64"),
            Err(ManifestError::NoMatchingPackage { architecture, .. }) if architecture == "arm64"
        ));
    }

    #[test]
    fn test_wildcard_prefix() {
        let m = manifest(&[("centos", "7.*", "_any", "seven"), ("centos", "6.*", "_any", "six")]);
        assert_eq!(selected(&m, "centos", "7.9.2009", "amd64").as_deref(), Some("seven"));
        assert_eq!(selected(&m, "centos", "7", "amd64").as_deref(), Some("seven"));
        assert_eq!(selected(&m, "centos", "6.10", "amd64").as_deref(), Some("six"));
        assert_eq!(selected(&m, "centos", "8.1", "amd64"), None);
    }

    #[test]
    fn test_most_specific_wildcard_wins() {
        let m = manifest(&[
            ("amazon", "2018.*", "_any", "year"),
            ("amazon", "2018.03.*", "_any", "month"),
            ("amazon", "_any", "_any", "any"),
        ]);
        assert_eq!(selected(&m, "amazon", "2018.03", "amd64").as_deref(), Some("month"));
        assert_eq!(selected(&m, "amazon", "2018.09", "amd64").as_deref(), Some("year"));
        assert_eq!(selected(&m, "amazon", "2", "amd64").as_deref(), Some("any"));
    }

    #[test]
    fn test_wildcard_prefix_must_match_whole_segments() {
        let m = manifest(&[("centos", "7.*", "_any", "seven")]);
        assert_eq!(selected(&m, "centos", "17.1", "amd64"), None);
        assert_eq!(selected(&m, "centos", "71", "amd64"), None);
    }

    #[test]
    fn test_exact_version_beats_wildcard() {
        let m = manifest(&[
            ("centos", "7.*", "_any", "wildcard"),
            ("centos", "7.9", "_any", "exact"),
            ("centos", "_any", "_any", "any"),
        ]);
        assert_eq!(selected(&m, "centos", "7.9", "amd64").as_deref(), Some("exact"));
        assert_eq!(selected(&m, "centos", "7.8", "amd64").as_deref(), Some("wildcard"));
    }

    #[test]
    fn test_any_before_star() {
        let m = manifest(&[("ubuntu", "*", "_any", "star"), ("ubuntu", "_any", "_any", "any")]);
        assert_eq!(selected(&m, "ubuntu", "24.04", "amd64").as_deref(), Some("any"));

        let m = manifest(&[("ubuntu", "*", "_any", "star")]);
        assert_eq!(selected(&m, "ubuntu", "24.04", "amd64").as_deref(), Some("star"));
    }

    #[test]
    fn test_nano_matches_only_nano_keys() {
        let m = manifest(&[
            ("windows", "10.*", "_any", "full"),
            ("windows", "10.*nano", "_any", "nano"),
        ]);
        assert_eq!(selected(&m, "windows", "10.0.14393nano", "amd64").as_deref(), Some("nano"));
        assert_eq!(selected(&m, "windows", "10.0.14393", "amd64").as_deref(), Some("full"));
    }

    #[test]
    fn test_nano_never_falls_back_to_plain_keys() {
        let m = manifest(&[
            ("windows", "10.*", "_any", "full"),
            ("windows", "_any", "_any", "any"),
            ("windows", "*", "_any", "star"),
        ]);
        assert_eq!(selected(&m, "windows", "10.0.14393nano", "amd64"), None);
    }

    #[test]
    fn test_plain_never_matches_nano_wildcard() {
        let m = manifest(&[("windows", "10.*nano", "_any", "nano")]);
        assert_eq!(selected(&m, "windows", "10.0.14393", "amd64"), None);
    }

    #[test]
    fn test_exact_nano_key() {
        let m = manifest(&[("windows", "10.0.14393nano", "_any", "nano")]);
        assert_eq!(selected(&m, "windows", "10.0.14393nano", "amd64").as_deref(), Some("nano"));
    }

    #[test]
    fn test_find_file() {
        let mut m = manifest(&[("ubuntu", "_any", "_any", "pkg.tar.gz")]);
        m.files.get_mut("pkg.tar.gz").unwrap().download_location = "https://x/pkg.tar.gz".to_string();

        let (name, info) = find_file(&m, "ubuntu", "22.04", "amd64").unwrap();
        assert_eq!(name, "pkg.tar.gz");
        assert_eq!(info.download_location, "https://x/pkg.tar.gz");
    }

    #[test]
    fn test_find_file_missing_from_file_table() {
        let mut m = manifest(&[("ubuntu", "_any", "_any", "pkg.tar.gz")]);
        m.files.clear();

        assert!(matches!(
            find_file(&m, "ubuntu", "22.04", "amd64"),
            Err(ManifestError::FileNotFound(f)) if f == "pkg.tar.gz"
        ));
    }
}
