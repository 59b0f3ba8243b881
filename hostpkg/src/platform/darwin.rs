//! macOS detection.

/// Extract the product version from `sw_vers` output.
///
/// Accepts either the full `sw_vers` listing or the bare output of
/// `sw_vers -productVersion`.
pub fn parse_sw_vers(output: &str) -> Option<String> {
    for line in output.lines() {
        if let Some((key, value)) = line.split_once(':') {
            if key.trim() == "ProductVersion" {
                let value = value.trim();
                return (!value.is_empty()).then(|| value.to_string());
            }
        }
    }
    let bare = output.trim();
    (!bare.is_empty() && !bare.contains(':')).then(|| bare.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_listing() {
        let output = "ProductName:\t\tmacOS\nProductVersion:\t\t14.2.1\nBuildVersion:\t\t23C71\n";
        assert_eq!(parse_sw_vers(output).as_deref(), Some("14.2.1"));
    }

    #[test]
    fn test_bare_version() {
        assert_eq!(parse_sw_vers("13.6\n").as_deref(), Some("13.6"));
    }

    #[test]
    fn test_empty() {
        assert_eq!(parse_sw_vers(""), None);
    }
}
