//! Windows detection.

use std::sync::OnceLock;

use regex::Regex;

fn version_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"Version\s+(\d+\.\d+\.\d+)").unwrap())
}

/// Extract `major.minor.build` from the output of `cmd /C ver`.
///
/// `Microsoft Windows [Version 10.0.17763.5458]` yields `10.0.17763`.
pub fn parse_ver_output(output: &str) -> Option<String> {
    version_pattern()
        .captures(output)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ver() {
        assert_eq!(
            parse_ver_output("\r\nMicrosoft Windows [Version 10.0.17763.5458]\r\n").as_deref(),
            Some("10.0.17763")
        );
        assert_eq!(
            parse_ver_output("Microsoft Windows [Version 6.3.9600]").as_deref(),
            Some("6.3.9600")
        );
        assert_eq!(parse_ver_output("garbage"), None);
    }
}
