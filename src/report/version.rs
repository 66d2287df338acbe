//! Browser version normalization.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::trace;

/// Label used for versions that cannot be grouped.
pub const UNKNOWN_VERSION: &str = "(unknown)";

/// Highest real Safari major version reported before the API started
/// returning WebKit build numbers in the version column.
const SAFARI_MAX_MAJOR: u64 = 10;

static VERSION_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^v?(\d+)(?:\.(\d+))?").expect("version pattern is valid"));

/// Reduce a full version string to its `major[.minor]` prefix.
///
/// ```
/// use browser_report::report::parse_version;
///
/// assert_eq!(parse_version("50.0.2661.102", "Chrome"), "50.0");
/// assert_eq!(parse_version("601.1.56", "Safari"), "(unknown)");
/// ```
pub fn parse_version(full_version: &str, browser: &str) -> String {
    let Some(captures) = VERSION_PATTERN.captures(full_version) else {
        trace!(browser, version = full_version, "Unparseable browser version");
        return UNKNOWN_VERSION.to_string();
    };

    let label = &captures[0];
    if browser == "Safari" {
        // An overflowing major is certainly a build number.
        let is_webkit_build = captures[1]
            .parse::<u64>()
            .map_or(true, |major| major > SAFARI_MAX_MAJOR);
        if is_webkit_build {
            trace!(version = label, "WebKit build number reported as Safari version");
            return UNKNOWN_VERSION.to_string();
        }
    }

    label.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_major_minor_prefix() {
        assert_eq!(parse_version("50.0.2661.102", "Chrome"), "50.0");
        assert_eq!(parse_version("46.0", "Firefox"), "46.0");
        assert_eq!(parse_version("11", "Internet Explorer"), "11");
    }

    #[test]
    fn test_leading_v_is_kept() {
        assert_eq!(parse_version("v8.2", "Opera"), "v8.2");
        assert_eq!(parse_version("V3", "Opera"), "V3");
    }

    #[test]
    fn test_trailing_dot_is_not_part_of_label() {
        assert_eq!(parse_version("12.", "Chrome"), "12");
    }

    #[test]
    fn test_unparseable() {
        assert_eq!(parse_version("(not set)", "Chrome"), UNKNOWN_VERSION);
        assert_eq!(parse_version("", "Edge"), UNKNOWN_VERSION);
        assert_eq!(parse_version("beta-1", "Edge"), UNKNOWN_VERSION);
    }

    #[test]
    fn test_safari_webkit_builds() {
        assert_eq!(parse_version("601.1.56", "Safari"), UNKNOWN_VERSION);
        assert_eq!(parse_version("11.0", "Safari"), UNKNOWN_VERSION);
        assert_eq!(parse_version("10.1", "Safari"), "10.1");
        assert_eq!(parse_version("9.1.2", "Safari"), "9.1");
        assert_eq!(parse_version("601.1.56", "Safari (in-app)"), "601.1");
    }

    #[test]
    fn test_overflowing_safari_major() {
        assert_eq!(
            parse_version("99999999999999999999999.1", "Safari"),
            UNKNOWN_VERSION
        );
    }
}
