//! Shared utilities for RCX.

/// Cap for captured stdout of a pipeline command, in bytes.
pub const STDOUT_CAP: usize = 5000;
/// Cap for the synthetic clone step's captured output, in bytes.
pub const CLONE_STDOUT_CAP: usize = 1000;
/// Cap for captured stderr / failure detail, in bytes.
pub const STDERR_CAP: usize = 2000;
/// Cap for entries in the report's error list, in bytes.
pub const ERROR_CAP: usize = 500;

/// Marker appended when a field was cut at its cap, so callers can tell a
/// short output from a capped one.
pub const TRUNCATION_MARKER: &str = "...[truncated]";

/// Truncate `text` to at most `cap` bytes on a char boundary, appending
/// [`TRUNCATION_MARKER`] when anything was cut.
pub fn truncate_output(text: &str, cap: usize) -> String {
    if text.len() <= cap {
        return text.to_string();
    }
    let mut end = cap;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}{}", &text[..end], TRUNCATION_MARKER)
}

/// Mask an API key for logging: keep a short prefix, hide the rest.
///
/// Credentials must never reach the log stream in full, even at debug level.
pub fn mask_api_key(key: &str) -> String {
    let prefix: String = key.chars().take(8).collect();
    if prefix.len() == key.len() {
        format!("{prefix}***")
    } else {
        format!("{prefix}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_short_text_unchanged() {
        assert_eq!(truncate_output("hello", 100), "hello");
        assert_eq!(truncate_output("", 0), "");
    }

    #[test]
    fn test_truncate_appends_marker() {
        let long = "x".repeat(6000);
        let capped = truncate_output(&long, STDOUT_CAP);
        assert!(capped.ends_with(TRUNCATION_MARKER));
        assert_eq!(capped.len(), STDOUT_CAP + TRUNCATION_MARKER.len());
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        // Multi-byte chars straddling the cap must not split.
        let text = "日本語".repeat(1000);
        let capped = truncate_output(&text, 100);
        assert!(capped.ends_with(TRUNCATION_MARKER));
        assert!(capped.len() <= 100 + TRUNCATION_MARKER.len());
    }

    #[test]
    fn test_truncated_output_is_never_empty() {
        let megabyte = "a".repeat(1024 * 1024);
        let capped = truncate_output(&megabyte, STDOUT_CAP);
        assert!(!capped.is_empty());
        assert!(capped.len() < megabyte.len());
    }

    #[test]
    fn test_mask_api_key() {
        let masked = mask_api_key("sk-aaaabbbbccccdddd");
        assert!(masked.starts_with("sk-aaaab"));
        assert!(!masked.contains("ccccdddd"));

        // Short keys are fully retained but still marked as masked.
        assert_eq!(mask_api_key("abc"), "abc***");
    }
}
