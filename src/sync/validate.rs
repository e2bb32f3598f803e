//! Syntactic validation of a production requirement list
//!
//! Used when a dry-run install is not possible. Every non-comment, non-blank
//! line must be a bare package identifier, or an identifier (with optional
//! extras) followed by one of `==`, `>=`, `<=`, `>`, `<`. Only the prefix up to
//! the operator is checked; versions and markers after it are accepted as is.

use crate::domain::InvalidLine;
use regex::Regex;
use std::sync::LazyLock;

static BARE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]*(\[[A-Za-z0-9._,\s-]*\])?$").unwrap()
});

static OPERATOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]*(\[[A-Za-z0-9._,\s-]*\])?\s*(==|>=|<=|>|<)").unwrap()
});

/// Returns true if a single line passes the syntactic check
pub fn is_valid_line(line: &str) -> bool {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return true;
    }
    BARE_RE.is_match(trimmed) || OPERATOR_RE.is_match(trimmed)
}

/// Lines of `content` that fail the syntactic check, 1-based
pub fn invalid_lines(content: &str) -> Vec<InvalidLine> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !is_valid_line(line))
        .map(|(i, line)| InvalidLine {
            line: i + 1,
            content: line.trim().to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_name_is_valid() {
        assert!(is_valid_line("weird-package-name-no-version"));
        assert!(is_valid_line("zope.interface"));
        assert!(is_valid_line("httpx[http2]"));
    }

    #[test]
    fn test_operators_are_valid() {
        assert!(is_valid_line("requests==2.31.0"));
        assert!(is_valid_line("requests>=2.28.0"));
        assert!(is_valid_line("requests<=3"));
        assert!(is_valid_line("requests>2"));
        assert!(is_valid_line("requests<3"));
        assert!(is_valid_line("requests >= 2.28.0"));
        assert!(is_valid_line("httpx[http2]>=0.24"));
    }

    #[test]
    fn test_markers_after_operator_accepted() {
        assert!(is_valid_line("colorama==0.4.6 ; sys_platform == 'win32'"));
    }

    #[test]
    fn test_comments_and_blank_lines_ignored() {
        assert!(is_valid_line(""));
        assert!(is_valid_line("   "));
        assert!(is_valid_line("# comment"));
        assert!(is_valid_line("    # via requests"));
    }

    #[test]
    fn test_malformed_lines_rejected() {
        assert!(!is_valid_line("bad;;version"));
        assert!(!is_valid_line("-e ."));
        assert!(!is_valid_line("pkg~=1.0"));
        assert!(!is_valid_line("pkg @ https://example.com/pkg.whl"));
        assert!(!is_valid_line("==1.0"));
    }

    #[test]
    fn test_invalid_lines_reports_positions() {
        let content = "# header\nrequests==2.31.0\nbad;;version\n\nweird-package-name-no-version\n";
        let invalid = invalid_lines(content);
        assert_eq!(
            invalid,
            vec![InvalidLine {
                line: 3,
                content: "bad;;version".to_string(),
            }]
        );
    }
}
