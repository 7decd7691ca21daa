use once_cell::sync::Lazy;
use regex::Regex;

pub fn is_valid_email(string: &str) -> bool {
    static RE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(
            r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$",
        )
        .unwrap()
    });
    RE.is_match(string)
}

/// Emails are compared and stored lower-cased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Codes typed in by people (raffle suffixes, company codes) are stored
/// upper-cased.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

pub fn is_valid_code(code: &str) -> bool {
    !code.is_empty() && code.chars().all(|c| c.is_ascii_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_test_email() {
        assert!(is_valid_email("visitor1@example.com"));
        assert!(!is_valid_email("visitor1@"));
        assert!(!is_valid_email("two\nlines@example.com"));
    }

    #[test]
    fn test_normalization() {
        assert_eq!(normalize_email("  Ana@Example.COM "), "ana@example.com");
        assert_eq!(normalize_code(" promo4k"), "PROMO4K");
        assert!(is_valid_code("PROMO4K"));
        assert!(!is_valid_code("PRO MO"));
        assert!(!is_valid_code(""));
    }
}
