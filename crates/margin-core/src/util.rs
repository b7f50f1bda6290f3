//! Shared utility functions used across multiple modules.

/// Normalize optional text by trimming whitespace and removing empties.
///
/// Returns `None` when the input is `None` or the trimmed value is empty.
pub fn normalize_text_option(value: Option<String>) -> Option<String> {
    let value = value?;
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Check if a string names a remote database (`libsql://`, `http://` or `https://`).
pub fn is_remote_database_url(value: &str) -> bool {
    ["libsql://", "http://", "https://"]
        .iter()
        .any(|scheme| value.starts_with(scheme))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_text_option_rejects_empty() {
        assert_eq!(normalize_text_option(None), None);
        assert_eq!(normalize_text_option(Some("   ".to_string())), None);
    }

    #[test]
    fn normalize_text_option_trims_value() {
        assert_eq!(
            normalize_text_option(Some(" libsql://db.turso.io ".to_string())),
            Some("libsql://db.turso.io".to_string())
        );
    }

    #[test]
    fn remote_database_url_accepts_known_schemes() {
        assert!(is_remote_database_url("libsql://db.turso.io"));
        assert!(is_remote_database_url("https://db.turso.io"));
        assert!(is_remote_database_url("http://localhost:8080"));
        assert!(!is_remote_database_url("ftp://example.com"));
        assert!(!is_remote_database_url("db.turso.io"));
    }
}
