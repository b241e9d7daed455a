/// Normalize a string for case-insensitive comparison.
pub fn normalize(s: &str) -> String {
    s.to_lowercase()
}

/// Trim a raw search term, returning None when nothing is left to search for.
pub fn normalize_query(query: &str) -> Option<String> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Substring (or prefix) test used by filters.
pub fn text_matches(value: &str, term: &str, match_case: bool, only_prefix: bool) -> bool {
    if match_case {
        compare(value, term, only_prefix)
    } else {
        compare(&normalize(value), &normalize(term), only_prefix)
    }
}

fn compare(value: &str, term: &str, only_prefix: bool) -> bool {
    if only_prefix {
        value.starts_with(term)
    } else {
        value.contains(term)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_query_trims() {
        assert_eq!(normalize_query("  smi "), Some("smi".to_string()));
        assert_eq!(normalize_query("   "), None);
    }

    #[test]
    fn test_text_matches_ignores_case_by_default() {
        assert!(text_matches("Alice Smith", "SMI", false, false));
        assert!(!text_matches("Alice Smith", "SMI", true, false));
        assert!(text_matches("Alice Smith", "Smi", true, false));
    }

    #[test]
    fn test_text_matches_prefix() {
        assert!(text_matches("Alice Smith", "ali", false, true));
        assert!(!text_matches("Alice Smith", "smi", false, true));
    }

    #[test]
    fn test_non_ascii_case_folding() {
        assert!(text_matches("Åsa Öberg", "öbe", false, false));
    }
}
