//! Tag normalization: trimmed, non-empty, case-sensitive, duplicates collapsed.

use std::collections::BTreeSet;

/// Normalizes raw tag input into the canonical set stored with a job.
///
/// Whitespace is trimmed, empty entries are dropped, and duplicates collapse.
/// Tags are case-sensitive: "linux" and "Linux" are distinct.
pub fn normalize_tags<I, S>(raw: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    raw.into_iter()
        .map(|t| t.as_ref().trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Splits a comma-separated tag list (CLI / dialog input) and normalizes it.
pub fn parse_tag_list(input: &str) -> BTreeSet<String> {
    normalize_tags(input.split(','))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_and_drops_empty() {
        let tags = normalize_tags(["  iso ", "", "   ", "debian"]);
        assert_eq!(
            tags.into_iter().collect::<Vec<_>>(),
            vec!["debian".to_string(), "iso".to_string()]
        );
    }

    #[test]
    fn duplicates_collapse_case_sensitive() {
        let tags = normalize_tags(["linux", "linux", "Linux"]);
        assert_eq!(tags.len(), 2);
        assert!(tags.contains("linux"));
        assert!(tags.contains("Linux"));
    }

    #[test]
    fn parse_comma_separated() {
        let tags = parse_tag_list("iso, debian,,  netinst ");
        assert_eq!(tags.len(), 3);
        assert!(tags.contains("iso"));
        assert!(tags.contains("debian"));
        assert!(tags.contains("netinst"));
    }

    #[test]
    fn empty_input_is_empty_set() {
        assert!(parse_tag_list("").is_empty());
        assert!(parse_tag_list(" , ,").is_empty());
    }
}
