//! Default file-name derivation for jobs created without an explicit name.

/// Fallback when the URL path yields nothing usable.
const DEFAULT_FILE_NAME: &str = "download.bin";

/// Linux NAME_MAX.
const NAME_MAX: usize = 255;

/// Derives a safe local file name from the URL's last path segment.
///
/// The candidate is sanitized for Linux filesystems (no `/`, NUL, or control
/// characters, no leading/trailing dots or spaces) and falls back to
/// `download.bin` when the URL has no usable path.
pub fn file_name_for_url(url: &str) -> String {
    let candidate = match last_path_segment(url) {
        Some(c) => c,
        None => return DEFAULT_FILE_NAME.to_string(),
    };
    let sanitized = sanitize_file_name(&candidate);
    if sanitized.is_empty() || sanitized == "." || sanitized == ".." {
        DEFAULT_FILE_NAME.to_string()
    } else {
        sanitized
    }
}

fn last_path_segment(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let segment = parsed.path().split('/').filter(|s| !s.is_empty()).next_back()?;
    match segment {
        "" | "." | ".." => None,
        s => Some(s.to_string()),
    }
}

/// Replaces characters a Linux filename cannot or should not carry and trims
/// the result to NAME_MAX bytes.
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '\0' | '/' | '\\' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let trimmed = cleaned.trim_matches(|c: char| c == ' ' || c == '.');

    if trimmed.len() > NAME_MAX {
        let mut take = NAME_MAX;
        while take > 0 && !trimmed.is_char_boundary(take) {
            take -= 1;
        }
        trimmed[..take].to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_from_url_path() {
        assert_eq!(
            file_name_for_url("https://example.com/a/b/archive.zip"),
            "archive.zip"
        );
        assert_eq!(file_name_for_url("https://example.com/single"), "single");
    }

    #[test]
    fn query_string_ignored() {
        assert_eq!(
            file_name_for_url("https://example.com/file.iso?token=abc"),
            "file.iso"
        );
    }

    #[test]
    fn root_and_unparseable_fall_back() {
        assert_eq!(file_name_for_url("https://example.com/"), "download.bin");
        assert_eq!(file_name_for_url("https://example.com"), "download.bin");
        assert_eq!(file_name_for_url("not a url"), "download.bin");
    }

    #[test]
    fn dot_segments_fall_back() {
        assert_eq!(file_name_for_url("https://example.com/.."), "download.bin");
    }

    #[test]
    fn sanitize_replaces_separators_and_controls() {
        assert_eq!(sanitize_file_name("a/b\\c.txt"), "a_b_c.txt");
        assert_eq!(sanitize_file_name("file\x00name.txt"), "file_name.txt");
    }

    #[test]
    fn sanitize_trims_dots_and_spaces() {
        assert_eq!(sanitize_file_name("  ..file.txt.. "), "file.txt");
    }

    #[test]
    fn sanitize_caps_length_at_char_boundary() {
        let long = "é".repeat(200); // 400 bytes
        let out = sanitize_file_name(&long);
        assert!(out.len() <= 255);
        assert!(out.is_char_boundary(out.len()));
    }
}
