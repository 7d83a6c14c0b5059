//! Parse HTTP response header lines collected from libcurl callbacks.

use super::ProbeResult;

/// Parse collected header lines into a ProbeResult. With redirects, lines from
/// every hop are present; later responses overwrite earlier values, so the
/// final response wins.
pub(crate) fn parse_probe_headers(lines: &[String]) -> ProbeResult {
    let mut total_bytes = None;
    let mut accepts_ranges = false;

    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        // Each hop starts with a status line; reset so only the final
        // response's headers count.
        if parse_status_line(line).is_some() {
            total_bytes = None;
            accepts_ranges = false;
            continue;
        }
        if let Some((name, value)) = line.split_once(':') {
            let name = name.trim();
            let value = value.trim();
            if name.eq_ignore_ascii_case("content-length") {
                if let Ok(n) = value.parse::<u64>() {
                    total_bytes = Some(n);
                }
            }
            if name.eq_ignore_ascii_case("accept-ranges") {
                accepts_ranges = value.eq_ignore_ascii_case("bytes");
            }
        }
    }

    ProbeResult {
        total_bytes,
        accepts_ranges,
    }
}

/// Extract the status code from an `HTTP/x.y NNN ...` line, if it is one.
pub(crate) fn parse_status_line(line: &str) -> Option<u32> {
    let rest = line.strip_prefix("HTTP/")?;
    let mut parts = rest.split_whitespace();
    parts.next()?; // version
    parts.next()?.parse().ok()
}
