//! Component C: scans an index file's lines for MRF URLs and their
//! associated hospital location names.
//!
//! Grounded directly on the original downloader's `main()`, which scans each
//! line of an index file for the substrings `"mrf-url"` and
//! `"location-name"` and takes everything after the first colon as the
//! value — not a JSON or CSV parse, a plain line scan.

use tracing::debug;

/// One entry discovered in an index file: an MRF URL paired with the most
/// recently seen location name (location names apply to every MRF URL line
/// that follows them until the next location-name line).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub url: String,
    pub location_name: Option<String>,
}

/// Scans `content` line by line for `mrf-url` and `location-name` markers.
pub fn scan_index(content: &str) -> Vec<IndexEntry> {
    let mut entries = Vec::new();
    let mut current_location: Option<String> = None;

    for line in content.lines() {
        if line.contains("location-name") {
            current_location = value_after_colon(line);
            continue;
        }
        if line.contains("mrf-url") {
            if let Some(url) = value_after_colon(line) {
                debug!(url, location = ?current_location, "discovered mrf url");
                entries.push(IndexEntry {
                    url,
                    location_name: current_location.clone(),
                });
            }
        }
    }

    entries
}

fn value_after_colon(line: &str) -> Option<String> {
    let idx = line.find(':')?;
    let value = line[idx + 1..].trim().trim_matches(['"', ',']).trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn associates_urls_with_the_preceding_location_name() {
        let content = r#"
            "location-name": "Example Hospital",
            "mrf-url": "https://example.org/a.json",
            "mrf-url": "https://example.org/b.json",
            "location-name": "Other Hospital",
            "mrf-url": "https://example.org/c.json"
        "#;
        let entries = scan_index(content);
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].location_name.as_deref(), Some("Example Hospital"));
        assert_eq!(entries[1].location_name.as_deref(), Some("Example Hospital"));
        assert_eq!(entries[2].location_name.as_deref(), Some("Other Hospital"));
    }

    #[test]
    fn ignores_lines_without_markers() {
        let content = "this line means nothing\n\"mrf-url\": \"https://x/y.csv\"";
        let entries = scan_index(content);
        assert_eq!(entries, vec![IndexEntry {
            url: "https://x/y.csv".to_string(),
            location_name: None,
        }]);
    }
}
