//! Component A: downloads one MRF (or index file) to disk.
//!
//! Client construction follows the teacher's `sources::base::HttpClient`
//! (gzip/deflate/brotli, a tuned connection pool) but without its retry-on-5xx
//! loop — the spec this crate implements only distinguishes 403 from every
//! other failure, so there is nothing for a retry loop to do.

use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::{Client, ClientBuilder, StatusCode};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::error::FetchError;

const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

/// Thin wrapper over `reqwest::Client` tuned for sequential, one-file-at-a-time
/// downloads of large MRF payloads.
#[derive(Clone)]
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    pub fn new() -> Result<Self, FetchError> {
        let client = ClientBuilder::new()
            .timeout(Duration::from_secs(600))
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .tcp_nodelay(true)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|source| FetchError::Request {
                url: String::new(),
                source,
            })?;
        Ok(Fetcher { client })
    }

    /// Downloads `url` into `dest_dir`, returning the path written.
    ///
    /// A 403 response is reported as [`FetchError::Forbidden`] rather than
    /// [`FetchError::BadStatus`] so the pipeline can treat it as a skip, not a
    /// fatal condition — matching the original downloader's
    /// 403-returns-`None`-not-an-exception behavior.
    pub async fn download(&self, url: &str, dest_dir: &Path) -> Result<PathBuf, FetchError> {
        debug!(url, "fetching");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| FetchError::Request {
                url: url.to_string(),
                source,
            })?;

        if response.status() == StatusCode::FORBIDDEN {
            warn!(url, "server returned 403");
            return Err(FetchError::Forbidden {
                url: url.to_string(),
            });
        }
        if !response.status().is_success() {
            return Err(FetchError::BadStatus {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        let content_disposition = response
            .headers()
            .get(reqwest::header::CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let filename = resolve_filename(url, content_disposition.as_deref(), content_type.as_deref());
        let dest = dest_dir.join(&filename);

        tokio::fs::create_dir_all(dest_dir)
            .await
            .map_err(|source| FetchError::Io {
                path: dest_dir.to_path_buf(),
                source,
            })?;

        let mut file = tokio::fs::File::create(&dest)
            .await
            .map_err(|source| FetchError::Io {
                path: dest.clone(),
                source,
            })?;

        let bytes = response
            .bytes()
            .await
            .map_err(|source| FetchError::Request {
                url: url.to_string(),
                source,
            })?;
        file.write_all(&bytes).await.map_err(|source| FetchError::Io {
            path: dest.clone(),
            source,
        })?;
        file.flush().await.map_err(|source| FetchError::Io {
            path: dest.clone(),
            source,
        })?;

        info!(url, path = %dest.display(), bytes = bytes.len(), "downloaded");
        Ok(dest)
    }
}

/// Resolves a filename for a downloaded file the same way the original
/// downloader did, in priority order: RFC 5987 `filename*=`, plain
/// `filename=`, the URL path's last segment, a MIME-type-derived extension,
/// and finally a hash of the URL.
fn resolve_filename(
    url: &str,
    content_disposition: Option<&str>,
    content_type: Option<&str>,
) -> String {
    if let Some(cd) = content_disposition {
        if let Some(name) = filename_star(cd) {
            return name;
        }
        if let Some(name) = filename_plain(cd) {
            return name;
        }
    }

    if let Some(name) = url_path_segment(url) {
        return name;
    }

    if let Some(ext) = content_type.and_then(extension_for_mime) {
        return format!("download.{ext}");
    }

    format!("download_{}.bin", hash_url(url))
}

fn filename_star(content_disposition: &str) -> Option<String> {
    let marker = "filename*=UTF-8''";
    let start = content_disposition.find(marker)? + marker.len();
    let rest = &content_disposition[start..];
    let end = rest.find(';').unwrap_or(rest.len());
    let encoded = rest[..end].trim().trim_matches('"');
    urlencoding::decode(encoded).ok().map(|c| c.into_owned())
}

fn filename_plain(content_disposition: &str) -> Option<String> {
    let marker = "filename=";
    let start = content_disposition.find(marker)? + marker.len();
    let rest = &content_disposition[start..];
    let end = rest.find(';').unwrap_or(rest.len());
    Some(rest[..end].trim().trim_matches('"').to_string())
}

fn url_path_segment(url: &str) -> Option<String> {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    let segment = without_query.rsplit('/').next()?;
    if segment.is_empty() {
        None
    } else {
        Some(segment.to_string())
    }
}

fn extension_for_mime(mime: &str) -> Option<&'static str> {
    let base = mime.split(';').next().unwrap_or(mime).trim();
    match base {
        "application/json" => Some("json"),
        "text/csv" | "application/csv" => Some("csv"),
        "application/zip" => Some("zip"),
        "application/gzip" | "application/x-gzip" => Some("gz"),
        _ => None,
    }
}

fn hash_url(url: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    let digest = hasher.finalize();
    format!("{:x}", digest)[..16].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_filename_star_first() {
        let cd = "attachment; filename*=UTF-8''standard-charges.csv; filename=\"fallback.csv\"";
        let name = resolve_filename("https://example.org/download", Some(cd), None);
        assert_eq!(name, "standard-charges.csv");
    }

    #[test]
    fn resolves_plain_filename_when_no_star_variant() {
        let cd = "attachment; filename=\"rates.json\"";
        let name = resolve_filename("https://example.org/download", Some(cd), None);
        assert_eq!(name, "rates.json");
    }

    #[test]
    fn falls_back_to_url_path_segment() {
        let name = resolve_filename("https://example.org/files/standard-charges.zip", None, None);
        assert_eq!(name, "standard-charges.zip");
    }

    #[test]
    fn falls_back_to_mime_type_when_url_has_no_segment() {
        let name = resolve_filename("https://example.org/", None, Some("application/json; charset=utf-8"));
        assert_eq!(name, "download.json");
    }

    #[test]
    fn falls_back_to_hash_when_nothing_else_matches() {
        let name = resolve_filename("https://example.org/", None, None);
        assert!(name.starts_with("download_"));
        assert!(name.ends_with(".bin"));
    }
}
