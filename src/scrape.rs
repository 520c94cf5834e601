//! Web page text via an external scraping API, with a file cache.
//!
//! Each URL maps to one cache file `{cache_dir}/{key}.txt`. A file younger
//! than `freshness_days` is served as-is; otherwise the page is fetched
//! through the scraping API, reduced to whitespace-collapsed text and
//! written back.
//!
//! Concurrent misses for the same URL both fetch and both write; the last
//! writer wins. Readers may observe either version.

use crate::config::ScraperSettings;
use crate::error::ExtractError;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, info, warn};

const SECS_PER_DAY: u64 = 24 * 60 * 60;

/// Line width handed to html2text; output is whitespace-collapsed anyway.
const TEXT_WIDTH: usize = 120;

/// Fetch target and cache key derived from a user-supplied URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedUrl {
    /// URL handed to the scraping API.
    pub target: String,
    /// Scheme-less, lower-cased URL identifying the cache entry.
    pub key: String,
}

/// Lower-case the URL and split it into fetch target and cache key.
///
/// Without a scheme `https://` is assumed.
pub fn normalize_url(url: &str) -> NormalizedUrl {
    let url = url.trim().to_lowercase();
    match url.split_once("://") {
        Some((_, rest)) => NormalizedUrl {
            key: rest.to_string(),
            target: url,
        },
        None => NormalizedUrl {
            target: format!("https://{url}"),
            key: url,
        },
    }
}

/// Cache key with every character outside `[a-z0-9.-]` replaced by `_`.
pub fn safe_key(key: &str) -> String {
    key.chars()
        .map(|c| match c {
            'a'..='z' | '0'..='9' | '.' | '-' => c,
            _ => '_',
        })
        .collect()
}

/// File-system-safe name for a cache key.
pub fn cache_file_name(key: &str) -> String {
    format!("{}.txt", safe_key(key))
}

/// Text of one page and where it came from.
#[derive(Debug, Clone)]
pub struct ScrapedPage {
    pub key: String,
    pub text: String,
    pub from_cache: bool,
}

pub struct Scraper {
    client: reqwest::Client,
    settings: ScraperSettings,
}

impl Scraper {
    pub fn new(client: reqwest::Client, settings: ScraperSettings) -> Self {
        Self { client, settings }
    }

    pub fn cache_path(&self, key: &str) -> PathBuf {
        self.settings.cache_dir.join(cache_file_name(key))
    }

    fn api_url(&self, target: &str) -> String {
        self.settings
            .api_url
            .replace("{api_key}", &self.settings.api_key)
            .replace("{target_url}", target)
    }

    /// Page text for `url`, from the cache when fresh.
    pub async fn fetch(&self, url: &str) -> Result<ScrapedPage, ExtractError> {
        if url.trim().is_empty() {
            return Err(ExtractError::MissingField("url"));
        }
        let NormalizedUrl { target, key } = normalize_url(url);
        let path = self.cache_path(&key);

        let max_age =
            Duration::from_secs(self.settings.freshness_days.saturating_mul(SECS_PER_DAY));
        if is_fresh(&path, max_age).await {
            if let Ok(text) = tokio::fs::read_to_string(&path).await {
                info!("Scrape cache hit for {}", key);
                return Ok(ScrapedPage {
                    key,
                    text,
                    from_cache: true,
                });
            }
        }

        info!("Scraping {}", target);
        let response = self
            .client
            .get(self.api_url(&target))
            .send()
            .await
            .map_err(|e| ExtractError::ScrapeTransport {
                url: target.clone(),
                reason: e.without_url().to_string(),
            })?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(ExtractError::ScrapeFailed {
                url: target,
                status: status.as_u16(),
            });
        }

        let html = response
            .text()
            .await
            .map_err(|e| ExtractError::ScrapeTransport {
                url: target.clone(),
                reason: e.without_url().to_string(),
            })?;
        let text = html_to_text(&html);
        debug!("{}: {} bytes HTML → {} chars text", key, html.len(), text.len());

        self.write_cache(&path, &text).await;

        Ok(ScrapedPage {
            key,
            text,
            from_cache: false,
        })
    }

    // Failing to cache only costs a refetch next time.
    async fn write_cache(&self, path: &Path, text: &str) {
        if let Err(e) = tokio::fs::create_dir_all(&self.settings.cache_dir).await {
            warn!("Cannot create cache dir {}: {}", self.settings.cache_dir.display(), e);
            return;
        }
        if let Err(e) = tokio::fs::write(path, text).await {
            warn!("Cannot write cache file {}: {}", path.display(), e);
        }
    }
}

async fn is_fresh(path: &Path, max_age: Duration) -> bool {
    let Ok(modified) = tokio::fs::metadata(path).await.and_then(|m| m.modified()) else {
        return false;
    };
    match SystemTime::now().checked_sub(max_age) {
        Some(cutoff) => modified > cutoff,
        None => true,
    }
}

/// Visible text of an HTML page with all whitespace runs collapsed.
pub fn html_to_text(html: &str) -> String {
    let text = html2text::from_read(Cursor::new(html.as_bytes()), TEXT_WIDTH)
        .unwrap_or_else(|_| html.to_string());
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
