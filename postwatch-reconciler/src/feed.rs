//! Remote IP-range feed client.
//!
//! The feed is a JSON document with a top-level `items` list; each item
//! carries a CIDR plus product and direction tag lists. Change detection
//! hashes the raw response body, so reordering or whitespace changes in the
//! feed count as changes; that errs toward rewriting the whitelist, which
//! is idempotent.

use std::time::Duration;

use serde::Deserialize;
use sha2::{Digest, Sha256};

use crate::error::FetchError;

/// Product tag marking ranges used for outbound mail.
const PRODUCT_TAG: &str = "email";

/// Direction tag marking egress ranges.
const DIRECTION_TAG: &str = "egress";

/// Parsed remote feed document.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedDocument {
    /// The top-level range list. Deserialisation fails when absent, which
    /// surfaces as [`FetchError::MalformedFeed`].
    pub items: Vec<IpRangeRecord>,
}

/// One entry of the remote feed.
#[derive(Debug, Clone, Deserialize)]
pub struct IpRangeRecord {
    #[serde(default)]
    pub cidr: Option<String>,

    #[serde(default)]
    pub product: Vec<String>,

    #[serde(default)]
    pub direction: Vec<String>,
}

/// Result of one fetch-and-diff pass.
#[derive(Debug)]
pub enum FeedOutcome {
    /// The body hashes to the previously seen digest; nothing to do.
    Unchanged,

    /// The body changed (or no previous digest existed).
    Changed {
        document: FeedDocument,
        content_hash: String,
    },
}

/// HTTP client for the remote feed.
#[derive(Debug, Clone)]
pub struct FeedClient {
    http: reqwest::Client,
    url: String,
}

impl FeedClient {
    /// Create a client for `url` with a bounded request timeout.
    ///
    /// # Errors
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("postwatch/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            url: url.into(),
        })
    }

    /// The configured feed URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Fetch the feed and compare its content hash against `last_hash`.
    ///
    /// Returns [`FeedOutcome::Unchanged`] when the digest matches, otherwise
    /// the parsed document tagged with its digest.
    ///
    /// # Errors
    /// Network failures, timeouts, non-success statuses and malformed bodies
    /// are all [`FetchError`]s; the caller skips the cycle.
    pub async fn fetch_and_diff(&self, last_hash: Option<&str>) -> Result<FeedOutcome, FetchError> {
        let response = self.http.get(&self.url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        let body = response.text().await?;
        let content_hash = content_hash(&body);

        if last_hash == Some(content_hash.as_str()) {
            tracing::debug!(hash = %content_hash, "feed content unchanged");
            return Ok(FeedOutcome::Unchanged);
        }

        let document: FeedDocument = serde_json::from_str(&body)?;
        tracing::info!(
            hash = %content_hash,
            items = document.items.len(),
            "fetched changed feed document"
        );

        Ok(FeedOutcome::Changed {
            document,
            content_hash,
        })
    }
}

/// Digest of the raw feed body, used purely for change detection.
#[must_use]
pub fn content_hash(body: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(body.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Collect the CIDR strings of every range tagged for outbound mail.
///
/// An entry qualifies when its product list contains `email`, its direction
/// list contains `egress`, and it carries a non-empty CIDR. The result is
/// sorted lexicographically ascending; duplicate CIDRs from the feed are
/// preserved.
#[must_use]
pub fn extract_ip_ranges(document: &FeedDocument) -> Vec<String> {
    let mut ranges: Vec<String> = document
        .items
        .iter()
        .filter(|item| {
            item.product.iter().any(|product| product == PRODUCT_TAG)
                && item.direction.iter().any(|direction| direction == DIRECTION_TAG)
        })
        .filter_map(|item| item.cidr.as_deref())
        .filter(|cidr| !cidr.is_empty())
        .map(str::to_owned)
        .collect();

    ranges.sort_unstable();
    ranges
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn parse(body: &str) -> FeedDocument {
        serde_json::from_str(body).unwrap()
    }

    #[test]
    fn test_extract_filters_by_product_and_direction() {
        let document = parse(
            r#"{"items":[
                {"product":["email"],"direction":["egress"],"cidr":"10.0.0.0/8"},
                {"product":["jira"],"direction":["egress"],"cidr":"10.1.0.0/16"}
            ]}"#,
        );
        assert_eq!(extract_ip_ranges(&document), vec!["10.0.0.0/8"]);
    }

    #[test]
    fn test_extract_requires_both_tags() {
        let document = parse(
            r#"{"items":[
                {"product":["email"],"direction":["ingress"],"cidr":"10.0.0.0/8"},
                {"product":["confluence","email"],"direction":["ingress","egress"],"cidr":"10.2.0.0/16"}
            ]}"#,
        );
        assert_eq!(extract_ip_ranges(&document), vec!["10.2.0.0/16"]);
    }

    #[test]
    fn test_extract_skips_missing_or_empty_cidr() {
        let document = parse(
            r#"{"items":[
                {"product":["email"],"direction":["egress"]},
                {"product":["email"],"direction":["egress"],"cidr":""},
                {"product":["email"],"direction":["egress"],"cidr":"192.0.2.0/24"}
            ]}"#,
        );
        assert_eq!(extract_ip_ranges(&document), vec!["192.0.2.0/24"]);
    }

    #[test]
    fn test_extract_sorts_and_preserves_duplicates() {
        let document = parse(
            r#"{"items":[
                {"product":["email"],"direction":["egress"],"cidr":"203.0.113.0/24"},
                {"product":["email"],"direction":["egress"],"cidr":"192.0.2.0/24"},
                {"product":["email"],"direction":["egress"],"cidr":"192.0.2.0/24"}
            ]}"#,
        );
        assert_eq!(
            extract_ip_ranges(&document),
            vec!["192.0.2.0/24", "192.0.2.0/24", "203.0.113.0/24"]
        );
    }

    #[test]
    fn test_missing_items_field_is_rejected() {
        let result = serde_json::from_str::<FeedDocument>(r#"{"ranges":[]}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_content_hash_is_stable() {
        let body = r#"{"items":[]}"#;
        assert_eq!(content_hash(body), content_hash(body));
        assert_ne!(content_hash(body), content_hash(r#"{"items":[{}]}"#));
    }
}
