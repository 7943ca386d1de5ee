//! # Delivery URLs
//!
//! Stored outputs are served by a CDN front end under
//! `https://<cdn-host>/projects/<account-id>/bucket/<key>`. The account id is the
//! storage access key id; the hosting platform uses it as the project segment.
//!
//! URLs are plain links: not signed, not time-limited, and the key is not escaped.

/// Builds delivery URLs for keys in the configured bucket.
#[derive(Debug, Clone)]
pub struct DeliveryUrls {
    cdn_host: String,
    account_id: String,
}

impl DeliveryUrls {
    pub fn new(cdn_host: impl Into<String>, account_id: impl Into<String>) -> Self {
        Self {
            cdn_host: cdn_host.into(),
            account_id: account_id.into(),
        }
    }

    pub fn url_for(&self, key: &str) -> String {
        format!(
            "https://{}/projects/{}/bucket/{}",
            self.cdn_host, self.account_id, key
        )
    }
}
