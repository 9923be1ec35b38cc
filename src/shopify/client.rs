//! Outbound REST adapter for the Shopify admin API.
//!
//! Wraps token exchange, shop-profile fetch, webhook registration, and one
//! page of a paginated listing walk. The next-page cursor travels in the
//! `Link` response header; `parse_link_header` extracts the `rel="next"`
//! entry. The per-shop base URL is overridable so tests can point the
//! client at a local mock server.

use reqwest::header::LINK;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

use crate::config::AppConfig;
use crate::shopify::types::{
    AccessTokenResponse, ShopProfile, ShopProfileResponse, WebhookRegistrationRequest,
};

const ACCESS_TOKEN_HEADER: &str = "X-Shopify-Access-Token";

/// Errors from outbound Shopify calls.
#[derive(Debug, Error)]
pub enum ShopifyClientError {
    #[error("request to Shopify failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Shopify returned status {status}: {body}")]
    UpstreamStatus { status: u16, body: String },
}

/// One page of a listing walk: the parsed envelope plus the next-page URL,
/// if the `Link` header carried one.
#[derive(Debug)]
pub struct ListingPage<T> {
    pub body: T,
    pub next_url: Option<String>,
}

/// Outcome of a webhook registration POST. Non-2xx statuses are data here,
/// not errors: the subscriber records them in the audit row.
#[derive(Debug)]
pub struct RegistrationOutcome {
    pub status: u16,
    pub body: String,
}

impl RegistrationOutcome {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Client for the Shopify admin REST API.
#[derive(Debug, Clone)]
pub struct ShopifyClient {
    http: reqwest::Client,
    api_key: String,
    api_secret: String,
    api_version: String,
    /// Test hook: replaces `https://{shop}` as the per-shop base URL
    shop_base_override: Option<String>,
}

impl ShopifyClient {
    /// Create a client from application configuration.
    pub fn new(config: &AppConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: config.shopify_api_key.clone().unwrap_or_default(),
            api_secret: config.shopify_api_secret.clone().unwrap_or_default(),
            api_version: config.shopify_api_version.clone(),
            shop_base_override: None,
        }
    }

    /// Redirect all shop traffic to a fixed base URL (tests only).
    pub fn with_shop_base(mut self, base: impl Into<String>) -> Self {
        self.shop_base_override = Some(base.into().trim_end_matches('/').to_string());
        self
    }

    fn shop_base(&self, shop: &str) -> String {
        match &self.shop_base_override {
            Some(base) => base.clone(),
            None => format!("https://{}", shop),
        }
    }

    /// URL of the first page of a versioned listing endpoint.
    pub fn listing_url(&self, shop: &str, resource: &str, page_limit: u32) -> String {
        format!(
            "{}/admin/api/{}/{}.json?limit={}",
            self.shop_base(shop),
            self.api_version,
            resource,
            page_limit
        )
    }

    /// Exchange an authorization code for an admin access token.
    pub async fn exchange_token(
        &self,
        shop: &str,
        code: &str,
    ) -> Result<AccessTokenResponse, ShopifyClientError> {
        let url = format!("{}/admin/oauth/access_token", self.shop_base(shop));
        let payload = serde_json::json!({
            "client_id": self.api_key,
            "client_secret": self.api_secret,
            "code": code,
        });

        let response = self.http.post(url).json(&payload).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ShopifyClientError::UpstreamStatus { status, body });
        }

        Ok(response.json().await?)
    }

    /// Fetch the shop profile used to resolve the owning user.
    pub async fn fetch_shop_profile(
        &self,
        shop: &str,
        access_token: &str,
    ) -> Result<ShopProfile, ShopifyClientError> {
        let url = format!(
            "{}/admin/api/{}/shop.json",
            self.shop_base(shop),
            self.api_version
        );

        let response = self
            .http
            .get(url)
            .header(ACCESS_TOKEN_HEADER, access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ShopifyClientError::UpstreamStatus { status, body });
        }

        let envelope: ShopProfileResponse = response.json().await?;
        Ok(envelope.shop)
    }

    /// Register one webhook topic for a shop.
    ///
    /// HTTP failure statuses come back as data; only transport errors are
    /// returned as `Err`, so a caller can audit each outcome independently.
    pub async fn register_webhook(
        &self,
        shop: &str,
        access_token: &str,
        topic: &str,
        address: &str,
    ) -> Result<RegistrationOutcome, reqwest::Error> {
        let url = format!(
            "{}/admin/api/{}/webhooks.json",
            self.shop_base(shop),
            self.api_version
        );

        let response = self
            .http
            .post(url)
            .header(ACCESS_TOKEN_HEADER, access_token)
            .json(&WebhookRegistrationRequest::json(topic, address))
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();

        Ok(RegistrationOutcome { status, body })
    }

    /// Fetch one page of a paginated listing walk.
    pub async fn fetch_page<T: DeserializeOwned>(
        &self,
        url: &str,
        access_token: &str,
    ) -> Result<ListingPage<T>, ShopifyClientError> {
        debug!(url, "Fetching Shopify listing page");

        let response = self
            .http
            .get(url)
            .header(ACCESS_TOKEN_HEADER, access_token)
            .send()
            .await?;

        let link_header = response
            .headers()
            .get(LINK)
            .and_then(|h| h.to_str().ok())
            .map(|s| s.to_string());

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ShopifyClientError::UpstreamStatus { status, body });
        }

        let body: T = response.json().await?;
        let next_url = link_header.as_deref().and_then(parse_link_header);

        Ok(ListingPage { body, next_url })
    }
}

/// Parse a `Link` header to extract the next-page URL.
///
/// Shopify (like GitHub) formats it as
/// `<https://shop/admin/api/...?page_info=abc>; rel="next", ...`; the walk
/// ends when no entry is marked `rel="next"`.
pub fn parse_link_header(link_header: &str) -> Option<String> {
    let links: Vec<&str> = link_header.split(',').collect();

    for link in links {
        let parts: Vec<&str> = link.split(';').collect();
        if parts.len() >= 2 {
            let url_part = parts[0].trim();
            let rel_part = parts[1].trim();

            if rel_part.contains("rel=\"next\"") {
                // Extract URL from <url>
                if let Some(start) = url_part.find('<')
                    && let Some(end) = url_part.find('>')
                {
                    return Some(url_part[start + 1..end].to_string());
                }
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_link_header_next() {
        let header = r#"<https://shop.myshopify.com/admin/api/2024-07/products.json?page_info=abc123&limit=250>; rel="next""#;
        assert_eq!(
            parse_link_header(header).as_deref(),
            Some("https://shop.myshopify.com/admin/api/2024-07/products.json?page_info=abc123&limit=250")
        );
    }

    #[test]
    fn test_parse_link_header_prev_and_next() {
        let header = r#"<https://shop.myshopify.com/x?page_info=prev>; rel="previous", <https://shop.myshopify.com/x?page_info=next>; rel="next""#;
        assert_eq!(
            parse_link_header(header).as_deref(),
            Some("https://shop.myshopify.com/x?page_info=next")
        );
    }

    #[test]
    fn test_parse_link_header_no_next() {
        let header = r#"<https://shop.myshopify.com/x?page_info=prev>; rel="previous""#;
        assert_eq!(parse_link_header(header), None);
        assert_eq!(parse_link_header(""), None);
    }

    #[test]
    fn test_listing_url_shape() {
        let config = AppConfig::default();
        let client = ShopifyClient::new(&config);
        let url = client.listing_url("demo.myshopify.com", "products", 250);
        assert_eq!(
            url,
            "https://demo.myshopify.com/admin/api/2024-07/products.json?limit=250"
        );
    }

    #[test]
    fn test_shop_base_override() {
        let config = AppConfig::default();
        let client = ShopifyClient::new(&config).with_shop_base("http://127.0.0.1:9999/");
        let url = client.listing_url("demo.myshopify.com", "orders", 50);
        assert_eq!(url, "http://127.0.0.1:9999/admin/api/2024-07/orders.json?limit=50");
    }
}
