//! # OAuth Handshake Handlers
//!
//! `GET /auth/shopify` starts the authorization-code flow and
//! `GET /auth/shopify/callback` completes it: HMAC verification first, then
//! token exchange, user resolution, tenant upsert, and the two background
//! job submissions. Failures here are browser-facing, so they render small
//! HTML error pages instead of problem+json.

use axum::{
    extract::{RawQuery, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use rand::RngCore;
use tracing::{info, warn};

use crate::crypto;
use crate::jobs::SyncJob;
use crate::repositories::{TenantRepository, UserRepository};
use crate::server::AppState;
use crate::shopify::oauth::{authorize_url, verify_callback};

/// Browser-facing OAuth failure page.
#[derive(Debug)]
pub struct OAuthErrorPage {
    status: StatusCode,
    message: String,
}

impl OAuthErrorPage {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn bad_gateway(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_GATEWAY,
            message: message.into(),
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl IntoResponse for OAuthErrorPage {
    fn into_response(self) -> Response {
        let body = format!(
            "<!DOCTYPE html>\n<html>\n<head><title>Authorization failed</title></head>\n<body>\n<h1>Authorization failed</h1>\n<p>{}</p>\n</body>\n</html>\n",
            escape_html(&self.message)
        );
        (self.status, Html(body)).into_response()
    }
}

fn escape_html(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Start the OAuth flow for a shop.
///
/// Stateless: validates the `shop` parameter and redirects to the shop's
/// authorize URL with the fixed read scopes.
pub async fn begin(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> Result<Redirect, OAuthErrorPage> {
    let params = parse_query(query.as_deref());

    let shop = param(&params, "shop")
        .ok_or_else(|| OAuthErrorPage::bad_request("Missing shop parameter."))?;

    let api_key = state
        .config
        .shopify_api_key
        .as_deref()
        .ok_or_else(|| OAuthErrorPage::internal("Shopify app credentials not configured."))?;

    let url = authorize_url(shop, api_key, &state.config.base_url);
    info!(shop, "Redirecting to Shopify authorization");

    Ok(Redirect::temporary(&url))
}

/// Complete the OAuth flow.
///
/// The HMAC check runs before anything else; nothing is read or written on
/// a signature mismatch. Token-exchange or profile failures also leave no
/// partial tenant state behind.
pub async fn callback(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> Result<Redirect, OAuthErrorPage> {
    let params = parse_query(query.as_deref());

    let shop = param(&params, "shop")
        .ok_or_else(|| OAuthErrorPage::bad_request("Missing shop parameter."))?
        .to_string();
    let code = param(&params, "code")
        .ok_or_else(|| OAuthErrorPage::bad_request("Missing code parameter."))?
        .to_string();

    let secret = state
        .config
        .shopify_api_secret
        .as_deref()
        .ok_or_else(|| OAuthErrorPage::internal("Shopify app credentials not configured."))?;

    if let Err(err) = verify_callback(&params, secret) {
        warn!(shop, error = %err, "OAuth callback rejected");
        return Err(OAuthErrorPage::bad_request("Invalid HMAC."));
    }

    let token_response = state
        .shopify
        .exchange_token(&shop, &code)
        .await
        .map_err(|err| {
            warn!(shop, error = %err, "Access token exchange failed");
            OAuthErrorPage::bad_gateway("Failed to get access token.")
        })?;
    let access_token = token_response.access_token;

    // No browser-session layer exists here, so every callback resolves its
    // principal from the shop profile.
    let profile = state
        .shopify
        .fetch_shop_profile(&shop, &access_token)
        .await
        .map_err(|err| {
            warn!(shop, error = %err, "Shop profile fetch failed");
            OAuthErrorPage::bad_gateway("Failed to fetch shop details.")
        })?;

    let email = profile
        .email
        .filter(|e| !e.is_empty())
        .ok_or_else(|| OAuthErrorPage::bad_gateway("Failed to fetch shop details."))?;
    let (first_name, last_name) = split_owner_name(profile.shop_owner.as_deref());

    let users = UserRepository::new(&state.db);
    let (user, user_created) = users
        .get_or_create(&email, first_name, last_name, placeholder_password_hash())
        .await
        .map_err(|err| {
            warn!(shop, error = %err, "User resolution failed");
            OAuthErrorPage::internal("Failed to complete authorization.")
        })?;

    let ciphertext = crypto::seal_access_token(
        state.config.crypto_key.as_deref(),
        &shop,
        &access_token,
    )
    .map_err(|err| {
        warn!(shop, error = %err, "Token encryption failed");
        OAuthErrorPage::internal("Failed to complete authorization.")
    })?;

    let tenant_name = shop.split('.').next().unwrap_or(&shop).to_string();
    let tenant = TenantRepository::new(&state.db)
        .upsert_by_domain(&shop, user.id, &tenant_name, ciphertext)
        .await
        .map_err(|err| {
            warn!(shop, error = %err, "Tenant upsert failed");
            OAuthErrorPage::internal("Failed to complete authorization.")
        })?;

    info!(
        shop,
        tenant_id = %tenant.id,
        user_created,
        "OAuth handshake completed; scheduling sync jobs"
    );

    // Independent fire-and-forget submissions: neither result is awaited,
    // and the redirect below does not wait for either job.
    state.jobs.submit(SyncJob::SubscribeWebhooks {
        tenant_id: tenant.id,
    });
    state.jobs.submit(SyncJob::BackfillStore {
        tenant_id: tenant.id,
    });

    let session = state.sessions.issue(user.id);
    let destination = format!("{}?session={}", state.config.frontend_url, session);

    Ok(Redirect::temporary(&destination))
}

fn parse_query(query: Option<&str>) -> Vec<(String, String)> {
    match query {
        Some(raw) => url::form_urlencoded::parse(raw.as_bytes())
            .into_owned()
            .collect(),
        None => Vec::new(),
    }
}

fn param<'a>(params: &'a [(String, String)], name: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.as_str())
        .filter(|v| !v.is_empty())
}

/// Split the shop owner's display name at the first space.
fn split_owner_name(owner: Option<&str>) -> (Option<String>, Option<String>) {
    let Some(owner) = owner.filter(|o| !o.trim().is_empty()) else {
        return (None, None);
    };

    let mut parts = owner.split_whitespace();
    let first = parts.next().map(|s| s.to_string());
    let rest = parts.collect::<Vec<_>>().join(" ");
    let last = if rest.is_empty() { None } else { Some(rest) };

    (first, last)
}

/// Random placeholder that can never be produced by hashing a password.
fn placeholder_password_hash() -> String {
    let mut bytes = [0u8; 24];
    rand::thread_rng().fill_bytes(&mut bytes);
    format!("!{}", base64_url::encode(&bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_owner_name() {
        assert_eq!(
            split_owner_name(Some("Ada Lovelace")),
            (Some("Ada".to_string()), Some("Lovelace".to_string()))
        );
        assert_eq!(
            split_owner_name(Some("Madonna")),
            (Some("Madonna".to_string()), None)
        );
        assert_eq!(
            split_owner_name(Some("Jean Claude Van Damme")),
            (
                Some("Jean".to_string()),
                Some("Claude Van Damme".to_string())
            )
        );
        assert_eq!(split_owner_name(Some("  ")), (None, None));
        assert_eq!(split_owner_name(None), (None, None));
    }

    #[test]
    fn test_placeholder_password_hash_is_unusable_and_random() {
        let first = placeholder_password_hash();
        let second = placeholder_password_hash();

        assert!(first.starts_with('!'));
        assert_ne!(first, second);
    }

    #[test]
    fn test_parse_query_decodes_pairs() {
        let params = parse_query(Some("shop=example.myshopify.com&code=abc%20def"));
        assert_eq!(param(&params, "shop"), Some("example.myshopify.com"));
        assert_eq!(param(&params, "code"), Some("abc def"));
        assert_eq!(param(&params, "hmac"), None);
    }

    #[test]
    fn test_error_page_escapes_markup() {
        let page = OAuthErrorPage::bad_request("<script>alert(1)</script>");
        let body = format!("{:?}", page);
        assert!(body.contains("script"));

        let escaped = escape_html("<script>&</script>");
        assert_eq!(escaped, "&lt;script&gt;&amp;&lt;/script&gt;");
    }
}
