//! OAuth handshake primitives for the Shopify authorization-code flow.
//!
//! Shopify signs the callback by HMAC-SHA256 over the query string minus the
//! `hmac` parameter itself, sorted by key and joined as `key=value&...`,
//! keyed with the app's shared secret. Verification uses constant-time
//! comparison to prevent timing attacks.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Access scopes requested from every shop.
pub const OAUTH_SCOPES: [&str; 3] = ["read_products", "read_orders", "read_customers"];

/// Errors from callback signature verification.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("callback carries no hmac parameter")]
    MissingHmac,
    #[error("callback hmac contains invalid hex")]
    MalformedHmac,
    #[error("callback hmac does not match computed digest")]
    InvalidSignature,
}

/// Build the shop-specific authorization URL for the fixed scope set.
pub fn authorize_url(shop: &str, api_key: &str, base_url: &str) -> String {
    let redirect_uri = format!("{}/auth/shopify/callback", base_url);
    format!(
        "https://{}/admin/oauth/authorize?client_id={}&scope={}&redirect_uri={}",
        shop,
        api_key,
        OAUTH_SCOPES.join(","),
        redirect_uri
    )
}

/// Compute the callback digest over all query parameters except `hmac`,
/// sorted by key and joined as `key=value&...`.
pub fn compute_callback_digest(params: &[(String, String)], secret: &str) -> String {
    let mut pairs: Vec<&(String, String)> = params.iter().filter(|(k, _)| k != "hmac").collect();
    pairs.sort_by(|a, b| a.0.cmp(&b.0));

    let message = pairs
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(message.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Verify the `hmac` parameter of an OAuth callback.
///
/// This check runs before any state is read or mutated; a mismatch rejects
/// the whole callback.
pub fn verify_callback(params: &[(String, String)], secret: &str) -> Result<(), SignatureError> {
    let provided = params
        .iter()
        .find(|(k, _)| k == "hmac")
        .map(|(_, v)| v.as_str())
        .ok_or(SignatureError::MissingHmac)?;

    let provided_bytes = hex::decode(provided).map_err(|_| SignatureError::MalformedHmac)?;

    let computed = compute_callback_digest(params, secret);
    let computed_bytes = hex::decode(&computed).expect("computed digest is valid hex");

    if ConstantTimeEq::ct_eq(computed_bytes.as_slice(), provided_bytes.as_slice()).into() {
        Ok(())
    } else {
        Err(SignatureError::InvalidSignature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn signed_params(secret: &str) -> Vec<(String, String)> {
        let mut params = pairs(&[
            ("shop", "example.myshopify.com"),
            ("code", "0907a61c0c8d55e99db179b68161bc00"),
            ("timestamp", "1337178173"),
            ("state", "0.6784241404160823"),
        ]);
        let digest = compute_callback_digest(&params, secret);
        params.push(("hmac".to_string(), digest));
        params
    }

    #[test]
    fn test_verify_round_trip() {
        let params = signed_params("hush");
        assert_eq!(verify_callback(&params, "hush"), Ok(()));
    }

    #[test]
    fn test_digest_is_order_independent() {
        let secret = "hush";
        let digest_a = compute_callback_digest(
            &pairs(&[("shop", "a.myshopify.com"), ("code", "xyz")]),
            secret,
        );
        let digest_b = compute_callback_digest(
            &pairs(&[("code", "xyz"), ("shop", "a.myshopify.com")]),
            secret,
        );
        assert_eq!(digest_a, digest_b);
    }

    #[test]
    fn test_tampered_parameter_rejected() {
        let mut params = signed_params("hush");
        for pair in params.iter_mut() {
            if pair.0 == "shop" {
                pair.1 = "evil.myshopify.com".to_string();
            }
        }
        assert_eq!(
            verify_callback(&params, "hush"),
            Err(SignatureError::InvalidSignature)
        );
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let params = signed_params("hush");
        assert_eq!(
            verify_callback(&params, "not-the-secret"),
            Err(SignatureError::InvalidSignature)
        );
    }

    #[test]
    fn test_missing_hmac_rejected() {
        let params = pairs(&[("shop", "example.myshopify.com"), ("code", "abc")]);
        assert_eq!(
            verify_callback(&params, "hush"),
            Err(SignatureError::MissingHmac)
        );
    }

    #[test]
    fn test_malformed_hmac_rejected() {
        let mut params = pairs(&[("shop", "example.myshopify.com")]);
        params.push(("hmac".to_string(), "not-hex!".to_string()));
        assert_eq!(
            verify_callback(&params, "hush"),
            Err(SignatureError::MalformedHmac)
        );
    }

    #[test]
    fn test_authorize_url_shape() {
        let url = authorize_url("example.myshopify.com", "client-id-123", "https://app.example.com");
        assert!(url.starts_with("https://example.myshopify.com/admin/oauth/authorize?"));
        assert!(url.contains("client_id=client-id-123"));
        assert!(url.contains("scope=read_products,read_orders,read_customers"));
        assert!(url.contains("redirect_uri=https://app.example.com/auth/shopify/callback"));
    }
}
