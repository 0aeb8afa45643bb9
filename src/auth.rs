//! Bearer-token verification. Tokens are issued by the external identity
//! provider; this module only checks the HS256 signature and registered
//! claims, then exposes the subject as the user id.

use axum::http::HeaderMap;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing bearer token")]
    MissingToken,
    #[error("invalid token")]
    InvalidToken,
    #[error("token expired")]
    Expired,
}

#[derive(Debug, Clone)]
pub struct Claims {
    pub subject: String,
}

pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(axum::http::header::AUTHORIZATION)?;
    let value = value.to_str().ok()?;
    let token = value.strip_prefix("Bearer ").or_else(|| value.strip_prefix("bearer "))?;
    let token = token.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, AuthError> {
    let mut parts = token.split('.');
    let header_b64 = parts.next().ok_or(AuthError::InvalidToken)?;
    let payload_b64 = parts.next().ok_or(AuthError::InvalidToken)?;
    let sig_b64 = parts.next().ok_or(AuthError::InvalidToken)?;
    if parts.next().is_some() {
        return Err(AuthError::InvalidToken);
    }

    let header_bytes = URL_SAFE_NO_PAD
        .decode(header_b64.as_bytes())
        .map_err(|_| AuthError::InvalidToken)?;
    let payload_bytes = URL_SAFE_NO_PAD
        .decode(payload_b64.as_bytes())
        .map_err(|_| AuthError::InvalidToken)?;
    let sig_bytes = URL_SAFE_NO_PAD
        .decode(sig_b64.as_bytes())
        .map_err(|_| AuthError::InvalidToken)?;

    let header_json: serde_json::Value =
        serde_json::from_slice(&header_bytes).map_err(|_| AuthError::InvalidToken)?;
    let alg = header_json
        .get("alg")
        .and_then(|value| value.as_str())
        .ok_or(AuthError::InvalidToken)?;
    if alg != "HS256" {
        return Err(AuthError::InvalidToken);
    }

    type HmacSha256 = Hmac<Sha256>;
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| AuthError::InvalidToken)?;
    mac.update(format!("{header_b64}.{payload_b64}").as_bytes());
    mac.verify_slice(&sig_bytes)
        .map_err(|_| AuthError::InvalidToken)?;

    let payload_json: serde_json::Value =
        serde_json::from_slice(&payload_bytes).map_err(|_| AuthError::InvalidToken)?;

    if let Some(exp) = payload_json.get("exp").and_then(|value| value.as_i64()) {
        if exp <= Utc::now().timestamp() {
            return Err(AuthError::Expired);
        }
    }

    let subject = payload_json
        .get("sub")
        .and_then(|value| value.as_str())
        .filter(|value| !value.trim().is_empty())
        .ok_or(AuthError::InvalidToken)?
        .to_string();

    Ok(Claims { subject })
}

/// User id for endpoints that require an authenticated caller.
pub fn require_user_id(headers: &HeaderMap, secret: &str) -> Result<String, AuthError> {
    let token = extract_token(headers).ok_or(AuthError::MissingToken)?;
    Ok(verify_token(&token, secret)?.subject)
}

/// User id for endpoints where anonymous callers are allowed: no token is
/// `None`, an invalid token is still an error.
pub fn optional_user_id(headers: &HeaderMap, secret: &str) -> Result<Option<String>, AuthError> {
    match extract_token(headers) {
        None => Ok(None),
        Some(token) => Ok(Some(verify_token(&token, secret)?.subject)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(payload: &serde_json::Value, secret: &str) -> String {
        let header_b64 = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let payload_b64 = URL_SAFE_NO_PAD.encode(payload.to_string().as_bytes());
        let signing_input = format!("{header_b64}.{payload_b64}");

        type HmacSha256 = Hmac<Sha256>;
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(signing_input.as_bytes());
        let sig_b64 = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        format!("{signing_input}.{sig_b64}")
    }

    #[test]
    fn valid_token_yields_subject() {
        let token = sign(&serde_json::json!({"sub": "user-42"}), "secret");
        let claims = verify_token(&token, "secret").unwrap();
        assert_eq!(claims.subject, "user-42");
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = sign(&serde_json::json!({"sub": "user-42"}), "secret");
        assert!(matches!(
            verify_token(&token, "other"),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn expired_token_is_rejected() {
        let token = sign(
            &serde_json::json!({"sub": "user-42", "exp": Utc::now().timestamp() - 10}),
            "secret",
        );
        assert!(matches!(verify_token(&token, "secret"), Err(AuthError::Expired)));
    }

    #[test]
    fn missing_subject_is_rejected() {
        let token = sign(&serde_json::json!({"role": "APP_USER"}), "secret");
        assert!(matches!(
            verify_token(&token, "secret"),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn extract_token_requires_bearer_scheme() {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::AUTHORIZATION,
            "Basic dXNlcjpwdw==".parse().unwrap(),
        );
        assert!(extract_token(&headers).is_none());

        headers.insert(
            axum::http::header::AUTHORIZATION,
            "Bearer abc.def.ghi".parse().unwrap(),
        );
        assert_eq!(extract_token(&headers).unwrap(), "abc.def.ghi");
    }
}
