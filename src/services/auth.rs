//! Stateless admin tokens: `base64url(username|expiry).base64url(hmac)`.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use sha1::Sha1;

use crate::config::AppConfig;
use crate::errors::AppError;

const TOKEN_TTL_HOURS: i64 = 24;

fn mac(secret: &str) -> Result<Hmac<Sha1>, AppError> {
    Hmac::<Sha1>::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::Config(format!("invalid auth secret: {e}")))
}

/// Checks the configured admin credentials and issues a token on success.
pub fn login(
    config: &AppConfig,
    username: &str,
    password: &str,
    now: DateTime<Utc>,
) -> Result<String, AppError> {
    if username != config.admin_username || password != config.admin_password {
        return Err(AppError::Validation("Invalid credentials".to_string()));
    }
    issue_token(&config.auth_secret, username, now)
}

pub fn issue_token(secret: &str, username: &str, now: DateTime<Utc>) -> Result<String, AppError> {
    let expires = (now + Duration::hours(TOKEN_TTL_HOURS)).timestamp();
    let payload = format!("{username}|{expires}");

    let mut mac = mac(secret)?;
    mac.update(payload.as_bytes());
    let signature = mac.finalize().into_bytes();

    Ok(format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(payload),
        URL_SAFE_NO_PAD.encode(signature)
    ))
}

/// Returns the username the token was issued to.
pub fn verify_token(secret: &str, token: &str, now: DateTime<Utc>) -> Result<String, AppError> {
    let (payload_b64, signature_b64) = token.split_once('.').ok_or(AppError::Unauthorized)?;
    let payload = URL_SAFE_NO_PAD
        .decode(payload_b64)
        .map_err(|_| AppError::Unauthorized)?;
    let signature = URL_SAFE_NO_PAD
        .decode(signature_b64)
        .map_err(|_| AppError::Unauthorized)?;

    let mut mac = mac(secret)?;
    mac.update(&payload);
    mac.verify_slice(&signature)
        .map_err(|_| AppError::Unauthorized)?;

    let payload = String::from_utf8(payload).map_err(|_| AppError::Unauthorized)?;
    let (username, expires) = payload.rsplit_once('|').ok_or(AppError::Unauthorized)?;
    let expires: i64 = expires.parse().map_err(|_| AppError::Unauthorized)?;
    if now.timestamp() >= expires {
        return Err(AppError::Unauthorized);
    }
    Ok(username.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_and_verify() {
        let now = Utc::now();
        let token = issue_token("secret", "admin", now).unwrap();
        assert_eq!(verify_token("secret", &token, now).unwrap(), "admin");
        assert_eq!(
            verify_token("secret", &token, now + Duration::hours(23)).unwrap(),
            "admin"
        );
    }

    #[test]
    fn test_expired_token_rejected() {
        let now = Utc::now();
        let token = issue_token("secret", "admin", now).unwrap();
        assert!(matches!(
            verify_token("secret", &token, now + Duration::hours(24)),
            Err(AppError::Unauthorized)
        ));
    }

    #[test]
    fn test_tampered_token_rejected() {
        let now = Utc::now();
        let token = issue_token("secret", "admin", now).unwrap();
        assert!(verify_token("other-secret", &token, now).is_err());

        let (_, sig) = token.split_once('.').unwrap();
        let forged = format!("{}.{sig}", URL_SAFE_NO_PAD.encode("root|9999999999"));
        assert!(verify_token("secret", &forged, now).is_err());
        assert!(verify_token("secret", "garbage", now).is_err());
    }
}
