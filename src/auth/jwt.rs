//! JWT token issuance and verification
//! HS256-signed, self-contained session tokens; nothing is stored server-side

use crate::{config::AppConfig, error::AppError};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};

use super::secret::SecretProvider;

/// Principal identifier bound into the `sub` claim
pub type PrincipalId = i64;

/// HS256 keys must carry at least 256 bits
pub const MIN_SECRET_BYTES: usize = 32;

/// JWT claims
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (principal id as decimal string)
    pub sub: String,

    /// Expiration (unix seconds)
    pub exp: i64,

    /// Issued at (unix seconds); optional on the way in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
}

/// Why a presented token was rejected.
///
/// Only ever surfaced in diagnostics; the HTTP boundary collapses all of these
/// into [`AppError::Unauthorized`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,

    #[error("invalid token signature")]
    InvalidSignature,

    #[error("token expired")]
    Expired,
}

/// How the `exp` claim is derived from the issuance instant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryPolicy {
    /// Fixed lifetime counted from issuance
    Sliding(Duration),
    /// Midnight (UTC) at the start of the day after issuance
    NextMidnight,
}

impl ExpiryPolicy {
    /// Resolve the policy named in `security.token_expiry`
    pub fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        match config.security.token_expiry.to_lowercase().as_str() {
            "sliding" => Ok(ExpiryPolicy::Sliding(Duration::seconds(
                config.security.token_ttl_secs as i64,
            ))),
            "next_midnight" => Ok(ExpiryPolicy::NextMidnight),
            other => Err(AppError::Config(format!("Unknown token expiry policy: {}", other))),
        }
    }

    /// Compute the expiry instant for a token issued at `issued_at`
    pub fn expires_at(&self, issued_at: DateTime<Utc>) -> Result<DateTime<Utc>, AppError> {
        match self {
            ExpiryPolicy::Sliding(ttl) => issued_at
                .checked_add_signed(*ttl)
                .ok_or_else(|| AppError::Internal("Token expiry overflow".to_string())),
            ExpiryPolicy::NextMidnight => issued_at
                .date_naive()
                .succ_opt()
                .and_then(|day| day.and_hms_opt(0, 0, 0))
                .map(|midnight| midnight.and_utc())
                .ok_or_else(|| AppError::Internal("Token expiry overflow".to_string())),
        }
    }
}

/// A freshly minted token and the instant it stops verifying
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// JWT service
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    expiry: ExpiryPolicy,
}

impl JwtService {
    /// Create JWT service from a secret source and an expiry policy
    pub fn new(secrets: &dyn SecretProvider, expiry: ExpiryPolicy) -> Result<Self, AppError> {
        let secret: Secret<String> = secrets.signing_secret()?;
        let secret = secret.expose_secret();

        if secret.len() < MIN_SECRET_BYTES {
            return Err(AppError::Config(format!(
                "JWT secret too short (min {} bytes)",
                MIN_SECRET_BYTES
            )));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked by hand so that `exp == now` is already expired
        validation.validate_exp = false;
        validation.leeway = 0;
        // Issuer and audience are deliberately not validated
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            expiry,
        })
    }

    /// Create JWT service from config
    pub fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        Self::new(&config.security, ExpiryPolicy::from_config(config)?)
    }

    pub fn expiry_policy(&self) -> ExpiryPolicy {
        self.expiry
    }

    /// Issue a token for `principal` as of now
    pub fn issue(&self, principal: PrincipalId) -> Result<IssuedToken, AppError> {
        self.issue_at(principal, Utc::now())
    }

    /// Issue a token for `principal` as of `issued_at`
    pub fn issue_at(
        &self,
        principal: PrincipalId,
        issued_at: DateTime<Utc>,
    ) -> Result<IssuedToken, AppError> {
        let expires_at = self.expiry.expires_at(issued_at)?;

        let claims = Claims {
            sub: principal.to_string(),
            exp: expires_at.timestamp(),
            iat: Some(issued_at.timestamp()),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| {
                tracing::error!("Failed to encode token: {:?}", e);
                AppError::Internal(format!("Failed to encode token: {}", e))
            })?;

        Ok(IssuedToken { token, expires_at })
    }

    /// Verify a token as of now and return the bound principal
    pub fn verify(&self, token: &str) -> Result<PrincipalId, TokenError> {
        self.verify_at(token, Utc::now())
    }

    /// Verify a token as of `now` and return the bound principal
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<PrincipalId, TokenError> {
        check_structure(token)?;

        // Signature is checked before the claims are deserialized
        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Malformed,
            })?
            .claims;

        if claims.exp <= now.timestamp() {
            return Err(TokenError::Expired);
        }

        claims.sub.parse::<PrincipalId>().map_err(|_| TokenError::Malformed)
    }
}

/// Three non-empty base64url segments, with JSON objects for header and payload.
///
/// Runs before signature verification so that garbage is reported as
/// malformed rather than as a bad signature.
fn check_structure(token: &str) -> Result<(), TokenError> {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 || segments.iter().any(|s| s.is_empty()) {
        return Err(TokenError::Malformed);
    }

    let mut decoded = Vec::with_capacity(3);
    for segment in &segments {
        decoded.push(URL_SAFE_NO_PAD.decode(segment).map_err(|_| TokenError::Malformed)?);
    }

    serde_json::from_slice::<Header>(&decoded[0]).map_err(|_| TokenError::Malformed)?;
    serde_json::from_slice::<serde_json::Map<String, serde_json::Value>>(&decoded[1])
        .map_err(|_| TokenError::Malformed)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn test_service(expiry: ExpiryPolicy) -> JwtService {
        let secret = Secret::new("test_secret_key_32_characters_long!".to_string());
        JwtService::new(&secret, expiry).unwrap()
    }

    #[test]
    fn test_issue_and_verify() {
        let service = test_service(ExpiryPolicy::Sliding(Duration::hours(24)));

        let issued = service.issue(42).unwrap();
        assert_eq!(service.verify(&issued.token), Ok(42));
    }

    #[test]
    fn test_short_secret_rejected() {
        let secret = Secret::new("short".to_string());
        assert!(JwtService::new(&secret, ExpiryPolicy::NextMidnight).is_err());
    }

    #[test]
    fn test_sliding_expiry() {
        let service = test_service(ExpiryPolicy::Sliding(Duration::hours(24)));
        let issued_at = Utc.with_ymd_and_hms(2024, 3, 10, 23, 30, 0).unwrap();

        let issued = service.issue_at(7, issued_at).unwrap();
        assert_eq!(issued.expires_at, issued_at + Duration::hours(24));
    }

    #[test]
    fn test_next_midnight_expiry() {
        let service = test_service(ExpiryPolicy::NextMidnight);

        let late = Utc.with_ymd_and_hms(2024, 3, 10, 23, 30, 0).unwrap();
        let early = Utc.with_ymd_and_hms(2024, 3, 10, 0, 0, 1).unwrap();
        let midnight = Utc.with_ymd_and_hms(2024, 3, 11, 0, 0, 0).unwrap();

        assert_eq!(service.issue_at(7, late).unwrap().expires_at, midnight);
        assert_eq!(service.issue_at(7, early).unwrap().expires_at, midnight);
    }

    #[test]
    fn test_expiry_boundary_is_exclusive() {
        let service = test_service(ExpiryPolicy::Sliding(Duration::hours(1)));
        let issued_at = Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap();
        let issued = service.issue_at(7, issued_at).unwrap();

        let just_before = issued.expires_at - Duration::seconds(1);
        assert_eq!(service.verify_at(&issued.token, just_before), Ok(7));
        assert_eq!(
            service.verify_at(&issued.token, issued.expires_at),
            Err(TokenError::Expired)
        );
    }

    #[test]
    fn test_wrong_key_is_invalid_signature() {
        let service = test_service(ExpiryPolicy::Sliding(Duration::hours(1)));
        let other_secret = Secret::new("another_secret_key_32_characters_long".to_string());
        let other = JwtService::new(&other_secret, ExpiryPolicy::Sliding(Duration::hours(1)))
            .unwrap();

        let issued = other.issue(1).unwrap();
        assert_eq!(service.verify(&issued.token), Err(TokenError::InvalidSignature));
    }

    #[test]
    fn test_empty_segments_are_malformed() {
        let service = test_service(ExpiryPolicy::Sliding(Duration::hours(1)));
        let issued = service.issue(1).unwrap();
        let parts: Vec<&str> = issued.token.split('.').collect();

        assert_eq!(service.verify(""), Err(TokenError::Malformed));
        assert_eq!(
            service.verify(&format!("{}.{}.", parts[0], parts[1])),
            Err(TokenError::Malformed)
        );
        assert_eq!(
            service.verify(&format!("{}..{}", parts[0], parts[2])),
            Err(TokenError::Malformed)
        );
    }

    #[test]
    fn test_undecodable_segments_are_malformed() {
        let service = test_service(ExpiryPolicy::Sliding(Duration::hours(1)));
        let issued = service.issue(1).unwrap();
        let parts: Vec<&str> = issued.token.split('.').collect();

        // 非 base64url 的载荷或签名
        assert_eq!(
            service.verify(&format!("{}.@@@.{}", parts[0], parts[2])),
            Err(TokenError::Malformed)
        );
        assert_eq!(
            service.verify(&format!("{}.{}.!!!", parts[0], parts[1])),
            Err(TokenError::Malformed)
        );

        // 可解码但不是 JSON 对象
        let not_json = URL_SAFE_NO_PAD.encode("not json");
        assert_eq!(
            service.verify(&format!("{}.{}.{}", not_json, parts[1], parts[2])),
            Err(TokenError::Malformed)
        );
        assert_eq!(
            service.verify(&format!("{}.{}.{}", parts[0], not_json, parts[2])),
            Err(TokenError::Malformed)
        );
    }

    #[test]
    fn test_issued_token_carries_iat() {
        let service = test_service(ExpiryPolicy::Sliding(Duration::hours(1)));
        let issued_at = Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap();
        let issued = service.issue_at(7, issued_at).unwrap();

        let payload = issued.token.split('.').nth(1).unwrap();
        let claims: Claims = serde_json::from_slice(&URL_SAFE_NO_PAD.decode(payload).unwrap())
            .unwrap();
        assert_eq!(claims.iat, Some(issued_at.timestamp()));
    }
}
