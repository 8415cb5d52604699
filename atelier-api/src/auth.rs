//! Authentication Module
//!
//! Two credentials exist in this system:
//! 1. API keys (X-API-Key header) for the external read-only query endpoint
//! 2. JWT bearer tokens for the first-party chat surface
//!
//! Session issuance lives outside this service; this module only verifies.

use crate::error::{ApiError, ApiResult};
use atelier_core::UserId;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

// ============================================================================
// CLOCK ABSTRACTION (FOR DETERMINISTIC TESTS)
// ============================================================================

/// Clock abstraction for JWT time validation.
///
/// Owning time validation ourselves (instead of letting `jsonwebtoken` do
/// it) keeps tests fully deterministic and avoids system-time panics on
/// broken CI clocks.
pub trait JwtClock: Send + Sync {
    /// Current time as Unix epoch seconds.
    fn now_epoch_secs(&self) -> i64;
}

/// Production clock using system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl JwtClock for SystemClock {
    fn now_epoch_secs(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// Fixed clock for deterministic tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub i64);

impl JwtClock for FixedClock {
    fn now_epoch_secs(&self) -> i64 {
        self.0
    }
}

// ============================================================================
// JWT SECRET (TYPE-SAFE)
// ============================================================================

/// Type-safe JWT secret that prevents accidental logging.
#[derive(Clone)]
pub struct JwtSecret(SecretString);

impl JwtSecret {
    /// Create a new JWT secret with validation.
    pub fn new(secret: String) -> ApiResult<Self> {
        if secret.is_empty() {
            return Err(ApiError::internal_error("JWT secret must not be empty"));
        }
        Ok(Self(SecretString::new(secret.into())))
    }

    /// Expose the secret value (only for cryptographic operations).
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    /// Check if the secret is the insecure default.
    pub fn is_insecure_default(&self) -> bool {
        self.0.expose_secret() == "INSECURE_DEFAULT_SECRET_CHANGE_IN_PRODUCTION"
    }
}

impl std::fmt::Debug for JwtSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "JwtSecret([REDACTED, {} chars])", self.0.expose_secret().len())
    }
}

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Authentication configuration.
#[derive(Clone)]
pub struct AuthConfig {
    /// Valid API keys for the external query endpoint.
    pub api_keys: HashSet<String>,

    /// JWT secret key for signing and verification.
    pub jwt_secret: JwtSecret,

    /// JWT algorithm (default: HS256).
    pub jwt_algorithm: Algorithm,

    /// JWT token expiration in seconds (default: 1 hour).
    pub jwt_expiration_secs: i64,

    /// Clock skew tolerance in seconds (default: 60).
    pub jwt_clock_skew_secs: i64,

    /// Clock for JWT time validation (injected for testing).
    pub clock: Arc<dyn JwtClock>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("api_keys", &format!("[{} keys]", self.api_keys.len()))
            .field("jwt_secret", &self.jwt_secret)
            .field("jwt_expiration_secs", &self.jwt_expiration_secs)
            .field("jwt_clock_skew_secs", &self.jwt_clock_skew_secs)
            .finish()
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        let secret_str = std::env::var("ATELIER_JWT_SECRET")
            .unwrap_or_else(|_| "INSECURE_DEFAULT_SECRET_CHANGE_IN_PRODUCTION".to_string());

        Self {
            api_keys: HashSet::new(),
            jwt_secret: JwtSecret::new(secret_str)
                .unwrap_or_else(|_| JwtSecret(SecretString::new("fallback".into()))),
            jwt_algorithm: Algorithm::HS256,
            jwt_expiration_secs: 3600,
            jwt_clock_skew_secs: 60,
            clock: Arc::new(SystemClock),
        }
    }
}

impl AuthConfig {
    /// Create authentication configuration from environment variables.
    ///
    /// - `ATELIER_API_KEYS`: Comma-separated list of valid API keys
    /// - `ATELIER_JWT_SECRET`: JWT signing secret
    /// - `ATELIER_JWT_EXPIRATION_SECS`: Token expiration (default: 3600)
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(keys) = std::env::var("ATELIER_API_KEYS") {
            config.api_keys = keys
                .split(',')
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty())
                .collect();
        }
        if let Some(secs) = std::env::var("ATELIER_JWT_EXPIRATION_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
        {
            config.jwt_expiration_secs = secs;
        }
        config
    }

    /// Add a valid API key.
    pub fn add_api_key(&mut self, key: String) {
        self.api_keys.insert(key);
    }
}

// ============================================================================
// AUTH CONTEXT
// ============================================================================

/// How a request was authenticated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethod {
    ApiKey,
    Jwt,
}

/// Authenticated caller context, injected into request extensions.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: UserId,
    pub auth_method: AuthMethod,
}

// ============================================================================
// CREDENTIAL VERIFICATION
// ============================================================================

/// Verify an API key against the configured set. Constant behavior for
/// missing and wrong keys: both are just `false`.
pub fn verify_api_key(config: &AuthConfig, api_key: Option<&str>) -> bool {
    match api_key {
        Some(key) if !key.is_empty() => config.api_keys.contains(key),
        _ => false,
    }
}

/// JWT claims carried by first-party tokens.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Authenticated user id.
    pub sub: String,
    /// Issued-at, epoch seconds.
    pub iat: i64,
    /// Expiration, epoch seconds.
    pub exp: i64,
}

/// Validate a `Authorization: Bearer` header and produce an AuthContext.
pub fn authenticate_bearer(config: &AuthConfig, auth_header: Option<&str>) -> ApiResult<AuthContext> {
    let header = auth_header
        .ok_or_else(|| ApiError::unauthorized("Authorization header required"))?;
    let token = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| ApiError::invalid_token("Authorization header must use Bearer scheme"))?;

    // Signature check via jsonwebtoken; time validation is ours (clock
    // injectable, skew tolerated).
    let mut validation = Validation::new(config.jwt_algorithm);
    validation.validate_exp = false;
    validation.required_spec_claims.clear();

    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.expose().as_bytes()),
        &validation,
    )
    .map_err(|e| ApiError::invalid_token(format!("Invalid token: {}", e)))?;

    let now = config.clock.now_epoch_secs();
    if data.claims.exp + config.jwt_clock_skew_secs < now {
        return Err(ApiError::token_expired());
    }
    if data.claims.iat - config.jwt_clock_skew_secs > now {
        return Err(ApiError::invalid_token("Token issued in the future"));
    }

    let user_id = Uuid::parse_str(&data.claims.sub)
        .map_err(|_| ApiError::invalid_token("Token subject is not a valid user id"))?;

    Ok(AuthContext {
        user_id,
        auth_method: AuthMethod::Jwt,
    })
}

/// Generate a JWT token for a user. Used by tests and the dev tooling; the
/// production issuer lives in the external auth service.
pub fn generate_jwt_token(config: &AuthConfig, user_id: UserId) -> ApiResult<String> {
    let now = config.clock.now_epoch_secs();
    let claims = Claims {
        sub: user_id.to_string(),
        iat: now,
        exp: now + config.jwt_expiration_secs,
    };

    encode(
        &Header::new(config.jwt_algorithm),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.expose().as_bytes()),
    )
    .map_err(|e| ApiError::internal_error(format!("Failed to sign token: {}", e)))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use atelier_core::new_entity_id;

    fn test_config(clock: FixedClock) -> AuthConfig {
        let mut config = AuthConfig::default();
        config.jwt_secret = JwtSecret::new("test_secret".to_string()).unwrap();
        config.add_api_key("test_key_123".to_string());
        config.clock = Arc::new(clock);
        config
    }

    // 2024-01-01 00:00:00 UTC
    const NOW: i64 = 1704067200;

    #[test]
    fn test_api_key_verification() {
        let config = test_config(FixedClock(NOW));
        assert!(verify_api_key(&config, Some("test_key_123")));
        assert!(!verify_api_key(&config, Some("wrong_key")));
        assert!(!verify_api_key(&config, Some("")));
        assert!(!verify_api_key(&config, None));
    }

    #[test]
    fn test_jwt_roundtrip() {
        let config = test_config(FixedClock(NOW));
        let user_id = new_entity_id();
        let token = generate_jwt_token(&config, user_id).unwrap();

        let ctx =
            authenticate_bearer(&config, Some(&format!("Bearer {}", token))).unwrap();
        assert_eq!(ctx.user_id, user_id);
        assert_eq!(ctx.auth_method, AuthMethod::Jwt);
    }

    #[test]
    fn test_expired_token_rejected() {
        let issue_config = test_config(FixedClock(NOW));
        let token = generate_jwt_token(&issue_config, new_entity_id()).unwrap();

        // Validate two hours later: expired (1h lifetime + 60s skew).
        let late_config = test_config(FixedClock(NOW + 7200));
        let err = authenticate_bearer(&late_config, Some(&format!("Bearer {}", token)))
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::TokenExpired);
    }

    #[test]
    fn test_skew_tolerance() {
        let issue_config = test_config(FixedClock(NOW));
        let token = generate_jwt_token(&issue_config, new_entity_id()).unwrap();

        // 30 seconds past expiration is within the 60 second skew.
        let config = test_config(FixedClock(NOW + 3600 + 30));
        assert!(authenticate_bearer(&config, Some(&format!("Bearer {}", token))).is_ok());
    }

    #[test]
    fn test_malformed_headers_rejected() {
        let config = test_config(FixedClock(NOW));
        assert_eq!(
            authenticate_bearer(&config, None).unwrap_err().code,
            ErrorCode::Unauthorized
        );
        assert_eq!(
            authenticate_bearer(&config, Some("NotBearer token"))
                .unwrap_err()
                .code,
            ErrorCode::InvalidToken
        );
        assert_eq!(
            authenticate_bearer(&config, Some("Bearer not.a.jwt"))
                .unwrap_err()
                .code,
            ErrorCode::InvalidToken
        );
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let issue_config = test_config(FixedClock(NOW));
        let token = generate_jwt_token(&issue_config, new_entity_id()).unwrap();

        let mut other = test_config(FixedClock(NOW));
        other.jwt_secret = JwtSecret::new("different_secret".to_string()).unwrap();
        assert!(authenticate_bearer(&other, Some(&format!("Bearer {}", token))).is_err());
    }
}
