//! Signed bearer tokens (JWT, HMAC).

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use super::error::AuthError;
use crate::config::ConfigError;

/// What a token may be used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenUse {
    Access,
    Refresh,
}

/// JWT Claims structure
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Claims {
    pub sub: String, // Subject (username)
    pub exp: i64,    // Expiration time (as UTC timestamp)
    pub iat: i64,    // Issued at
    pub jti: String, // Unique per token, so same-second logins differ
    pub token_use: TokenUse,
}

/// Parse an algorithm name from config. Only shared-secret algorithms apply.
pub fn parse_algorithm(name: &str) -> Result<Algorithm, ConfigError> {
    match name.to_ascii_uppercase().as_str() {
        "HS256" => Ok(Algorithm::HS256),
        "HS384" => Ok(Algorithm::HS384),
        "HS512" => Ok(Algorithm::HS512),
        _ => Err(ConfigError::Algorithm(name.to_string())),
    }
}

#[derive(Clone)]
pub struct TokenCodec {
    algorithm: Algorithm,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenCodec {
    pub fn new(secret: &str, algorithm: Algorithm) -> Self {
        let mut validation = Validation::new(algorithm);
        validation.leeway = 0;
        Self {
            algorithm,
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Sign a token for `subject` that expires `expires_in` from now.
    pub fn encode(
        &self,
        subject: &str,
        token_use: TokenUse,
        expires_in: Duration,
    ) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            sub: subject.to_string(),
            exp: (now + expires_in).timestamp(),
            iat: now.timestamp(),
            jti: uuid::Uuid::new_v4().simple().to_string(),
            token_use,
        };

        encode(&Header::new(self.algorithm), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Internal(format!("Failed to generate token: {}", e)))
    }

    /// Verify signature and expiry and return the claims.
    pub fn decode(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::TokenInvalid,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> TokenCodec {
        TokenCodec::new("test-secret", Algorithm::HS256)
    }

    #[test]
    fn test_round_trip() {
        let codec = codec();
        let token = codec
            .encode("driver1", TokenUse::Access, Duration::minutes(60))
            .unwrap();

        let claims = codec.decode(&token).unwrap();
        assert_eq!(claims.sub, "driver1");
        assert_eq!(claims.token_use, TokenUse::Access);
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_expired_token() {
        let codec = codec();
        let token = codec
            .encode("driver1", TokenUse::Access, Duration::seconds(-5))
            .unwrap();

        assert!(matches!(codec.decode(&token), Err(AuthError::TokenExpired)));
    }

    #[test]
    fn test_wrong_secret_is_invalid() {
        let token = codec()
            .encode("driver1", TokenUse::Refresh, Duration::days(7))
            .unwrap();
        let other = TokenCodec::new("another-secret", Algorithm::HS256);

        assert!(matches!(other.decode(&token), Err(AuthError::TokenInvalid)));
    }

    #[test]
    fn test_tampered_payload_is_invalid() {
        let codec = codec();
        let forged = codec
            .encode("admin", TokenUse::Access, Duration::minutes(5))
            .unwrap();
        let token = codec
            .encode("driver1", TokenUse::Access, Duration::minutes(5))
            .unwrap();
        let mut parts: Vec<&str> = token.split('.').collect();
        parts[1] = forged.split('.').nth(1).unwrap();

        assert!(matches!(
            codec.decode(&parts.join(".")),
            Err(AuthError::TokenInvalid)
        ));
    }

    #[test]
    fn test_tokens_minted_together_differ() {
        let codec = codec();
        let a = codec
            .encode("driver1", TokenUse::Refresh, Duration::days(7))
            .unwrap();
        let b = codec
            .encode("driver1", TokenUse::Refresh, Duration::days(7))
            .unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_garbage_is_invalid() {
        assert!(matches!(
            codec().decode("not.a.jwt"),
            Err(AuthError::TokenInvalid)
        ));
    }

    #[test]
    fn test_parse_algorithm() {
        assert_eq!(parse_algorithm("HS256").unwrap(), Algorithm::HS256);
        assert_eq!(parse_algorithm("hs512").unwrap(), Algorithm::HS512);
        assert!(parse_algorithm("RS256").is_err());
    }
}
