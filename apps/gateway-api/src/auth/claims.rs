//! Bearer-credential verification shared by HTTP auth and the gateway
//! handshake.

use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::config::Config;

/// Role tags carried in campus access tokens. Closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Teacher,
    Admin,
}

/// Claims encoded in a campus access token.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    /// Expiry, seconds since the epoch.
    pub exp: i64,
}

/// Identity attached to a connection after a successful handshake.
/// Immutable for the life of the connection.
#[derive(Debug, Clone)]
pub struct ConnectionIdentity {
    pub user_id: String,
    pub role: Role,
    pub username: Option<String>,
    pub full_name: Option<String>,
}

impl From<Claims> for ConnectionIdentity {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            role: claims.role,
            username: claims.username,
            full_name: claims.full_name,
        }
    }
}

/// Why a credential was rejected. Logged server-side only; clients see a
/// generic rejection.
#[derive(Debug)]
pub enum AuthFailure {
    /// No credential supplied in production mode.
    Missing,
    /// Malformed, expired, or wrongly signed token.
    Invalid(jsonwebtoken::errors::Error),
}

/// Verify a bearer credential and extract the identity it carries.
///
/// A leading `"Bearer "` prefix is stripped if present. A missing credential
/// yields an anonymous connection (`Ok(None)`) in development and a hard
/// rejection in production.
pub fn verify_credential(
    config: &Config,
    credential: Option<&str>,
) -> Result<Option<ConnectionIdentity>, AuthFailure> {
    let Some(raw) = credential else {
        if config.mode.is_production() {
            return Err(AuthFailure::Missing);
        }
        return Ok(None);
    };

    let token = raw.strip_prefix("Bearer ").unwrap_or(raw);
    let claims = decode_token(&config.jwt_secret, token).map_err(AuthFailure::Invalid)?;
    Ok(Some(claims.into()))
}

/// Decode and validate a token against the shared secret.
pub fn decode_token(secret: &str, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let validation = Validation::new(Algorithm::HS256);
    let data = jsonwebtoken::decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )?;
    Ok(data.claims)
}
