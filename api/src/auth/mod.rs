pub mod claims;
pub mod extractors;
pub mod guards;
pub mod middleware;

pub use claims::{AuthUser, Claims};

use chrono::{Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode, errors::ErrorKind};
use util::config;

/// Generates a JWT and its expiry timestamp (RFC 3339) for a given user.
///
/// Fails with `InvalidKeyFormat` when no signing secret is configured.
pub fn generate_jwt(user_id: i64, admin: bool) -> Result<(String, String), jsonwebtoken::errors::Error> {
    let secret = config::signing_secret().ok_or(ErrorKind::InvalidKeyFormat)?;
    let expiry = Utc::now() + Duration::minutes(config::jwt_duration_minutes() as i64);

    let claims = Claims {
        sub: user_id,
        admin,
        exp: expiry.timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok((token, expiry.to_rfc3339()))
}
