use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

/// JWT Claims structure.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,  // User ID as text
    pub uid: i32,     // User ID
    pub role: String, // user | business | admin
    pub exp: usize,   // Expiration timestamp
}

/// Sign a token for `user_id` with `role`, valid for `ttl`.
pub fn sign(secret: &str, user_id: i32, role: &str, ttl: Duration) -> Result<String> {
    let expiration = Utc::now()
        .checked_add_signed(ttl)
        .context("token expiry out of range")?
        .timestamp();

    let claims = Claims {
        sub: user_id.to_string(),
        uid: user_id,
        role: role.to_owned(),
        exp: usize::try_from(expiration).context("token expiry before epoch")?,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

/// Verify and decode a JWT token.
pub fn verify(secret: &str, token: &str) -> Result<Claims> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(token_data.claims)
}
