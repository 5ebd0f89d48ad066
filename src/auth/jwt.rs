use std::time::{SystemTime, UNIX_EPOCH};

use crate::models::Claims;
use jsonwebtoken::{
    DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Missing Authorization header")]
    Missing,
    #[error("Authorization header must start with Bearer")]
    Malformed,
    #[error("Token has expired")]
    Expired,
    #[error("Invalid token")]
    Invalid,
    #[error("Invalid email or password")]
    BadCredentials,
    #[error("Current password is incorrect")]
    WrongPassword,
}

fn now() -> usize {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as usize)
        .unwrap_or(0)
}

pub fn generate_token(
    user_id: u64,
    email: String,
    secret: &str,
    ttl: usize,
) -> Result<String, jsonwebtoken::errors::Error> {
    let iat = now();
    let claims = Claims {
        user_id,
        sub: email,
        iat,
        exp: iat + ttl,
        jti: Uuid::new_v4().to_string(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, AuthError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => AuthError::Expired,
        _ => AuthError::Invalid,
    })
}

/// Resolves an `Authorization` header value to the user it was issued to.
pub fn authenticate(header: Option<&str>, secret: &str) -> Result<u64, AuthError> {
    let token = header
        .ok_or(AuthError::Missing)?
        .strip_prefix("Bearer ")
        .ok_or(AuthError::Malformed)?;

    verify_token(token.trim(), secret).map(|claims| claims.user_id)
}
