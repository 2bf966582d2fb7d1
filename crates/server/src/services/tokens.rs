use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::{
    config::Config,
    db::models::UserType,
    error::{AppError, Result},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user id
    pub username: String,
    pub user_type: UserType,
    pub token_type: TokenType,
    pub exp: usize,
}

#[derive(Debug, Serialize)]
pub struct TokenPair {
    pub refresh: String,
    pub access: String,
}

fn create_token(
    user_id: &str,
    username: &str,
    user_type: UserType,
    token_type: TokenType,
    ttl: Duration,
    secret: &str,
) -> Result<String> {
    let expiration = Utc::now()
        .checked_add_signed(ttl)
        .ok_or_else(|| AppError::Internal("Token expiry out of range".to_string()))?
        .timestamp()
        .max(0) as usize;

    let claims = Claims {
        sub: user_id.to_string(),
        username: username.to_string(),
        user_type,
        token_type,
        exp: expiration,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|_| AppError::Internal("Failed to create token".to_string()))
}

pub fn issue_pair(
    user_id: &str,
    username: &str,
    user_type: UserType,
    config: &Config,
) -> Result<TokenPair> {
    let refresh = create_token(
        user_id,
        username,
        user_type,
        TokenType::Refresh,
        Duration::days(config.refresh_token_ttl_days),
        &config.jwt_secret,
    )?;
    let access = issue_access(user_id, username, user_type, config)?;

    Ok(TokenPair { refresh, access })
}

pub fn issue_access(
    user_id: &str,
    username: &str,
    user_type: UserType,
    config: &Config,
) -> Result<String> {
    create_token(
        user_id,
        username,
        user_type,
        TokenType::Access,
        Duration::minutes(config.access_token_ttl_minutes),
        &config.jwt_secret,
    )
}

/// Decodes and checks signature, expiry and that the token is of the
/// expected kind. Any failure is reported as `Unauthorized`.
pub fn verify(token: &str, expected: TokenType, secret: &str) -> Result<Claims> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::Unauthorized)?;

    if data.claims.token_type != expected {
        return Err(AppError::Unauthorized);
    }

    Ok(data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config {
            port: 0,
            database_url: "sqlite::memory:".to_string(),
            database_max_connections: 1,
            jwt_secret: "unit-test-secret".to_string(),
            access_token_ttl_minutes: 5,
            refresh_token_ttl_days: 1,
        }
    }

    #[test]
    fn pair_tokens_are_not_interchangeable() {
        let config = config();
        let pair = issue_pair("u1", "alice", UserType::Freelancer, &config).unwrap();

        let claims = verify(&pair.access, TokenType::Access, &config.jwt_secret).unwrap();
        assert_eq!(claims.sub, "u1");
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.user_type, UserType::Freelancer);

        assert!(verify(&pair.access, TokenType::Refresh, &config.jwt_secret).is_err());
        assert!(verify(&pair.refresh, TokenType::Access, &config.jwt_secret).is_err());
        assert!(verify(&pair.refresh, TokenType::Refresh, &config.jwt_secret).is_ok());
    }

    #[test]
    fn rejects_foreign_signature_and_expired_tokens() {
        let config = config();
        let token = issue_access("u1", "alice", UserType::Recruiter, &config).unwrap();
        assert!(verify(&token, TokenType::Access, "another-secret").is_err());

        let expired = create_token(
            "u1",
            "alice",
            UserType::Recruiter,
            TokenType::Access,
            Duration::minutes(-10),
            &config.jwt_secret,
        )
        .unwrap();
        assert!(matches!(
            verify(&expired, TokenType::Access, &config.jwt_secret),
            Err(AppError::Unauthorized)
        ));
    }
}
