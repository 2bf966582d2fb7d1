use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    extract::AppJson,
    db::{
        self,
        models::{User, UserType},
    },
    error::{is_unique_violation, AppError, Result},
    services::tokens::{self, TokenType},
    AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/token/refresh", post(refresh))
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub user_type: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh: String,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: String,
    pub username: String,
    pub email: String,
    pub user_type: UserType,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub refresh: String,
    pub access: String,
    pub username: String,
    pub user_type: UserType,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub access: String,
}

pub(crate) fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|_| AppError::Internal("Failed to hash password".to_string()))
}

pub(crate) fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

async fn register(
    State(state): State<AppState>,
    AppJson(body): AppJson<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>)> {
    // Validate input
    let username = body.username.trim();
    if username.is_empty() {
        return Err(AppError::Validation("Username is required".to_string()));
    }
    if body.email.is_empty() || !body.email.contains('@') {
        return Err(AppError::Validation("Invalid email address".to_string()));
    }
    if body.password.is_empty() {
        return Err(AppError::Validation("Password is required".to_string()));
    }
    let user_type: UserType = body.user_type.parse()?;

    // Check if user already exists
    let existing = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE username = ?")
        .bind(username)
        .fetch_one(&state.db.pool)
        .await?;

    if existing > 0 {
        return Err(username_taken());
    }

    let password_hash = hash_password(&body.password)?;

    let user_id = Uuid::new_v4().to_string();

    sqlx::query(
        "INSERT INTO users (id, username, email, password_hash, user_type, created_at) VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&user_id)
    .bind(username)
    .bind(&body.email)
    .bind(&password_hash)
    .bind(user_type.as_str())
    .bind(db::timestamp())
    .execute(&state.db.pool)
    .await
    .map_err(|e| {
        // Lost a race against a concurrent registration
        if is_unique_violation(&e) {
            username_taken()
        } else {
            e.into()
        }
    })?;

    tracing::info!(user_id = %user_id, user_type = %user_type, "user registered");

    Ok((
        StatusCode::CREATED,
        Json(UserResponse {
            id: user_id,
            username: username.to_string(),
            email: body.email,
            user_type,
        }),
    ))
}

fn username_taken() -> AppError {
    AppError::Validation("A user with that username already exists".to_string())
}

async fn login(
    State(state): State<AppState>,
    AppJson(body): AppJson<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    let user = sqlx::query_as::<_, User>(
        "SELECT id, username, email, password_hash, user_type, created_at FROM users WHERE username = ?",
    )
    .bind(body.username.trim())
    .fetch_optional(&state.db.pool)
    .await?
    .ok_or_else(|| AppError::Validation("User not found".to_string()))?;

    if !verify_password(&body.password, &user.password_hash)? {
        return Err(AppError::Validation("Incorrect password".to_string()));
    }

    let user_type: UserType = user
        .user_type
        .parse()
        .map_err(|_| AppError::Internal(format!("Corrupt user_type for {}", user.id)))?;

    let pair = tokens::issue_pair(&user.id, &user.username, user_type, &state.config)?;

    Ok(Json(LoginResponse {
        refresh: pair.refresh,
        access: pair.access,
        username: user.username,
        user_type,
    }))
}

async fn refresh(
    State(state): State<AppState>,
    AppJson(body): AppJson<RefreshRequest>,
) -> Result<Json<RefreshResponse>> {
    let claims = tokens::verify(&body.refresh, TokenType::Refresh, &state.config.jwt_secret)?;

    let access = tokens::issue_access(&claims.sub, &claims.username, claims.user_type, &state.config)?;

    Ok(Json(RefreshResponse { access }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_is_salted_and_verifiable() {
        let first = hash_password("correct horse").unwrap();
        let second = hash_password("correct horse").unwrap();

        assert_ne!(first, second);
        assert!(!first.contains("correct horse"));
        assert!(verify_password("correct horse", &first).unwrap());
        assert!(!verify_password("wrong horse", &first).unwrap());
    }
}
