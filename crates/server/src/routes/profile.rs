use axum::{extract::State, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;
use uuid::Uuid;

use crate::{
    extract::AppJson,
    db::models::FreelancerProfile,
    error::{AppError, Result},
    middleware::auth::AuthUser,
    routes::catalog::{self, PROFILE_SKILLS, PROFILE_TECH_STACK},
    AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route(
        "/freelancer/profile",
        get(get_profile).put(replace_profile).patch(patch_profile),
    )
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateProfileRequest {
    pub education: Option<String>,
    pub experience: Option<String>,
    pub bio: Option<String>,
    pub hourly_rate: Option<f64>,
    pub skills: Option<Vec<i64>>,
    pub tech_stack: Option<Vec<i64>>,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub id: String,
    pub education: String,
    pub experience: String,
    pub skills: Vec<i64>,
    pub tech_stack: Vec<i64>,
    pub bio: String,
    pub hourly_rate: f64,
}

/// Returns the user's profile, creating an empty one on first access.
async fn get_or_create(conn: &mut SqliteConnection, user_id: &str) -> Result<FreelancerProfile> {
    sqlx::query("INSERT OR IGNORE INTO freelancer_profiles (id, user_id) VALUES (?, ?)")
        .bind(Uuid::new_v4().to_string())
        .bind(user_id)
        .execute(&mut *conn)
        .await?;

    let profile = sqlx::query_as::<_, FreelancerProfile>(
        "SELECT id, user_id, education, experience, bio, hourly_rate FROM freelancer_profiles WHERE user_id = ?",
    )
    .bind(user_id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(profile)
}

async fn to_response(
    conn: &mut SqliteConnection,
    profile: FreelancerProfile,
) -> Result<ProfileResponse> {
    let skills = catalog::load_links(conn, PROFILE_SKILLS, &profile.id).await?;
    let tech_stack = catalog::load_links(conn, PROFILE_TECH_STACK, &profile.id).await?;

    Ok(ProfileResponse {
        id: profile.id,
        education: profile.education,
        experience: profile.experience,
        skills,
        tech_stack,
        bio: profile.bio,
        hourly_rate: profile.hourly_rate,
    })
}

async fn get_profile(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<ProfileResponse>> {
    let mut conn = state.db.pool.acquire().await?;
    let profile = get_or_create(&mut conn, &user.id).await?;
    Ok(Json(to_response(&mut conn, profile).await?))
}

async fn replace_profile(
    State(state): State<AppState>,
    user: AuthUser,
    AppJson(body): AppJson<UpdateProfileRequest>,
) -> Result<Json<ProfileResponse>> {
    if body.skills.is_none() {
        return Err(AppError::Validation("skills: This field is required.".to_string()));
    }
    if body.tech_stack.is_none() {
        return Err(AppError::Validation(
            "tech_stack: This field is required.".to_string(),
        ));
    }
    update_profile(state, user, body).await
}

async fn patch_profile(
    State(state): State<AppState>,
    user: AuthUser,
    AppJson(body): AppJson<UpdateProfileRequest>,
) -> Result<Json<ProfileResponse>> {
    update_profile(state, user, body).await
}

async fn update_profile(
    state: AppState,
    user: AuthUser,
    body: UpdateProfileRequest,
) -> Result<Json<ProfileResponse>> {
    if body.hourly_rate.is_some_and(|rate| !rate.is_finite() || rate < 0.0) {
        return Err(AppError::Validation(
            "hourly_rate must be a non-negative number".to_string(),
        ));
    }

    let mut tx = state.db.pool.begin().await?;

    let current = get_or_create(&mut tx, &user.id).await?;

    let skills = match &body.skills {
        Some(ids) => Some(catalog::validate_ids(&mut tx, PROFILE_SKILLS.catalog, ids).await?),
        None => None,
    };
    let tech_stack = match &body.tech_stack {
        Some(ids) => Some(catalog::validate_ids(&mut tx, PROFILE_TECH_STACK.catalog, ids).await?),
        None => None,
    };

    sqlx::query(
        "UPDATE freelancer_profiles SET education = ?, experience = ?, bio = ?, hourly_rate = ? WHERE id = ?",
    )
    .bind(body.education.unwrap_or(current.education))
    .bind(body.experience.unwrap_or(current.experience))
    .bind(body.bio.unwrap_or(current.bio))
    .bind(body.hourly_rate.unwrap_or(current.hourly_rate))
    .bind(&current.id)
    .execute(&mut *tx)
    .await?;

    if let Some(ids) = skills {
        catalog::replace_links(&mut tx, PROFILE_SKILLS, &current.id, &ids).await?;
    }
    if let Some(ids) = tech_stack {
        catalog::replace_links(&mut tx, PROFILE_TECH_STACK, &current.id, &ids).await?;
    }

    let updated = get_or_create(&mut tx, &user.id).await?;
    let response = to_response(&mut tx, updated).await?;

    tx.commit().await?;

    Ok(Json(response))
}
