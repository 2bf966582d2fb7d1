use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;
use uuid::Uuid;

use crate::{
    extract::AppJson,
    db::{self, models::Job},
    error::{AppError, Result},
    middleware::auth::AuthUser,
    routes::{
        applications::{self, ApplicationResponse},
        catalog::{self, JOB_SKILLS, JOB_TECH_STACK},
    },
    AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/jobs", get(list_jobs).post(create_job))
        .route(
            "/jobs/:id",
            get(get_job)
                .put(replace_job)
                .patch(patch_job)
                .delete(delete_job),
        )
        .route("/jobs/:id/applications", get(list_job_applications))
}

#[derive(Debug, Default, Deserialize)]
pub struct JobRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(alias = "pay_per_hour")]
    pub budget: Option<f64>,
    pub experience_level: Option<String>,
    pub required_skills: Option<Vec<i64>>,
    pub tech_stack: Option<Vec<i64>>,
    pub is_active: Option<bool>,
}

impl JobRequest {
    /// Fields a full write (create or PUT) must carry.
    fn require_full(&self) -> Result<()> {
        if self.title.is_none() {
            return Err(AppError::Validation("title: This field is required.".to_string()));
        }
        if self.description.is_none() {
            return Err(AppError::Validation(
                "description: This field is required.".to_string(),
            ));
        }
        if self.budget.is_none() {
            return Err(AppError::Validation("budget: This field is required.".to_string()));
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
            return Err(AppError::Validation("Job title is required".to_string()));
        }
        if self.description.as_deref().is_some_and(|d| d.trim().is_empty()) {
            return Err(AppError::Validation(
                "Job description is required".to_string(),
            ));
        }
        if self.budget.is_some_and(|b| !b.is_finite() || b < 0.0) {
            return Err(AppError::Validation(
                "budget must be a non-negative number".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct JobResponse {
    pub id: String,
    pub recruiter: String,
    pub title: String,
    pub description: String,
    pub required_skills: Vec<i64>,
    pub tech_stack: Vec<i64>,
    pub budget: f64,
    pub experience_level: String,
    pub is_active: bool,
    pub created_at: String,
}

const JOB_COLUMNS: &str =
    "id, recruiter_id, title, description, budget, experience_level, is_active, created_at";

async fn to_response(conn: &mut SqliteConnection, job: Job) -> Result<JobResponse> {
    let required_skills = catalog::load_links(conn, JOB_SKILLS, &job.id).await?;
    let tech_stack = catalog::load_links(conn, JOB_TECH_STACK, &job.id).await?;

    Ok(JobResponse {
        id: job.id,
        recruiter: job.recruiter_id,
        title: job.title,
        description: job.description,
        required_skills,
        tech_stack,
        budget: job.budget,
        experience_level: job.experience_level,
        is_active: job.is_active,
        created_at: job.created_at,
    })
}

/// Jobs visible to the caller: a recruiter sees their own postings,
/// active or not; everyone else sees every active posting.
async fn find_visible(conn: &mut SqliteConnection, user: &AuthUser, id: &str) -> Result<Job> {
    let job = if user.is_recruiter() {
        sqlx::query_as::<_, Job>(&format!(
            "SELECT {JOB_COLUMNS} FROM jobs WHERE id = ? AND recruiter_id = ?"
        ))
        .bind(id)
        .bind(&user.id)
        .fetch_optional(&mut *conn)
        .await?
    } else {
        sqlx::query_as::<_, Job>(&format!(
            "SELECT {JOB_COLUMNS} FROM jobs WHERE id = ? AND is_active = 1"
        ))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
    };

    job.ok_or_else(|| AppError::NotFound("Job not found".to_string()))
}

/// Looks up a job the caller may modify.
async fn find_owned(conn: &mut SqliteConnection, user: &AuthUser, id: &str) -> Result<Job> {
    if !user.is_recruiter() {
        return Err(AppError::Forbidden(
            "Only recruiters can manage jobs".to_string(),
        ));
    }
    find_visible(conn, user, id).await
}

async fn list_jobs(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<JobResponse>>> {
    let mut conn = state.db.pool.acquire().await?;

    let jobs = if user.is_recruiter() {
        sqlx::query_as::<_, Job>(&format!(
            "SELECT {JOB_COLUMNS} FROM jobs WHERE recruiter_id = ? ORDER BY created_at DESC"
        ))
        .bind(&user.id)
        .fetch_all(&mut *conn)
        .await?
    } else {
        sqlx::query_as::<_, Job>(&format!(
            "SELECT {JOB_COLUMNS} FROM jobs WHERE is_active = 1 ORDER BY created_at DESC"
        ))
        .fetch_all(&mut *conn)
        .await?
    };

    let mut response = Vec::with_capacity(jobs.len());
    for job in jobs {
        response.push(to_response(&mut conn, job).await?);
    }

    Ok(Json(response))
}

async fn create_job(
    State(state): State<AppState>,
    user: AuthUser,
    AppJson(body): AppJson<JobRequest>,
) -> Result<(StatusCode, Json<JobResponse>)> {
    if !user.is_recruiter() {
        return Err(AppError::Forbidden(
            "Only recruiters can post jobs".to_string(),
        ));
    }
    body.require_full()?;
    body.validate()?;

    let mut tx = state.db.pool.begin().await?;

    let skills = catalog::validate_ids(
        &mut tx,
        JOB_SKILLS.catalog,
        body.required_skills.as_deref().unwrap_or_default(),
    )
    .await?;
    let tech_stack = catalog::validate_ids(
        &mut tx,
        JOB_TECH_STACK.catalog,
        body.tech_stack.as_deref().unwrap_or_default(),
    )
    .await?;

    let job_id = Uuid::new_v4().to_string();

    // The owner is always the caller, whatever the payload says
    sqlx::query(
        "INSERT INTO jobs (id, recruiter_id, title, description, budget, experience_level, is_active, created_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&job_id)
    .bind(&user.id)
    .bind(body.title.unwrap_or_default().trim())
    .bind(body.description.unwrap_or_default())
    .bind(body.budget.unwrap_or_default())
    .bind(body.experience_level.unwrap_or_default())
    .bind(body.is_active.unwrap_or(true))
    .bind(db::timestamp())
    .execute(&mut *tx)
    .await?;

    catalog::replace_links(&mut tx, JOB_SKILLS, &job_id, &skills).await?;
    catalog::replace_links(&mut tx, JOB_TECH_STACK, &job_id, &tech_stack).await?;

    let job = find_visible(&mut tx, &user, &job_id).await?;
    let response = to_response(&mut tx, job).await?;

    tx.commit().await?;

    tracing::info!(job_id = %job_id, recruiter_id = %user.id, "job posted");

    Ok((StatusCode::CREATED, Json(response)))
}

async fn get_job(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<JobResponse>> {
    let mut conn = state.db.pool.acquire().await?;
    let job = find_visible(&mut conn, &user, &id).await?;
    Ok(Json(to_response(&mut conn, job).await?))
}

async fn replace_job(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    AppJson(body): AppJson<JobRequest>,
) -> Result<Json<JobResponse>> {
    body.require_full()?;
    update_job(state, user, id, body).await
}

async fn patch_job(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    AppJson(body): AppJson<JobRequest>,
) -> Result<Json<JobResponse>> {
    update_job(state, user, id, body).await
}

async fn update_job(
    state: AppState,
    user: AuthUser,
    id: String,
    body: JobRequest,
) -> Result<Json<JobResponse>> {
    body.validate()?;

    let mut tx = state.db.pool.begin().await?;

    let current = find_owned(&mut tx, &user, &id).await?;

    let skills = match &body.required_skills {
        Some(ids) => Some(catalog::validate_ids(&mut tx, JOB_SKILLS.catalog, ids).await?),
        None => None,
    };
    let tech_stack = match &body.tech_stack {
        Some(ids) => Some(catalog::validate_ids(&mut tx, JOB_TECH_STACK.catalog, ids).await?),
        None => None,
    };

    // recruiter_id and created_at are never rewritten
    sqlx::query(
        "UPDATE jobs SET title = ?, description = ?, budget = ?, experience_level = ?, is_active = ? WHERE id = ?",
    )
    .bind(body.title.map(|t| t.trim().to_string()).unwrap_or(current.title))
    .bind(body.description.unwrap_or(current.description))
    .bind(body.budget.unwrap_or(current.budget))
    .bind(body.experience_level.unwrap_or(current.experience_level))
    .bind(body.is_active.unwrap_or(current.is_active))
    .bind(&current.id)
    .execute(&mut *tx)
    .await?;

    if let Some(ids) = skills {
        catalog::replace_links(&mut tx, JOB_SKILLS, &current.id, &ids).await?;
    }
    if let Some(ids) = tech_stack {
        catalog::replace_links(&mut tx, JOB_TECH_STACK, &current.id, &ids).await?;
    }

    let job = find_visible(&mut tx, &user, &current.id).await?;
    let response = to_response(&mut tx, job).await?;

    tx.commit().await?;

    Ok(Json(response))
}

async fn delete_job(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    let mut conn = state.db.pool.acquire().await?;
    let job = find_owned(&mut conn, &user, &id).await?;

    // Cascades to links and applications
    sqlx::query("DELETE FROM jobs WHERE id = ?")
        .bind(&job.id)
        .execute(&mut *conn)
        .await?;

    tracing::info!(job_id = %job.id, recruiter_id = %user.id, "job deleted");

    Ok(StatusCode::NO_CONTENT)
}

async fn list_job_applications(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Vec<ApplicationResponse>>> {
    let mut conn = state.db.pool.acquire().await?;
    let job = find_owned(&mut conn, &user, &id).await?;

    let rows = applications::list_for_job(&mut conn, &job.id).await?;

    Ok(Json(rows))
}
