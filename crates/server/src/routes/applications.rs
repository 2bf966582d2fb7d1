use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;
use uuid::Uuid;

use crate::{
    extract::AppJson,
    db::{
        self,
        models::{ApplicationStatus, JobApplication},
    },
    error::{is_unique_violation, AppError, Result},
    middleware::auth::AuthUser,
    services::notifications,
    AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/applications", post(apply))
        .route("/my-applications", get(my_applications))
        .route("/applications/:id/update-status", patch(update_status))
}

#[derive(Debug, Deserialize)]
pub struct ApplyRequest {
    pub job: String,
    #[serde(default, alias = "proposal")]
    pub cover_letter: String,
    pub bid_amount: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ApplicationResponse {
    pub id: String,
    pub job: String,
    pub freelancer: String,
    pub status: ApplicationStatus,
    pub cover_letter: String,
    pub bid_amount: Option<f64>,
    pub applied_at: String,
}

impl TryFrom<JobApplication> for ApplicationResponse {
    type Error = AppError;

    fn try_from(row: JobApplication) -> Result<Self> {
        Ok(Self {
            status: row.status.parse()?,
            id: row.id,
            job: row.job_id,
            freelancer: row.freelancer_id,
            cover_letter: row.cover_letter,
            bid_amount: row.bid_amount,
            applied_at: row.applied_at,
        })
    }
}

const APPLICATION_COLUMNS: &str =
    "id, job_id, freelancer_id, cover_letter, bid_amount, status, applied_at";

fn collect(rows: Vec<JobApplication>) -> Result<Vec<ApplicationResponse>> {
    rows.into_iter().map(ApplicationResponse::try_from).collect()
}

pub async fn list_for_job(
    conn: &mut SqliteConnection,
    job_id: &str,
) -> Result<Vec<ApplicationResponse>> {
    let rows = sqlx::query_as::<_, JobApplication>(&format!(
        "SELECT {APPLICATION_COLUMNS} FROM job_applications WHERE job_id = ? ORDER BY applied_at ASC"
    ))
    .bind(job_id)
    .fetch_all(&mut *conn)
    .await?;

    collect(rows)
}

async fn apply(
    State(state): State<AppState>,
    user: AuthUser,
    AppJson(body): AppJson<ApplyRequest>,
) -> Result<(StatusCode, Json<ApplicationResponse>)> {
    if !user.is_freelancer() {
        return Err(AppError::Forbidden(
            "Only freelancers can apply to jobs".to_string(),
        ));
    }
    if body.cover_letter.trim().is_empty() {
        return Err(AppError::Validation(
            "cover_letter: This field may not be blank.".to_string(),
        ));
    }
    if body.bid_amount.is_some_and(|b| !b.is_finite() || b < 0.0) {
        return Err(AppError::Validation(
            "bid_amount must be a non-negative number".to_string(),
        ));
    }

    // The open-job check and the insert must see the same job row
    let mut tx = state.db.pool.begin().await?;

    let open = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM jobs WHERE id = ? AND is_active = 1",
    )
    .bind(&body.job)
    .fetch_one(&mut *tx)
    .await?;

    if open == 0 {
        return Err(AppError::Validation(format!(
            "Invalid job id \"{}\" - object does not exist.",
            body.job
        )));
    }

    let application_id = Uuid::new_v4().to_string();

    // Applicant and status come from the server, never the payload
    sqlx::query(
        "INSERT INTO job_applications (id, job_id, freelancer_id, cover_letter, bid_amount, status, applied_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&application_id)
    .bind(&body.job)
    .bind(&user.id)
    .bind(&body.cover_letter)
    .bind(body.bid_amount)
    .bind(ApplicationStatus::Pending.as_str())
    .bind(db::timestamp())
    .execute(&mut *tx)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Validation("You have already applied to this job".to_string())
        } else {
            e.into()
        }
    })?;

    let row = sqlx::query_as::<_, JobApplication>(&format!(
        "SELECT {APPLICATION_COLUMNS} FROM job_applications WHERE id = ?"
    ))
    .bind(&application_id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(application_id = %application_id, job_id = %body.job, "application submitted");

    Ok((StatusCode::CREATED, Json(ApplicationResponse::try_from(row)?)))
}

async fn my_applications(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<ApplicationResponse>>> {
    if !user.is_freelancer() {
        return Ok(Json(Vec::new()));
    }

    let rows = sqlx::query_as::<_, JobApplication>(&format!(
        "SELECT {APPLICATION_COLUMNS} FROM job_applications WHERE freelancer_id = ? ORDER BY applied_at DESC"
    ))
    .bind(&user.id)
    .fetch_all(&state.db.pool)
    .await?;

    Ok(Json(collect(rows)?))
}

async fn update_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    AppJson(body): AppJson<UpdateStatusRequest>,
) -> Result<Json<ApplicationResponse>> {
    let mut tx = state.db.pool.begin().await?;

    let (freelancer_id, recruiter_id, job_title) = sqlx::query_as::<_, (String, String, String)>(
        r#"
        SELECT a.freelancer_id, j.recruiter_id, j.title
        FROM job_applications a
        JOIN jobs j ON a.job_id = j.id
        WHERE a.id = ?
        "#,
    )
    .bind(&id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::NotFound("Application not found".to_string()))?;

    if recruiter_id != user.id {
        return Err(AppError::Forbidden("Not authorized".to_string()));
    }

    let status = body
        .status
        .as_deref()
        .and_then(ApplicationStatus::parse_decision)
        .ok_or_else(|| {
            AppError::Validation("Invalid status. Must be 'accepted' or 'rejected'.".to_string())
        })?;

    sqlx::query("UPDATE job_applications SET status = ? WHERE id = ?")
        .bind(status.as_str())
        .bind(&id)
        .execute(&mut *tx)
        .await?;

    notifications::notify_status_change(&mut tx, &freelancer_id, &id, &job_title, status).await?;

    let row = sqlx::query_as::<_, JobApplication>(&format!(
        "SELECT {APPLICATION_COLUMNS} FROM job_applications WHERE id = ?"
    ))
    .bind(&id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(application_id = %id, status = status.as_str(), "application status changed");

    Ok(Json(ApplicationResponse::try_from(row)?))
}
