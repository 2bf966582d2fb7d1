use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use crate::{
    db::models::Notification,
    error::{AppError, Result},
    middleware::auth::AuthUser,
    AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/notifications", get(list_notifications))
        .route("/notifications/:id/read", post(mark_read))
}

#[derive(Debug, Serialize)]
pub struct NotificationResponse {
    pub id: String,
    pub title: String,
    pub message: String,
    pub is_read: bool,
    pub created_at: String,
    pub related_application: Option<String>,
}

impl From<Notification> for NotificationResponse {
    fn from(row: Notification) -> Self {
        Self {
            id: row.id,
            title: row.title,
            message: row.message,
            is_read: row.is_read,
            created_at: row.created_at,
            related_application: row.related_application_id,
        }
    }
}

const NOTIFICATION_COLUMNS: &str =
    "id, user_id, title, message, is_read, related_application_id, created_at";

async fn list_notifications(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<NotificationResponse>>> {
    let rows = sqlx::query_as::<_, Notification>(&format!(
        "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE user_id = ? ORDER BY created_at DESC, rowid DESC"
    ))
    .bind(&user.id)
    .fetch_all(&state.db.pool)
    .await?;

    Ok(Json(rows.into_iter().map(NotificationResponse::from).collect()))
}

async fn mark_read(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<NotificationResponse>> {
    let mut conn = state.db.pool.acquire().await?;

    let updated = sqlx::query("UPDATE notifications SET is_read = 1 WHERE id = ? AND user_id = ?")
        .bind(&id)
        .bind(&user.id)
        .execute(&mut *conn)
        .await?
        .rows_affected();

    if updated == 0 {
        return Err(AppError::NotFound("Notification not found".to_string()));
    }

    let row = sqlx::query_as::<_, Notification>(&format!(
        "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE id = ?"
    ))
    .bind(&id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(Json(row.into()))
}
