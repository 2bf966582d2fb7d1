use sqlx::SqliteConnection;
use uuid::Uuid;

use crate::{
    db::{self, models::ApplicationStatus},
    error::Result,
};

/// Queues the "your application was decided" message for the applicant.
/// Runs on the caller's connection so it can share the status update's
/// transaction.
pub async fn notify_status_change(
    conn: &mut SqliteConnection,
    freelancer_id: &str,
    application_id: &str,
    job_title: &str,
    status: ApplicationStatus,
) -> Result<String> {
    let id = Uuid::new_v4().to_string();
    let title = format!("Application {}", status.title());
    let message = format!(
        "Your application for '{job_title}' has been {}.",
        status.as_str()
    );

    sqlx::query(
        "INSERT INTO notifications (id, user_id, title, message, is_read, related_application_id, created_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(freelancer_id)
    .bind(&title)
    .bind(&message)
    .bind(false)
    .bind(application_id)
    .bind(db::timestamp())
    .execute(&mut *conn)
    .await?;

    Ok(id)
}
