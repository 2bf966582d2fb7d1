use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserType {
    Freelancer,
    Recruiter,
    Client,
}

impl UserType {
    pub fn as_str(self) -> &'static str {
        match self {
            UserType::Freelancer => "freelancer",
            UserType::Recruiter => "recruiter",
            UserType::Client => "client",
        }
    }
}

impl fmt::Display for UserType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "freelancer" => Ok(UserType::Freelancer),
            "recruiter" => Ok(UserType::Recruiter),
            "client" => Ok(UserType::Client),
            other => Err(AppError::Validation(format!(
                "\"{other}\" is not a valid user_type"
            ))),
        }
    }
}

/// Lifecycle of a job application. Only `Pending` is ever written on
/// creation; recruiters move it to one of the two decided states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    Pending,
    Accepted,
    Rejected,
}

impl ApplicationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Accepted => "accepted",
            ApplicationStatus::Rejected => "rejected",
        }
    }

    /// Parses a status a recruiter may set. `pending` is not a decision.
    pub fn parse_decision(s: &str) -> Option<Self> {
        match s {
            "accepted" => Some(ApplicationStatus::Accepted),
            "rejected" => Some(ApplicationStatus::Rejected),
            _ => None,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "Pending",
            ApplicationStatus::Accepted => "Accepted",
            ApplicationStatus::Rejected => "Rejected",
        }
    }
}

impl FromStr for ApplicationStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ApplicationStatus::Pending),
            other => ApplicationStatus::parse_decision(other).ok_or_else(|| {
                AppError::Internal(format!("Unknown application status in database: {other}"))
            }),
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub user_type: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CatalogItem {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FreelancerProfile {
    pub id: String,
    pub user_id: String,
    pub education: String,
    pub experience: String,
    pub bio: String,
    pub hourly_rate: f64,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Job {
    pub id: String,
    pub recruiter_id: String,
    pub title: String,
    pub description: String,
    pub budget: f64,
    pub experience_level: String,
    pub is_active: bool,
    pub created_at: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct JobApplication {
    pub id: String,
    pub job_id: String,
    pub freelancer_id: String,
    pub cover_letter: String,
    pub bid_amount: Option<f64>,
    pub status: String,
    pub applied_at: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub message: String,
    pub is_read: bool,
    pub related_application_id: Option<String>,
    pub created_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_type_parses_known_roles_only() {
        assert_eq!("recruiter".parse::<UserType>().unwrap(), UserType::Recruiter);
        assert_eq!("client".parse::<UserType>().unwrap(), UserType::Client);
        assert!("Recruiter".parse::<UserType>().is_err());
        assert!("admin".parse::<UserType>().is_err());
    }

    #[test]
    fn pending_is_not_a_decision() {
        assert_eq!(ApplicationStatus::parse_decision("pending"), None);
        assert_eq!(ApplicationStatus::parse_decision("maybe"), None);
        assert_eq!(
            ApplicationStatus::parse_decision("rejected"),
            Some(ApplicationStatus::Rejected)
        );
        assert_eq!(
            "pending".parse::<ApplicationStatus>().unwrap(),
            ApplicationStatus::Pending
        );
    }
}
