pub mod applications;
pub mod auth;
pub mod catalog;
pub mod jobs;
pub mod notifications;
pub mod profile;
