pub mod notifications;
pub mod tokens;
