use std::env;

#[derive(Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub database_max_connections: u32,
    pub jwt_secret: String,
    pub access_token_ttl_minutes: i64,
    pub refresh_token_ttl_days: i64,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            port: parse_var("PORT").unwrap_or(3000),
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:./data/hireboard.db?mode=rwc".to_string()),
            database_max_connections: parse_var("DATABASE_MAX_CONNECTIONS").unwrap_or(5),
            jwt_secret: env::var("JWT_SECRET")
                .unwrap_or_else(|_| "development-secret-change-in-production".to_string()),
            access_token_ttl_minutes: parse_var("ACCESS_TOKEN_TTL_MINUTES").unwrap_or(5),
            refresh_token_ttl_days: parse_var("REFRESH_TOKEN_TTL_DAYS").unwrap_or(1),
        }
    }
}

fn parse_var<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.parse().ok())
}
