// src/config.rs

use std::env;
use dotenvy::dotenv;

/// Number of students shown on the toppers board.
pub const TOPPER_LIMIT: usize = 3;

/// Sanity bounds for the year of a monthly fee record.
pub const FEE_YEAR_MIN: i32 = 2000;
pub const FEE_YEAR_MAX: i32 = 2100;

/// Exclusive upper bounds of the money columns: NUMERIC(10,2) for fee
/// amounts, NUMERIC(12,2) for salaries.
pub const FEE_AMOUNT_LIMIT: i64 = 100_000_000;
pub const SALARY_LIMIT: i64 = 10_000_000_000;

/// Number of upcoming events listed on the dashboard.
pub const UPCOMING_EVENTS_LIMIT: i64 = 5;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    /// Token lifetime in seconds.
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
    pub bind_addr: String,
    pub db_max_connections: u32,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set");

        let jwt_secret = env::var("JWT_SECRET")
            .expect("JWT_SECRET must be set");

        let jwt_expiration = env::var("JWT_EXPIRATION")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(86_400);

        let rust_log = env::var("RUST_LOG")
            .unwrap_or_else(|_| "info".to_string());

        let admin_username = env::var("ADMIN_USERNAME").ok().filter(|v| !v.is_empty());
        let admin_password = env::var("ADMIN_PASSWORD").ok().filter(|v| !v.is_empty());

        let bind_addr = env::var("BIND_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        let db_max_connections = env::var("DB_MAX_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(5);

        Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
            admin_username,
            admin_password,
            bind_addr,
            db_max_connections,
        }
    }
}
