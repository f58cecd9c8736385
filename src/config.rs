// src/config.rs

use std::env;
use std::path::PathBuf;
use dotenvy::dotenv;

use crate::session::store::DEFAULT_IDLE_MINUTES;

#[derive(Debug, Clone)]
pub struct Config {
    /// Root of the flat-file store (`quizzes/` and `notes/` live below it).
    pub data_dir: PathBuf,
    /// Shared secret that unlocks admin mode for a session.
    pub admin_password: String,
    pub bind_addr: String,
    pub log_dir: String,
    pub rust_log: String,
    /// Minutes a session may sit idle before it is dropped.
    pub session_idle_minutes: i64,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let admin_password = env::var("ADMIN_PASSWORD")
            .expect("ADMIN_PASSWORD must be set");

        let data_dir = env::var("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("data"));

        let bind_addr = env::var("BIND_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        let log_dir = env::var("LOG_DIR")
            .unwrap_or_else(|_| "logs".to_string());

        let rust_log = env::var("RUST_LOG")
            .unwrap_or_else(|_| "info".to_string());

        let session_idle_minutes = env::var("SESSION_IDLE_MINUTES")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .filter(|m| *m > 0)
            .unwrap_or(DEFAULT_IDLE_MINUTES);

        Self {
            data_dir,
            admin_password,
            bind_addr,
            log_dir,
            rust_log,
            session_idle_minutes,
        }
    }
}
