// src/config.rs
use crate::{
    error::{AppError, AppResult},
    services::marking_window::MarkingWindow,
};
use std::{env, net::SocketAddr, path::PathBuf};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_WINDOW_MINUTES: i64 = 30;
const DEFAULT_INACTIVITY_DAYS: i64 = 1;
const MIN_SECRET_LEN: usize = 64;

/// Runtime configuration, read once from the environment at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub session_secret: String,
    pub bind_addr: SocketAddr,
    pub marking_window: MarkingWindow,
    pub session_inactivity_days: i64,
    pub timetable_csv: Option<PathBuf>,
}

impl AppConfig {
    /// Reads the process environment. `main` loads `.env` before calling this.
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup (the environment in production).
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL")
            .ok_or_else(|| AppError::ConfigError("DATABASE_URL is not set".into()))?;
        let session_secret = lookup("SESSION_SECRET")
            .ok_or_else(|| AppError::ConfigError("SESSION_SECRET is not set".into()))?;
        // Session cookies are signed with it; the signing key needs 64 bytes.
        if session_secret.len() < MIN_SECRET_LEN {
            return Err(AppError::ConfigError(format!(
                "SESSION_SECRET must be at least {} bytes",
                MIN_SECRET_LEN
            )));
        }

        let bind_addr = lookup("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| AppError::ConfigError(format!("BIND_ADDR: {}", e)))?;

        let window_minutes = match lookup("MARKING_WINDOW_MINUTES") {
            Some(raw) => raw
                .trim()
                .parse::<i64>()
                .ok()
                .filter(|m| *m >= 0)
                .ok_or_else(|| {
                    AppError::ConfigError(format!("MARKING_WINDOW_MINUTES: invalid value '{}'", raw))
                })?,
            None => DEFAULT_WINDOW_MINUTES,
        };
        let marking_window = match lookup("MARKING_WINDOW").as_deref().map(str::trim) {
            None | Some("") | Some("open_ended") => MarkingWindow::OpenEnded,
            Some("bounded") => MarkingWindow::Bounded { minutes: window_minutes },
            Some(other) => {
                return Err(AppError::ConfigError(format!(
                    "MARKING_WINDOW: expected 'open_ended' or 'bounded', got '{}'",
                    other
                )))
            }
        };

        let session_inactivity_days = match lookup("SESSION_INACTIVITY_DAYS") {
            Some(raw) => raw.trim().parse::<i64>().ok().filter(|d| *d > 0).ok_or_else(|| {
                AppError::ConfigError(format!("SESSION_INACTIVITY_DAYS: invalid value '{}'", raw))
            })?,
            None => DEFAULT_INACTIVITY_DAYS,
        };

        let timetable_csv = lookup("TIMETABLE_CSV")
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);

        Ok(Self {
            database_url,
            session_secret,
            bind_addr,
            marking_window,
            session_inactivity_days,
            timetable_csv,
        })
    }
}
