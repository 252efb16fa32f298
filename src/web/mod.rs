// src/web/mod.rs
pub mod attendance_handlers;
pub mod auth_handlers;
pub mod home_handlers;
pub mod mw_auth;
pub mod profile_handlers;
pub mod routes;
pub mod timetable_handlers;

use axum::response::Redirect;
use serde::Deserialize;

/// Notification passed back to a page after a redirect.
#[derive(Deserialize, Debug, Default)]
pub struct FeedbackParams {
    pub success: Option<String>,
    pub error: Option<String>,
}

pub fn redirect_success(path: &str, message: &str) -> Redirect {
    Redirect::to(&format!("{}?success={}", path, urlencoding::encode(message)))
}

pub fn redirect_error(path: &str, message: &str) -> Redirect {
    Redirect::to(&format!("{}?error={}", path, urlencoding::encode(message)))
}
