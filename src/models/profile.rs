// src/models/profile.rs
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct Profile {
    pub id: String,
    pub full_name: String,
    pub college_id: String,
    pub branch: Option<String>,
    pub section: String,
    pub roll_number: Option<String>,
    pub batch: Option<String>,
    pub year: Option<i64>,
    pub semester: Option<i64>,
}

impl Profile {
    pub fn first_name(&self) -> &str {
        self.full_name.split_whitespace().next().unwrap_or("Student")
    }
}

/// Who is logged in, kept in the session from login until logout.
///
/// Handlers receive it from the auth middleware and pass it explicitly to
/// every query that depends on the student or their section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
    pub user_id: String,
    pub full_name: String,
    pub section: String,
}

impl SessionContext {
    pub const SESSION_KEY: &'static str = "session_context";

    pub fn from_profile(profile: &Profile) -> Self {
        Self {
            user_id: profile.id.clone(),
            full_name: profile.full_name.clone(),
            section: profile.section.clone(),
        }
    }

    pub fn first_name(&self) -> &str {
        self.full_name.split_whitespace().next().unwrap_or("Student")
    }
}
