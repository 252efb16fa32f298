// src/models/user.rs
use serde::Deserialize;
use sqlx::FromRow;

/// Credentials row from the `users` table.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: String,
    pub email: String,
    pub password_hash: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Sign-up form: credentials plus the profile fields collected at registration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterForm {
    pub full_name: String,
    pub email: String,
    pub password: String,
    pub branch: String,
    pub section: String,
    pub roll_number: String,
    #[serde(default)]
    pub college_id: Option<String>,
    #[serde(default)]
    pub batch: Option<String>,
    #[serde(default)]
    pub year: Option<String>,
    #[serde(default)]
    pub semester: Option<String>,
}
