// src/services/user_service.rs
use crate::{
    error::{is_unique_violation, AppError, AppResult},
    models::{profile::Profile, user::{RegisterForm, User}},
};
use sqlx::SqlitePool;
use uuid::Uuid;

/// Branches offered at registration and the sections of each.
pub const BRANCH_SECTIONS: &[(&str, &[&str])] = &[
    ("CSE Core", &["A2", "A3"]),
    ("CS-AIML", &["A4", "A5", "A6"]),
    ("IT", &["B1", "B2", "B3"]),
    ("CS-DS", &["B4"]),
];

pub fn sections_of(branch: &str) -> &'static [&'static str] {
    BRANCH_SECTIONS
        .iter()
        .find(|(name, _)| *name == branch)
        .map(|(_, sections)| *sections)
        .unwrap_or(&[])
}

pub async fn find_user_by_email(db_pool: &SqlitePool, email: &str) -> AppResult<Option<User>> {
    tracing::debug!("Looking up user by email: {}", email);
    let user = sqlx::query_as::<_, User>("SELECT id, email, password_hash FROM users WHERE email = ?1")
        .bind(email)
        .fetch_optional(db_pool)
        .await?;
    Ok(user)
}

pub async fn find_email(db_pool: &SqlitePool, user_id: &str) -> AppResult<Option<String>> {
    let email = sqlx::query_scalar::<_, String>("SELECT email FROM users WHERE id = ?1")
        .bind(user_id)
        .fetch_optional(db_pool)
        .await?;
    Ok(email)
}

pub async fn find_profile(db_pool: &SqlitePool, user_id: &str) -> AppResult<Option<Profile>> {
    let profile = sqlx::query_as::<_, Profile>(
        r#"
        SELECT id, full_name, college_id, branch, section, roll_number, batch, year, semester
        FROM profiles WHERE id = ?1
        "#,
    )
    .bind(user_id)
    .fetch_optional(db_pool)
    .await?;
    Ok(profile)
}

/// Validated sign-up data.
#[derive(Debug)]
struct NewAccount {
    full_name: String,
    email: String,
    password: String,
    branch: String,
    section: String,
    roll_number: String,
    college_id: String,
    batch: Option<String>,
    year: Option<i64>,
    semester: Option<i64>,
}

fn validate_registration(form: &RegisterForm) -> AppResult<NewAccount> {
    let invalid = |msg: &str| Err(AppError::Validation(msg.to_string()));

    let full_name = form.full_name.trim();
    if full_name.is_empty() {
        return invalid("Name is required");
    }
    if full_name.chars().count() > 100 {
        return invalid("Name must be less than 100 characters");
    }

    let email = form.email.trim().to_lowercase();
    if !looks_like_email(&email) {
        return invalid("Invalid email address");
    }
    if email.len() > 255 {
        return invalid("Email must be less than 255 characters");
    }

    if form.branch.is_empty() {
        return invalid("Branch is required");
    }
    if form.section.is_empty() {
        return invalid("Section is required");
    }
    if !sections_of(&form.branch).contains(&form.section.as_str()) {
        return invalid("Section does not belong to the selected branch");
    }

    let roll_number = form.roll_number.trim();
    if roll_number.is_empty() {
        return invalid("Roll number is required");
    }
    if roll_number.chars().count() > 20 {
        return invalid("Roll number must be less than 20 characters");
    }

    let password_len = form.password.chars().count();
    if password_len < 6 {
        return invalid("Password must be at least 6 characters");
    }
    if password_len > 100 {
        return invalid("Password must be less than 100 characters");
    }

    let college_id = optional_text(&form.college_id).unwrap_or_else(|| roll_number.to_string());

    Ok(NewAccount {
        full_name: full_name.to_string(),
        email,
        password: form.password.clone(),
        branch: form.branch.clone(),
        section: form.section.clone(),
        roll_number: roll_number.to_string(),
        college_id,
        batch: optional_text(&form.batch),
        year: optional_number(&form.year, "Year")?,
        semester: optional_number(&form.semester, "Semester")?,
    })
}

fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && domain.contains('.')
                && !email.contains(char::is_whitespace)
                && !domain.contains('@')
        }
        None => false,
    }
}

fn optional_text(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn optional_number(value: &Option<String>, field: &str) -> AppResult<Option<i64>> {
    match optional_text(value) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<i64>()
            .map(Some)
            .map_err(|_| AppError::Validation(format!("{} must be a number", field))),
    }
}

/// Creates the credentials row and the profile in one transaction.
pub async fn register(db_pool: &SqlitePool, form: &RegisterForm) -> AppResult<String> {
    let account = validate_registration(form)?;
    tracing::info!("Registering account: {}", account.email);

    let password_hash = crate::services::auth_service::hash_password(&account.password).await?;
    let user_id = Uuid::new_v4().to_string();

    let mut tx = db_pool.begin().await?;

    let insert_user = sqlx::query("INSERT INTO users (id, email, password_hash) VALUES (?1, ?2, ?3)")
        .bind(&user_id)
        .bind(&account.email)
        .bind(&password_hash)
        .execute(&mut *tx)
        .await;
    if let Err(e) = insert_user {
        if is_unique_violation(&e) {
            tracing::warn!("Registration refused: '{}' already exists.", account.email);
            tx.rollback().await?;
            return Err(AppError::Conflict("This email is already registered. Please login instead.".into()));
        }
        return Err(e.into());
    }

    sqlx::query(
        r#"
        INSERT INTO profiles (id, full_name, college_id, branch, section, roll_number, batch, year, semester)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
    )
    .bind(&user_id)
    .bind(&account.full_name)
    .bind(&account.college_id)
    .bind(&account.branch)
    .bind(&account.section)
    .bind(&account.roll_number)
    .bind(&account.batch)
    .bind(account.year)
    .bind(account.semester)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    tracing::info!("✅ Account '{}' created.", account.email);
    Ok(user_id)
}

/// Removes the student and every row they own.
pub async fn delete_account(db_pool: &SqlitePool, user_id: &str) -> AppResult<()> {
    tracing::info!("Deleting account {}", user_id);
    let mut tx = db_pool.begin().await?;

    // Records reference modifications, so they go first.
    for statement in [
        "DELETE FROM attendance_records WHERE student_id = ?1",
        "DELETE FROM class_modifications WHERE student_id = ?1",
        "DELETE FROM holidays WHERE holiday_type = 'manual' AND student_id = ?1",
        "DELETE FROM manual_attendance WHERE student_id = ?1",
        "DELETE FROM profiles WHERE id = ?1",
    ] {
        sqlx::query(statement).bind(user_id).execute(&mut *tx).await?;
    }

    let removed = sqlx::query("DELETE FROM users WHERE id = ?1")
        .bind(user_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();
    if removed == 0 {
        tx.rollback().await?;
        return Err(AppError::NotFound("Account".into()));
    }

    tx.commit().await?;
    tracing::info!("✅ Account {} deleted.", user_id);
    Ok(())
}
