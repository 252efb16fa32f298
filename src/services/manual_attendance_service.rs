// src/services/manual_attendance_service.rs
use crate::{
    error::{AppError, AppResult},
    models::manual_attendance::ManualAttendance,
};
use sqlx::SqlitePool;
use uuid::Uuid;

pub async fn list(db_pool: &SqlitePool, student_id: &str) -> AppResult<Vec<ManualAttendance>> {
    let rows = sqlx::query_as::<_, ManualAttendance>(
        r#"
        SELECT id, student_id, subject_code, classes_held, classes_attended
        FROM manual_attendance WHERE student_id = ?1 ORDER BY subject_code ASC
        "#,
    )
    .bind(student_id)
    .fetch_all(db_pool)
    .await?;
    Ok(rows)
}

/// Checked before anything is sent to the database.
pub fn validate(subject_code: &str, classes_held: i64, classes_attended: i64) -> AppResult<()> {
    if subject_code.trim().is_empty() {
        return Err(AppError::Validation("Pick a subject.".into()));
    }
    if classes_held < 0 || classes_attended < 0 {
        return Err(AppError::Validation("Class counts cannot be negative.".into()));
    }
    if classes_attended > classes_held {
        return Err(AppError::Validation(
            "Classes attended cannot be more than classes held.".into(),
        ));
    }
    Ok(())
}

/// Creates or replaces the student's counts for one subject.
pub async fn upsert(
    db_pool: &SqlitePool,
    student_id: &str,
    subject_code: &str,
    classes_held: i64,
    classes_attended: i64,
) -> AppResult<ManualAttendance> {
    validate(subject_code, classes_held, classes_attended)?;
    let subject_code = subject_code.trim();

    let row = sqlx::query_as::<_, ManualAttendance>(
        r#"
        INSERT INTO manual_attendance (id, student_id, subject_code, classes_held, classes_attended)
        VALUES (?1, ?2, ?3, ?4, ?5)
        ON CONFLICT(student_id, subject_code) DO UPDATE SET
            classes_held = excluded.classes_held,
            classes_attended = excluded.classes_attended,
            updated_at = CURRENT_TIMESTAMP
        RETURNING id, student_id, subject_code, classes_held, classes_attended
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(student_id)
    .bind(subject_code)
    .bind(classes_held)
    .bind(classes_attended)
    .fetch_one(db_pool)
    .await?;

    tracing::info!(
        "Manual attendance for {} / {}: {}/{}",
        student_id,
        subject_code,
        classes_attended,
        classes_held
    );
    Ok(row)
}
