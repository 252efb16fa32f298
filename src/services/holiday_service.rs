// src/services/holiday_service.rs
use crate::{
    error::{AppError, AppResult},
    models::holiday::{Holiday, HolidayType, DEFAULT_MANUAL_HOLIDAY_NAME},
};
use chrono::NaiveDate;
use sqlx::SqlitePool;
use uuid::Uuid;

/// Official holidays plus the student's own, ordered by date.
pub async fn list_for_student(db_pool: &SqlitePool, student_id: &str) -> AppResult<Vec<Holiday>> {
    let holidays = sqlx::query_as::<_, Holiday>(
        r#"
        SELECT id, date, name, holiday_type, student_id
        FROM holidays
        WHERE holiday_type = 'official'
           OR (holiday_type = 'manual' AND student_id = ?1)
        ORDER BY date ASC, holiday_type ASC
        "#,
    )
    .bind(student_id)
    .fetch_all(db_pool)
    .await?;
    Ok(holidays)
}

/// The holiday (official or the student's own) falling on `date`, if any.
pub async fn holiday_on(
    db_pool: &SqlitePool,
    student_id: &str,
    date: NaiveDate,
) -> AppResult<Option<Holiday>> {
    let holiday = sqlx::query_as::<_, Holiday>(
        r#"
        SELECT id, date, name, holiday_type, student_id
        FROM holidays
        WHERE date = ?2
          AND (holiday_type = 'official' OR (holiday_type = 'manual' AND student_id = ?1))
        ORDER BY holiday_type DESC
        LIMIT 1
        "#,
    )
    .bind(student_id)
    .bind(date)
    .fetch_optional(db_pool)
    .await?;
    Ok(holiday)
}

/// Marks or unmarks a manual holiday on `date`. Returns true when the date is now marked.
pub async fn toggle_manual(
    db_pool: &SqlitePool,
    student_id: &str,
    date: NaiveDate,
    name: Option<&str>,
) -> AppResult<bool> {
    let removed = sqlx::query(
        "DELETE FROM holidays WHERE holiday_type = 'manual' AND student_id = ?1 AND date = ?2",
    )
    .bind(student_id)
    .bind(date)
    .execute(db_pool)
    .await?
    .rows_affected();

    if removed > 0 {
        tracing::info!("Manual holiday {} removed for {}", date, student_id);
        return Ok(false);
    }

    let name = name
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(DEFAULT_MANUAL_HOLIDAY_NAME);
    sqlx::query(
        "INSERT INTO holidays (id, date, name, holiday_type, student_id) VALUES (?1, ?2, ?3, ?4, ?5)",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(date)
    .bind(name)
    .bind(HolidayType::Manual)
    .bind(student_id)
    .execute(db_pool)
    .await?;

    tracing::info!("Manual holiday {} added for {}", date, student_id);
    Ok(true)
}

/// Deletes one of the student's manual holidays. Official holidays are read-only.
pub async fn delete_manual(db_pool: &SqlitePool, student_id: &str, id: &str) -> AppResult<()> {
    let removed = sqlx::query(
        "DELETE FROM holidays WHERE id = ?1 AND holiday_type = 'manual' AND student_id = ?2",
    )
    .bind(id)
    .bind(student_id)
    .execute(db_pool)
    .await?
    .rows_affected();

    if removed == 0 {
        tracing::warn!("Holiday {} not deletable by {}", id, student_id);
        return Err(AppError::NotFound("Holiday".into()));
    }
    Ok(())
}
