// src/services/attendance_service.rs
use crate::{
    error::AppResult,
    models::{
        attendance::{
            AttendanceRecord, AttendanceStatus, ClassCard, ClassModification, ModificationKind,
            NewModification,
        },
        profile::SessionContext,
        timetable::TimetableEntry,
    },
    services::{
        marking_flow::WritePlan,
        marking_window::{self, MarkingWindow},
        timetable_service,
    },
};
use chrono::{NaiveDate, NaiveDateTime, Utc};
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::collections::HashMap;
use uuid::Uuid;

const RECORD_COLUMNS: &str = "id, student_id, timetable_id, date, status, marked_at, modification_id";

/// All of a student's records, oldest first.
pub async fn list_for_student(db_pool: &SqlitePool, student_id: &str) -> AppResult<Vec<AttendanceRecord>> {
    let query = format!(
        "SELECT {} FROM attendance_records WHERE student_id = ?1 ORDER BY date ASC",
        RECORD_COLUMNS
    );
    let records = sqlx::query_as::<_, AttendanceRecord>(&query)
        .bind(student_id)
        .fetch_all(db_pool)
        .await?;
    Ok(records)
}

pub async fn list_for_date(
    db_pool: &SqlitePool,
    student_id: &str,
    date: NaiveDate,
) -> AppResult<Vec<AttendanceRecord>> {
    let query = format!(
        "SELECT {} FROM attendance_records WHERE student_id = ?1 AND date = ?2",
        RECORD_COLUMNS
    );
    let records = sqlx::query_as::<_, AttendanceRecord>(&query)
        .bind(student_id)
        .bind(date)
        .fetch_all(db_pool)
        .await?;
    Ok(records)
}

/// Writes the record for (student, class, date); a second write for the same
/// triple overwrites status, mark time and modification.
async fn upsert_record(
    tx: &mut Transaction<'_, Sqlite>,
    student_id: &str,
    timetable_id: &str,
    date: NaiveDate,
    status: AttendanceStatus,
    modification_id: Option<&str>,
) -> AppResult<AttendanceRecord> {
    let query = format!(
        r#"
        INSERT INTO attendance_records (id, student_id, timetable_id, date, status, marked_at, modification_id)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        ON CONFLICT(student_id, timetable_id, date) DO UPDATE SET
            status = excluded.status,
            marked_at = excluded.marked_at,
            modification_id = excluded.modification_id,
            updated_at = CURRENT_TIMESTAMP
        RETURNING {}
        "#,
        RECORD_COLUMNS
    );
    let record = sqlx::query_as::<_, AttendanceRecord>(&query)
        .bind(Uuid::new_v4().to_string())
        .bind(student_id)
        .bind(timetable_id)
        .bind(date)
        .bind(status)
        .bind(Utc::now())
        .bind(modification_id)
        .fetch_one(&mut **tx)
        .await?;
    Ok(record)
}

async fn insert_modification(
    tx: &mut Transaction<'_, Sqlite>,
    student_id: &str,
    modification: &NewModification,
) -> AppResult<ClassModification> {
    let (date, start, end, room, notes, swapped_with) = match &modification.kind {
        ModificationKind::Cancelled => (None, None, None, None, None, None),
        ModificationKind::Rescheduled { date, start_time, end_time, room, notes } => (
            Some(*date),
            Some(*start_time),
            Some(*end_time),
            room.clone(),
            notes.clone(),
            None,
        ),
        ModificationKind::Swapped { swapped_with_timetable_id } => {
            (None, None, None, None, None, Some(swapped_with_timetable_id.clone()))
        }
    };

    let created = sqlx::query_as::<_, ClassModification>(
        r#"
        INSERT INTO class_modifications (id, student_id, original_timetable_id, original_date,
            modification_type, rescheduled_date, rescheduled_start_time, rescheduled_end_time,
            rescheduled_room, notes, swapped_with_timetable_id)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        RETURNING id, student_id, original_timetable_id, original_date, modification_type,
            rescheduled_date, rescheduled_start_time, rescheduled_end_time, rescheduled_room,
            notes, swapped_with_timetable_id
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(student_id)
    .bind(&modification.original_timetable_id)
    .bind(modification.original_date)
    .bind(modification.kind.modification_type())
    .bind(date)
    .bind(start)
    .bind(end)
    .bind(room)
    .bind(notes)
    .bind(swapped_with)
    .fetch_one(&mut **tx)
    .await?;

    Ok(created)
}

pub async fn find_modification(db_pool: &SqlitePool, id: &str) -> AppResult<Option<ClassModification>> {
    let modification = sqlx::query_as::<_, ClassModification>(
        r#"
        SELECT id, student_id, original_timetable_id, original_date, modification_type,
            rescheduled_date, rescheduled_start_time, rescheduled_end_time, rescheduled_room,
            notes, swapped_with_timetable_id
        FROM class_modifications WHERE id = ?1
        "#,
    )
    .bind(id)
    .fetch_optional(db_pool)
    .await?;
    Ok(modification)
}

/// Carries out the writes decided by the marking flow.
///
/// The modification (when there is one) is created first and its id goes into
/// the attendance record; if creating it fails nothing else is written.
pub async fn execute_plan(
    db_pool: &SqlitePool,
    ctx: &SessionContext,
    date: NaiveDate,
    plan: &WritePlan,
) -> AppResult<AttendanceRecord> {
    let mut tx = db_pool.begin().await?;

    let record = match plan {
        WritePlan::Attendance { timetable_id, status } => {
            upsert_record(&mut tx, &ctx.user_id, timetable_id, date, *status, None).await?
        }
        WritePlan::WithModification { modification, status } => {
            let created = insert_modification(&mut tx, &ctx.user_id, modification).await?;
            tracing::debug!(
                "Created {:?} modification {} for class {}",
                created.modification_type,
                created.id,
                modification.original_timetable_id
            );
            upsert_record(
                &mut tx,
                &ctx.user_id,
                &modification.original_timetable_id,
                date,
                *status,
                Some(&created.id),
            )
            .await?
        }
    };

    tx.commit().await?;
    tracing::info!(
        "✅ Marked class {} as {} for student {} on {}",
        record.timetable_id,
        record.status,
        ctx.user_id,
        date
    );
    Ok(record)
}

/// Joins today's classes with the statuses already recorded for today.
/// A class with a record is never markable again.
pub fn join_today(
    classes: Vec<TimetableEntry>,
    records: &[AttendanceRecord],
    window: MarkingWindow,
    now: NaiveDateTime,
) -> Vec<ClassCard> {
    let by_class: HashMap<&str, &AttendanceRecord> = records
        .iter()
        .filter(|r| r.date == now.date())
        .map(|r| (r.timetable_id.as_str(), r))
        .collect();
    let clock = now.time();

    classes
        .into_iter()
        .map(|entry| {
            let record = by_class.get(entry.id.as_str());
            let status = record.map(|r| r.status);
            let can_mark = status.is_none() && window.can_mark(entry.start_time, clock);
            ClassCard {
                modification_id: record.and_then(|r| r.modification_id.clone()),
                is_past: marking_window::is_past(entry.end_time, clock),
                is_current: marking_window::is_current(entry.start_time, entry.end_time, clock),
                status,
                can_mark,
                entry,
            }
        })
        .collect()
}

/// Today's cards for the student, read fresh from the database.
pub async fn today_cards(
    db_pool: &SqlitePool,
    ctx: &SessionContext,
    window: MarkingWindow,
    now: NaiveDateTime,
) -> AppResult<Vec<ClassCard>> {
    let today = now.date();
    let classes = timetable_service::list_today(db_pool, ctx, today).await?;
    let records = list_for_date(db_pool, &ctx.user_id, today).await?;
    Ok(join_today(classes, &records, window, now))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::db::test_pool;
    use crate::services::timetable_service::tests::SAMPLE_CSV;
    use chrono::NaiveTime;

    /// Inserts a user + profile in section A2 and the sample timetable.
    pub(crate) async fn seed_student(pool: &SqlitePool) -> SessionContext {
        sqlx::query("INSERT INTO users (id, email, password_hash) VALUES ('stu-1', 'stu@example.com', 'x')")
            .execute(pool)
            .await
            .unwrap();
        sqlx::query(
            "INSERT INTO profiles (id, full_name, college_id, branch, section, roll_number) \
             VALUES ('stu-1', 'Asha Verma', '21CS001', 'CSE Core', 'A2', '21CS001')",
        )
        .execute(pool)
        .await
        .unwrap();
        timetable_service::import_csv(pool, SAMPLE_CSV.as_bytes()).await.unwrap();
        SessionContext {
            user_id: "stu-1".into(),
            full_name: "Asha Verma".into(),
            section: "A2".into(),
        }
    }

    pub(crate) async fn class_id(pool: &SqlitePool, code: &str) -> String {
        sqlx::query_scalar::<_, String>(
            "SELECT id FROM timetable WHERE section = 'A2' AND subject_code = ?1 ORDER BY day_of_week LIMIT 1",
        )
        .bind(code)
        .fetch_one(pool)
        .await
        .unwrap()
    }

    pub(crate) fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 3).unwrap()
    }

    fn at(h: u32, m: u32) -> NaiveDateTime {
        monday().and_time(NaiveTime::from_hms_opt(h, m, 0).unwrap())
    }

    async fn count_records(pool: &SqlitePool) -> i64 {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM attendance_records")
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn remarking_overwrites_the_same_row() {
        let pool = test_pool().await;
        let ctx = seed_student(&pool).await;
        let class = class_id(&pool, "CS302").await;

        let absent = WritePlan::Attendance { timetable_id: class.clone(), status: AttendanceStatus::Absent };
        let first = execute_plan(&pool, &ctx, monday(), &absent).await.unwrap();

        let present = WritePlan::Attendance { timetable_id: class.clone(), status: AttendanceStatus::Present };
        let second = execute_plan(&pool, &ctx, monday(), &present).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(count_records(&pool).await, 1);
        let stored = list_for_date(&pool, "stu-1", monday()).await.unwrap();
        assert_eq!(stored[0].status, AttendanceStatus::Present);
        assert!(stored[0].marked_at.is_some());
    }

    #[tokio::test]
    async fn rescheduled_class_creates_modification_then_record() {
        let pool = test_pool().await;
        let ctx = seed_student(&pool).await;
        let class = class_id(&pool, "CS301").await;

        let plan = WritePlan::WithModification {
            modification: NewModification {
                original_timetable_id: class.clone(),
                original_date: monday(),
                kind: ModificationKind::Rescheduled {
                    date: NaiveDate::from_ymd_opt(2025, 3, 5).unwrap(),
                    start_time: NaiveTime::from_hms_opt(14, 0, 0).unwrap(),
                    end_time: NaiveTime::from_hms_opt(15, 0, 0).unwrap(),
                    room: Some("L-110".into()),
                    notes: None,
                },
            },
            status: AttendanceStatus::Rescheduled,
        };
        let record = execute_plan(&pool, &ctx, monday(), &plan).await.unwrap();

        assert_eq!(record.status, AttendanceStatus::Rescheduled);
        let modification_id = record.modification_id.expect("record references modification");
        let modification = find_modification(&pool, &modification_id).await.unwrap().unwrap();
        assert_eq!(modification.original_timetable_id, class);
        assert_eq!(modification.rescheduled_room.as_deref(), Some("L-110"));
        assert_eq!(modification.rescheduled_start_time, NaiveTime::from_hms_opt(14, 0, 0));
    }

    #[tokio::test]
    async fn failed_modification_writes_no_record() {
        let pool = test_pool().await;
        let ctx = seed_student(&pool).await;
        let class = class_id(&pool, "CS301").await;
        sqlx::query(
            "CREATE TRIGGER reject_modifications BEFORE INSERT ON class_modifications \
             BEGIN SELECT RAISE(ABORT, 'modifications unavailable'); END;",
        )
        .execute(&pool)
        .await
        .unwrap();

        let plan = WritePlan::WithModification {
            modification: NewModification {
                original_timetable_id: class,
                original_date: monday(),
                kind: ModificationKind::Cancelled,
            },
            status: AttendanceStatus::Cancelled,
        };
        let result = execute_plan(&pool, &ctx, monday(), &plan).await;

        assert!(result.is_err());
        assert_eq!(count_records(&pool).await, 0);
    }

    #[tokio::test]
    async fn swap_to_unknown_class_is_rejected_by_the_store() {
        let pool = test_pool().await;
        let ctx = seed_student(&pool).await;
        let class = class_id(&pool, "CS301").await;

        let plan = WritePlan::WithModification {
            modification: NewModification {
                original_timetable_id: class,
                original_date: monday(),
                kind: ModificationKind::Swapped { swapped_with_timetable_id: "missing".into() },
            },
            status: AttendanceStatus::Swapped,
        };

        assert!(execute_plan(&pool, &ctx, monday(), &plan).await.is_err());
        assert_eq!(count_records(&pool).await, 0);
    }

    #[tokio::test]
    async fn today_cards_lock_marked_classes() {
        let pool = test_pool().await;
        let ctx = seed_student(&pool).await;
        let databases = class_id(&pool, "CS302").await;
        let plan = WritePlan::Attendance { timetable_id: databases.clone(), status: AttendanceStatus::Present };
        execute_plan(&pool, &ctx, monday(), &plan).await.unwrap();

        let cards = today_cards(&pool, &ctx, MarkingWindow::OpenEnded, at(11, 0)).await.unwrap();

        assert_eq!(cards.len(), 3);
        // 08:45 Databases, already marked
        assert_eq!(cards[0].entry.id, databases);
        assert_eq!(cards[0].status, Some(AttendanceStatus::Present));
        assert!(!cards[0].can_mark);
        assert!(cards[0].is_past);
        // 10:45 Operating Systems, running now
        assert!(cards[1].can_mark);
        assert!(cards[1].is_current);
        // 13:45 lab, not started yet
        assert!(!cards[2].can_mark);
        assert!(!cards[2].is_past);
    }
}
