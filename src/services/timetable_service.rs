// src/services/timetable_service.rs
use crate::{
    error::{AppError, AppResult},
    models::{
        profile::SessionContext,
        timetable::{DaySchedule, TimetableCsvRow, TimetableEntry, DAY_NAMES},
    },
};
use chrono::{Datelike, NaiveDate, NaiveTime};
use sqlx::SqlitePool;
use std::io::Read;
use uuid::Uuid;

const ENTRY_COLUMNS: &str = "id, section, day_of_week, start_time, end_time, subject_code, \
     subject_name, professor_name, room, class_type";

/// Day index used by the timetable: Monday = 0 .. Sunday = 6.
pub fn day_of_week(date: NaiveDate) -> u32 {
    date.weekday().num_days_from_monday()
}

/// Classes of a section on one weekday, ordered by start time. An empty day is not an error.
pub async fn list_for_day(
    db_pool: &SqlitePool,
    section: &str,
    day_of_week: u32,
) -> AppResult<Vec<TimetableEntry>> {
    tracing::debug!("Fetching timetable for section {} on day {}", section, day_of_week);

    let query = format!(
        "SELECT {} FROM timetable WHERE section = ?1 AND day_of_week = ?2 ORDER BY start_time ASC",
        ENTRY_COLUMNS
    );
    let entries = sqlx::query_as::<_, TimetableEntry>(&query)
        .bind(section)
        .bind(day_of_week as i64)
        .fetch_all(db_pool)
        .await?;

    Ok(entries)
}

/// Today's classes for the logged-in student.
pub async fn list_today(
    db_pool: &SqlitePool,
    ctx: &SessionContext,
    today: NaiveDate,
) -> AppResult<Vec<TimetableEntry>> {
    list_for_day(db_pool, &ctx.section, day_of_week(today)).await
}

/// The whole week of a section, ordered by day then start time.
pub async fn list_for_section(db_pool: &SqlitePool, section: &str) -> AppResult<Vec<TimetableEntry>> {
    let query = format!(
        "SELECT {} FROM timetable WHERE section = ?1 ORDER BY day_of_week ASC, start_time ASC",
        ENTRY_COLUMNS
    );
    let entries = sqlx::query_as::<_, TimetableEntry>(&query)
        .bind(section)
        .fetch_all(db_pool)
        .await?;
    tracing::debug!("Loaded {} timetable entries for section {}", entries.len(), section);
    Ok(entries)
}

pub async fn find_by_id(db_pool: &SqlitePool, id: &str) -> AppResult<Option<TimetableEntry>> {
    let query = format!("SELECT {} FROM timetable WHERE id = ?1", ENTRY_COLUMNS);
    let entry = sqlx::query_as::<_, TimetableEntry>(&query)
        .bind(id)
        .fetch_optional(db_pool)
        .await?;
    Ok(entry)
}

/// Groups a section's entries into Monday..Saturday, keeping empty days.
pub fn week_view(entries: &[TimetableEntry]) -> Vec<DaySchedule> {
    DAY_NAMES
        .iter()
        .enumerate()
        .map(|(index, &day_name)| DaySchedule {
            day_name,
            classes: entries
                .iter()
                .filter(|e| e.day_of_week == index as i64)
                .cloned()
                .collect(),
        })
        .collect()
}

/// Inserts or updates timetable rows from CSV, keyed on (section, day, start time).
/// Returns the number of rows written.
pub async fn import_csv<R: Read>(db_pool: &SqlitePool, reader: R) -> AppResult<usize> {
    let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

    let mut rows = Vec::new();
    for (index, result) in csv_reader.deserialize::<TimetableCsvRow>().enumerate() {
        // Header is line 1.
        let line = index + 2;
        let row = result.map_err(|e| AppError::TimetableImport(format!("line {}: {}", line, e)))?;
        rows.push(validate_row(row, line)?);
    }

    let mut tx = db_pool.begin().await?;
    for row in &rows {
        sqlx::query(
            r#"
            INSERT INTO timetable (id, section, day_of_week, start_time, end_time, subject_code,
                                   subject_name, professor_name, room, class_type)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ON CONFLICT(section, day_of_week, start_time) DO UPDATE SET
                end_time = excluded.end_time,
                subject_code = excluded.subject_code,
                subject_name = excluded.subject_name,
                professor_name = excluded.professor_name,
                room = excluded.room,
                class_type = excluded.class_type,
                updated_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(&row.id)
        .bind(&row.section)
        .bind(row.day_of_week)
        .bind(row.start_time)
        .bind(row.end_time)
        .bind(&row.subject_code)
        .bind(&row.subject_name)
        .bind(&row.professor_name)
        .bind(&row.room)
        .bind(&row.class_type)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;

    tracing::info!("✅ Imported {} timetable rows.", rows.len());
    Ok(rows.len())
}

fn validate_row(row: TimetableCsvRow, line: usize) -> AppResult<TimetableEntry> {
    let bad = |what: &str| AppError::TimetableImport(format!("line {}: {}", line, what));

    if row.section.is_empty() || row.subject_code.is_empty() || row.subject_name.is_empty() {
        return Err(bad("section, subject_code and subject_name are required"));
    }
    if !(0..=5).contains(&row.day_of_week) {
        return Err(bad("day_of_week must be between 0 (Monday) and 5 (Saturday)"));
    }
    let start_time = parse_clock(&row.start_time).ok_or_else(|| bad("invalid start_time"))?;
    let end_time = parse_clock(&row.end_time).ok_or_else(|| bad("invalid end_time"))?;

    Ok(TimetableEntry {
        id: Uuid::new_v4().to_string(),
        section: row.section,
        day_of_week: row.day_of_week,
        start_time,
        end_time,
        subject_code: row.subject_code,
        subject_name: row.subject_name,
        professor_name: row.professor_name,
        room: row.room.filter(|r| !r.is_empty()),
        class_type: row.class_type,
    })
}

/// Accepts `HH:MM` and `HH:MM:SS`.
pub fn parse_clock(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .ok()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::db::test_pool;

    pub(crate) const SAMPLE_CSV: &str = "\
section,day_of_week,start_time,end_time,subject_code,subject_name,professor_name,room,class_type
A2,0,10:45,11:45,CS301,Operating Systems,Dr. Rao,L-104,lecture
A2,0,08:45,09:45,CS302,Databases,Dr. Iyer,L-101,lecture
A2,0,13:45,15:45,CS303,Networks Lab,Dr. Sen,,lab
A2,2,09:45,10:45,CS301,Operating Systems,Dr. Rao,L-104,lecture
B1,0,08:45,09:45,IT201,Web Technologies,Dr. Das,L-201,lecture
";

    #[test]
    fn monday_is_zero_and_sunday_is_six() {
        let monday = NaiveDate::from_ymd_opt(2025, 3, 3).unwrap();
        let saturday = NaiveDate::from_ymd_opt(2025, 3, 8).unwrap();
        let sunday = NaiveDate::from_ymd_opt(2025, 3, 9).unwrap();

        assert_eq!(day_of_week(monday), 0);
        assert_eq!(day_of_week(saturday), 5);
        assert_eq!(day_of_week(sunday), 6);
    }

    #[test]
    fn parses_short_and_long_clock_times() {
        assert_eq!(parse_clock("09:45"), NaiveTime::from_hms_opt(9, 45, 0));
        assert_eq!(parse_clock("09:45:30"), NaiveTime::from_hms_opt(9, 45, 30));
        assert_eq!(parse_clock("9h45"), None);
    }

    #[tokio::test]
    async fn lists_a_day_in_start_time_order() {
        let pool = test_pool().await;
        import_csv(&pool, SAMPLE_CSV.as_bytes()).await.unwrap();

        let monday = list_for_day(&pool, "A2", 0).await.unwrap();
        let codes: Vec<&str> = monday.iter().map(|e| e.subject_code.as_str()).collect();
        assert_eq!(codes, vec!["CS302", "CS301", "CS303"]);
        assert_eq!(monday[2].room, None);

        let sunday = list_for_day(&pool, "A2", 6).await.unwrap();
        assert!(sunday.is_empty());
    }

    #[tokio::test]
    async fn reimport_updates_instead_of_duplicating() {
        let pool = test_pool().await;
        import_csv(&pool, SAMPLE_CSV.as_bytes()).await.unwrap();

        let update = "\
section,day_of_week,start_time,end_time,subject_code,subject_name,professor_name,room,class_type
A2,0,08:45,09:45,CS302,Databases,Dr. Menon,L-102,lecture
";
        import_csv(&pool, update.as_bytes()).await.unwrap();

        let week = list_for_section(&pool, "A2").await.unwrap();
        assert_eq!(week.len(), 4);
        let databases = week.iter().find(|e| e.subject_code == "CS302").unwrap();
        assert_eq!(databases.professor_name, "Dr. Menon");

        let view = week_view(&week);
        assert_eq!(view.len(), 6);
        assert_eq!(view[0].classes.len(), 3);
        assert_eq!(view[1].classes.len(), 0);
        assert_eq!(view[2].classes.len(), 1);
    }

    #[tokio::test]
    async fn rejects_rows_outside_the_week() {
        let pool = test_pool().await;
        let csv = "\
section,day_of_week,start_time,end_time,subject_code,subject_name,professor_name,room,class_type
A2,6,08:45,09:45,CS302,Databases,Dr. Iyer,L-101,lecture
";
        let result = import_csv(&pool, csv.as_bytes()).await;
        assert!(matches!(result, Err(AppError::TimetableImport(_))));
    }
}
