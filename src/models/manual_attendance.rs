// src/models/manual_attendance.rs
use sqlx::FromRow;

/// Student-entered held/attended counts for a subject, kept apart from the
/// counts derived from attendance records.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct ManualAttendance {
    pub id: String,
    pub student_id: String,
    pub subject_code: String,
    pub classes_held: i64,
    pub classes_attended: i64,
}

impl ManualAttendance {
    pub fn percentage(&self) -> f64 {
        if self.classes_held == 0 {
            0.0
        } else {
            self.classes_attended as f64 / self.classes_held as f64 * 100.0
        }
    }
}
