// src/models/attendance.rs
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

use super::timetable::TimetableEntry;

/// Recorded disposition of one class on one date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum AttendanceStatus {
    Present,
    Absent,
    Cancelled,
    Swapped,
    Rescheduled,
}

impl AttendanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::Present => "present",
            AttendanceStatus::Absent => "absent",
            AttendanceStatus::Cancelled => "cancelled",
            AttendanceStatus::Swapped => "swapped",
            AttendanceStatus::Rescheduled => "rescheduled",
        }
    }

    /// Cancelled and swapped classes never reach the denominator.
    pub fn is_counted(&self) -> bool {
        !matches!(self, AttendanceStatus::Cancelled | AttendanceStatus::Swapped)
    }

    /// Rescheduled classes count as attended.
    pub fn is_attended(&self) -> bool {
        matches!(self, AttendanceStatus::Present | AttendanceStatus::Rescheduled)
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct AttendanceRecord {
    pub id: String,
    pub student_id: String,
    pub timetable_id: String,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    pub marked_at: Option<DateTime<Utc>>,
    pub modification_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum ModificationType {
    Cancelled,
    Rescheduled,
    Swapped,
}

#[derive(Debug, Clone, FromRow)]
pub struct ClassModification {
    pub id: String,
    pub student_id: String,
    pub original_timetable_id: String,
    pub original_date: NaiveDate,
    pub modification_type: ModificationType,
    pub rescheduled_date: Option<NaiveDate>,
    pub rescheduled_start_time: Option<NaiveTime>,
    pub rescheduled_end_time: Option<NaiveTime>,
    pub rescheduled_room: Option<String>,
    pub notes: Option<String>,
    pub swapped_with_timetable_id: Option<String>,
}

/// Fields of a modification before it is stored (the id is generated on insert).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewModification {
    pub original_timetable_id: String,
    pub original_date: NaiveDate,
    pub kind: ModificationKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModificationKind {
    Cancelled,
    Rescheduled {
        date: NaiveDate,
        start_time: NaiveTime,
        end_time: NaiveTime,
        room: Option<String>,
        notes: Option<String>,
    },
    Swapped {
        swapped_with_timetable_id: String,
    },
}

impl ModificationKind {
    pub fn modification_type(&self) -> ModificationType {
        match self {
            ModificationKind::Cancelled => ModificationType::Cancelled,
            ModificationKind::Rescheduled { .. } => ModificationType::Rescheduled,
            ModificationKind::Swapped { .. } => ModificationType::Swapped,
        }
    }
}

/// A class of today's list joined with the student's recorded status.
#[derive(Debug, Clone)]
pub struct ClassCard {
    pub entry: TimetableEntry,
    pub status: Option<AttendanceStatus>,
    pub modification_id: Option<String>,
    pub can_mark: bool,
    pub is_past: bool,
    pub is_current: bool,
}
