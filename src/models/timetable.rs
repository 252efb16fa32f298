// src/models/timetable.rs
use chrono::NaiveTime;
use serde::Deserialize;
use sqlx::FromRow;

pub const DAY_NAMES: [&str; 6] = ["Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday"];

/// One scheduled class slot of a section.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct TimetableEntry {
    pub id: String,
    pub section: String,
    pub day_of_week: i64, // 0 = Monday .. 5 = Saturday
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub subject_code: String,
    pub subject_name: String,
    pub professor_name: String,
    pub room: Option<String>,
    pub class_type: String,
}

impl TimetableEntry {
    pub fn time_range(&self) -> String {
        format!("{}-{}", self.start_time.format("%H:%M"), self.end_time.format("%H:%M"))
    }

    pub fn room_label(&self) -> &str {
        self.room.as_deref().unwrap_or("TBA")
    }
}

/// A CSV row of the institution timetable import.
#[derive(Debug, Clone, Deserialize)]
pub struct TimetableCsvRow {
    pub section: String,
    pub day_of_week: i64,
    pub start_time: String,
    pub end_time: String,
    pub subject_code: String,
    pub subject_name: String,
    pub professor_name: String,
    #[serde(default)]
    pub room: Option<String>,
    pub class_type: String,
}

/// Classes of one weekday, for the week view.
#[derive(Debug, Clone)]
pub struct DaySchedule {
    pub day_name: &'static str,
    pub classes: Vec<TimetableEntry>,
}
