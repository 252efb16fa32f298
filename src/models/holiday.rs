// src/models/holiday.rs
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub const DEFAULT_MANUAL_HOLIDAY_NAME: &str = "Manual Holiday";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum HolidayType {
    Official, // institution-wide, read-only
    Manual,   // per-student
}

#[derive(Debug, Clone, FromRow)]
pub struct Holiday {
    pub id: String,
    pub date: NaiveDate,
    pub name: String,
    pub holiday_type: HolidayType,
    pub student_id: Option<String>,
}

impl Holiday {
    pub fn is_manual(&self) -> bool {
        self.holiday_type == HolidayType::Manual
    }
}
