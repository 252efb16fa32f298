// src/services/marking_window.rs
//! When a class can be marked, and whether it is over or running.
//!
//! All comparisons are local wall-clock times on the same day; classes that
//! cross midnight are not supported. Class times are compared at minute
//! precision.
use chrono::{NaiveTime, TimeDelta, Timelike};

/// Which rule decides whether a class may be marked right now.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MarkingWindow {
    /// From the class start until the end of the day.
    #[default]
    OpenEnded,
    /// Only within `minutes` on either side of the class start.
    Bounded { minutes: i64 },
}

impl MarkingWindow {
    pub fn can_mark(&self, start_time: NaiveTime, now: NaiveTime) -> bool {
        let start = to_minute(start_time);
        match *self {
            MarkingWindow::OpenEnded => now >= start && now <= end_of_day(),
            MarkingWindow::Bounded { minutes } => {
                now.signed_duration_since(start).abs() <= TimeDelta::minutes(minutes)
            }
        }
    }

    pub fn label(&self) -> String {
        match self {
            MarkingWindow::OpenEnded => "from class start until end of day".to_string(),
            MarkingWindow::Bounded { minutes } => {
                format!("within {} minutes of class start", minutes)
            }
        }
    }
}

pub fn is_past(end_time: NaiveTime, now: NaiveTime) -> bool {
    now > to_minute(end_time)
}

pub fn is_current(start_time: NaiveTime, end_time: NaiveTime, now: NaiveTime) -> bool {
    now >= to_minute(start_time) && now <= to_minute(end_time)
}

fn end_of_day() -> NaiveTime {
    NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN)
}

fn to_minute(time: NaiveTime) -> NaiveTime {
    NaiveTime::from_hms_opt(time.hour(), time.minute(), 0).unwrap_or(time)
}
