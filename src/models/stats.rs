// src/models/stats.rs
use super::attendance::AttendanceStatus;

/// Count of records per status, over the whole history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusTally {
    pub present: usize,
    pub absent: usize,
    pub cancelled: usize,
    pub swapped: usize,
    pub rescheduled: usize,
}

impl StatusTally {
    pub fn add(&mut self, status: AttendanceStatus) {
        match status {
            AttendanceStatus::Present => self.present += 1,
            AttendanceStatus::Absent => self.absent += 1,
            AttendanceStatus::Cancelled => self.cancelled += 1,
            AttendanceStatus::Swapped => self.swapped += 1,
            AttendanceStatus::Rescheduled => self.rescheduled += 1,
        }
    }

    pub fn total_records(&self) -> usize {
        self.present + self.absent + self.cancelled + self.swapped + self.rescheduled
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ManualStats {
    pub classes_held: i64,
    pub classes_attended: i64,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubjectStats {
    pub subject_code: String,
    pub subject_name: String,
    pub total: usize,
    pub present: usize,
    pub absent: usize,
    pub percentage: f64,
    pub manual: Option<ManualStats>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AttendanceSummary {
    pub overall_percentage: f64,
    pub total: usize,
    pub present: usize,
    pub tally: StatusTally,
    pub subjects: Vec<SubjectStats>,
}

pub fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}
