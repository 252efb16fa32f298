// src/models/mod.rs
pub mod attendance;
pub mod holiday;
pub mod manual_attendance;
pub mod profile;
pub mod stats;
pub mod timetable;
pub mod user;
