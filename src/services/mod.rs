// src/services/mod.rs
pub mod attendance_service;
pub mod auth_service;
pub mod holiday_service;
pub mod manual_attendance_service;
pub mod marking_flow;
pub mod marking_window;
pub mod stats_service;
pub mod timetable_service;
pub mod user_service;
