//! Class-timetable grid and schedule-assignment engine.

pub mod routine;
