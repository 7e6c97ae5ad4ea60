//! Weekly timetable engine for the routine API.
//!
//! A [`ViewAdapter`] binds a [`TimeSlotGrid`] to one [`ViewContext`] (a
//! group, room or teacher and an academic year), fetches the scoped schedule
//! list through a [`TimetableApi`], resolves each cell via the
//! [`ScheduleIndex`] and drives the [`ScheduleEditor`] for create and edit.

mod api;
mod auth;
mod client;
mod config;
mod editor;
mod error;
mod fence;
mod grid;
mod index;
mod slot;
mod teachers;
mod types;
mod view;
mod year;

pub use api::{ScheduleQuery, TimetableApi};
pub use auth::{AuthContext, AuthHandle, Role};
pub use client::HttpTimetableApi;
pub use config::{AppConfig, ClientConfig, EditPolicy, GridConfig, API_URL_ENV, TOKEN_ENV};
pub use editor::{
    EditorDraft, EditorMode, EditorState, SaveOutcome, SaveRequest, SaveResult, ScheduleEditor,
};
pub use error::{TimetableError, TimetableResult, GENERIC_SAVE_ERROR};
pub use fence::{Generation, RequestFence};
pub use grid::TimeSlotGrid;
pub use index::{
    normalize_records, replace_by_id, CellState, MalformedRecord, ScheduleIndex, SlotConflict,
};
pub use slot::{Day, SlotDetail, SlotKey, TimeSlot};
pub use teachers::{Resolution, TeacherAvailabilityResolver, TeacherLookup, TeacherLookupResult};
pub use types::{
    AvailableYears, DisplayFields, Room, Schedule, SchedulePayload, ScheduleRecord, Scope,
    ScopeKind, Subject, Teacher, ViewContext,
};
pub use view::{
    display_lines, CellView, Notice, NoticeLevel, RefreshResult, RefreshTicket, ViewAdapter,
};
pub use year::{academic_year_on, current_academic_year, default_year};
