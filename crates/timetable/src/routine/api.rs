//! The routine API as seen by the engine.
//!
//! [`TimetableApi`] is the seam between the engine and the backend: the
//! reqwest client in [`super::client`] implements it for real use, tests
//! implement it in memory.

use super::error::TimetableResult;
use super::types::{
    Room, SchedulePayload, ScheduleRecord, Scope, Subject, Teacher, ViewContext,
};
use async_trait::async_trait;

/// Fetch parameters for the scoped schedule listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleQuery {
    /// Path segments below the base URL, e.g. `["schedules", "group", "5"]`
    pub segments: Vec<String>,
    pub year: i32,
    /// Whether the backend only serves this listing to signed-in users
    pub requires_auth: bool,
}

impl ScheduleQuery {
    pub fn for_context(context: &ViewContext) -> Self {
        let (kind, id, requires_auth) = match &context.scope {
            Scope::Group(id) => ("group", id.to_string(), false),
            Scope::Room(id) => ("room", id.to_string(), false),
            Scope::Teacher(email) => ("teacher", email.clone(), true),
        };

        Self {
            segments: vec!["schedules".to_string(), kind.to_string(), id],
            year: context.year,
            requires_auth,
        }
    }
}

#[async_trait]
pub trait TimetableApi: Send + Sync {
    /// `GET /schedules/{group|room|teacher}/:id?year=`
    async fn schedules(&self, query: &ScheduleQuery) -> TimetableResult<Vec<ScheduleRecord>>;

    /// `GET /subjects`, all pages
    async fn subjects(&self) -> TimetableResult<Vec<Subject>>;

    /// `GET /rooms`, all pages
    async fn rooms(&self) -> TimetableResult<Vec<Room>>;

    /// `GET /teachers`
    async fn teachers(&self) -> TimetableResult<Vec<Teacher>>;

    /// `GET /subject/:id/teachers`
    async fn subject_teachers(&self, subject_id: i64) -> TimetableResult<Vec<Teacher>>;

    /// `POST /schedules`
    async fn create_schedule(&self, payload: &SchedulePayload) -> TimetableResult<ScheduleRecord>;

    /// `PUT /schedules/:id`
    async fn update_schedule(
        &self,
        id: i64,
        payload: &SchedulePayload,
    ) -> TimetableResult<ScheduleRecord>;

    /// `GET /years/schedules`
    async fn available_years(&self) -> TimetableResult<Vec<i32>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_per_scope() {
        let query = ScheduleQuery::for_context(&ViewContext::group(5, 2081));
        assert_eq!(query.segments, vec!["schedules", "group", "5"]);
        assert_eq!(query.year, 2081);
        assert!(!query.requires_auth);

        let query = ScheduleQuery::for_context(&ViewContext::room(12, 2080));
        assert_eq!(query.segments, vec!["schedules", "room", "12"]);

        let query = ScheduleQuery::for_context(&ViewContext::teacher("ram@example.edu", 2081));
        assert_eq!(query.segments, vec!["schedules", "teacher", "ram@example.edu"]);
        assert!(query.requires_auth);
    }
}
