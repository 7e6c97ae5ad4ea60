//! In-memory routine API used by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;
use timetable::routine::{
    AuthContext, AuthHandle, Room, Role, SchedulePayload, ScheduleQuery, ScheduleRecord, Subject,
    Teacher, TimetableApi, TimetableError, TimetableResult,
};

pub const YEAR: i32 = 2081;

/// Stores schedules like the backend does and records every call.
#[derive(Default)]
pub struct FakeApi {
    pub records: Mutex<Vec<ScheduleRecord>>,
    pub subjects: Vec<Subject>,
    pub rooms: Vec<Room>,
    pub teachers: Vec<Teacher>,
    pub subject_teachers: HashMap<i64, Vec<Teacher>>,
    pub save_error: Mutex<Option<TimetableError>>,
    pub rooms_error: Option<TimetableError>,
    calls: Mutex<Vec<String>>,
    next_id: AtomicI64,
}

impl FakeApi {
    pub fn new(records: Vec<ScheduleRecord>) -> Self {
        Self {
            records: Mutex::new(records),
            subjects: vec![subject(7, "Compiler Design"), subject(8, "Data Mining")],
            rooms: vec![room(2, "B-201"), room(3, "B-305")],
            teachers: vec![
                teacher("ram@example.edu", "Ram Sharma"),
                teacher("sita@example.edu", "Sita Karki"),
            ],
            subject_teachers: HashMap::from([
                (7, vec![teacher("ram@example.edu", "Ram Sharma")]),
                (8, vec![teacher("sita@example.edu", "Sita Karki")]),
            ]),
            next_id: AtomicI64::new(100),
            ..Default::default()
        }
    }

    pub fn fail_saves_with(&self, error: TimetableError) {
        *self.save_error.lock().unwrap() = Some(error);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Calls whose description starts with `prefix`.
    pub fn count(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn take_save_error(&self) -> Option<TimetableError> {
        self.save_error.lock().unwrap().take()
    }
}

#[async_trait]
impl TimetableApi for FakeApi {
    async fn schedules(&self, query: &ScheduleQuery) -> TimetableResult<Vec<ScheduleRecord>> {
        let path = query.segments.join("/");
        self.record(format!("GET {path}?year={}", query.year));

        let kind = query.segments[1].as_str();
        let id = query.segments[2].as_str();
        let records = self.records.lock().unwrap();
        Ok(records
            .iter()
            .filter(|r| r.year.map_or(true, |y| y == query.year))
            .filter(|r| match kind {
                "group" => r.group_id.map(|g| g.to_string()).as_deref() == Some(id),
                "room" => r.room_id.map(|g| g.to_string()).as_deref() == Some(id),
                _ => r.teacher_email.as_deref() == Some(id),
            })
            .cloned()
            .collect())
    }

    async fn subjects(&self) -> TimetableResult<Vec<Subject>> {
        self.record("GET subjects".to_string());
        Ok(self.subjects.clone())
    }

    async fn rooms(&self) -> TimetableResult<Vec<Room>> {
        self.record("GET rooms".to_string());
        match &self.rooms_error {
            Some(e) => Err(e.clone()),
            None => Ok(self.rooms.clone()),
        }
    }

    async fn teachers(&self) -> TimetableResult<Vec<Teacher>> {
        self.record("GET teachers".to_string());
        Ok(self.teachers.clone())
    }

    async fn subject_teachers(&self, subject_id: i64) -> TimetableResult<Vec<Teacher>> {
        self.record(format!("GET subject/{subject_id}/teachers"));
        Ok(self.subject_teachers.get(&subject_id).cloned().unwrap_or_default())
    }

    async fn create_schedule(&self, payload: &SchedulePayload) -> TimetableResult<ScheduleRecord> {
        self.record("POST schedules".to_string());
        if let Some(e) = self.take_save_error() {
            return Err(e);
        }
        let record = from_payload(self.next_id.fetch_add(1, Ordering::Relaxed), payload);
        self.records.lock().unwrap().push(record.clone());
        Ok(record)
    }

    async fn update_schedule(
        &self,
        id: i64,
        payload: &SchedulePayload,
    ) -> TimetableResult<ScheduleRecord> {
        self.record(format!("PUT schedules/{id}"));
        if let Some(e) = self.take_save_error() {
            return Err(e);
        }
        let record = from_payload(id, payload);
        let mut records = self.records.lock().unwrap();
        match records.iter_mut().find(|r| r.id == id) {
            Some(existing) => *existing = record.clone(),
            None => {
                return Err(TimetableError::Api {
                    status: 404,
                    message: "schedule not found".to_string(),
                })
            }
        }
        Ok(record)
    }

    async fn available_years(&self) -> TimetableResult<Vec<i32>> {
        self.record("GET years/schedules".to_string());
        Ok(vec![YEAR - 1, YEAR])
    }
}

/// The backend answers saves without display fields.
fn from_payload(id: i64, payload: &SchedulePayload) -> ScheduleRecord {
    ScheduleRecord {
        id,
        group_id: Some(payload.group_id),
        room_id: Some(payload.room_id),
        subject_id: Some(payload.subject_id),
        teacher_email: Some(payload.teacher_email.clone()),
        time_slot: Some(payload.time_slot.clone()),
        year: Some(payload.year),
        ..Default::default()
    }
}

pub fn subject(id: i64, name: &str) -> Subject {
    Subject {
        id,
        name: name.to_string(),
        subject_code: None,
        department: None,
        teachers: None,
    }
}

pub fn room(id: i64, code: &str) -> Room {
    Room {
        id,
        room_code: code.to_string(),
        block_no: None,
        department: None,
        floor_no: None,
        screen_available: None,
    }
}

pub fn teacher(email: &str, name: &str) -> Teacher {
    Teacher {
        email: email.to_string(),
        name: name.to_string(),
        designation: "Lecturer".to_string(),
        department: None,
    }
}

/// A schedule record with the flat slot encoding.
pub fn record(id: i64, group_id: i64, room_id: i64, subject_id: i64, slot: &str) -> ScheduleRecord {
    ScheduleRecord {
        id,
        group_id: Some(group_id),
        room_id: Some(room_id),
        subject_id: Some(subject_id),
        teacher_email: Some("ram@example.edu".to_string()),
        time_slot: Some(slot.to_string()),
        year: Some(YEAR),
        subject_name: Some(format!("Subject {subject_id}")),
        room_code: Some(format!("R{room_id}")),
        group_name: Some(format!("Group {group_id}")),
        ..Default::default()
    }
}

pub fn admin() -> AuthHandle {
    AuthHandle::signed_in(AuthContext::new("admin@example.edu", Role::Admin, "admin-token"))
}
