/// Types shared by the timetable engine and the routine API
use super::error::{TimetableError, TimetableResult};
use super::slot::{SlotDetail, SlotKey};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Schedule as returned by the `/schedules/...` endpoints.
///
/// The backend omits zero values, so every field except `id` may be absent.
/// The slot arrives either as the flat `time_slot` string or as the nested
/// `time_slot_detail` object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScheduleRecord {
    pub id: i64,
    #[serde(default)]
    pub group_id: Option<i64>,
    #[serde(default)]
    pub room_id: Option<i64>,
    #[serde(default)]
    pub subject_id: Option<i64>,
    #[serde(default)]
    pub teacher_email: Option<String>,
    #[serde(default)]
    pub time_slot: Option<String>,
    #[serde(default)]
    pub time_slot_detail: Option<SlotDetail>,
    #[serde(default)]
    pub year: Option<i32>,

    #[serde(default)]
    pub teacher_name: Option<String>,
    #[serde(default)]
    pub teacher_designation: Option<String>,
    #[serde(default)]
    pub room_code: Option<String>,
    #[serde(default)]
    pub block_no: Option<String>,
    #[serde(default)]
    pub subject_code: Option<String>,
    #[serde(default)]
    pub subject_name: Option<String>,
    #[serde(default)]
    pub group_name: Option<String>,
}

impl ScheduleRecord {
    /// Decodes whichever slot shape the record carries.
    ///
    /// A record carrying both shapes must have them agree.
    pub fn slot_key(&self) -> TimetableResult<SlotKey> {
        let flat = self
            .time_slot
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(SlotKey::parse_flat)
            .transpose()?;
        let nested = self
            .time_slot_detail
            .as_ref()
            .map(SlotKey::from_detail)
            .transpose()?;

        match (flat, nested) {
            (Some(a), Some(b)) if a != b => Err(TimetableError::InvalidSlot {
                input: self.time_slot.clone().unwrap_or_default(),
                reason: format!("time_slot disagrees with time_slot_detail ({b})"),
            }),
            (Some(key), _) | (None, Some(key)) => Ok(key),
            (None, None) => Err(TimetableError::InvalidSlot {
                input: String::new(),
                reason: format!("schedule {} has no time slot", self.id),
            }),
        }
    }
}

/// Denormalized display fields carried along with a schedule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayFields {
    pub subject_name: Option<String>,
    pub subject_code: Option<String>,
    pub teacher_name: Option<String>,
    pub teacher_designation: Option<String>,
    pub room_code: Option<String>,
    pub block_no: Option<String>,
    pub group_name: Option<String>,
}

impl DisplayFields {
    /// "Designation Name", skipping whichever part is missing.
    pub fn teacher_label(&self) -> Option<String> {
        let parts: Vec<&str> = [&self.teacher_designation, &self.teacher_name]
            .into_iter()
            .filter_map(|p| p.as_deref())
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();
        (!parts.is_empty()).then(|| parts.join(" "))
    }
}

/// A persisted assignment of subject, teacher and room to a group at one slot.
#[derive(Debug, Clone, PartialEq)]
pub struct Schedule {
    pub id: i64,
    pub group_id: i64,
    pub room_id: i64,
    pub subject_id: i64,
    pub teacher_email: String,
    pub slot: SlotKey,
    pub year: Option<i32>,
    pub display: DisplayFields,
}

impl TryFrom<ScheduleRecord> for Schedule {
    type Error = TimetableError;

    fn try_from(record: ScheduleRecord) -> Result<Self, Self::Error> {
        let slot = record.slot_key()?;
        let missing = |field: &str| TimetableError::Decode {
            message: format!("schedule {} has no {field}", record.id),
        };

        Ok(Schedule {
            id: record.id,
            group_id: record.group_id.ok_or_else(|| missing("group_id"))?,
            room_id: record.room_id.ok_or_else(|| missing("room_id"))?,
            subject_id: record.subject_id.ok_or_else(|| missing("subject_id"))?,
            teacher_email: record
                .teacher_email
                .clone()
                .filter(|e| !e.is_empty())
                .ok_or_else(|| missing("teacher_email"))?,
            slot,
            year: record.year,
            display: DisplayFields {
                subject_name: record.subject_name,
                subject_code: record.subject_code,
                teacher_name: record.teacher_name,
                teacher_designation: record.teacher_designation,
                room_code: record.room_code,
                block_no: record.block_no,
                group_name: record.group_name,
            },
        })
    }
}

/// A teacher, as listed by `/teachers` or `/subject/:id/teachers`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Teacher {
    #[serde(alias = "teacher_email")]
    pub email: String,
    #[serde(default, alias = "teacher_name")]
    pub name: String,
    #[serde(default, alias = "teacher_designation")]
    pub designation: String,
    #[serde(default)]
    pub department: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub subject_code: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    /// Eligible teachers when the listing embeds them
    #[serde(default)]
    pub teachers: Option<Vec<Teacher>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: i64,
    #[serde(default)]
    pub room_code: String,
    #[serde(default)]
    pub block_no: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub floor_no: Option<i32>,
    #[serde(default)]
    pub screen_available: Option<bool>,
}

/// Request body for `POST /schedules` and `PUT /schedules/:id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulePayload {
    pub group_id: i64,
    pub room_id: i64,
    pub subject_id: i64,
    pub teacher_email: String,
    pub time_slot: String,
    pub year: i32,
}

/// Body of `GET /years/schedules`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AvailableYears {
    #[serde(default)]
    pub years: Vec<i32>,
}

/// Which dimension a grid view is scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeKind {
    Group,
    Room,
    Teacher,
}

impl fmt::Display for ScopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScopeKind::Group => "group",
            ScopeKind::Room => "room",
            ScopeKind::Teacher => "teacher",
        };
        f.write_str(name)
    }
}

/// The fixed dimension of a grid view.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scope {
    Group(i64),
    Room(i64),
    Teacher(String),
}

impl Scope {
    pub fn kind(&self) -> ScopeKind {
        match self {
            Scope::Group(_) => ScopeKind::Group,
            Scope::Room(_) => ScopeKind::Room,
            Scope::Teacher(_) => ScopeKind::Teacher,
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Group(id) => write!(f, "group {id}"),
            Scope::Room(id) => write!(f, "room {id}"),
            Scope::Teacher(email) => write!(f, "teacher {email}"),
        }
    }
}

/// Scope plus academic year; decides what is fetched and whether editing is allowed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ViewContext {
    pub scope: Scope,
    pub year: i32,
}

impl ViewContext {
    pub fn new(scope: Scope, year: i32) -> Self {
        Self { scope, year }
    }

    pub fn group(id: i64, year: i32) -> Self {
        Self::new(Scope::Group(id), year)
    }

    pub fn room(id: i64, year: i32) -> Self {
        Self::new(Scope::Room(id), year)
    }

    pub fn teacher(email: impl Into<String>, year: i32) -> Self {
        Self::new(Scope::Teacher(email.into()), year)
    }

    /// True if a scoped fetch of this context would list `schedule`.
    /// A schedule without a year is taken to belong to any year.
    pub fn includes(&self, schedule: &Schedule) -> bool {
        let in_scope = match &self.scope {
            Scope::Group(id) => schedule.group_id == *id,
            Scope::Room(id) => schedule.room_id == *id,
            Scope::Teacher(email) => schedule.teacher_email == *email,
        };
        in_scope && schedule.year.map_or(true, |year| year == self.year)
    }
}

impl fmt::Display for ViewContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.scope, self.year)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_with_flat_slot() {
        let record: ScheduleRecord = serde_json::from_value(json!({
            "id": 3,
            "group_id": 1,
            "room_id": 4,
            "subject_id": 7,
            "teacher_email": "ram@example.edu",
            "time_slot": "MON-16:15-17:55",
            "subject_name": "Compiler Design",
            "teacher_name": "Ram Sharma",
            "teacher_designation": "Dr.",
            "room_code": "B-201"
        }))
        .unwrap();

        let schedule = Schedule::try_from(record).unwrap();
        assert_eq!(schedule.slot.to_wire(), "MON-16:15-17:55");
        assert_eq!(schedule.display.teacher_label().as_deref(), Some("Dr. Ram Sharma"));
    }

    #[test]
    fn test_record_with_conflicting_shapes() {
        let record = ScheduleRecord {
            id: 9,
            time_slot: Some("MON-16:15-17:55".to_string()),
            time_slot_detail: Some(SlotDetail {
                day: "TUE".to_string(),
                start_time: "16:15:00".to_string(),
                end_time: "17:55:00".to_string(),
            }),
            ..Default::default()
        };
        assert!(matches!(
            record.slot_key(),
            Err(TimetableError::InvalidSlot { .. })
        ));
    }

    #[test]
    fn test_record_missing_dimension_is_rejected() {
        let record = ScheduleRecord {
            id: 2,
            room_id: Some(1),
            subject_id: Some(1),
            teacher_email: Some("a@b.c".to_string()),
            time_slot: Some("SUN-16:15-17:55".to_string()),
            ..Default::default()
        };
        let err = Schedule::try_from(record).unwrap_err();
        assert_eq!(
            err,
            TimetableError::Decode {
                message: "schedule 2 has no group_id".to_string()
            }
        );
    }

    #[test]
    fn test_teacher_accepts_prefixed_fields() {
        let teacher: Teacher = serde_json::from_value(json!({
            "teacher_email": "sita@example.edu",
            "teacher_name": "Sita Karki"
        }))
        .unwrap();
        assert_eq!(teacher.email, "sita@example.edu");
        assert_eq!(teacher.designation, "");
    }

    #[test]
    fn test_scope_kind_serde() {
        let kinds: Vec<ScopeKind> = serde_json::from_value(json!(["group", "room"])).unwrap();
        assert_eq!(kinds, vec![ScopeKind::Group, ScopeKind::Room]);
    }

    #[test]
    fn test_context_includes_by_scope_and_year() {
        let schedule = Schedule {
            id: 1,
            group_id: 5,
            room_id: 2,
            subject_id: 7,
            teacher_email: "ram@example.edu".to_string(),
            slot: "SUN-16:15-17:55".parse().unwrap(),
            year: Some(2081),
            display: DisplayFields::default(),
        };

        assert!(ViewContext::group(5, 2081).includes(&schedule));
        assert!(!ViewContext::group(6, 2081).includes(&schedule));
        assert!(ViewContext::room(2, 2081).includes(&schedule));
        assert!(!ViewContext::room(3, 2081).includes(&schedule));
        assert!(ViewContext::teacher("ram@example.edu", 2081).includes(&schedule));
        assert!(!ViewContext::teacher("sita@example.edu", 2081).includes(&schedule));
        assert!(!ViewContext::group(5, 2082).includes(&schedule));

        let undated = Schedule {
            year: None,
            ..schedule
        };
        assert!(ViewContext::group(5, 2082).includes(&undated));
    }
}
