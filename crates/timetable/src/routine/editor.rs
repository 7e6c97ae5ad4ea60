//! Create/edit workflow for a single timetable cell.
//!
//! ```text
//! Closed --open--> Open(mode, draft) --save--> Saving --ok--> Closed
//!                      ^                          |
//!                      +---------- err -----------+
//! ```
//!
//! The draft lives only while the editor is open; closing discards it no
//! matter how the last save went.

use super::api::TimetableApi;
use super::error::{TimetableError, TimetableResult};
use super::fence::{Generation, RequestFence};
use super::slot::SlotKey;
use super::teachers::{Resolution, TeacherAvailabilityResolver, TeacherLookupResult};
use super::types::{Schedule, SchedulePayload, ScheduleRecord, Scope, Subject, Teacher, ViewContext};
use tracing::{debug, info, warn};

/// Whether the open cell already has a schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorMode {
    New,
    Edit { schedule_id: i64 },
}

/// In-progress form state. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorDraft {
    pub group_id: Option<i64>,
    pub room_id: Option<i64>,
    pub subject_id: Option<i64>,
    pub teacher_email: Option<String>,
    pub slot: SlotKey,
    pub year: i32,
}

impl EditorDraft {
    /// Draft for an empty cell, pre-filled with the view's fixed dimension.
    pub fn for_empty_cell(context: &ViewContext, slot: SlotKey) -> Self {
        let mut draft = Self {
            group_id: None,
            room_id: None,
            subject_id: None,
            teacher_email: None,
            slot,
            year: context.year,
        };
        match &context.scope {
            Scope::Group(id) => draft.group_id = Some(*id),
            Scope::Room(id) => draft.room_id = Some(*id),
            Scope::Teacher(email) => draft.teacher_email = Some(email.clone()),
        }
        draft
    }

    /// Draft seeded from an existing schedule.
    pub fn from_schedule(schedule: &Schedule, year: i32) -> Self {
        Self {
            group_id: Some(schedule.group_id),
            room_id: Some(schedule.room_id),
            subject_id: Some(schedule.subject_id),
            teacher_email: Some(schedule.teacher_email.clone()),
            slot: schedule.slot,
            year: schedule.year.unwrap_or(year),
        }
    }

    /// Fields the backend requires that are still unset.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.group_id.is_none() {
            missing.push("group");
        }
        if self.room_id.is_none() {
            missing.push("room");
        }
        if self.subject_id.is_none() {
            missing.push("subject");
        }
        if self.teacher_email.as_deref().map_or(true, |e| e.trim().is_empty()) {
            missing.push("teacher");
        }
        missing
    }

    /// The request body, or the list of unset fields.
    pub fn to_payload(&self) -> TimetableResult<SchedulePayload> {
        match (self.group_id, self.room_id, self.subject_id, &self.teacher_email) {
            (Some(group_id), Some(room_id), Some(subject_id), Some(email)) if !email.trim().is_empty() => {
                Ok(SchedulePayload {
                    group_id,
                    room_id,
                    subject_id,
                    teacher_email: email.trim().to_string(),
                    time_slot: self.slot.to_wire(),
                    year: self.year,
                })
            }
            _ => Err(TimetableError::IncompleteDraft {
                missing: self.missing_fields(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorState {
    Closed,
    Open {
        mode: EditorMode,
        draft: EditorDraft,
        /// Message from the last failed save
        error: Option<String>,
    },
    Saving {
        mode: EditorMode,
        draft: EditorDraft,
    },
}

impl EditorState {
    pub fn name(&self) -> &'static str {
        match self {
            EditorState::Closed => "closed",
            EditorState::Open { .. } => "open",
            EditorState::Saving { .. } => "saving",
        }
    }
}

/// A save that has been issued and not yet answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveRequest {
    pub mode: EditorMode,
    pub payload: SchedulePayload,
    generation: Generation,
}

impl SaveRequest {
    /// Sends the request: PUT for an existing schedule, POST otherwise.
    pub async fn send(self, api: &dyn TimetableApi) -> SaveResult {
        let outcome = match self.mode {
            EditorMode::Edit { schedule_id } => api.update_schedule(schedule_id, &self.payload).await,
            EditorMode::New => api.create_schedule(&self.payload).await,
        };
        SaveResult {
            request: self,
            outcome,
        }
    }
}

#[derive(Debug)]
pub struct SaveResult {
    pub request: SaveRequest,
    pub outcome: TimetableResult<ScheduleRecord>,
}

/// A successful save, for the owner of the schedule list to apply.
#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    /// Replace the entry with this id
    Updated {
        schedule_id: i64,
        payload: SchedulePayload,
        confirmed: ScheduleRecord,
    },
    /// Re-fetch the scoped list
    Created {
        payload: SchedulePayload,
        confirmed: ScheduleRecord,
    },
}

#[derive(Debug)]
pub struct ScheduleEditor {
    state: EditorState,
    resolver: TeacherAvailabilityResolver,
    /// Drop the selected teacher if the next resolved list excludes them
    prune_teacher: bool,
    saves: RequestFence,
}

impl Default for ScheduleEditor {
    fn default() -> Self {
        Self::new()
    }
}

impl ScheduleEditor {
    pub fn new() -> Self {
        Self {
            state: EditorState::Closed,
            resolver: TeacherAvailabilityResolver::new(),
            prune_teacher: false,
            saves: RequestFence::new(),
        }
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn is_open(&self) -> bool {
        !matches!(self.state, EditorState::Closed)
    }

    pub fn mode(&self) -> Option<EditorMode> {
        match &self.state {
            EditorState::Closed => None,
            EditorState::Open { mode, .. } | EditorState::Saving { mode, .. } => Some(*mode),
        }
    }

    pub fn draft(&self) -> Option<&EditorDraft> {
        match &self.state {
            EditorState::Closed => None,
            EditorState::Open { draft, .. } | EditorState::Saving { draft, .. } => Some(draft),
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.state {
            EditorState::Open { error, .. } => error.as_deref(),
            _ => None,
        }
    }

    /// Teacher options for the current subject.
    pub fn teacher_options(&self) -> &[Teacher] {
        self.resolver.teachers()
    }

    /// Opens a cell.
    ///
    /// `editable` is the view's edit right; without it the editor stays
    /// closed. An occupied cell opens in edit mode and starts resolving the
    /// teachers for its subject; an empty one opens in new mode with no
    /// teacher options.
    pub fn open(
        &mut self,
        context: &ViewContext,
        editable: bool,
        slot: SlotKey,
        occupant: Option<&Schedule>,
        subjects: &[Subject],
    ) -> TimetableResult<Resolution> {
        if !editable {
            debug!(context = %context, slot = %slot, "Ignoring open on read-only view");
            return Err(TimetableError::NotEditable {
                context: context.scope.kind().to_string(),
            });
        }
        if let EditorState::Saving { .. } = self.state {
            return Err(self.invalid("open a cell"));
        }

        self.prune_teacher = false;
        let (mode, draft, resolution) = match occupant {
            Some(schedule) => {
                let draft = EditorDraft::from_schedule(schedule, context.year);
                let resolution = self.resolver.begin(draft.subject_id, subjects);
                (
                    EditorMode::Edit {
                        schedule_id: schedule.id,
                    },
                    draft,
                    resolution,
                )
            }
            None => {
                self.resolver.clear();
                (
                    EditorMode::New,
                    EditorDraft::for_empty_cell(context, slot),
                    Resolution::Ready,
                )
            }
        };

        info!(slot = %slot, mode = ?mode, "Editor opened");
        self.state = EditorState::Open {
            mode,
            draft,
            error: None,
        };
        Ok(resolution)
    }

    /// Changes the subject and restarts teacher resolution for it.
    pub fn set_subject(
        &mut self,
        subject_id: Option<i64>,
        subjects: &[Subject],
    ) -> TimetableResult<Resolution> {
        self.draft_mut("change the subject")?.subject_id = subject_id;
        let resolution = self.resolver.begin(subject_id, subjects);
        self.prune_teacher = true;
        if resolution == Resolution::Ready {
            self.prune_ineligible_teacher();
        }
        Ok(resolution)
    }

    /// Applies a finished teacher lookup.
    pub fn apply_teachers(&mut self, result: TeacherLookupResult) -> TimetableResult<bool> {
        let applied = self.resolver.apply(result);
        if matches!(applied, Ok(true) | Err(_)) {
            self.prune_ineligible_teacher();
        }
        applied
    }

    pub fn set_teacher(&mut self, email: Option<String>) -> TimetableResult<()> {
        self.draft_mut("change the teacher")?.teacher_email = email;
        Ok(())
    }

    pub fn set_room(&mut self, room_id: Option<i64>) -> TimetableResult<()> {
        self.draft_mut("change the room")?.room_id = room_id;
        Ok(())
    }

    pub fn set_group(&mut self, group_id: Option<i64>) -> TimetableResult<()> {
        self.draft_mut("change the group")?.group_id = group_id;
        Ok(())
    }

    /// Validates the draft and moves to `Saving`.
    ///
    /// An incomplete draft keeps the editor open with the error shown and
    /// issues nothing.
    pub fn begin_save(&mut self) -> TimetableResult<SaveRequest> {
        let EditorState::Open { mode, draft, error } = &mut self.state else {
            return Err(TimetableError::InvalidTransition {
                from: self.state.name(),
                action: "save",
            });
        };

        let payload = match draft.to_payload() {
            Ok(payload) => payload,
            Err(e) => {
                *error = Some(e.user_message());
                return Err(e);
            }
        };
        let mode = *mode;
        let draft = draft.clone();
        let request = SaveRequest {
            mode,
            payload,
            generation: self.saves.issue(),
        };

        debug!(
            mode = ?request.mode,
            slot = %draft.slot,
            generation = %request.generation,
            "Saving schedule"
        );
        self.state = EditorState::Saving {
            mode: request.mode,
            draft,
        };
        Ok(request)
    }

    /// Applies the answer to a save.
    ///
    /// On success the editor closes and the outcome is handed back for the
    /// schedule list. On failure it reopens with the server's message and
    /// the list must be left alone. The editor state is only touched by the
    /// answer to the save it is currently waiting on.
    pub fn finish_save(&mut self, result: SaveResult) -> TimetableResult<SaveOutcome> {
        let SaveResult { request, outcome } = result;
        let saving = matches!(self.state, EditorState::Saving { .. })
            && self.saves.is_current(request.generation);
        if !saving {
            debug!(generation = %request.generation, "Save answered after the editor moved on");
        }

        match outcome {
            Ok(confirmed) => {
                info!(mode = ?request.mode, schedule_id = confirmed.id, "Schedule saved");
                if saving {
                    self.close();
                }
                Ok(match request.mode {
                    EditorMode::Edit { schedule_id } => SaveOutcome::Updated {
                        schedule_id,
                        payload: request.payload,
                        confirmed,
                    },
                    EditorMode::New => SaveOutcome::Created {
                        payload: request.payload,
                        confirmed,
                    },
                })
            }
            Err(e) => {
                warn!(mode = ?request.mode, error = %e, "Schedule save failed");
                if saving {
                    let previous = std::mem::replace(&mut self.state, EditorState::Closed);
                    if let EditorState::Saving { mode, draft } = previous {
                        self.state = EditorState::Open {
                            mode,
                            draft,
                            error: Some(e.user_message()),
                        };
                    }
                }
                Err(e)
            }
        }
    }

    /// Issues the save and waits for it.
    pub async fn save(&mut self, api: &dyn TimetableApi) -> TimetableResult<SaveOutcome> {
        let request = self.begin_save()?;
        let result = request.send(api).await;
        self.finish_save(result)
    }

    /// Closes the editor and discards the draft.
    pub fn close(&mut self) {
        if self.is_open() {
            debug!("Editor closed");
        }
        self.state = EditorState::Closed;
        self.resolver.clear();
        self.prune_teacher = false;
    }

    fn draft_mut(&mut self, action: &'static str) -> TimetableResult<&mut EditorDraft> {
        match &mut self.state {
            EditorState::Open { draft, .. } => Ok(draft),
            other => Err(TimetableError::InvalidTransition {
                from: other.name(),
                action,
            }),
        }
    }

    fn prune_ineligible_teacher(&mut self) {
        if !self.prune_teacher {
            return;
        }
        self.prune_teacher = false;

        let resolver = &self.resolver;
        if let EditorState::Open { draft, .. } = &mut self.state {
            let keep = draft
                .teacher_email
                .as_deref()
                .map_or(true, |email| resolver.is_eligible(email));
            if !keep {
                debug!(teacher = ?draft.teacher_email, "Clearing teacher not eligible for subject");
                draft.teacher_email = None;
            }
        }
    }

    fn invalid(&self, action: &'static str) -> TimetableError {
        TimetableError::InvalidTransition {
            from: self.state.name(),
            action,
        }
    }
}
