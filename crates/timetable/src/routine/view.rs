//! One grid view bound to a [`ViewContext`].
//!
//! [`ViewAdapter`] owns everything a rendered timetable needs: the fetched
//! schedule list and its index, the reference lists used by the editor, the
//! editor itself and a queue of user-facing notices. Every suspension point
//! is split into a `begin_*` step that only touches local state, a future
//! that only talks to the API, and an `apply`/`finish` step that folds the
//! answer back in. Refresh answers carry a generation and are dropped when a
//! newer refresh has been issued since.

use super::api::{ScheduleQuery, TimetableApi};
use super::auth::AuthHandle;
use super::config::EditPolicy;
use super::editor::{SaveOutcome, SaveRequest, SaveResult, ScheduleEditor};
use super::error::{TimetableError, TimetableResult};
use super::fence::{Generation, RequestFence};
use super::grid::TimeSlotGrid;
use super::index::{normalize_records, replace_by_id, CellState, MalformedRecord, ScheduleIndex};
use super::slot::SlotKey;
use super::teachers::{Resolution, TeacherLookupResult};
use super::types::{
    Room, Schedule, SchedulePayload, ScheduleRecord, ScopeKind, Subject, Teacher, ViewContext,
};
use super::year::current_academic_year;
use std::fmt;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl fmt::Display for NoticeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NoticeLevel::Info => "info",
            NoticeLevel::Success => "success",
            NoticeLevel::Warning => "warning",
            NoticeLevel::Error => "error",
        };
        f.write_str(name)
    }
}

/// Non-blocking message for the user (a toast in a UI).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

/// A refresh that has been issued for one context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshTicket {
    context: ViewContext,
    generation: Generation,
    include_teachers: bool,
}

impl RefreshTicket {
    pub fn context(&self) -> &ViewContext {
        &self.context
    }

    /// Fetches the schedule list and reference data concurrently.
    pub async fn fetch(self, api: &dyn TimetableApi) -> RefreshResult {
        let query = ScheduleQuery::for_context(&self.context);
        let include_teachers = self.include_teachers;
        let teachers = async move {
            if include_teachers {
                Some(api.teachers().await)
            } else {
                None
            }
        };

        let (schedules, subjects, rooms, teachers) =
            futures::join!(api.schedules(&query), api.subjects(), api.rooms(), teachers);

        RefreshResult {
            ticket: self,
            schedules,
            subjects,
            rooms,
            teachers,
        }
    }
}

#[derive(Debug)]
pub struct RefreshResult {
    pub ticket: RefreshTicket,
    pub schedules: TimetableResult<Vec<ScheduleRecord>>,
    pub subjects: TimetableResult<Vec<Subject>>,
    pub rooms: TimetableResult<Vec<Room>>,
    /// `None` when the view was read-only at issue time
    pub teachers: Option<TimetableResult<Vec<Teacher>>>,
}

/// A resolved cell, ready to render.
#[derive(Debug, Clone, PartialEq)]
pub struct CellView<'a> {
    pub slot: SlotKey,
    pub state: CellState<'a>,
    /// Display lines for the view's scope; empty for an empty cell
    pub lines: Vec<String>,
}

impl CellView<'_> {
    pub fn is_empty(&self) -> bool {
        matches!(self.state, CellState::Empty)
    }
}

#[derive(Debug)]
pub struct ViewAdapter {
    context: ViewContext,
    auth: AuthHandle,
    policy: EditPolicy,
    grid: TimeSlotGrid,
    schedules: Vec<Schedule>,
    malformed: Vec<MalformedRecord>,
    index: ScheduleIndex,
    subjects: Vec<Subject>,
    rooms: Vec<Room>,
    teachers: Vec<Teacher>,
    editor: ScheduleEditor,
    fence: RequestFence,
    loading: bool,
    notices: Vec<Notice>,
}

impl ViewAdapter {
    pub fn new(context: ViewContext, grid: TimeSlotGrid, policy: EditPolicy, auth: AuthHandle) -> Self {
        Self {
            context,
            auth,
            policy,
            grid,
            schedules: Vec::new(),
            malformed: Vec::new(),
            index: ScheduleIndex::default(),
            subjects: Vec::new(),
            rooms: Vec::new(),
            teachers: Vec::new(),
            editor: ScheduleEditor::new(),
            fence: RequestFence::new(),
            loading: false,
            notices: Vec::new(),
        }
    }

    pub fn context(&self) -> &ViewContext {
        &self.context
    }

    pub fn grid(&self) -> &TimeSlotGrid {
        &self.grid
    }

    pub fn schedules(&self) -> &[Schedule] {
        &self.schedules
    }

    /// Records dropped by the last refresh because they could not be decoded.
    pub fn malformed(&self) -> &[MalformedRecord] {
        &self.malformed
    }

    pub fn index(&self) -> &ScheduleIndex {
        &self.index
    }

    pub fn subjects(&self) -> &[Subject] {
        &self.subjects
    }

    pub fn rooms(&self) -> &[Room] {
        &self.rooms
    }

    /// All teachers; only fetched while the view is editable.
    pub fn teachers(&self) -> &[Teacher] {
        &self.teachers
    }

    pub fn editor(&self) -> &ScheduleEditor {
        &self.editor
    }

    /// Direct access for draft fields that need no coordination.
    pub fn editor_mut(&mut self) -> &mut ScheduleEditor {
        &mut self.editor
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn drain_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Parameters for the scoped schedule listing.
    pub fn query(&self) -> ScheduleQuery {
        ScheduleQuery::for_context(&self.context)
    }

    /// Whether cells of this view can be opened in the editor right now.
    pub fn is_editable(&self) -> bool {
        let role = self.auth.current().map(|ctx| ctx.role);
        self.policy.allows(self.context.scope.kind(), role)
    }

    /// Switches to a new context. Returns the refresh to run, or `None` if
    /// nothing changed.
    ///
    /// The editor is closed and any refresh for the old context becomes
    /// stale. The previous grid stays visible until the new data arrives.
    pub fn set_context(&mut self, context: ViewContext) -> Option<RefreshTicket> {
        if context == self.context {
            return None;
        }
        info!(from = %self.context, to = %context, "View context changed");
        self.context = context;
        self.editor.close();
        Some(self.begin_refresh())
    }

    pub async fn change_context(&mut self, api: &dyn TimetableApi, context: ViewContext) {
        if let Some(ticket) = self.set_context(context) {
            let result = ticket.fetch(api).await;
            self.apply_refresh(result);
        }
    }

    /// Issues a refresh for the current context, superseding earlier ones.
    pub fn begin_refresh(&mut self) -> RefreshTicket {
        let generation = self.fence.issue();
        self.loading = true;
        let ticket = RefreshTicket {
            context: self.context.clone(),
            generation,
            include_teachers: self.is_editable(),
        };
        debug!(context = %ticket.context, generation = %generation, "Refresh issued");
        ticket
    }

    /// Applies a refresh answer. Returns false if it was stale and dropped.
    ///
    /// Each listing that failed is replaced by an empty one and reported as
    /// an error notice; the rest of the answer still applies.
    pub fn apply_refresh(&mut self, result: RefreshResult) -> bool {
        let RefreshResult {
            ticket,
            schedules,
            subjects,
            rooms,
            teachers,
        } = result;

        if !self.fence.is_current(ticket.generation) || ticket.context != self.context {
            debug!(
                context = %ticket.context,
                generation = %ticket.generation,
                "Discarding stale refresh"
            );
            return false;
        }
        self.loading = false;

        let records = self.listing_or_empty("schedules", schedules);
        self.subjects = self.listing_or_empty("subjects", subjects);
        self.rooms = self.listing_or_empty("rooms", rooms);
        self.teachers = match teachers {
            Some(teachers) => self.listing_or_empty("teachers", teachers),
            None => Vec::new(),
        };

        let (schedules, malformed) = normalize_records(records);
        for record in &malformed {
            self.notify(
                NoticeLevel::Warning,
                format!("Inconsistent data: schedule {} skipped ({})", record.id, record.error),
            );
        }
        self.schedules = schedules;
        self.malformed = malformed;
        self.rebuild_index();
        self.report_inconsistencies();

        info!(
            context = %self.context,
            schedules = self.schedules.len(),
            subjects = self.subjects.len(),
            rooms = self.rooms.len(),
            "Refresh applied"
        );
        true
    }

    /// Refreshes the current context and waits for the answer.
    pub async fn refresh(&mut self, api: &dyn TimetableApi) -> bool {
        let result = self.begin_refresh().fetch(api).await;
        self.apply_refresh(result)
    }

    /// Years that have schedules, newest first; the current academic year if
    /// none are known.
    pub async fn available_years(&mut self, api: &dyn TimetableApi) -> Vec<i32> {
        let mut years = match api.available_years().await {
            Ok(years) => years,
            Err(e) => {
                warn!(error = %e, "Failed to fetch available years");
                self.notify(NoticeLevel::Warning, format!("Failed to fetch years: {e}"));
                Vec::new()
            }
        };
        years.sort_unstable_by(|a, b| b.cmp(a));
        years.dedup();
        if years.is_empty() {
            years.push(current_academic_year());
        }
        years
    }

    /// The cell at `slot` with the display lines for this view's scope.
    pub fn cell_view(&self, slot: SlotKey) -> CellView<'_> {
        let state = self.index.cell(&slot);
        let lines = state
            .schedule()
            .map(|schedule| display_lines(self.context.scope.kind(), schedule))
            .unwrap_or_default();
        CellView { slot, state, lines }
    }

    /// Opens `slot` in the editor.
    ///
    /// The returned resolution, if pending, must be run and handed to
    /// [`Self::apply_teachers`].
    pub fn begin_open(&mut self, slot: SlotKey) -> TimetableResult<Resolution> {
        if !self.grid.contains(&slot) {
            return Err(TimetableError::InvalidSlot {
                input: slot.to_wire(),
                reason: "not a cell of this grid".to_string(),
            });
        }
        let editable = self.is_editable();
        let occupant = self.index.lookup(&slot).cloned();
        self.editor
            .open(&self.context, editable, slot, occupant.as_ref(), &self.subjects)
    }

    pub async fn open_cell(&mut self, api: &dyn TimetableApi, slot: SlotKey) -> TimetableResult<()> {
        let resolution = self.begin_open(slot)?;
        self.resolve_teachers(api, resolution).await
    }

    /// Changes the draft's subject.
    pub fn begin_subject(&mut self, subject_id: Option<i64>) -> TimetableResult<Resolution> {
        self.editor.set_subject(subject_id, &self.subjects)
    }

    pub async fn select_subject(
        &mut self,
        api: &dyn TimetableApi,
        subject_id: Option<i64>,
    ) -> TimetableResult<()> {
        let resolution = self.begin_subject(subject_id)?;
        self.resolve_teachers(api, resolution).await
    }

    /// Applies a teacher lookup; a failed one is reported as a notice.
    pub fn apply_teachers(&mut self, result: TeacherLookupResult) -> TimetableResult<bool> {
        let applied = self.editor.apply_teachers(result);
        if let Err(e) = &applied {
            self.notify(NoticeLevel::Error, format!("Failed to fetch teachers: {e}"));
        }
        applied
    }

    async fn resolve_teachers(
        &mut self,
        api: &dyn TimetableApi,
        resolution: Resolution,
    ) -> TimetableResult<()> {
        if let Resolution::Pending(lookup) = resolution {
            let result = lookup.run(api).await;
            self.apply_teachers(result)?;
        }
        Ok(())
    }

    pub fn begin_save(&mut self) -> TimetableResult<SaveRequest> {
        self.editor.begin_save()
    }

    /// Folds a save answer into the view.
    ///
    /// An update replaces the matching entry with the server's copy, or
    /// removes it if the edit moved it out of this view's scope or year; a
    /// create (or an update the server answer cannot be reconciled with)
    /// returns the one scoped refresh to run. On failure the editor stays
    /// open with the message and the list is untouched.
    pub fn finish_save(&mut self, result: SaveResult) -> TimetableResult<Option<RefreshTicket>> {
        let options = self.editor.teacher_options().to_vec();
        match self.editor.finish_save(result)? {
            SaveOutcome::Updated {
                schedule_id,
                payload,
                confirmed,
            } => match self.reconcile(schedule_id, &payload, confirmed, &options) {
                Some(schedule) if !self.context.includes(&schedule) => {
                    debug!(schedule_id, context = %self.context, "Updated schedule left the view");
                    self.schedules.retain(|s| s.id != schedule_id);
                    self.rebuild_index();
                    self.notify(NoticeLevel::Success, "Schedule updated successfully!");
                    Ok(None)
                }
                Some(schedule) => {
                    if !replace_by_id(&mut self.schedules, schedule) {
                        warn!(schedule_id, "Updated schedule is no longer listed");
                        return Ok(Some(self.begin_refresh()));
                    }
                    self.rebuild_index();
                    self.notify(NoticeLevel::Success, "Schedule updated successfully!");
                    Ok(None)
                }
                None => {
                    self.notify(NoticeLevel::Success, "Schedule updated successfully!");
                    Ok(Some(self.begin_refresh()))
                }
            },
            SaveOutcome::Created { confirmed, .. } => {
                debug!(schedule_id = confirmed.id, "Created schedule, reloading view");
                self.notify(NoticeLevel::Success, "Schedule created successfully!");
                Ok(Some(self.begin_refresh()))
            }
        }
    }

    /// Saves the open draft and applies the outcome, including any follow-up
    /// refresh.
    pub async fn save(&mut self, api: &dyn TimetableApi) -> TimetableResult<()> {
        let request = self.begin_save()?;
        let result = request.send(api).await;
        if let Some(ticket) = self.finish_save(result)? {
            let result = ticket.fetch(api).await;
            self.apply_refresh(result);
        }
        Ok(())
    }

    pub fn close_editor(&mut self) {
        self.editor.close();
    }

    /// Builds the updated entry from the server's answer, filling what the
    /// answer omits from the request, then display fields from the
    /// reference lists or the previous entry.
    fn reconcile(
        &self,
        schedule_id: i64,
        payload: &SchedulePayload,
        confirmed: ScheduleRecord,
        teacher_options: &[Teacher],
    ) -> Option<Schedule> {
        let mut record = confirmed;
        if record.id == 0 {
            record.id = schedule_id;
        }
        if record.id != schedule_id {
            warn!(schedule_id, returned = record.id, "Update answered with another schedule");
            return None;
        }
        record.group_id.get_or_insert(payload.group_id);
        record.room_id.get_or_insert(payload.room_id);
        record.subject_id.get_or_insert(payload.subject_id);
        if record.teacher_email.as_deref().map_or(true, str::is_empty) {
            record.teacher_email = Some(payload.teacher_email.clone());
        }
        if record.time_slot.is_none() && record.time_slot_detail.is_none() {
            record.time_slot = Some(payload.time_slot.clone());
        }
        record.year.get_or_insert(payload.year);

        let mut schedule = match Schedule::try_from(record) {
            Ok(schedule) => schedule,
            Err(e) => {
                warn!(schedule_id, error = %e, "Cannot reconcile update answer");
                return None;
            }
        };

        let previous = self.schedules.iter().find(|s| s.id == schedule_id);
        self.fill_display(&mut schedule, previous, teacher_options);
        Some(schedule)
    }

    fn fill_display(
        &self,
        schedule: &mut Schedule,
        previous: Option<&Schedule>,
        teacher_options: &[Teacher],
    ) {
        let display = &mut schedule.display;

        if display.subject_name.is_none() && display.subject_code.is_none() {
            if let Some(subject) = self.subjects.iter().find(|s| s.id == schedule.subject_id) {
                display.subject_name = Some(subject.name.clone()).filter(|n| !n.is_empty());
                display.subject_code = subject.subject_code.clone();
            } else if let Some(prev) = previous.filter(|p| p.subject_id == schedule.subject_id) {
                display.subject_name = prev.display.subject_name.clone();
                display.subject_code = prev.display.subject_code.clone();
            }
        }

        if display.room_code.is_none() {
            if let Some(room) = self.rooms.iter().find(|r| r.id == schedule.room_id) {
                display.room_code = Some(room.room_code.clone()).filter(|c| !c.is_empty());
                display.block_no = room.block_no.clone();
            } else if let Some(prev) = previous.filter(|p| p.room_id == schedule.room_id) {
                display.room_code = prev.display.room_code.clone();
                display.block_no = prev.display.block_no.clone();
            }
        }

        if display.teacher_name.is_none() {
            let email = &schedule.teacher_email;
            let known = self
                .teachers
                .iter()
                .chain(teacher_options)
                .find(|t| &t.email == email);
            if let Some(teacher) = known {
                display.teacher_name = Some(teacher.name.clone()).filter(|n| !n.is_empty());
                display.teacher_designation =
                    Some(teacher.designation.clone()).filter(|d| !d.is_empty());
            } else if let Some(prev) = previous.filter(|p| &p.teacher_email == email) {
                display.teacher_name = prev.display.teacher_name.clone();
                display.teacher_designation = prev.display.teacher_designation.clone();
            }
        }

        if display.group_name.is_none() {
            if let Some(prev) = previous.filter(|p| p.group_id == schedule.group_id) {
                display.group_name = prev.display.group_name.clone();
            }
        }
    }

    fn rebuild_index(&mut self) {
        self.index = ScheduleIndex::build(&self.schedules);
    }

    /// Warns about duplicate and off-grid schedules. Runs once per applied
    /// refresh, not on every local edit.
    fn report_inconsistencies(&mut self) {
        for conflict in self.index.conflicts() {
            let ids: Vec<String> = conflict.schedule_ids.iter().map(i64::to_string).collect();
            warn!(slot = %conflict.slot, ids = ?conflict.schedule_ids, "Duplicate slot occupancy");
            self.notify(
                NoticeLevel::Warning,
                format!(
                    "Inconsistent data: schedules {} share {}",
                    ids.join(", "),
                    conflict.slot
                ),
            );
        }

        let outside: Vec<(i64, SlotKey)> = self
            .index
            .off_grid(&self.grid)
            .into_iter()
            .map(|s| (s.id, s.slot))
            .collect();
        for (id, slot) in outside {
            self.notify(
                NoticeLevel::Warning,
                format!("Schedule {id} at {slot} is outside the timetable grid"),
            );
        }
    }

    fn listing_or_empty<T>(&mut self, what: &str, listing: TimetableResult<Vec<T>>) -> Vec<T> {
        match listing {
            Ok(items) => items,
            Err(e) => {
                warn!(context = %self.context, listing = what, error = %e, "Fetch failed");
                self.notify(NoticeLevel::Error, format!("Failed to fetch {what}: {e}"));
                Vec::new()
            }
        }
    }

    fn notify(&mut self, level: NoticeLevel, message: impl Into<String>) {
        self.notices.push(Notice::new(level, message));
    }
}

/// What a cell shows for `schedule`, depending on the view's fixed dimension.
///
/// The fixed dimension itself is left out: a group view does not repeat the
/// group, a room view the room, a teacher view the teacher.
pub fn display_lines(scope: ScopeKind, schedule: &Schedule) -> Vec<String> {
    let display = &schedule.display;
    let subject = display
        .subject_name
        .clone()
        .or_else(|| display.subject_code.clone())
        .unwrap_or_else(|| format!("Subject {}", schedule.subject_id));
    let teacher = display
        .teacher_label()
        .unwrap_or_else(|| schedule.teacher_email.clone());
    let room = display
        .room_code
        .clone()
        .unwrap_or_else(|| format!("Room {}", schedule.room_id));
    let group = display
        .group_name
        .clone()
        .unwrap_or_else(|| format!("Group {}", schedule.group_id));

    match scope {
        ScopeKind::Group => vec![subject, teacher, room],
        ScopeKind::Room => vec![subject, teacher, group],
        ScopeKind::Teacher => vec![subject, group, room],
    }
}
