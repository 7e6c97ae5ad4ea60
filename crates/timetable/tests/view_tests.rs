//! Refresh, lookup and context handling of a grid view against an in-memory API.

use timetable::routine::{
    AuthHandle, CellState, Day, EditPolicy, NoticeLevel, ScheduleRecord, SlotDetail, SlotKey,
    TimeSlot, TimeSlotGrid, TimetableError, ViewAdapter, ViewContext,
};

mod support;

use support::{admin, record, FakeApi, YEAR};

fn monday_grid() -> TimeSlotGrid {
    TimeSlotGrid::new(vec![Day::Mon], vec![TimeSlot::parse("16:15", "17:55").unwrap()])
}

fn monday() -> SlotKey {
    SlotKey::new(Day::Mon, TimeSlot::parse("16:15", "17:55").unwrap())
}

#[tokio::test]
async fn test_flat_and_nested_slots_resolve_to_same_cell() {
    let flat = FakeApi::new(vec![record(1, 5, 2, 7, "MON-16:15-17:55")]);
    let mut view = ViewAdapter::new(
        ViewContext::group(5, YEAR),
        monday_grid(),
        EditPolicy::default(),
        AuthHandle::anonymous(),
    );
    assert!(view.refresh(&flat).await);

    assert_eq!(view.grid().cells(), vec![monday()]);
    let cell = view.cell_view(monday());
    assert_eq!(cell.state.schedule().map(|s| s.subject_id), Some(7));

    let nested = FakeApi::new(vec![ScheduleRecord {
        time_slot: None,
        time_slot_detail: Some(SlotDetail {
            day: "MON".to_string(),
            start_time: "16:15:00".to_string(),
            end_time: "17:55:00".to_string(),
        }),
        ..record(1, 5, 2, 7, "")
    }]);
    assert!(view.refresh(&nested).await);
    let cell = view.cell_view(monday());
    assert!(matches!(cell.state, CellState::Occupied(s) if s.subject_id == 7));
    assert!(view.malformed().is_empty());
}

#[tokio::test]
async fn test_refresh_is_scoped_by_context_and_year() {
    let api = FakeApi::new(vec![
        record(1, 5, 2, 7, "SUN-16:15-17:55"),
        record(2, 6, 2, 8, "SUN-17:55-19:35"),
        ScheduleRecord {
            year: Some(YEAR - 1),
            ..record(3, 5, 3, 8, "MON-16:15-17:55")
        },
    ]);
    let mut view = ViewAdapter::new(
        ViewContext::group(5, YEAR),
        TimeSlotGrid::default(),
        EditPolicy::default(),
        admin(),
    );

    view.refresh(&api).await;
    let ids: Vec<i64> = view.schedules().iter().map(|s| s.id).collect();
    assert_eq!(ids, vec![1]);
    assert_eq!(view.teachers().len(), 2);

    view.change_context(&api, ViewContext::room(2, YEAR)).await;
    let ids: Vec<i64> = view.schedules().iter().map(|s| s.id).collect();
    assert_eq!(ids, vec![1, 2]);
    // Read-only view: the full teacher list is not needed.
    assert!(view.teachers().is_empty());

    view.change_context(&api, ViewContext::group(5, YEAR - 1)).await;
    let ids: Vec<i64> = view.schedules().iter().map(|s| s.id).collect();
    assert_eq!(ids, vec![3]);

    assert_eq!(
        api.calls()
            .iter()
            .filter(|c| c.starts_with("GET schedules"))
            .cloned()
            .collect::<Vec<_>>(),
        vec![
            "GET schedules/group/5?year=2081",
            "GET schedules/room/2?year=2081",
            "GET schedules/group/5?year=2080",
        ]
    );
}

#[tokio::test]
async fn test_stale_response_is_discarded() {
    let api = FakeApi::new(vec![
        record(1, 5, 2, 7, "SUN-16:15-17:55"),
        ScheduleRecord {
            year: Some(YEAR - 1),
            ..record(2, 5, 2, 8, "MON-16:15-17:55")
        },
    ]);
    let mut view = ViewAdapter::new(
        ViewContext::group(5, YEAR),
        TimeSlotGrid::default(),
        EditPolicy::default(),
        admin(),
    );

    let first = view.begin_refresh();
    let second = view.set_context(ViewContext::group(5, YEAR - 1)).unwrap();

    // The newer fetch resolves first, the older one afterwards.
    let newer = second.fetch(&api).await;
    let older = first.fetch(&api).await;
    assert!(view.apply_refresh(newer));
    assert!(!view.apply_refresh(older));

    let ids: Vec<i64> = view.schedules().iter().map(|s| s.id).collect();
    assert_eq!(ids, vec![2]);
}

#[tokio::test]
async fn test_failed_reference_fetch_falls_back_to_empty() {
    let mut api = FakeApi::new(vec![record(1, 5, 2, 7, "SUN-16:15-17:55")]);
    api.rooms_error = Some(TimetableError::Network {
        message: "connection reset".to_string(),
    });
    let mut view = ViewAdapter::new(
        ViewContext::group(5, YEAR),
        TimeSlotGrid::default(),
        EditPolicy::default(),
        admin(),
    );

    assert!(view.refresh(&api).await);
    assert!(view.rooms().is_empty());
    assert_eq!(view.schedules().len(), 1);
    assert_eq!(view.subjects().len(), 2);

    let notices = view.drain_notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].level, NoticeLevel::Error);
}

#[tokio::test]
async fn test_available_years_newest_first() {
    let api = FakeApi::new(Vec::new());
    let mut view = ViewAdapter::new(
        ViewContext::group(5, YEAR),
        TimeSlotGrid::default(),
        EditPolicy::default(),
        AuthHandle::anonymous(),
    );
    assert_eq!(view.available_years(&api).await, vec![YEAR, YEAR - 1]);
}

#[tokio::test]
async fn test_cells_render_per_scope() {
    let api = FakeApi::new(vec![record(1, 5, 2, 7, "SUN-16:15-17:55")]);
    let sunday: SlotKey = "SUN-16:15-17:55".parse().unwrap();

    let mut view = ViewAdapter::new(
        ViewContext::room(2, YEAR),
        TimeSlotGrid::default(),
        EditPolicy::default(),
        admin(),
    );
    view.refresh(&api).await;
    assert_eq!(
        view.cell_view(sunday).lines,
        vec!["Subject 7", "ram@example.edu", "Group 5"]
    );

    view.change_context(&api, ViewContext::teacher("ram@example.edu", YEAR)).await;
    assert_eq!(view.cell_view(sunday).lines, vec!["Subject 7", "Group 5", "R2"]);
    assert!(view.cell_view("MON-16:15-17:55".parse().unwrap()).is_empty());
}
