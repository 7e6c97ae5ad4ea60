//! Lookup from grid cell to the schedule occupying it.
//!
//! The index is rebuilt from scratch whenever the schedule list changes; a
//! grid has a dozen cells, so there is nothing to gain from incremental
//! updates.
//!
//! # Tie-break
//! Two schedules on the same [`SlotKey`] within one view is inconsistent
//! data. The index does not arbitrate: [`ScheduleIndex::lookup`] returns the
//! one that came first in the source list, and [`ScheduleIndex::cell`]
//! reports the cell as [`CellState::Conflicted`] so callers can flag it.

use super::error::TimetableError;
use super::grid::TimeSlotGrid;
use super::slot::SlotKey;
use super::types::{Schedule, ScheduleRecord};
use std::collections::HashMap;
use tracing::warn;

/// A record that could not be turned into a [`Schedule`].
#[derive(Debug, Clone, PartialEq)]
pub struct MalformedRecord {
    pub id: i64,
    pub error: TimetableError,
}

/// Splits wire records into valid schedules and malformed ones, keeping order.
pub fn normalize_records(records: Vec<ScheduleRecord>) -> (Vec<Schedule>, Vec<MalformedRecord>) {
    let mut schedules = Vec::with_capacity(records.len());
    let mut malformed = Vec::new();

    for record in records {
        let id = record.id;
        match Schedule::try_from(record) {
            Ok(schedule) => schedules.push(schedule),
            Err(error) => {
                warn!(schedule_id = id, error = %error, "Dropping malformed schedule record");
                malformed.push(MalformedRecord { id, error });
            }
        }
    }

    (schedules, malformed)
}

/// Replaces the entry with the same id, keeping list order.
///
/// Returns false (and leaves the list untouched) when no entry matches.
pub fn replace_by_id(schedules: &mut [Schedule], updated: Schedule) -> bool {
    match schedules.iter_mut().find(|s| s.id == updated.id) {
        Some(slot) => {
            *slot = updated;
            true
        }
        None => false,
    }
}

/// What occupies a single cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CellState<'a> {
    Empty,
    Occupied(&'a Schedule),
    /// More than one schedule claims the cell; `chosen` is the first in source order.
    Conflicted {
        chosen: &'a Schedule,
        count: usize,
    },
}

impl<'a> CellState<'a> {
    /// The schedule shown in the cell, if any.
    pub fn schedule(&self) -> Option<&'a Schedule> {
        match *self {
            CellState::Empty => None,
            CellState::Occupied(schedule) | CellState::Conflicted { chosen: schedule, .. } => {
                Some(schedule)
            }
        }
    }

    pub fn is_conflicted(&self) -> bool {
        matches!(self, CellState::Conflicted { .. })
    }
}

/// Duplicate occupancy found while building the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotConflict {
    pub slot: SlotKey,
    /// Ids in source order; the first one is displayed
    pub schedule_ids: Vec<i64>,
}

#[derive(Debug, Clone, Default)]
pub struct ScheduleIndex {
    by_slot: HashMap<SlotKey, Vec<Schedule>>,
}

impl ScheduleIndex {
    /// Builds the index from the full schedule list.
    pub fn build(schedules: &[Schedule]) -> Self {
        let mut by_slot: HashMap<SlotKey, Vec<Schedule>> = HashMap::new();
        for schedule in schedules {
            by_slot.entry(schedule.slot).or_default().push(schedule.clone());
        }
        Self { by_slot }
    }

    /// The schedule at `key`, first in source order on duplicates.
    pub fn lookup(&self, key: &SlotKey) -> Option<&Schedule> {
        self.by_slot.get(key).and_then(|entries| entries.first())
    }

    pub fn cell(&self, key: &SlotKey) -> CellState<'_> {
        match self.by_slot.get(key).map(Vec::as_slice) {
            None | Some([]) => CellState::Empty,
            Some([only]) => CellState::Occupied(only),
            Some(entries) => CellState::Conflicted {
                chosen: &entries[0],
                count: entries.len(),
            },
        }
    }

    /// Every slot claimed by more than one schedule, in slot order.
    pub fn conflicts(&self) -> Vec<SlotConflict> {
        let mut conflicts: Vec<SlotConflict> = self
            .by_slot
            .iter()
            .filter(|(_, entries)| entries.len() > 1)
            .map(|(slot, entries)| SlotConflict {
                slot: *slot,
                schedule_ids: entries.iter().map(|s| s.id).collect(),
            })
            .collect();
        conflicts.sort_by_key(|c| c.slot);
        conflicts
    }

    /// Schedules whose slot is not a cell of `grid`, so would never be shown.
    pub fn off_grid<'a>(&'a self, grid: &TimeSlotGrid) -> Vec<&'a Schedule> {
        let mut outside: Vec<&Schedule> = self
            .by_slot
            .iter()
            .filter(|(slot, _)| !grid.contains(slot))
            .flat_map(|(_, entries)| entries.iter())
            .collect();
        outside.sort_by_key(|s| (s.slot, s.id));
        outside
    }

    pub fn len(&self) -> usize {
        self.by_slot.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_slot.is_empty()
    }
}
