//! The fixed day × time-slot grid.

use super::config::GridConfig;
use super::slot::{Day, SlotKey, TimeSlot};

/// Cells to render, derived from configuration only.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSlotGrid {
    days: Vec<Day>,
    time_slots: Vec<TimeSlot>,
}

impl TimeSlotGrid {
    pub fn new(days: Vec<Day>, time_slots: Vec<TimeSlot>) -> Self {
        Self { days, time_slots }
    }

    pub fn from_config(config: &GridConfig) -> Self {
        Self::new(config.days.clone(), config.time_slots.clone())
    }

    pub fn days(&self) -> &[Day] {
        &self.days
    }

    pub fn time_slots(&self) -> &[TimeSlot] {
        &self.time_slots
    }

    /// Every cell in row-major order: day outer, time slot inner.
    pub fn cells(&self) -> Vec<SlotKey> {
        self.days
            .iter()
            .flat_map(|&day| self.time_slots.iter().map(move |&time| SlotKey::new(day, time)))
            .collect()
    }

    /// Cells grouped by day, one row per day.
    pub fn rows(&self) -> Vec<(Day, Vec<SlotKey>)> {
        self.days
            .iter()
            .map(|&day| {
                let row = self
                    .time_slots
                    .iter()
                    .map(|&time| SlotKey::new(day, time))
                    .collect();
                (day, row)
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.days.len() * self.time_slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `key` is one of this grid's cells.
    pub fn contains(&self, key: &SlotKey) -> bool {
        self.days.contains(&key.day) && self.time_slots.contains(&key.time)
    }
}

impl Default for TimeSlotGrid {
    fn default() -> Self {
        Self::from_config(&GridConfig::default())
    }
}
