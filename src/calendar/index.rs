use crate::model::Entry;
use chrono::{Local, NaiveDate, TimeZone};
use std::collections::HashMap;

/// Date → entries lookup over one snapshot of the journal. Entries keep the
/// order they had in the source slice.
#[derive(Debug, Default, Clone)]
pub struct EntryIndex {
    by_day: HashMap<NaiveDate, Vec<Entry>>,
}

impl EntryIndex {
    /// Groups by local calendar day.
    pub fn build(entries: &[Entry]) -> Self {
        Self::build_in(entries, &Local)
    }

    pub fn build_in<Tz: TimeZone>(entries: &[Entry], tz: &Tz) -> Self {
        let mut by_day: HashMap<NaiveDate, Vec<Entry>> = HashMap::new();
        for entry in entries {
            by_day
                .entry(entry.date_in(tz))
                .or_default()
                .push(entry.clone());
        }
        EntryIndex { by_day }
    }

    pub fn entries_on(&self, date: NaiveDate) -> &[Entry] {
        self.by_day.get(&date).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn day_count(&self) -> usize {
        self.by_day.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_day.is_empty()
    }
}
