#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use reflect::calendar::{ScrollMetrics, Viewport};
use reflect::model::{Entry, Journal};
use reflect::storage::{init_journal_in, JournalLocation};
use tempfile::TempDir;

/// Pixel height of one rendered week row in the simulated page.
pub const WEEK_PX: u32 = 200;

/// A temp directory holding an initialized project journal.
pub fn project_journal() -> (TempDir, JournalLocation) {
    let dir = tempfile::tempdir().unwrap();
    let location = init_journal_in(dir.path()).unwrap();
    (dir, location)
}

pub fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
}

/// Push an entry with an exact timestamp, bypassing the "now" stamping of
/// `Journal::add_entry`.
pub fn push_entry(journal: &mut Journal, id: &str, category: &str, text: &str, at: DateTime<Utc>) {
    journal
        .entries
        .push(Entry::new(id.into(), category.into(), text, at));
    journal
        .entries
        .sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

/// Scroll container whose content height follows the number of weeks laid out.
#[derive(Debug, Default)]
pub struct Page {
    pub top: u32,
    pub height: u32,
    pub client: u32,
}

impl Page {
    pub fn new(client: u32) -> Self {
        Page {
            top: 0,
            height: 0,
            client,
        }
    }

    pub fn set_top(&mut self, top: u32) {
        self.set_scroll_top(top);
    }

    pub fn lay_out(&mut self, days: usize) {
        self.height = (days / 7) as u32 * WEEK_PX;
    }
}

impl Viewport for Page {
    fn metrics(&self) -> ScrollMetrics {
        ScrollMetrics {
            scroll_top: self.top,
            scroll_height: self.height,
            client_height: self.client,
        }
    }

    fn set_scroll_top(&mut self, offset: u32) {
        self.top = offset.min(self.height.saturating_sub(self.client));
    }
}
