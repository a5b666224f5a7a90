use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};
use once_cell::sync::Lazy;
use rand::{distributions::Alphanumeric, Rng};
use regex::Regex;
use serde::{Deserialize, Serialize};

pub type EntryId = String;
pub type CategoryId = String;
pub type ReportId = String;

const ID_LEN: usize = 8;
const DATE_FORMAT: &str = "%Y-%m-%d";

/// `#` followed by ASCII word characters or Cyrillic letters. Other
/// scripts end the tag, so `#café` tags as `#caf`.
static TAG_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"#[0-9A-Za-z_\x{0400}-\x{04FF}]+").expect("tag pattern compiles"));

pub const ICON_LIBRARY: [&str; 17] = [
    "Briefcase",
    "Home",
    "Heart",
    "Lightbulb",
    "User",
    "Smile",
    "Star",
    "Coffee",
    "Cloud",
    "Moon",
    "Sun",
    "Book",
    "Camera",
    "Music",
    "Map",
    "Zap",
    "Target",
];

pub const DEFAULT_ICON: &str = "MessageCircle";

#[derive(Debug, Default, Serialize, Deserialize, Clone)]
pub struct Journal {
    #[serde(default)]
    pub entries: Vec<Entry>,
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub reports: Vec<Report>,
}

/// A dated journal moment. `tags` is a cache of the `#tokens` found in
/// `text` and is only ever written together with it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "EntryRecord", into = "EntryRecord")]
pub struct Entry {
    pub id: EntryId,
    pub category_id: CategoryId,
    text: String,
    tags: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize)]
struct EntryRecord {
    id: EntryId,
    category_id: CategoryId,
    text: String,
    #[serde(default)]
    tags: Vec<String>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub icon: String,
    pub color: CategoryColor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryColor {
    Blue,
    Green,
    Red,
    Purple,
    Yellow,
    Orange,
    Pink,
    Teal,
    Indigo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Period {
    Day,
    Week,
    Month,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub id: ReportId,
    pub period: Period,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub content: String,
    pub generated_at: DateTime<Utc>,
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum JournalError {
    #[error("entry not found: {0}")]
    EntryNotFound(String),
    #[error("category not found: {0}")]
    CategoryNotFound(String),
    #[error("report not found: {0}")]
    ReportNotFound(String),
    #[error("entry text is empty")]
    EmptyText,
    #[error("category name is empty")]
    EmptyName,
    #[error("invalid date (use YYYY-MM-DD): {0}")]
    InvalidDate(String),
}

impl Journal {
    pub fn seeded() -> Self {
        let defaults = [
            ("1", "Work", "Briefcase", CategoryColor::Blue),
            ("2", "Family", "Home", CategoryColor::Green),
            ("3", "Health", "Heart", CategoryColor::Red),
            ("4", "Ideas", "Lightbulb", CategoryColor::Yellow),
            ("5", "Personal", "User", CategoryColor::Purple),
            ("6", "Mood", "Smile", CategoryColor::Orange),
        ];
        Journal {
            entries: Vec::new(),
            categories: defaults
                .iter()
                .map(|(id, name, icon, color)| Category {
                    id: (*id).to_string(),
                    name: (*name).to_string(),
                    icon: (*icon).to_string(),
                    color: *color,
                })
                .collect(),
            reports: Vec::new(),
        }
    }

    pub fn entry(&self, id: &str) -> Option<&Entry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn category(&self, id: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.id == id)
    }

    pub fn report(&self, id: &str) -> Option<&Report> {
        self.reports.iter().find(|r| r.id == id)
    }

    /// Adds an entry stamped with `now`, or with local noon of `date` when
    /// one is given.
    pub fn add_entry(
        &mut self,
        text: &str,
        category_id: &str,
        date: Option<NaiveDate>,
        now: DateTime<Utc>,
    ) -> Result<EntryId, JournalError> {
        self.validate_entry(text, category_id)?;
        let created_at = match date {
            Some(d) => local_noon(d)?,
            None => now,
        };
        let id = generate_id();
        self.entries.push(Entry::new(
            id.clone(),
            category_id.to_string(),
            text,
            created_at,
        ));
        self.sort_entries();
        Ok(id)
    }

    /// Replaces text and category; the timestamp moves only when a new
    /// date is supplied.
    pub fn update_entry(
        &mut self,
        id: &str,
        text: &str,
        category_id: &str,
        date: Option<NaiveDate>,
    ) -> Result<(), JournalError> {
        self.validate_entry(text, category_id)?;
        let created_at = date.map(local_noon).transpose()?;
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| JournalError::EntryNotFound(id.to_string()))?;
        entry.set_text(text);
        entry.category_id = category_id.to_string();
        if let Some(ts) = created_at {
            // same civil day keeps the original time of day
            if ts.with_timezone(&Local).date_naive() != entry.local_date() {
                entry.created_at = ts;
            }
        }
        self.sort_entries();
        Ok(())
    }

    pub fn delete_entry(&mut self, id: &str) -> Result<Entry, JournalError> {
        let idx = self
            .entries
            .iter()
            .position(|e| e.id == id)
            .ok_or_else(|| JournalError::EntryNotFound(id.to_string()))?;
        Ok(self.entries.remove(idx))
    }

    pub fn add_category(
        &mut self,
        name: &str,
        icon: &str,
        color: CategoryColor,
    ) -> Result<CategoryId, JournalError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(JournalError::EmptyName);
        }
        let id = generate_id();
        self.categories.push(Category {
            id: id.clone(),
            name: name.to_string(),
            icon: icon.to_string(),
            color,
        });
        Ok(id)
    }

    pub fn update_category(
        &mut self,
        id: &str,
        name: &str,
        icon: &str,
        color: CategoryColor,
    ) -> Result<(), JournalError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(JournalError::EmptyName);
        }
        let category = self
            .categories
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| JournalError::CategoryNotFound(id.to_string()))?;
        category.name = name.to_string();
        category.icon = icon.to_string();
        category.color = color;
        Ok(())
    }

    /// Removes the category and every entry filed under it. Returns the
    /// number of entries removed.
    pub fn delete_category(&mut self, id: &str) -> Result<usize, JournalError> {
        if self.category(id).is_none() {
            return Err(JournalError::CategoryNotFound(id.to_string()));
        }
        let before = self.entries.len();
        self.entries.retain(|e| e.category_id != id);
        self.categories.retain(|c| c.id != id);
        Ok(before - self.entries.len())
    }

    pub fn add_report(&mut self, report: Report) {
        self.reports.insert(0, report);
    }

    pub fn delete_report(&mut self, id: &str) -> Result<Report, JournalError> {
        let idx = self
            .reports
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| JournalError::ReportNotFound(id.to_string()))?;
        Ok(self.reports.remove(idx))
    }

    pub fn entry_count_for(&self, category_id: &str) -> usize {
        self.entries
            .iter()
            .filter(|e| e.category_id == category_id)
            .count()
    }

    fn validate_entry(&self, text: &str, category_id: &str) -> Result<(), JournalError> {
        if text.trim().is_empty() {
            return Err(JournalError::EmptyText);
        }
        if self.category(category_id).is_none() {
            return Err(JournalError::CategoryNotFound(category_id.to_string()));
        }
        Ok(())
    }

    /// Restores the newest-first order; used after loading from disk.
    pub fn normalize(&mut self) {
        self.sort_entries();
    }

    fn sort_entries(&mut self) {
        self.entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    }
}

impl Entry {
    pub fn new(
        id: EntryId,
        category_id: CategoryId,
        text: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        let text = text.into();
        let tags = extract_tags(&text);
        Entry {
            id,
            category_id,
            text,
            tags,
            created_at,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.tags = extract_tags(&self.text);
    }

    /// Civil date of `created_at` as seen from `tz`.
    pub fn date_in<Tz: TimeZone>(&self, tz: &Tz) -> NaiveDate {
        self.created_at.with_timezone(tz).date_naive()
    }

    pub fn local_date(&self) -> NaiveDate {
        self.date_in(&Local)
    }
}

impl From<EntryRecord> for Entry {
    fn from(record: EntryRecord) -> Self {
        Entry::new(record.id, record.category_id, record.text, record.created_at)
    }
}

impl From<Entry> for EntryRecord {
    fn from(entry: Entry) -> Self {
        EntryRecord {
            id: entry.id,
            category_id: entry.category_id,
            text: entry.text,
            tags: entry.tags,
            created_at: entry.created_at,
        }
    }
}

impl CategoryColor {
    pub const ALL: [CategoryColor; 9] = [
        CategoryColor::Blue,
        CategoryColor::Green,
        CategoryColor::Red,
        CategoryColor::Purple,
        CategoryColor::Yellow,
        CategoryColor::Orange,
        CategoryColor::Pink,
        CategoryColor::Teal,
        CategoryColor::Indigo,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            CategoryColor::Blue => "blue",
            CategoryColor::Green => "green",
            CategoryColor::Red => "red",
            CategoryColor::Purple => "purple",
            CategoryColor::Yellow => "yellow",
            CategoryColor::Orange => "orange",
            CategoryColor::Pink => "pink",
            CategoryColor::Teal => "teal",
            CategoryColor::Indigo => "indigo",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim().to_lowercase();
        Self::ALL.into_iter().find(|c| c.label() == raw)
    }

    pub fn cycle(&self, step: isize) -> Self {
        let len = Self::ALL.len() as isize;
        let idx = Self::ALL.iter().position(|c| c == self).unwrap_or(0) as isize;
        Self::ALL[(idx + step).rem_euclid(len) as usize]
    }
}

impl Period {
    pub const ALL: [Period; 3] = [Period::Day, Period::Week, Period::Month];

    pub fn label(&self) -> &'static str {
        match self {
            Period::Day => "Day",
            Period::Week => "Week",
            Period::Month => "Month",
        }
    }

    pub fn adjective(&self) -> &'static str {
        match self {
            Period::Day => "daily",
            Period::Week => "weekly",
            Period::Month => "monthly",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "day" | "daily" => Some(Period::Day),
            "week" | "weekly" => Some(Period::Week),
            "month" | "monthly" => Some(Period::Month),
            _ => None,
        }
    }

    pub fn next(&self) -> Self {
        match self {
            Period::Day => Period::Week,
            Period::Week => Period::Month,
            Period::Month => Period::Day,
        }
    }
}

pub fn extract_tags(text: &str) -> Vec<String> {
    TAG_PATTERN
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

pub fn parse_date(raw: &str) -> Result<NaiveDate, JournalError> {
    let trimmed = raw.trim();
    NaiveDate::parse_from_str(trimmed, DATE_FORMAT)
        .map_err(|_| JournalError::InvalidDate(trimmed.to_string()))
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn icon_cycle(current: &str, step: isize) -> &'static str {
    let len = ICON_LIBRARY.len() as isize;
    let idx = match ICON_LIBRARY.iter().position(|i| *i == current) {
        Some(i) => i as isize,
        None if step > 0 => -1,
        None => 0,
    };
    ICON_LIBRARY[(idx + step).rem_euclid(len) as usize]
}

pub fn generate_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(ID_LEN)
        .map(char::from)
        .collect()
}

/// Local noon keeps a picked date on the same civil day in any nearby zone.
fn local_noon(date: NaiveDate) -> Result<DateTime<Utc>, JournalError> {
    date.and_hms_opt(12, 0, 0)
        .and_then(|naive| Local.from_local_datetime(&naive).earliest())
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| JournalError::InvalidDate(format_date(date)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn extracts_tags_in_order() {
        assert_eq!(
            extract_tags("Had a #great #day today"),
            vec!["#great".to_string(), "#day".to_string()]
        );
        assert_eq!(extract_tags("#работа и #дом"), vec!["#работа", "#дом"]);
        assert!(extract_tags("no tags # here").is_empty());
        assert_eq!(extract_tags("#café #naïve_idea"), vec!["#caf", "#na"]);
    }

    #[test]
    fn set_text_recomputes_tags() {
        let mut entry = Entry::new("a".into(), "1".into(), "Had a #great #day today", Utc::now());
        let before = entry.tags().to_vec();
        entry.set_text(entry.text().to_string());
        assert_eq!(entry.tags(), before.as_slice());
        entry.set_text("now #different");
        assert_eq!(entry.tags(), ["#different".to_string()]);
    }

    #[test]
    fn deserialize_rebuilds_stale_tag_cache() {
        let yaml = "id: x\ncategory_id: '1'\ntext: 'walk #outside'\ntags: ['#stale']\ncreated_at: 2024-03-01T09:00:00Z\n";
        let entry: Entry = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(entry.tags(), ["#outside".to_string()]);
    }

    #[test]
    fn entries_stay_sorted_newest_first() {
        let mut journal = Journal::seeded();
        journal
            .add_entry("older", "1", None, utc("2024-03-01T09:00:00Z"))
            .unwrap();
        journal
            .add_entry("newer", "1", None, utc("2024-03-05T09:00:00Z"))
            .unwrap();
        journal
            .add_entry("middle", "2", None, utc("2024-03-03T09:00:00Z"))
            .unwrap();
        let texts: Vec<&str> = journal.entries.iter().map(|e| e.text()).collect();
        assert_eq!(texts, vec!["newer", "middle", "older"]);
    }

    #[test]
    fn add_entry_rejects_unknown_category_without_mutating() {
        let mut journal = Journal::seeded();
        let err = journal
            .add_entry("text", "missing", None, Utc::now())
            .unwrap_err();
        assert_eq!(err, JournalError::CategoryNotFound("missing".into()));
        assert!(journal.entries.is_empty());
        assert_eq!(
            journal.add_entry("   ", "1", None, Utc::now()).unwrap_err(),
            JournalError::EmptyText
        );
    }

    #[test]
    fn custom_date_lands_on_that_local_day() {
        let mut journal = Journal::seeded();
        let date = NaiveDate::from_ymd_opt(2024, 1, 8).unwrap();
        let id = journal.add_entry("picked", "1", Some(date), Utc::now()).unwrap();
        assert_eq!(journal.entry(&id).unwrap().local_date(), date);
    }

    #[test]
    fn update_entry_replaces_text_and_tags() {
        let mut journal = Journal::seeded();
        let id = journal
            .add_entry("first #one", "1", None, utc("2024-03-01T09:00:00Z"))
            .unwrap();
        journal.update_entry(&id, "second #two", "3", None).unwrap();
        let entry = journal.entry(&id).unwrap();
        assert_eq!(entry.text(), "second #two");
        assert_eq!(entry.tags(), ["#two".to_string()]);
        assert_eq!(entry.category_id, "3");
        assert_eq!(entry.created_at, utc("2024-03-01T09:00:00Z"));
    }

    #[test]
    fn deleting_category_cascades_to_entries() {
        let mut journal = Journal::seeded();
        journal.add_entry("a", "1", None, Utc::now()).unwrap();
        journal.add_entry("b", "1", None, Utc::now()).unwrap();
        journal.add_entry("c", "2", None, Utc::now()).unwrap();
        assert_eq!(journal.delete_category("1").unwrap(), 2);
        assert!(journal.category("1").is_none());
        assert!(journal.entries.iter().all(|e| e.category_id != "1"));
        assert_eq!(journal.entries.len(), 1);
    }

    #[test]
    fn colors_and_icons_cycle() {
        assert_eq!(CategoryColor::Blue.cycle(-1), CategoryColor::Indigo);
        assert_eq!(CategoryColor::Indigo.cycle(1), CategoryColor::Blue);
        assert_eq!(icon_cycle("Briefcase", 1), "Home");
        assert_eq!(icon_cycle("Briefcase", -1), "Target");
        assert_eq!(icon_cycle(DEFAULT_ICON, 1), "Briefcase");
    }
}
