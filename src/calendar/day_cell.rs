use super::index::EntryIndex;
use crate::model::{Category, Entry, EntryId};
use chrono::NaiveDate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextToken<'a> {
    Word(&'a str),
    Tag(&'a str),
}

/// What the user asked for on an entry. The cell never mutates entries
/// itself; the owner of the journal acts on these.
#[derive(Debug, Clone, PartialEq)]
pub enum DayIntent {
    Edit(Entry),
    Delete(EntryId),
}

/// Render model of one calendar day.
#[derive(Debug, Clone, Copy)]
pub struct DayCell<'a> {
    pub date: NaiveDate,
    pub is_today: bool,
    pub entries: &'a [Entry],
}

impl<'a> DayCell<'a> {
    pub fn new(date: NaiveDate, today: NaiveDate, index: &'a EntryIndex) -> Self {
        DayCell {
            date,
            is_today: date == today,
            entries: index.entries_on(date),
        }
    }

    /// e.g. `Monday, 30 Dec`
    pub fn title(&self) -> String {
        self.date.format("%A, %-d %b").to_string()
    }

    pub fn year_label(&self) -> String {
        self.date.format("%Y").to_string()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn edit_intent(&self, idx: usize) -> Option<DayIntent> {
        self.entries.get(idx).cloned().map(DayIntent::Edit)
    }

    pub fn delete_intent(&self, idx: usize) -> Option<DayIntent> {
        self.entries
            .get(idx)
            .map(|entry| DayIntent::Delete(entry.id.clone()))
    }
}

pub fn category_for<'c>(entry: &Entry, categories: &'c [Category]) -> Option<&'c Category> {
    categories.iter().find(|c| c.id == entry.category_id)
}

/// Splits on spaces; words starting with `#` are tags.
pub fn tokenize(text: &str) -> Vec<TextToken<'_>> {
    text.split_whitespace()
        .map(|word| {
            if word.starts_with('#') {
                TextToken::Tag(word)
            } else {
                TextToken::Word(word)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn entries() -> Vec<Entry> {
        vec![
            Entry::new("b".into(), "1".into(), "second #run", Utc.with_ymd_and_hms(2024, 3, 1, 18, 0, 0).unwrap()),
            Entry::new("a".into(), "2".into(), "first", Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap()),
        ]
    }

    #[test]
    fn cell_reflects_index_and_today() {
        let entries = entries();
        let index = EntryIndex::build_in(&entries, &Utc);
        let day = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let cell = DayCell::new(day, day, &index);
        assert!(cell.is_today);
        assert_eq!(cell.title(), "Friday, 1 Mar");
        assert_eq!(cell.year_label(), "2024");
        assert_eq!(cell.entries.len(), 2);

        let other = DayCell::new(day.succ_opt().unwrap(), day, &index);
        assert!(!other.is_today);
        assert!(other.is_empty());
        assert_eq!(other.edit_intent(0), None);
    }

    #[test]
    fn intents_carry_the_entry() {
        let entries = entries();
        let index = EntryIndex::build_in(&entries, &Utc);
        let day = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let cell = DayCell::new(day, day, &index);
        assert_eq!(cell.edit_intent(1), Some(DayIntent::Edit(entries[1].clone())));
        assert_eq!(cell.delete_intent(0), Some(DayIntent::Delete("b".into())));
        assert_eq!(cell.delete_intent(2), None);
    }

    #[test]
    fn tags_are_highlighted_tokens() {
        assert_eq!(
            tokenize("Had a #great day"),
            vec![
                TextToken::Word("Had"),
                TextToken::Word("a"),
                TextToken::Tag("#great"),
                TextToken::Word("day"),
            ]
        );
        assert!(tokenize("   ").is_empty());
    }

    #[test]
    fn resolves_category() {
        let categories = crate::model::Journal::seeded().categories;
        let entries = entries();
        assert_eq!(category_for(&entries[0], &categories).map(|c| c.name.as_str()), Some("Work"));
    }
}
