mod helpers;

use chrono::NaiveDate;
use helpers::{push_entry, utc};
use reflect::calendar::EntryIndex;
use reflect::model::{CategoryColor, Journal, JournalError};

#[test]
fn entries_stay_newest_first() {
    let mut journal = Journal::seeded();
    push_entry(&mut journal, "old", "1", "first", utc(2024, 3, 1, 9, 0));
    push_entry(&mut journal, "new", "1", "third", utc(2024, 3, 3, 9, 0));
    journal
        .add_entry("second", "2", None, utc(2024, 3, 2, 9, 0))
        .unwrap();

    let texts: Vec<&str> = journal.entries.iter().map(|e| e.text()).collect();
    assert_eq!(texts, ["third", "second", "first"]);
}

#[test]
fn picked_date_lands_on_that_calendar_day() {
    let mut journal = Journal::seeded();
    let day = NaiveDate::from_ymd_opt(2023, 12, 31).unwrap();
    let id = journal
        .add_entry("new year's eve #party", "5", Some(day), utc(2024, 3, 14, 9, 0))
        .unwrap();

    let entry = journal.entry(&id).unwrap();
    assert_eq!(entry.local_date(), day);
    let index = EntryIndex::build(&journal.entries);
    assert_eq!(index.entries_on(day).len(), 1);
    assert_eq!(index.entries_on(day)[0].tags(), ["#party"]);
}

#[test]
fn moving_an_entry_regroups_it() {
    let mut journal = Journal::seeded();
    let from = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
    let to = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
    let id = journal
        .add_entry("walk", "3", Some(from), utc(2024, 3, 14, 9, 0))
        .unwrap();
    journal
        .update_entry(&id, "long walk #outside", "3", Some(to))
        .unwrap();

    let index = EntryIndex::build(&journal.entries);
    assert!(index.entries_on(from).is_empty());
    let moved = &index.entries_on(to)[0];
    assert_eq!(moved.text(), "long walk #outside");
    assert_eq!(moved.tags(), ["#outside"]);
}

#[test]
fn deleting_a_category_removes_its_entries() {
    let mut journal = Journal::seeded();
    let work = journal
        .add_category("Side project", "Zap", CategoryColor::Teal)
        .unwrap();
    journal
        .add_entry("wrote the parser", &work, None, utc(2024, 3, 14, 9, 0))
        .unwrap();
    journal
        .add_entry("fixed the lexer", &work, None, utc(2024, 3, 14, 10, 0))
        .unwrap();
    journal
        .add_entry("dinner with family", "2", None, utc(2024, 3, 14, 19, 0))
        .unwrap();

    assert_eq!(journal.delete_category(&work).unwrap(), 2);
    assert_eq!(journal.entries.len(), 1);
    assert!(journal.category(&work).is_none());
    assert!(journal
        .entries
        .iter()
        .all(|e| journal.category(&e.category_id).is_some()));
}

#[test]
fn invalid_mutations_leave_the_journal_untouched() {
    let mut journal = Journal::seeded();
    journal
        .add_entry("kept", "1", None, utc(2024, 3, 14, 9, 0))
        .unwrap();
    let before = journal.entries.clone();

    assert_eq!(
        journal.add_entry("   ", "1", None, utc(2024, 3, 14, 10, 0)),
        Err(JournalError::EmptyText)
    );
    assert!(matches!(
        journal.add_entry("orphan", "missing", None, utc(2024, 3, 14, 10, 0)),
        Err(JournalError::CategoryNotFound(_))
    ));
    assert!(matches!(
        journal.update_entry("nope", "text", "1", None),
        Err(JournalError::EntryNotFound(_))
    ));
    assert!(matches!(
        journal.delete_category("missing"),
        Err(JournalError::CategoryNotFound(_))
    ));
    assert_eq!(journal.entries, before);
}
