use crate::config::project_dirs;
use crate::model::Journal;
use anyhow::{Context, Result};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const PROJECT_DIR: &str = ".reflect";
const JOURNAL_FILE: &str = "journal.yml";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JournalScope {
    Project,
    Global,
}

#[derive(Debug, Clone)]
pub struct JournalLocation {
    pub path: PathBuf,
    pub scope: JournalScope,
}

impl JournalScope {
    pub fn label(&self) -> &'static str {
        match self {
            JournalScope::Project => "project",
            JournalScope::Global => "global",
        }
    }
}

pub fn init_project_journal() -> Result<JournalLocation> {
    let cwd = env::current_dir()?;
    init_journal_in(&cwd)
}

/// Creates `<dir>/.reflect/journal.yml` with the default categories unless
/// it already exists.
pub fn init_journal_in(dir: &Path) -> Result<JournalLocation> {
    let journal_dir = dir.join(PROJECT_DIR);
    fs::create_dir_all(&journal_dir).context("failed to create .reflect directory")?;
    let location = JournalLocation {
        path: journal_dir.join(JOURNAL_FILE),
        scope: JournalScope::Project,
    };
    if !location.path.exists() {
        save_journal(&location, &Journal::seeded())?;
        info!(path = %location.path.display(), "initialized project journal");
    }
    Ok(location)
}

pub fn locate_journal(start: &Path) -> Result<JournalLocation> {
    if let Some(project_path) = find_project_journal(start) {
        return Ok(JournalLocation {
            path: project_path,
            scope: JournalScope::Project,
        });
    }
    Ok(JournalLocation {
        path: global_journal_path()?,
        scope: JournalScope::Global,
    })
}

pub fn load_journal(location: &JournalLocation) -> Result<Journal> {
    if location.path.exists() {
        let data = fs::read_to_string(&location.path)
            .with_context(|| format!("reading {:?}", location.path))?;
        let mut journal: Journal =
            serde_yaml::from_str(&data).context("parsing journal file")?;
        journal.normalize();
        debug!(
            entries = journal.entries.len(),
            categories = journal.categories.len(),
            reports = journal.reports.len(),
            "loaded journal"
        );
        Ok(journal)
    } else {
        let journal = Journal::seeded();
        save_journal(location, &journal)?;
        info!(path = %location.path.display(), "created new journal");
        Ok(journal)
    }
}

pub fn save_journal(location: &JournalLocation, journal: &Journal) -> Result<()> {
    if let Some(parent) = location.path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("creating {:?}", parent))?;
    }
    let serialized = serde_yaml::to_string(journal).context("serializing journal")?;
    fs::write(&location.path, serialized)
        .with_context(|| format!("writing {:?}", location.path))?;
    debug!(path = %location.path.display(), "saved journal");
    Ok(())
}

fn find_project_journal(start: &Path) -> Option<PathBuf> {
    let mut dir = Some(start);
    while let Some(current) = dir {
        let candidate = current.join(PROJECT_DIR).join(JOURNAL_FILE);
        if candidate.exists() {
            return Some(candidate);
        }
        dir = current.parent();
    }
    None
}

fn global_journal_path() -> Result<PathBuf> {
    Ok(project_dirs()?.data_dir().join(JOURNAL_FILE))
}
