use crate::ui;
use anyhow::{anyhow, bail, Context, Result};
use chrono::{Local, Utc};
use reflect::config::Config;
use reflect::model::{format_date, parse_date, CategoryColor, Entry, Journal, Period};
use reflect::report::{HttpRelay, ReportGenerator};
use reflect::storage::{
    init_project_journal, load_journal, locate_journal, save_journal, JournalLocation,
};
use std::env;

pub fn init() -> Result<()> {
    let location = init_project_journal()?;
    println!("Initialized journal at {}", location.path.display());
    Ok(())
}

pub fn list(date: Option<String>, category: Option<String>) -> Result<()> {
    let (journal, location) = load_current_journal()?;
    let day = date.as_deref().map(parse_date).transpose()?;
    println!(
        "Journal: {} ({})",
        location.path.display(),
        location.scope.label()
    );
    let mut shown = 0;
    for entry in &journal.entries {
        if let Some(d) = day {
            if entry.local_date() != d {
                continue;
            }
        }
        if let Some(ref filter) = category {
            if &entry.category_id != filter {
                continue;
            }
        }
        print_entry(&journal, entry);
        shown += 1;
    }
    if shown == 0 {
        println!("  (no entries)");
    }
    Ok(())
}

pub fn add(text: String, category: Option<String>, date: Option<String>) -> Result<()> {
    let (mut journal, location) = load_current_journal()?;
    let category_id = category
        .or_else(|| journal.categories.first().map(|c| c.id.clone()))
        .ok_or_else(|| anyhow!("journal has no categories"))?;
    let day = date.as_deref().map(parse_date).transpose()?;
    let id = journal
        .add_entry(&text, &category_id, day, Utc::now())
        .with_context(|| format!("adding entry to category {}", category_id))?;
    save_journal(&location, &journal)?;
    println!("Added entry {}", id);
    Ok(())
}

pub fn edit(
    entry_id: String,
    text: Option<String>,
    category: Option<String>,
    date: Option<String>,
) -> Result<()> {
    let (mut journal, location) = load_current_journal()?;
    let current = journal
        .entry(&entry_id)
        .cloned()
        .ok_or_else(|| anyhow!("entry {} not found", entry_id))?;
    let day = date.as_deref().map(parse_date).transpose()?;
    let text = text.unwrap_or_else(|| current.text().to_string());
    let category_id = category.unwrap_or(current.category_id);
    journal
        .update_entry(&entry_id, &text, &category_id, day)
        .with_context(|| format!("editing entry {}", entry_id))?;
    save_journal(&location, &journal)?;
    println!("Updated entry {}", entry_id);
    Ok(())
}

pub fn delete(entry_id: String) -> Result<()> {
    let (mut journal, location) = load_current_journal()?;
    journal.delete_entry(&entry_id)?;
    save_journal(&location, &journal)?;
    println!("Deleted entry {}", entry_id);
    Ok(())
}

pub fn category_list() -> Result<()> {
    let (journal, _) = load_current_journal()?;
    for category in &journal.categories {
        println!(
            "  - {}: {} [{} / {}] ({} entries)",
            category.id,
            category.name,
            category.icon,
            category.color.label(),
            journal.entry_count_for(&category.id)
        );
    }
    Ok(())
}

pub fn category_add(name: String, icon: String, color: String) -> Result<()> {
    let (mut journal, location) = load_current_journal()?;
    let color = parse_color(&color)?;
    let id = journal.add_category(&name, &icon, color)?;
    save_journal(&location, &journal)?;
    println!("Added category {}", id);
    Ok(())
}

pub fn category_edit(
    category_id: String,
    name: Option<String>,
    icon: Option<String>,
    color: Option<String>,
) -> Result<()> {
    let (mut journal, location) = load_current_journal()?;
    let current = journal
        .category(&category_id)
        .cloned()
        .ok_or_else(|| anyhow!("category {} not found", category_id))?;
    let color = match color {
        Some(c) => parse_color(&c)?,
        None => current.color,
    };
    journal.update_category(
        &category_id,
        name.as_deref().unwrap_or(&current.name),
        icon.as_deref().unwrap_or(&current.icon),
        color,
    )?;
    save_journal(&location, &journal)?;
    println!("Updated category {}", category_id);
    Ok(())
}

pub fn category_delete(category_id: String) -> Result<()> {
    let (mut journal, location) = load_current_journal()?;
    let removed = journal.delete_category(&category_id)?;
    save_journal(&location, &journal)?;
    println!("Deleted category {} and {} entries", category_id, removed);
    Ok(())
}

pub fn report_generate(config: &Config, period: String) -> Result<()> {
    let period = Period::parse(&period)
        .ok_or_else(|| anyhow!("unknown period {} (use day, week or month)", period))?;
    let (mut journal, location) = load_current_journal()?;
    let relay = HttpRelay::new(&config.relay)?;
    let report = ReportGenerator::new(&relay, &config.relay)
        .generate(&journal, period, &Local::now())
        .context("generating report")?;
    println!("{}", report.content);
    println!();
    println!("Saved report {}", report.id);
    journal.add_report(report);
    save_journal(&location, &journal)?;
    Ok(())
}

pub fn report_list() -> Result<()> {
    let (journal, _) = load_current_journal()?;
    if journal.reports.is_empty() {
        println!("  (no reports)");
    }
    for report in &journal.reports {
        println!(
            "  - {}: {} {} .. {} (generated {})",
            report.id,
            report.period.label(),
            format_date(report.start_date.with_timezone(&Local).date_naive()),
            format_date(report.end_date.with_timezone(&Local).date_naive()),
            report
                .generated_at
                .with_timezone(&Local)
                .format("%Y-%m-%d %H:%M")
        );
    }
    Ok(())
}

pub fn report_show(report_id: String) -> Result<()> {
    let (journal, _) = load_current_journal()?;
    let report = journal
        .report(&report_id)
        .ok_or_else(|| anyhow!("report {} not found", report_id))?;
    println!("{}", report.content);
    Ok(())
}

pub fn report_delete(report_id: String) -> Result<()> {
    let (mut journal, location) = load_current_journal()?;
    journal.delete_report(&report_id)?;
    save_journal(&location, &journal)?;
    println!("Deleted report {}", report_id);
    Ok(())
}

pub fn tui(config: Config) -> Result<()> {
    let (journal, location) = load_current_journal()?;
    ui::run(journal, location, config)
}

fn load_current_journal() -> Result<(Journal, JournalLocation)> {
    let cwd = env::current_dir()?;
    let location = locate_journal(&cwd)?;
    let journal = load_journal(&location)?;
    Ok((journal, location))
}

fn parse_color(raw: &str) -> Result<CategoryColor> {
    match CategoryColor::parse(raw) {
        Some(color) => Ok(color),
        None => bail!(
            "unknown color {} (use one of {})",
            raw,
            CategoryColor::ALL
                .iter()
                .map(|c| c.label())
                .collect::<Vec<_>>()
                .join(", ")
        ),
    }
}

fn print_entry(journal: &Journal, entry: &Entry) {
    let category = journal
        .category(&entry.category_id)
        .map(|c| c.name.as_str())
        .unwrap_or("Unknown");
    println!(
        "  - {} [{}] {}: {}",
        entry.id,
        entry
            .created_at
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M"),
        category,
        entry.text()
    );
    if !entry.tags().is_empty() {
        println!("    tags: {}", entry.tags().join(", "));
    }
}
