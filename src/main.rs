mod cli;
mod commands;
mod ui;

use anyhow::{Context, Result};
use clap::Parser;
use reflect::config::{default_log_path, Config};
use std::fs::{self, OpenOptions};
use std::sync::Mutex;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let args = cli::Cli::parse();
    let config = Config::load(args.config.as_deref())?;
    init_tracing(&config)?;
    info!(
        config = ?args.config,
        log_level = %config.log_level,
        "configuration loaded"
    );

    let command = args.command.unwrap_or(cli::Command::Tui);
    match command {
        cli::Command::Init => commands::init(),
        cli::Command::List { date, category } => commands::list(date, category),
        cli::Command::Add {
            text,
            category,
            date,
        } => commands::add(text, category, date),
        cli::Command::Edit {
            entry_id,
            text,
            category,
            date,
        } => commands::edit(entry_id, text, category, date),
        cli::Command::Delete { entry_id } => commands::delete(entry_id),
        cli::Command::Category { action } => match action {
            cli::CategoryAction::List => commands::category_list(),
            cli::CategoryAction::Add { name, icon, color } => {
                commands::category_add(name, icon, color)
            }
            cli::CategoryAction::Edit {
                category_id,
                name,
                icon,
                color,
            } => commands::category_edit(category_id, name, icon, color),
            cli::CategoryAction::Delete { category_id } => commands::category_delete(category_id),
        },
        cli::Command::Report { action } => match action {
            cli::ReportAction::Generate { period } => commands::report_generate(&config, period),
            cli::ReportAction::List => commands::report_list(),
            cli::ReportAction::Show { report_id } => commands::report_show(report_id),
            cli::ReportAction::Delete { report_id } => commands::report_delete(report_id),
        },
        cli::Command::Tui => commands::tui(config),
    }
}

/// Logs go to a file: the TUI owns the terminal. `RUST_LOG` overrides the
/// configured level.
fn init_tracing(config: &Config) -> Result<()> {
    let path = default_log_path()?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("creating {:?}", parent))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("opening log file {:?}", path))?;
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}
