use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "reflect", version, about = "Terminal journal with an infinite calendar")]
pub struct Cli {
    /// Path to a config file (defaults to the user config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Initialize a journal in the current directory
    Init,
    /// List entries, newest first
    List {
        /// Only entries on this day (YYYY-MM-DD)
        #[arg(long)]
        date: Option<String>,
        /// Only entries in this category id
        #[arg(long)]
        category: Option<String>,
    },
    /// Record a new moment
    Add {
        /// Entry text; #words become tags
        text: String,
        /// Category id (defaults to the first category)
        #[arg(long, short = 'c')]
        category: Option<String>,
        /// Day to file the entry under (YYYY-MM-DD)
        #[arg(long)]
        date: Option<String>,
    },
    /// Edit an existing entry
    Edit {
        /// Entry id to edit
        entry_id: String,
        /// Replacement text
        #[arg(long)]
        text: Option<String>,
        /// Move to category id
        #[arg(long, short = 'c')]
        category: Option<String>,
        /// Move to day (YYYY-MM-DD)
        #[arg(long)]
        date: Option<String>,
    },
    /// Delete an entry
    Delete {
        /// Entry id to delete
        entry_id: String,
    },
    /// Manage categories
    Category {
        #[command(subcommand)]
        action: CategoryAction,
    },
    /// Generate and browse AI reports
    Report {
        #[command(subcommand)]
        action: ReportAction,
    },
    /// Launch the interactive TUI
    Tui,
}

#[derive(Subcommand, Debug)]
pub enum CategoryAction {
    /// List categories with their entry counts
    List,
    /// Add a category
    Add {
        name: String,
        /// Icon name from the icon library
        #[arg(long, default_value = "Star")]
        icon: String,
        /// One of blue, green, red, purple, yellow, orange, pink, teal, indigo
        #[arg(long, default_value = "blue")]
        color: String,
    },
    /// Edit a category
    Edit {
        category_id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        icon: Option<String>,
        #[arg(long)]
        color: Option<String>,
    },
    /// Delete a category and all of its entries
    Delete { category_id: String },
}

#[derive(Subcommand, Debug)]
pub enum ReportAction {
    /// Generate a report for day, week or month
    Generate { period: String },
    /// List stored reports
    List,
    /// Print a stored report
    Show { report_id: String },
    /// Delete a stored report
    Delete { report_id: String },
}
