use anyhow::{bail, Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DAYS_PER_WEEK: usize = 7;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub log_level: String,
    pub calendar: CalendarConfig,
    pub tui: TuiConfig,
    pub relay: RelayConfig,
}

/// Sizing and timing of the infinite calendar. Distances are in viewport
/// pixels.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct CalendarConfig {
    pub initial_days: usize,
    pub weeks_back: u32,
    pub load_more_days: usize,
    pub scroll_threshold: u32,
    pub scroll_top_offset: u32,
    pub initial_scroll_delay_ms: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct TuiConfig {
    /// Pixels represented by one terminal row.
    pub row_height: u32,
    pub day_card_height: u16,
    pub tick_ms: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct RelayConfig {
    pub url: String,
    pub model: String,
    pub temperature: f32,
    pub top_p: f32,
    pub timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
            calendar: CalendarConfig::default(),
            tui: TuiConfig::default(),
            relay: RelayConfig::default(),
        }
    }
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            initial_days: 168,
            weeks_back: 8,
            load_more_days: 28,
            scroll_threshold: 600,
            scroll_top_offset: 80,
            initial_scroll_delay_ms: 150,
        }
    }
}

impl Default for TuiConfig {
    fn default() -> Self {
        Self {
            row_height: 20,
            day_card_height: 9,
            tick_ms: 100,
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:3001".into(),
            model: "gemini-3-flash-preview".into(),
            temperature: 0.7,
            top_p: 0.95,
            timeout_secs: 120,
        }
    }
}

impl Config {
    /// Loads `path`, or the default config location when `path` is `None`.
    /// A missing default file yields the built-in defaults; a missing
    /// explicit file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (default_config_path()?, false),
        };
        if !path.exists() {
            if explicit {
                bail!("config file not found: {}", path.display());
            }
            return Ok(Config::default());
        }
        let data =
            fs::read_to_string(&path).with_context(|| format!("reading {:?}", path))?;
        let config = Self::from_yaml(&data).with_context(|| format!("loading {:?}", path))?;
        Ok(config)
    }

    pub fn from_yaml(data: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(data).context("parsing config file")?;
        config.calendar.validate()?;
        config.tui.validate()?;
        Ok(config)
    }
}

impl CalendarConfig {
    pub fn initial_scroll_delay(&self) -> Duration {
        Duration::from_millis(self.initial_scroll_delay_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.initial_days == 0 || self.initial_days % DAYS_PER_WEEK != 0 {
            bail!(
                "calendar.initial_days must be a positive multiple of 7 (got {})",
                self.initial_days
            );
        }
        if self.load_more_days == 0 || self.load_more_days % DAYS_PER_WEEK != 0 {
            bail!(
                "calendar.load_more_days must be a positive multiple of 7 (got {})",
                self.load_more_days
            );
        }
        if self.weeks_back as usize * DAYS_PER_WEEK >= self.initial_days {
            bail!(
                "calendar.weeks_back ({}) leaves no room for the current week in {} days",
                self.weeks_back,
                self.initial_days
            );
        }
        Ok(())
    }
}

impl TuiConfig {
    pub fn validate(&self) -> Result<()> {
        if self.row_height == 0 {
            bail!("tui.row_height must be positive");
        }
        if self.day_card_height < 5 {
            bail!(
                "tui.day_card_height must be at least 5 rows (got {})",
                self.day_card_height
            );
        }
        Ok(())
    }
}

pub fn default_config_path() -> Result<PathBuf> {
    Ok(project_dirs()?.config_dir().join("config.yml"))
}

pub fn default_log_path() -> Result<PathBuf> {
    Ok(project_dirs()?.data_dir().join("reflect.log"))
}

pub(crate) fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("", "", "reflect").context("locating user directories")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_calendar_constants() {
        let cal = CalendarConfig::default();
        assert_eq!(cal.initial_days, 168);
        assert_eq!(cal.weeks_back, 8);
        assert_eq!(cal.load_more_days, 28);
        assert_eq!(cal.scroll_threshold, 600);
        assert_eq!(cal.scroll_top_offset, 80);
        assert_eq!(cal.initial_scroll_delay(), Duration::from_millis(150));
        assert!(cal.validate().is_ok());
    }

    #[test]
    fn partial_yaml_keeps_other_defaults() {
        let config = Config::from_yaml("calendar:\n  load_more_days: 14\nlog_level: debug\n").unwrap();
        assert_eq!(config.calendar.load_more_days, 14);
        assert_eq!(config.calendar.initial_days, 168);
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.relay, RelayConfig::default());
    }

    #[test]
    fn rejects_window_without_room_for_today() {
        let err = Config::from_yaml("calendar:\n  initial_days: 56\n  weeks_back: 8\n").unwrap_err();
        assert!(format!("{:#}", err).contains("weeks_back"));
    }

    #[test]
    fn rejects_partial_week_steps() {
        assert!(Config::from_yaml("calendar:\n  load_more_days: 10\n").is_err());
    }
}
