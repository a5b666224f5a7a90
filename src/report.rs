//! AI summaries of journal entries over a day, week or month.
//!
//! Text generation happens behind a relay service; [`SummaryRelay`] is the
//! seam, [`HttpRelay`] the production implementation.

use crate::config::RelayConfig;
use crate::model::{generate_id, Category, Entry, Journal, Period, Report};
use chrono::{DateTime, Days, NaiveTime, TimeZone, Utc};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

pub const NO_ENTRIES_MESSAGE: &str = "No entries found for this period.";
const GENERATE_PATH: &str = "/api/gemini/generate";

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("summary relay is unreachable at {0}; make sure it is running")]
    Unreachable(String),

    #[error("the relay rejected the model API key; check GEMINI_API_KEY on the relay")]
    Unauthorized,

    #[error("model request quota exceeded, try again later")]
    QuotaExceeded,

    #[error("the model is not available from this location")]
    UnsupportedLocation,

    #[error("relay error (status {status}): {message}")]
    Relay { status: u16, message: String },

    #[error("the model returned an empty response")]
    EmptyResponse,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("report range does not exist in the local time zone")]
    InvalidRange,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SummaryRequest {
    pub prompt: String,
    pub model: String,
    pub temperature: f32,
    #[serde(rename = "topP")]
    pub top_p: f32,
}

pub trait SummaryRelay {
    fn generate(&self, request: &SummaryRequest) -> Result<String, ReportError>;
}

#[derive(Debug, Deserialize)]
struct RelayResponse {
    #[serde(default)]
    text: Option<String>,
}

pub struct HttpRelay {
    client: Client,
    base_url: String,
}

impl HttpRelay {
    pub fn new(config: &RelayConfig) -> Result<Self, ReportError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(HttpRelay {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}{}", self.base_url, GENERATE_PATH)
    }
}

impl SummaryRelay for HttpRelay {
    fn generate(&self, request: &SummaryRequest) -> Result<String, ReportError> {
        let endpoint = self.endpoint();
        debug!(%endpoint, model = %request.model, "sending summary request");
        let response = self
            .client
            .post(&endpoint)
            .json(request)
            .send()
            .map_err(|err| {
                if err.is_connect() || err.is_timeout() {
                    ReportError::Unreachable(self.base_url.clone())
                } else {
                    ReportError::Http(err)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            let message = relay_error_message(&body)
                .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
            warn!(status = status.as_u16(), %message, "relay returned an error");
            return Err(classify_relay_error(status.as_u16(), message));
        }

        let body: RelayResponse = response.json()?;
        match body.text.map(|t| t.trim().to_string()) {
            Some(text) if !text.is_empty() => Ok(text),
            _ => Err(ReportError::EmptyResponse),
        }
    }
}

/// Pulls `error.message` or a plain `error` string out of a relay error body.
fn relay_error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let error = value.get("error")?;
    error
        .get("message")
        .and_then(|m| m.as_str())
        .or_else(|| error.as_str())
        .map(str::to_string)
}

pub fn classify_relay_error(status: u16, message: String) -> ReportError {
    let lower = message.to_lowercase();
    if lower.contains("api key") || lower.contains("authentication") {
        ReportError::Unauthorized
    } else if lower.contains("quota") || lower.contains("limit") {
        ReportError::QuotaExceeded
    } else if lower.contains("location") || lower.contains("not supported") {
        ReportError::UnsupportedLocation
    } else {
        ReportError::Relay { status, message }
    }
}

/// Inclusive bounds of `period` ending today: today only, or the last 7 or
/// 30 days plus today.
pub fn period_range<Tz: TimeZone>(
    period: Period,
    now: &DateTime<Tz>,
) -> Result<(DateTime<Utc>, DateTime<Utc>), ReportError> {
    let tz = now.timezone();
    let today = now.date_naive();
    let days_back = match period {
        Period::Day => 0,
        Period::Week => 7,
        Period::Month => 30,
    };
    let first_day = today
        .checked_sub_days(Days::new(days_back))
        .ok_or(ReportError::InvalidRange)?;
    let start_of_day = NaiveTime::from_hms_opt(0, 0, 0).ok_or(ReportError::InvalidRange)?;
    let end_of_day =
        NaiveTime::from_hms_milli_opt(23, 59, 59, 999).ok_or(ReportError::InvalidRange)?;
    let start = tz
        .from_local_datetime(&first_day.and_time(start_of_day))
        .earliest()
        .ok_or(ReportError::InvalidRange)?;
    let end = tz
        .from_local_datetime(&today.and_time(end_of_day))
        .latest()
        .ok_or(ReportError::InvalidRange)?;
    Ok((start.with_timezone(&Utc), end.with_timezone(&Utc)))
}

pub fn entries_in_range(
    entries: &[Entry],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Vec<&Entry> {
    entries
        .iter()
        .filter(|e| e.created_at >= start && e.created_at <= end)
        .collect()
}

pub fn build_prompt<Tz>(
    entries: &[&Entry],
    categories: &[Category],
    period: Period,
    tz: &Tz,
) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    let formatted = entries
        .iter()
        .map(|e| {
            let category = categories
                .iter()
                .find(|c| c.id == e.category_id)
                .map(|c| c.name.as_str())
                .unwrap_or("Unknown");
            format!(
                "[{}][Category: {}] {}",
                e.created_at.with_timezone(tz).format("%H:%M:%S"),
                category,
                e.text()
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Analyse the following journal entries and write a {} report.\n\
         Answer in Markdown with these sections:\n\
         1. **Overview**: a short summary of the key events and activities.\n\
         2. **Emotional background**: the emotional tone and state of mind reflected in the entries.\n\
         3. **Patterns and insights**: recurring behaviours, habits, or links between actions and emotions.\n\
         4. **Recommendations**: 2-3 suggestions for more awareness or better wellbeing based on the observations.\n\
         \n\
         Journal entries:\n{}",
        period.adjective(),
        formatted
    )
}

/// Builds reports from a journal snapshot through a relay.
pub struct ReportGenerator<'r, R: SummaryRelay + ?Sized> {
    relay: &'r R,
    config: &'r RelayConfig,
}

impl<'r, R: SummaryRelay + ?Sized> ReportGenerator<'r, R> {
    pub fn new(relay: &'r R, config: &'r RelayConfig) -> Self {
        ReportGenerator { relay, config }
    }

    /// Produces a report for `period` ending on `now`'s day. An empty period
    /// is reported without contacting the relay.
    pub fn generate<Tz>(
        &self,
        journal: &Journal,
        period: Period,
        now: &DateTime<Tz>,
    ) -> Result<Report, ReportError>
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        let (start, end) = period_range(period, now)?;
        let entries = entries_in_range(&journal.entries, start, end);
        let content = if entries.is_empty() {
            NO_ENTRIES_MESSAGE.to_string()
        } else {
            let request = SummaryRequest {
                prompt: build_prompt(&entries, &journal.categories, period, &now.timezone()),
                model: self.config.model.clone(),
                temperature: self.config.temperature,
                top_p: self.config.top_p,
            };
            self.relay.generate(&request)?.trim().to_string()
        };
        info!(
            period = period.label(),
            entries = entries.len(),
            length = content.len(),
            "generated report"
        );
        Ok(Report {
            id: generate_id(),
            period,
            start_date: start,
            end_date: end,
            content,
            generated_at: now.with_timezone(&Utc),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn day_range_covers_today_only() {
        let now = Utc.with_ymd_and_hms(2024, 3, 14, 15, 30, 0).unwrap();
        let (start, end) = period_range(Period::Day, &now).unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 3, 14, 0, 0, 0).unwrap());
        assert_eq!(end.date_naive(), now.date_naive());
        assert_eq!(end.format("%H:%M:%S%.3f").to_string(), "23:59:59.999");
    }

    #[test]
    fn week_and_month_reach_back() {
        let now = Utc.with_ymd_and_hms(2024, 3, 14, 15, 30, 0).unwrap();
        let (week_start, _) = period_range(Period::Week, &now).unwrap();
        let (month_start, _) = period_range(Period::Month, &now).unwrap();
        assert_eq!(week_start, Utc.with_ymd_and_hms(2024, 3, 7, 0, 0, 0).unwrap());
        assert_eq!(month_start, Utc.with_ymd_and_hms(2024, 2, 13, 0, 0, 0).unwrap());
    }

    #[test]
    fn prompt_lists_entries_with_category_names() {
        let journal = Journal::seeded();
        let a = Entry::new(
            "a".into(),
            "1".into(),
            "shipped #release",
            Utc.with_ymd_and_hms(2024, 3, 14, 9, 5, 0).unwrap(),
        );
        let b = Entry::new(
            "b".into(),
            "gone".into(),
            "orphan",
            Utc.with_ymd_and_hms(2024, 3, 14, 10, 0, 0).unwrap(),
        );
        let prompt = build_prompt(&[&a, &b], &journal.categories, Period::Week, &Utc);
        assert!(prompt.contains("write a weekly report"));
        assert!(prompt.contains("[09:05:00][Category: Work] shipped #release"));
        assert!(prompt.contains("[10:00:00][Category: Unknown] orphan"));
    }

    #[test]
    fn relay_errors_are_classified() {
        assert!(matches!(
            classify_relay_error(401, "Invalid API key".into()),
            ReportError::Unauthorized
        ));
        assert!(matches!(
            classify_relay_error(429, "Quota exceeded".into()),
            ReportError::QuotaExceeded
        ));
        assert!(matches!(
            classify_relay_error(400, "User location is not supported".into()),
            ReportError::UnsupportedLocation
        ));
        assert!(matches!(
            classify_relay_error(500, "boom".into()),
            ReportError::Relay { status: 500, .. }
        ));
    }

    #[test]
    fn error_message_from_body() {
        assert_eq!(
            relay_error_message(r#"{"error":{"message":"bad key"}}"#).as_deref(),
            Some("bad key")
        );
        assert_eq!(relay_error_message(r#"{"error":"nope"}"#).as_deref(), Some("nope"));
        assert_eq!(relay_error_message("not json"), None);
    }

    #[test]
    fn request_serializes_top_p_in_camel_case() {
        let request = SummaryRequest {
            prompt: "p".into(),
            model: "m".into(),
            temperature: 0.5,
            top_p: 0.25,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["topP"], 0.25);
        assert!(json.get("top_p").is_none());
    }
}
