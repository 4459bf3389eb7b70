//! Calendar distributor
//!
//! Pushes one early-morning event per plan day to a Google Calendar (v3 REST,
//! bearer token) and can sweep those events away again.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::env;
use tracing::{debug, info, warn};
use url::Url;

use crate::models::plan::{DayName, ExerciseEntry, WeeklyPlan};
use crate::models::profile::Profile;

/// ---------------------------------------------------------------------------
/// Configuration
/// ---------------------------------------------------------------------------

/// Every event this crate creates has a summary starting with this
pub const EVENT_SUMMARY_PREFIX: &str = "Workout:";

const DEFAULT_API_BASE: &str = "https://www.googleapis.com/calendar/v3";
const DEFAULT_TIMEZONE: &str = "America/New_York";
const DEFAULT_CALENDAR_ID: &str = "primary";
const EVENT_START: (u32, u32) = (4, 30);
const EVENT_END: (u32, u32) = (5, 30);

#[derive(Debug, Clone)]
pub struct CalendarConfig {
  pub api_base: String,
  pub access_token: String,
  pub calendar_id: String,
  pub timezone: String,
}

impl CalendarConfig {
  /// Token from `CALENDAR_ACCESS_TOKEN`.
  ///
  /// The calendar is `CALENDAR_ID`, else the profile's `calendar_id`, else the
  /// plan recipient's address, else `primary`.
  pub fn from_env(profile: &Profile, recipient: Option<&str>) -> Result<Self, CalendarError> {
    let access_token = env::var("CALENDAR_ACCESS_TOKEN")
      .map_err(|_| CalendarError::MissingConfig("CALENDAR_ACCESS_TOKEN".into()))?;

    let calendar_id = env::var("CALENDAR_ID")
      .ok()
      .or_else(|| profile.calendar_id.clone())
      .or_else(|| recipient.map(str::to_string))
      .unwrap_or_else(|| DEFAULT_CALENDAR_ID.to_string());

    Ok(Self {
      api_base: env::var("CALENDAR_API_BASE").unwrap_or_else(|_| DEFAULT_API_BASE.to_string()),
      access_token,
      calendar_id,
      timezone: env::var("CALENDAR_TIMEZONE").unwrap_or_else(|_| DEFAULT_TIMEZONE.to_string()),
    })
  }
}

/// ---------------------------------------------------------------------------
/// Error Handling
/// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum CalendarError {
  #[error("Missing configuration: {0}")]
  MissingConfig(String),

  #[error("Invalid calendar URL: {0}")]
  InvalidUrl(String),

  #[error("HTTP request failed: {0}")]
  Request(String),

  #[error("API error: {0}")]
  Api(String),

  #[error("Parse error: {0}")]
  Parse(String),
}

impl From<reqwest::Error> for CalendarError {
  fn from(e: reqwest::Error) -> Self {
    CalendarError::Request(e.to_string())
  }
}

impl From<url::ParseError> for CalendarError {
  fn from(e: url::ParseError) -> Self {
    CalendarError::InvalidUrl(e.to_string())
  }
}

/// ---------------------------------------------------------------------------
/// Event Building
/// ---------------------------------------------------------------------------

/// The next date falling on `day`, strictly after `today`.
///
/// Running on the target weekday itself schedules a week out.
pub fn next_occurrence(today: NaiveDate, day: DayName) -> NaiveDate {
  let current = today.weekday().num_days_from_monday() as i64;
  let target = day.weekday().num_days_from_monday() as i64;

  let mut days_ahead = target - current;
  if days_ahead <= 0 {
    days_ahead += 7;
  }
  today + Duration::days(days_ahead)
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorkoutEvent {
  pub day: DayName,
  pub summary: String,
  pub description: String,
  pub start: NaiveDateTime,
  pub end: NaiveDateTime,
}

/// One `- name (setsxreps)` line per exercise
pub fn describe_day(entries: &[ExerciseEntry]) -> String {
  entries
    .iter()
    .map(|entry| {
      format!(
        "- {} ({}x{})",
        entry.exercise,
        entry.sets_or_default(),
        entry.reps_or_default()
      )
    })
    .collect::<Vec<_>>()
    .join("\n")
}

/// Events for every plan day that has exercises, in week order
pub fn build_events(plan: &WeeklyPlan, today: NaiveDate) -> Vec<WorkoutEvent> {
  let at = |date: NaiveDate, (hour, minute): (u32, u32)| {
    NaiveTime::from_hms_opt(hour, minute, 0).map(|time| date.and_time(time))
  };

  plan
    .days
    .iter()
    .filter(|(_, entries)| !entries.is_empty())
    .filter_map(|(day, entries)| {
      let date = next_occurrence(today, *day);
      Some(WorkoutEvent {
        day: *day,
        summary: format!("{} {}", EVENT_SUMMARY_PREFIX, day),
        description: describe_day(entries),
        start: at(date, EVENT_START)?,
        end: at(date, EVENT_END)?,
      })
    })
    .collect()
}

/// ---------------------------------------------------------------------------
/// API Types
/// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct EventBody<'a> {
  summary: &'a str,
  description: &'a str,
  start: EventTime<'a>,
  end: EventTime<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EventTime<'a> {
  date_time: String,
  time_zone: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedEvent {
  pub id: String,
  pub html_link: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListedEvent {
  pub id: String,
  #[serde(default)]
  pub summary: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPage {
  #[serde(default)]
  pub items: Vec<ListedEvent>,
  pub next_page_token: Option<String>,
}

/// ---------------------------------------------------------------------------
/// Calendar Client
/// ---------------------------------------------------------------------------

pub struct CalendarClient {
  client: Client,
  config: CalendarConfig,
}

impl CalendarClient {
  pub fn new(config: CalendarConfig) -> Self {
    Self {
      client: Client::new(),
      config,
    }
  }

  pub fn calendar_id(&self) -> &str {
    &self.config.calendar_id
  }

  /// `{base}/calendars/{id}/events[/{extra}]` with each segment escaped
  fn events_url(&self, extra: Option<&str>) -> Result<Url, CalendarError> {
    let mut url = Url::parse(&self.config.api_base)?;
    {
      let mut segments = url
        .path_segments_mut()
        .map_err(|_| CalendarError::InvalidUrl(self.config.api_base.clone()))?;
      segments
        .pop_if_empty()
        .extend(["calendars", self.config.calendar_id.as_str(), "events"]);
      if let Some(extra) = extra {
        segments.push(extra);
      }
    }
    Ok(url)
  }

  async fn check(response: reqwest::Response, action: &str) -> Result<String, CalendarError> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
      return Err(CalendarError::Api(format!(
        "{} failed with {}: {}",
        action, status, body
      )));
    }
    Ok(body)
  }

  pub async fn insert_event(&self, event: &WorkoutEvent) -> Result<CreatedEvent, CalendarError> {
    let body = EventBody {
      summary: &event.summary,
      description: &event.description,
      start: EventTime {
        date_time: event.start.format("%Y-%m-%dT%H:%M:%S").to_string(),
        time_zone: &self.config.timezone,
      },
      end: EventTime {
        date_time: event.end.format("%Y-%m-%dT%H:%M:%S").to_string(),
        time_zone: &self.config.timezone,
      },
    };

    let response = self
      .client
      .post(self.events_url(None)?)
      .bearer_auth(&self.config.access_token)
      .json(&body)
      .send()
      .await?;

    let body = Self::check(response, "insert event").await?;
    let created: CreatedEvent =
      serde_json::from_str(&body).map_err(|e| CalendarError::Parse(e.to_string()))?;

    debug!(
      event_id = %created.id,
      link = created.html_link.as_deref().unwrap_or(""),
      "calendar event created"
    );
    Ok(created)
  }

  /// One page of events matching the workout summary prefix
  pub async fn list_workout_events(
    &self,
    page_token: Option<&str>,
  ) -> Result<EventPage, CalendarError> {
    let mut url = self.events_url(None)?;
    {
      let mut query = url.query_pairs_mut();
      query
        .append_pair("q", EVENT_SUMMARY_PREFIX)
        .append_pair("singleEvents", "true")
        .append_pair("orderBy", "startTime");
      if let Some(token) = page_token {
        query.append_pair("pageToken", token);
      }
    }

    let response = self
      .client
      .get(url)
      .bearer_auth(&self.config.access_token)
      .send()
      .await?;

    let body = Self::check(response, "list events").await?;
    serde_json::from_str(&body).map_err(|e| CalendarError::Parse(e.to_string()))
  }

  pub async fn delete_event(&self, event_id: &str) -> Result<(), CalendarError> {
    let response = self
      .client
      .delete(self.events_url(Some(event_id))?)
      .bearer_auth(&self.config.access_token)
      .send()
      .await?;

    Self::check(response, "delete event").await?;
    Ok(())
  }

  /// Create events for the plan. A failed insert is logged and skipped;
  /// returns how many events were created.
  pub async fn push_plan(&self, plan: &WeeklyPlan, today: NaiveDate) -> usize {
    let mut created = 0;
    for event in build_events(plan, today) {
      match self.insert_event(&event).await {
        Ok(_) => created += 1,
        Err(e) => warn!(day = %event.day, error = %e, "failed to create calendar event"),
      }
    }

    info!(calendar = %self.config.calendar_id, events = created, "pushed plan to calendar");
    created
  }

  /// Delete every workout event on the calendar, following pagination.
  ///
  /// Listing errors abort the sweep; a failed delete is logged and skipped.
  pub async fn clear_workout_events(&self) -> Result<usize, CalendarError> {
    let mut deleted = 0;
    let mut page_token: Option<String> = None;

    loop {
      let page = self.list_workout_events(page_token.as_deref()).await?;

      for event in page
        .items
        .iter()
        .filter(|event| event.summary.contains(EVENT_SUMMARY_PREFIX))
      {
        match self.delete_event(&event.id).await {
          Ok(()) => {
            debug!(event_id = %event.id, summary = %event.summary, "deleted workout event");
            deleted += 1;
          }
          Err(e) => warn!(event_id = %event.id, error = %e, "failed to delete workout event"),
        }
      }

      match page.next_page_token {
        Some(token) => page_token = Some(token),
        None => break,
      }
    }

    info!(calendar = %self.config.calendar_id, deleted, "cleared workout events");
    Ok(deleted)
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
