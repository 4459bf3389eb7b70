//! Wearable recovery data for readiness-informed planning
//!
//! Pulls sleep, stress, body battery and HRV readings for one day from a
//! wearable-data HTTP provider (Garmin Connect response shapes) and derives a
//! readiness flag from simple red-flag thresholds.
//!
//! Every fetch is fail-soft: a failed reading is logged and left empty, and
//! the snapshot is still built from whatever came back.

use chrono::{Duration, NaiveDate, Utc};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::env;
use tracing::{debug, warn};

/// ---------------------------------------------------------------------------
/// Thresholds
/// ---------------------------------------------------------------------------

const POOR_SLEEP_SCORE: i64 = 50;
const SHORT_SLEEP_HOURS: f64 = 6.0;
const HIGH_STRESS_NOTE: i64 = 50;
const HIGH_STRESS_FLAG: i64 = 60;
const LOW_BODY_BATTERY: i64 = 30;
const LOW_HRV_STATUSES: [&str; 2] = ["LOW", "POOR"];
/// Two or more red flags means take it easy
const RED_FLAG_LIMIT: usize = 2;
/// Hours (UTC) that count as a morning body-battery reading
const MORNING_HOURS: std::ops::RangeInclusive<i64> = 6..=9;

/// ---------------------------------------------------------------------------
/// Configuration
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct WearableConfig {
  pub api_base: String,
  pub api_token: String,
}

impl WearableConfig {
  pub fn from_env() -> Result<Self, WearableError> {
    Ok(Self {
      api_base: env::var("WEARABLE_API_BASE")
        .map_err(|_| WearableError::MissingConfig("WEARABLE_API_BASE".into()))?,
      api_token: env::var("WEARABLE_API_TOKEN")
        .map_err(|_| WearableError::MissingConfig("WEARABLE_API_TOKEN".into()))?,
    })
  }
}

/// ---------------------------------------------------------------------------
/// Error Handling
/// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum WearableError {
  #[error("Missing configuration: {0}")]
  MissingConfig(String),

  #[error("HTTP request failed: {0}")]
  Request(String),

  #[error("API error: {0}")]
  Api(String),

  #[error("Parse error: {0}")]
  Parse(String),
}

impl From<reqwest::Error> for WearableError {
  fn from(e: reqwest::Error) -> Self {
    WearableError::Request(e.to_string())
  }
}

/// ---------------------------------------------------------------------------
/// Provider Response Shapes
/// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
pub struct SleepResponse {
  #[serde(rename = "dailySleepDTO", default)]
  pub daily_sleep: Option<DailySleep>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailySleep {
  pub sleep_time_seconds: Option<i64>,
  pub sleep_scores: Option<SleepScores>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SleepScores {
  pub overall: Option<ScoreValue>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ScoreValue {
  pub value: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StressResponse {
  pub overall_stress_level: Option<i64>,
}

/// One day of body battery; readings are `[epoch_millis, level, ..]`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BodyBatteryDay {
  #[serde(default)]
  pub body_battery_values_array: Vec<Vec<Option<i64>>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HrvResponse {
  pub hrv_summary: Option<HrvSummary>,
}

#[derive(Debug, Default, Deserialize)]
pub struct HrvSummary {
  pub status: Option<String>,
}

/// Whatever the provider returned for one day
#[derive(Debug, Default)]
pub struct WearableReadings {
  pub sleep: Option<SleepResponse>,
  pub stress: Option<StressResponse>,
  pub body_battery: Option<Vec<BodyBatteryDay>>,
  pub hrv: Option<HrvResponse>,
}

/// ---------------------------------------------------------------------------
/// Provider Client
/// ---------------------------------------------------------------------------

pub struct WearableClient {
  client: Client,
  config: WearableConfig,
}

impl WearableClient {
  pub fn new(config: WearableConfig) -> Self {
    Self {
      client: Client::new(),
      config,
    }
  }

  pub fn from_env() -> Result<Self, WearableError> {
    Ok(Self::new(WearableConfig::from_env()?))
  }

  async fn get_json<T: DeserializeOwned>(
    &self,
    resource: &str,
    date: NaiveDate,
  ) -> Result<T, WearableError> {
    let url = format!(
      "{}/{}/{}",
      self.config.api_base.trim_end_matches('/'),
      resource,
      date.format("%Y-%m-%d")
    );

    let response = self
      .client
      .get(&url)
      .bearer_auth(&self.config.api_token)
      .send()
      .await?;

    if !response.status().is_success() {
      let status = response.status();
      let error_text = response.text().await.unwrap_or_default();
      return Err(WearableError::Api(format!(
        "{} API error {}: {}",
        resource, status, error_text
      )));
    }

    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| WearableError::Parse(format!("{}: {}", resource, e)))
  }

  pub async fn fetch_sleep(&self, date: NaiveDate) -> Result<SleepResponse, WearableError> {
    self.get_json("sleep", date).await
  }

  pub async fn fetch_stress(&self, date: NaiveDate) -> Result<StressResponse, WearableError> {
    self.get_json("stress", date).await
  }

  pub async fn fetch_body_battery(
    &self,
    date: NaiveDate,
  ) -> Result<Vec<BodyBatteryDay>, WearableError> {
    self.get_json("body-battery", date).await
  }

  pub async fn fetch_hrv(&self, date: NaiveDate) -> Result<HrvResponse, WearableError> {
    self.get_json("hrv", date).await
  }

  /// Fetch every reading for `date`, keeping whichever ones succeed
  pub async fn fetch_readings(&self, date: NaiveDate) -> WearableReadings {
    WearableReadings {
      sleep: soft(self.fetch_sleep(date).await, "sleep"),
      stress: soft(self.fetch_stress(date).await, "stress"),
      body_battery: soft(self.fetch_body_battery(date).await, "body battery"),
      hrv: soft(self.fetch_hrv(date).await, "hrv"),
    }
  }
}

fn soft<T>(result: Result<T, WearableError>, what: &str) -> Option<T> {
  match result {
    Ok(value) => Some(value),
    Err(e) => {
      warn!(reading = what, error = %e, "wearable reading unavailable");
      None
    }
  }
}

/// ---------------------------------------------------------------------------
/// Recovery Snapshot
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoverySnapshot {
  pub date: NaiveDate,
  pub sleep_score: Option<i64>,
  pub sleep_duration_hours: Option<f64>,
  pub sleep_quality: Option<String>,
  pub stress_level: Option<i64>,
  pub body_battery_morning: Option<i64>,
  pub body_battery_current: Option<i64>,
  pub hrv_status: Option<String>,
  pub recovery_ready: bool,
  pub recovery_notes: Vec<String>,
}

impl RecoverySnapshot {
  /// No readings; ready by default
  pub fn empty(date: NaiveDate) -> Self {
    Self {
      date,
      sleep_score: None,
      sleep_duration_hours: None,
      sleep_quality: None,
      stress_level: None,
      body_battery_morning: None,
      body_battery_current: None,
      hrv_status: None,
      recovery_ready: true,
      recovery_notes: Vec::new(),
    }
  }

  pub fn from_readings(date: NaiveDate, readings: &WearableReadings) -> Self {
    let mut snapshot = Self::empty(date);

    if let Some(daily) = readings.sleep.as_ref().and_then(|s| s.daily_sleep.as_ref()) {
      snapshot.sleep_score = daily
        .sleep_scores
        .as_ref()
        .and_then(|scores| scores.overall.as_ref())
        .and_then(|overall| overall.value);
      snapshot.sleep_duration_hours = daily
        .sleep_time_seconds
        .filter(|secs| *secs > 0)
        .map(|secs| (secs as f64 / 3600.0 * 10.0).round() / 10.0);

      if let Some(score) = snapshot.sleep_score {
        let quality = Self::sleep_quality(score);
        if quality == "Poor" {
          snapshot
            .recovery_notes
            .push("Poor sleep - consider lighter workout".to_string());
        }
        snapshot.sleep_quality = Some(quality.to_string());
      }
    }

    // Negative stress values are the provider's "no data" sentinels
    if let Some(stress) = readings
      .stress
      .as_ref()
      .and_then(|s| s.overall_stress_level)
      .filter(|level| *level > 0)
    {
      snapshot.stress_level = Some(stress);
      if stress > HIGH_STRESS_NOTE {
        snapshot
          .recovery_notes
          .push(format!("High stress ({}) - include mindfulness", stress));
      }
    }

    if let Some(day) = readings.body_battery.as_ref().and_then(|days| days.first()) {
      let (morning, current) = Self::body_battery_levels(&day.body_battery_values_array);
      snapshot.body_battery_morning = morning;
      snapshot.body_battery_current = current;
    }

    if let Some(status) = readings
      .hrv
      .as_ref()
      .and_then(|h| h.hrv_summary.as_ref())
      .and_then(|summary| summary.status.clone())
    {
      if LOW_HRV_STATUSES.contains(&status.as_str()) {
        snapshot
          .recovery_notes
          .push("Low HRV - prioritize recovery".to_string());
      }
      snapshot.hrv_status = Some(status);
    }

    snapshot.recovery_ready = snapshot.compute_readiness();
    snapshot
  }

  pub fn sleep_quality(score: i64) -> &'static str {
    match score {
      s if s >= 80 => "Excellent",
      s if s >= 60 => "Good",
      s if s >= 40 => "Fair",
      _ => "Poor",
    }
  }

  /// First reading in the morning window, and the latest reading of the day
  pub fn body_battery_levels(readings: &[Vec<Option<i64>>]) -> (Option<i64>, Option<i64>) {
    let level = |reading: &Vec<Option<i64>>| reading.get(1).copied().flatten();

    let morning = readings
      .iter()
      .filter(|reading| {
        reading
          .first()
          .copied()
          .flatten()
          .map(|millis| MORNING_HOURS.contains(&((millis / 3_600_000) % 24)))
          .unwrap_or(false)
      })
      .find_map(level);

    let current = readings.iter().filter_map(level).last();

    (morning, current)
  }

  pub fn red_flags(&self) -> usize {
    let checks = [
      self.sleep_score.map(|s| s < POOR_SLEEP_SCORE),
      self.sleep_duration_hours.map(|h| h < SHORT_SLEEP_HOURS),
      self.stress_level.map(|s| s > HIGH_STRESS_FLAG),
      self.body_battery_morning.map(|b| b < LOW_BODY_BATTERY),
      self
        .hrv_status
        .as_deref()
        .map(|status| LOW_HRV_STATUSES.contains(&status)),
    ];
    checks.iter().filter(|flag| **flag == Some(true)).count()
  }

  pub fn compute_readiness(&self) -> bool {
    self.red_flags() < RED_FLAG_LIMIT
  }

  pub fn has_data(&self) -> bool {
    self.sleep_score.is_some()
      || self.sleep_duration_hours.is_some()
      || self.stress_level.is_some()
      || self.body_battery_current.is_some()
      || self.hrv_status.is_some()
  }

  /// Text block describing recovery for the planning prompt
  pub fn to_prompt_context(&self) -> String {
    let mut parts = Vec::new();

    if let Some(score) = self.sleep_score {
      parts.push(format!(
        "Sleep: {}/100 ({})",
        score,
        self.sleep_quality.as_deref().unwrap_or("n/a")
      ));
    }
    if let Some(hours) = self.sleep_duration_hours {
      parts.push(format!("Slept: {}hrs", hours));
    }
    if let Some(stress) = self.stress_level {
      parts.push(format!("Stress: {}/100", stress));
    }
    if let Some(battery) = self.body_battery_current {
      parts.push(format!("Body Battery: {}%", battery));
    }
    if let Some(status) = &self.hrv_status {
      parts.push(format!("HRV: {}", status));
    }
    if !self.recovery_ready {
      parts.push("Recovery metrics suggest taking it easier today".to_string());
    }
    if !self.recovery_notes.is_empty() {
      parts.push(format!("Notes: {}", self.recovery_notes.join("; ")));
    }

    if parts.is_empty() {
      "No wearable data available".to_string()
    } else {
      parts.join("\n")
    }
  }
}

/// Yesterday is the default: last night's sleep is complete by then
pub fn default_snapshot_date() -> NaiveDate {
  Utc::now().date_naive() - Duration::days(1)
}

/// Build a snapshot for `date`. Without a client the snapshot is empty and
/// carries a note saying so.
pub async fn build_snapshot(client: Option<&WearableClient>, date: NaiveDate) -> RecoverySnapshot {
  match client {
    Some(client) => {
      let readings = client.fetch_readings(date).await;
      let snapshot = RecoverySnapshot::from_readings(date, &readings);
      debug!(
        date = %date,
        ready = snapshot.recovery_ready,
        red_flags = snapshot.red_flags(),
        "recovery snapshot built"
      );
      snapshot
    }
    None => {
      let mut snapshot = RecoverySnapshot::empty(date);
      snapshot
        .recovery_notes
        .push("Could not connect to wearable provider".to_string());
      snapshot
    }
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;

  fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 14).unwrap()
  }

  fn millis_at_hour(hour: i64) -> i64 {
    // 2025-01-14T00:00:00Z
    1_736_812_800_000 + hour * 3_600_000
  }

  fn readings(score: i64, seconds: i64, stress: i64, hrv: &str) -> WearableReadings {
    WearableReadings {
      sleep: Some(SleepResponse {
        daily_sleep: Some(DailySleep {
          sleep_time_seconds: Some(seconds),
          sleep_scores: Some(SleepScores {
            overall: Some(ScoreValue { value: Some(score) }),
          }),
        }),
      }),
      stress: Some(StressResponse {
        overall_stress_level: Some(stress),
      }),
      body_battery: None,
      hrv: Some(HrvResponse {
        hrv_summary: Some(HrvSummary {
          status: Some(hrv.to_string()),
        }),
      }),
    }
  }

  #[test]
  fn test_sleep_quality_bands() {
    assert_eq!(RecoverySnapshot::sleep_quality(85), "Excellent");
    assert_eq!(RecoverySnapshot::sleep_quality(80), "Excellent");
    assert_eq!(RecoverySnapshot::sleep_quality(65), "Good");
    assert_eq!(RecoverySnapshot::sleep_quality(40), "Fair");
    assert_eq!(RecoverySnapshot::sleep_quality(39), "Poor");
  }

  #[test]
  fn test_well_rested_is_ready() {
    let snapshot = RecoverySnapshot::from_readings(date(), &readings(82, 27_000, 25, "BALANCED"));
    assert_eq!(snapshot.sleep_duration_hours, Some(7.5));
    assert_eq!(snapshot.sleep_quality.as_deref(), Some("Excellent"));
    assert_eq!(snapshot.red_flags(), 0);
    assert!(snapshot.recovery_ready);
    assert!(snapshot.recovery_notes.is_empty());
  }

  #[test]
  fn test_one_red_flag_is_still_ready() {
    // Short sleep only
    let snapshot = RecoverySnapshot::from_readings(date(), &readings(70, 19_800, 30, "BALANCED"));
    assert_eq!(snapshot.red_flags(), 1);
    assert!(snapshot.recovery_ready);
  }

  #[test]
  fn test_two_red_flags_not_ready() {
    // Poor sleep score + low HRV
    let snapshot = RecoverySnapshot::from_readings(date(), &readings(35, 27_000, 20, "LOW"));
    assert_eq!(snapshot.red_flags(), 2);
    assert!(!snapshot.recovery_ready);
    assert!(snapshot
      .recovery_notes
      .contains(&"Poor sleep - consider lighter workout".to_string()));
    assert!(snapshot
      .recovery_notes
      .contains(&"Low HRV - prioritize recovery".to_string()));
  }

  #[test]
  fn test_stress_note_and_flag_thresholds() {
    // 55 gets a note but is not a red flag
    let snapshot = RecoverySnapshot::from_readings(date(), &readings(75, 27_000, 55, "BALANCED"));
    assert_eq!(snapshot.red_flags(), 0);
    assert_eq!(snapshot.recovery_notes, vec!["High stress (55) - include mindfulness"]);

    let snapshot = RecoverySnapshot::from_readings(date(), &readings(75, 27_000, 61, "BALANCED"));
    assert_eq!(snapshot.red_flags(), 1);
  }

  #[test]
  fn test_negative_stress_ignored() {
    let snapshot = RecoverySnapshot::from_readings(date(), &readings(75, 27_000, -1, "BALANCED"));
    assert_eq!(snapshot.stress_level, None);
  }

  #[test]
  fn test_body_battery_morning_and_current() {
    let values = vec![
      vec![Some(millis_at_hour(2)), Some(40)],
      vec![Some(millis_at_hour(6)), None],
      vec![Some(millis_at_hour(7)), Some(72)],
      vec![Some(millis_at_hour(8)), Some(70)],
      vec![Some(millis_at_hour(18)), Some(35)],
      vec![Some(millis_at_hour(20)), None],
    ];

    let (morning, current) = RecoverySnapshot::body_battery_levels(&values);
    assert_eq!(morning, Some(72));
    assert_eq!(current, Some(35));
  }

  #[test]
  fn test_body_battery_empty() {
    assert_eq!(RecoverySnapshot::body_battery_levels(&[]), (None, None));
  }

  #[test]
  fn test_prompt_context_empty() {
    let snapshot = RecoverySnapshot::empty(date());
    assert!(!snapshot.has_data());
    assert_eq!(snapshot.to_prompt_context(), "No wearable data available");
  }

  #[test]
  fn test_prompt_context_lists_readings() {
    let mut snapshot = RecoverySnapshot::from_readings(date(), &readings(35, 18_000, 65, "POOR"));
    snapshot.body_battery_current = Some(22);

    let context = snapshot.to_prompt_context();
    assert!(context.contains("Sleep: 35/100 (Poor)"));
    assert!(context.contains("Slept: 5hrs"));
    assert!(context.contains("Stress: 65/100"));
    assert!(context.contains("Body Battery: 22%"));
    assert!(context.contains("HRV: POOR"));
    assert!(context.contains("taking it easier"));
  }

  #[tokio::test]
  async fn test_build_snapshot_without_client() {
    let snapshot = build_snapshot(None, date()).await;
    assert!(snapshot.recovery_ready);
    assert_eq!(snapshot.recovery_notes, vec!["Could not connect to wearable provider"]);
  }

  #[tokio::test]
  async fn test_fetch_readings_from_provider() {
    let mut server = mockito::Server::new_async().await;

    let sleep = server
      .mock("GET", "/sleep/2025-01-14")
      .match_header("authorization", "Bearer test-token")
      .with_status(200)
      .with_body(r#"{"dailySleepDTO":{"sleepTimeSeconds":25200,"sleepScores":{"overall":{"value":45}}}}"#)
      .create_async()
      .await;
    let stress = server
      .mock("GET", "/stress/2025-01-14")
      .with_status(200)
      .with_body(r#"{"overallStressLevel":64}"#)
      .create_async()
      .await;
    let battery = server
      .mock("GET", "/body-battery/2025-01-14")
      .with_status(200)
      .with_body(format!(
        r#"[{{"bodyBatteryValuesArray":[[{},55],[{},31]]}}]"#,
        millis_at_hour(7),
        millis_at_hour(19)
      ))
      .create_async()
      .await;
    // HRV endpoint failing must not sink the snapshot
    let hrv = server
      .mock("GET", "/hrv/2025-01-14")
      .with_status(500)
      .with_body("upstream unavailable")
      .create_async()
      .await;

    let client = WearableClient::new(WearableConfig {
      api_base: server.url(),
      api_token: "test-token".to_string(),
    });

    let snapshot = build_snapshot(Some(&client), date()).await;

    sleep.assert_async().await;
    stress.assert_async().await;
    battery.assert_async().await;
    hrv.assert_async().await;

    assert_eq!(snapshot.sleep_score, Some(45));
    assert_eq!(snapshot.sleep_duration_hours, Some(7.0));
    assert_eq!(snapshot.stress_level, Some(64));
    assert_eq!(snapshot.body_battery_morning, Some(55));
    assert_eq!(snapshot.body_battery_current, Some(31));
    assert_eq!(snapshot.hrv_status, None);
    // Poor sleep score + high stress
    assert!(!snapshot.recovery_ready);
  }

  #[tokio::test]
  async fn test_fetch_api_error() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
      .mock("GET", "/stress/2025-01-14")
      .with_status(401)
      .with_body("unauthorized")
      .create_async()
      .await;

    let client = WearableClient::new(WearableConfig {
      api_base: format!("{}/", server.url()),
      api_token: "bad".to_string(),
    });

    let result = client.fetch_stress(date()).await;
    assert!(matches!(result, Err(WearableError::Api(_))));
  }
}
