//! Dashboard exporter: the week's plan plus recovery and cycle status as one
//! JSON document for the web dashboard.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;
use tracing::info;

use crate::cycle::CyclePhase;
use crate::models::plan::{DayName, ExerciseEntry, WeeklyPlan};
use crate::models::profile::Profile;
use crate::recovery::RecoverySnapshot;

#[derive(Error, Debug)]
pub enum DashboardError {
  #[error("Failed to access dashboard file: {0}")]
  Io(#[from] io::Error),

  #[error("Invalid dashboard JSON: {0}")]
  Json(#[from] serde_json::Error),
}

/// Recovery section as the dashboard reads it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardRecovery {
  pub sleep_score: Option<i64>,
  pub sleep_hours: Option<f64>,
  pub sleep_quality: Option<String>,
  pub body_battery: Option<i64>,
  pub hrv_status: Option<String>,
  pub recovery_ready: bool,
  pub notes: Vec<String>,
}

impl From<&RecoverySnapshot> for DashboardRecovery {
  fn from(snapshot: &RecoverySnapshot) -> Self {
    Self {
      sleep_score: snapshot.sleep_score,
      sleep_hours: snapshot.sleep_duration_hours,
      sleep_quality: snapshot.sleep_quality.clone(),
      body_battery: snapshot.body_battery_current,
      hrv_status: snapshot.hrv_status.clone(),
      recovery_ready: snapshot.recovery_ready,
      notes: snapshot.recovery_notes.clone(),
    }
  }
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardData {
  pub last_updated: DateTime<Utc>,
  pub current_week: u32,
  pub cycle_phase: Option<CyclePhase>,
  pub recovery: DashboardRecovery,
  pub coaching_notes: String,
  pub workouts: BTreeMap<DayName, Vec<ExerciseEntry>>,
}

impl DashboardData {
  pub fn build(
    profile: &Profile,
    plan: &WeeklyPlan,
    recovery: &RecoverySnapshot,
    cycle: Option<&CyclePhase>,
    now: DateTime<Utc>,
  ) -> Self {
    Self {
      last_updated: now,
      current_week: profile.current_week,
      cycle_phase: cycle.cloned(),
      recovery: recovery.into(),
      coaching_notes: plan.coaching_notes.clone().unwrap_or_default(),
      workouts: plan.days.clone(),
    }
  }
}

/// Write the full dashboard document
pub fn export(path: &Path, data: &DashboardData) -> Result<(), DashboardError> {
  fs::write(path, serde_json::to_string_pretty(data)?)?;
  info!(path = %path.display(), week = data.current_week, "dashboard data exported");
  Ok(())
}

/// Update the recovery, cycle and timestamp sections of an existing dashboard
/// file, leaving the workouts alone. A missing file starts from an empty
/// document.
pub fn refresh_recovery(
  path: &Path,
  recovery: &RecoverySnapshot,
  cycle: Option<&CyclePhase>,
  now: DateTime<Utc>,
) -> Result<(), DashboardError> {
  let mut document = match fs::read_to_string(path) {
    Ok(contents) => match serde_json::from_str::<Value>(&contents)? {
      Value::Object(map) => map,
      _ => Map::new(),
    },
    Err(e) if e.kind() == io::ErrorKind::NotFound => Map::new(),
    Err(e) => return Err(e.into()),
  };

  document.insert(
    "recovery".to_string(),
    serde_json::to_value(DashboardRecovery::from(recovery))?,
  );
  document.insert("cycle_phase".to_string(), serde_json::to_value(cycle)?);
  document.insert("last_updated".to_string(), serde_json::to_value(now)?);

  fs::write(path, serde_json::to_string_pretty(&Value::Object(document))?)?;
  info!(path = %path.display(), "dashboard recovery refreshed");
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cycle::cycle_phase_from_str;
  use crate::test_utils::{mock_plan, mock_profile};
  use chrono::{NaiveDate, TimeZone};

  fn snapshot() -> RecoverySnapshot {
    let mut snapshot = RecoverySnapshot::empty(NaiveDate::from_ymd_opt(2025, 1, 14).unwrap());
    snapshot.sleep_score = Some(78);
    snapshot.sleep_duration_hours = Some(7.2);
    snapshot.body_battery_current = Some(64);
    snapshot.recovery_notes = vec!["High stress (55) - include mindfulness".to_string()];
    snapshot
  }

  fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 15, 5, 0, 0).unwrap()
  }

  #[test]
  fn test_export_document_shape() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dashboard_data.json");
    let cycle = cycle_phase_from_str(NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(), "2025-01-01", 28)
      .unwrap();

    let data = DashboardData::build(&mock_profile(), &mock_plan(), &snapshot(), Some(&cycle), now());
    export(&path, &data).unwrap();

    let written: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(written["current_week"], 4);
    assert_eq!(written["last_updated"], "2025-01-15T05:00:00Z");
    assert_eq!(written["cycle_phase"]["phase"], "Ovulation");
    assert_eq!(written["cycle_phase"]["day"], 15);
    assert_eq!(written["recovery"]["sleep_hours"], 7.2);
    assert_eq!(written["recovery"]["body_battery"], 64);
    assert_eq!(written["recovery"]["recovery_ready"], true);
    assert_eq!(written["coaching_notes"], "Heavy hinge focus this week.");
    assert_eq!(written["workouts"]["Monday"][0]["exercise"], "Barbell Hip Thrust");
    assert!(written["workouts"].get("Tuesday").is_none());
  }

  #[test]
  fn test_export_without_notes_or_cycle() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dashboard_data.json");
    let mut plan = mock_plan();
    plan.coaching_notes = None;

    let data = DashboardData::build(&mock_profile(), &plan, &snapshot(), None, now());
    export(&path, &data).unwrap();

    let written: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(written["coaching_notes"], "");
    assert!(written["cycle_phase"].is_null());
  }

  #[test]
  fn test_refresh_recovery_keeps_workouts() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dashboard_data.json");
    let data = DashboardData::build(&mock_profile(), &mock_plan(), &RecoverySnapshot::empty(NaiveDate::from_ymd_opt(2025, 1, 7).unwrap()), None, now());
    export(&path, &data).unwrap();

    let later = Utc.with_ymd_and_hms(2025, 1, 16, 6, 30, 0).unwrap();
    refresh_recovery(&path, &snapshot(), None, later).unwrap();

    let written: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(written["recovery"]["sleep_score"], 78);
    assert_eq!(written["last_updated"], "2025-01-16T06:30:00Z");
    assert_eq!(written["workouts"]["Wednesday"][0]["exercise"], "Smith Machine Squat");
    assert_eq!(written["current_week"], 4);
  }

  #[test]
  fn test_refresh_recovery_creates_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dashboard_data.json");

    refresh_recovery(&path, &snapshot(), None, now()).unwrap();

    let written: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(written["recovery"]["notes"][0], "High stress (55) - include mindfulness");
    assert!(written.get("workouts").is_none());
  }

  #[test]
  fn test_refresh_recovery_rejects_corrupt_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dashboard_data.json");
    fs::write(&path, "{ truncated").unwrap();

    let result = refresh_recovery(&path, &snapshot(), None, now());
    assert!(matches!(result, Err(DashboardError::Json(_))));
  }
}
