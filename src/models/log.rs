use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One row of the workout log
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct LoggedSet {
  pub id: i64,
  pub week: i64,
  pub day: String,
  pub position: i64,
  pub exercise: String,
  pub sets: Option<String>,
  pub reps: Option<String>,
  pub rest: Option<String>,
  pub target_weight: Option<String>,
  pub actual_weight: Option<String>,
  pub actual_reps: Option<String>,
  pub rpe: Option<f64>,
  pub cues: Option<String>,
  pub notes: Option<String>,
  pub done: bool,
  pub created_at: Option<DateTime<Utc>>,
}

/// What the athlete reports back for a logged exercise
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SetResult {
  pub actual_weight: Option<String>,
  pub actual_reps: Option<String>,
  pub rpe: Option<f64>,
  pub notes: Option<String>,
  pub done: bool,
}
