//! Run configuration from the environment (`.env` is loaded by the binary).
//!
//! Only local paths and the plan recipient live here. Each external service
//! reads its own credentials when its client is built.

use std::env;
use std::path::PathBuf;

use crate::models::profile::Profile;

const DEFAULT_PROFILE_PATH: &str = "user_profile.json";
const DEFAULT_DB_PATH: &str = "workout_log.db";
const DEFAULT_DASHBOARD_PATH: &str = "dashboard_data.json";
const DEFAULT_EMAIL_FALLBACK_PATH: &str = "weekly_plan.html";

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
  pub profile_path: PathBuf,
  pub db_path: PathBuf,
  pub dashboard_path: PathBuf,
  pub email_fallback_path: PathBuf,
  pub recipient_email: Option<String>,
}

impl Default for AppConfig {
  fn default() -> Self {
    Self {
      profile_path: PathBuf::from(DEFAULT_PROFILE_PATH),
      db_path: PathBuf::from(DEFAULT_DB_PATH),
      dashboard_path: PathBuf::from(DEFAULT_DASHBOARD_PATH),
      email_fallback_path: PathBuf::from(DEFAULT_EMAIL_FALLBACK_PATH),
      recipient_email: None,
    }
  }
}

impl AppConfig {
  pub fn from_env() -> Self {
    Self {
      profile_path: path_var("COACH_PROFILE_PATH", DEFAULT_PROFILE_PATH),
      db_path: path_var("COACH_DB_PATH", DEFAULT_DB_PATH),
      dashboard_path: path_var("COACH_DASHBOARD_PATH", DEFAULT_DASHBOARD_PATH),
      email_fallback_path: path_var("COACH_EMAIL_FALLBACK_PATH", DEFAULT_EMAIL_FALLBACK_PATH),
      recipient_email: env::var("RECIPIENT_EMAIL").ok().filter(|v| !v.trim().is_empty()),
    }
  }

  /// `RECIPIENT_EMAIL` wins over the profile's address
  pub fn recipient_for(&self, profile: &Profile) -> Option<String> {
    self
      .recipient_email
      .clone()
      .or_else(|| profile.recipient_email.clone())
  }
}

fn path_var(name: &str, default: &str) -> PathBuf {
  env::var(name)
    .ok()
    .filter(|v| !v.trim().is_empty())
    .map(PathBuf::from)
    .unwrap_or_else(|| PathBuf::from(default))
}
