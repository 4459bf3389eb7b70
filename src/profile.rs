//! Profile store: load and save `user_profile.json`, and the two profile
//! updates a run makes (new exercises, week counter).

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::Map;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::models::plan::WeeklyPlan;
use crate::models::profile::{ExerciseRecord, Profile};
use crate::plan::{search_url, BARE_NAME_DEFAULTS, PLACEHOLDER_EXERCISE};

const NEW_EXERCISE_DESC: &str = "AI Suggested Variation";
const NEW_EXERCISE_ALT: &str = "Standard Variation";

#[derive(Error, Debug)]
pub enum ProfileError {
  #[error("Profile not found at {}", .0.display())]
  NotFound(PathBuf),

  #[error("Failed to access profile: {0}")]
  Io(#[from] io::Error),

  #[error("Invalid profile JSON: {0}")]
  Json(#[from] serde_json::Error),
}

pub fn load(path: &Path) -> Result<Profile, ProfileError> {
  let contents = fs::read_to_string(path).map_err(|e| match e.kind() {
    io::ErrorKind::NotFound => ProfileError::NotFound(path.to_path_buf()),
    _ => ProfileError::Io(e),
  })?;

  let profile: Profile = serde_json::from_str(&contents)?;
  debug!(path = %path.display(), week = profile.current_week, "profile loaded");
  Ok(profile)
}

/// Write the profile as 4-space indented JSON
pub fn save(path: &Path, profile: &Profile) -> Result<(), ProfileError> {
  let mut buffer = Vec::new();
  let formatter = PrettyFormatter::with_indent(b"    ");
  let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
  profile.serialize(&mut serializer)?;
  buffer.push(b'\n');

  fs::write(path, buffer)?;
  debug!(path = %path.display(), "profile saved");
  Ok(())
}

/// Add exercises the plan marks `is_new` to the exercise database.
///
/// Each lands in its own category (created if missing) unless a record with
/// the same name is already there. Returns how many records were added.
pub fn record_new_exercises(profile: &mut Profile, plan: &WeeklyPlan) -> usize {
  let mut added = 0;

  for (_, entry) in plan.entries().filter(|(_, e)| e.is_new()) {
    if entry.exercise == PLACEHOLDER_EXERCISE {
      continue;
    }

    let category = entry
      .category
      .clone()
      .unwrap_or_else(|| BARE_NAME_DEFAULTS.category.to_string());
    let records = profile.exercise_database.entry(category.clone()).or_default();

    if records.iter().any(|r| r.name == entry.exercise) {
      continue;
    }

    records.push(ExerciseRecord {
      name: entry.exercise.clone(),
      url: Some(
        entry
          .url
          .clone()
          .unwrap_or_else(|| search_url(&entry.exercise)),
      ),
      desc: Some(NEW_EXERCISE_DESC.to_string()),
      alt: Some(NEW_EXERCISE_ALT.to_string()),
      extra: Map::new(),
    });

    info!(exercise = %entry.exercise, category = %category, "added new exercise to database");
    added += 1;
  }

  added
}

pub fn advance_week(profile: &mut Profile) {
  profile.current_week += 1;
}
