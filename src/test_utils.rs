//! Test utilities and helpers
//!
//! - In-memory workout log database
//! - Mock profile and plan factories

use crate::models::plan::{DayName, ExerciseEntry, WeeklyPlan};
use crate::models::profile::{
  CycleSettings, ExerciseRecord, NutritionTargets, Profile, ScheduleSlot, UserContext,
};
use serde_json::Map;
use sqlx::SqlitePool;
use std::collections::BTreeMap;

/// ---------------------------------------------------------------------------
/// Database Test Utilities
/// ---------------------------------------------------------------------------

/// Create an in-memory SQLite database with all migrations applied
///
/// Uses max_connections(1) to prevent multiple pool connections from creating
/// isolated in-memory databases, which would cause intermittent test failures
pub async fn setup_test_db() -> SqlitePool {
  let pool = sqlx::sqlite::SqlitePoolOptions::new()
    .max_connections(1)
    .connect("sqlite::memory:")
    .await
    .expect("Failed to create in-memory database");

  sqlx::migrate!("./migrations")
    .run(&pool)
    .await
    .expect("Failed to run migrations");

  pool
}

pub async fn teardown_test_db(pool: SqlitePool) {
  pool.close().await;
}

/// ---------------------------------------------------------------------------
/// Mock Data Factories
/// ---------------------------------------------------------------------------

/// Five-day split, cycle tracking on, one reference exercise
pub fn mock_profile() -> Profile {
  let slots = [
    ("Monday", "Glutes & Hamstrings"),
    ("Tuesday", "Upper Body"),
    ("Wednesday", "Quads, Calves, Core"),
    ("Thursday", "Push/Pull/Arms"),
    ("Friday", "Glute Volume"),
  ];

  let mut exercise_database = BTreeMap::new();
  exercise_database.insert(
    "Glutes".to_string(),
    vec![ExerciseRecord {
      name: "Barbell Hip Thrust".to_string(),
      url: Some("https://youtu.be/hip-thrust".to_string()),
      desc: Some("Primary glute builder".to_string()),
      alt: Some("Glute Bridge".to_string()),
      extra: Map::new(),
    }],
  );

  let mut maxes = BTreeMap::new();
  maxes.insert("Barbell Hip Thrust".to_string(), 225.0);

  Profile {
    user_name: Some("Alex".to_string()),
    primary_goal: "Build glutes and back strength".to_string(),
    current_week: 4,
    schedule_slots: slots
      .iter()
      .map(|(day, focus)| ScheduleSlot {
        day_name: day.to_string(),
        focus: focus.to_string(),
        ..Default::default()
      })
      .collect(),
    exercise_database,
    maxes,
    menstrual_cycle: Some(CycleSettings {
      track_cycle: true,
      last_period_start: Some("2025-01-01".to_string()),
      average_cycle_length: Some(28),
      ..Default::default()
    }),
    nutrition: Some(NutritionTargets {
      calorie_target: Some(2100.0),
      protein_target_g: Some(140.0),
      carb_target_g: None,
      fat_target_g: None,
      ..Default::default()
    }),
    user_context: Some(UserContext {
      stats: Some("5'6\", 140 lbs".to_string()),
      experience: Some("Intermediate".to_string()),
      gym_profile: None,
      specific_goals: None,
      ..Default::default()
    }),
    calendar_id: Some("athlete@example.com".to_string()),
    recipient_email: None,
    extra: Map::new(),
  }
}

/// Monday and Wednesday sessions with notes
pub fn mock_plan() -> WeeklyPlan {
  let mut plan = WeeklyPlan {
    coaching_notes: Some("Heavy hinge focus this week.".to_string()),
    ..Default::default()
  };

  plan.days.insert(
    DayName::Monday,
    vec![
      ExerciseEntry {
        category: Some("Glutes".to_string()),
        sets: Some("4".to_string()),
        reps: Some("8-10".to_string()),
        rest: Some("90s".to_string()),
        target_weight: Some("185 lbs".to_string()),
        url: Some("https://youtu.be/hip-thrust".to_string()),
        cues: Some("Ribs down, squeeze at the top".to_string()),
        is_new: Some(false),
        ..ExerciseEntry::named("Barbell Hip Thrust")
      },
      ExerciseEntry {
        category: Some("Hamstrings".to_string()),
        sets: Some("3".to_string()),
        reps: Some("10".to_string()),
        is_new: Some(true),
        url: Some("https://youtu.be/b-stance-rdl".to_string()),
        ..ExerciseEntry::named("B-Stance RDL")
      },
    ],
  );
  plan.days.insert(
    DayName::Wednesday,
    vec![ExerciseEntry {
      category: Some("Quads".to_string()),
      sets: Some("4".to_string()),
      reps: Some("6-8".to_string()),
      ..ExerciseEntry::named("Smith Machine Squat")
    }],
  );

  plan
}

/// ---------------------------------------------------------------------------
/// Tests for Test Utilities
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_setup_db_creates_schema() {
    let pool = setup_test_db().await;

    let tables: Vec<(String,)> = sqlx::query_as(
      "SELECT name FROM sqlite_master WHERE type='table' AND name = 'workout_log'",
    )
    .fetch_all(&pool)
    .await
    .expect("Failed to query tables");

    assert_eq!(tables.len(), 1);

    teardown_test_db(pool).await;
  }

  #[test]
  fn test_mock_factories_create_valid_data() {
    let profile = mock_profile();
    assert_eq!(profile.schedule_order().len(), 5);
    assert_eq!(profile.focus_for(DayName::Monday), "Glutes & Hamstrings");

    let plan = mock_plan();
    assert_eq!(plan.exercise_count(), 3);
    assert!(plan.entries().any(|(_, e)| e.is_new()));
  }
}
