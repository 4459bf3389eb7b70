//! Workout log: the prescribed week as rows the athlete fills in.
//!
//! Rows follow the profile's schedule order. Logging a week again replaces
//! that week's rows, so a re-run does not duplicate the plan.

use tracing::info;

use crate::db::{DbPool, LogError};
use crate::models::log::{LoggedSet, SetResult};
use crate::models::plan::WeeklyPlan;
use crate::models::profile::Profile;

use super::scheduled_days;

/// Rows handed to the planning prompt as last week's performance
pub const RECENT_LOG_LIMIT: i64 = 20;

/// Write one row per exercise for `week`; returns the number of rows written
pub async fn log_week(
  pool: &DbPool,
  plan: &WeeklyPlan,
  week: u32,
  profile: &Profile,
) -> Result<usize, LogError> {
  let mut tx = pool.begin().await?;

  sqlx::query("DELETE FROM workout_log WHERE week = ?1")
    .bind(week as i64)
    .execute(&mut *tx)
    .await?;

  let mut written = 0;
  for (day, entries) in scheduled_days(profile, plan) {
    for (position, entry) in entries.iter().enumerate() {
      sqlx::query(
        r#"
        INSERT INTO workout_log (
          week, day, position, exercise, sets, reps, rest, target_weight, cues
        )
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
      )
      .bind(week as i64)
      .bind(day.as_str())
      .bind(position as i64)
      .bind(&entry.exercise)
      .bind(entry.sets_or_default())
      .bind(entry.reps_or_default())
      .bind(entry.rest_or_default())
      .bind(entry.target_weight_or_default())
      .bind(entry.cues.as_deref().unwrap_or(""))
      .execute(&mut *tx)
      .await?;

      written += 1;
    }
  }

  tx.commit().await?;

  info!(week, rows = written, "logged week to workout log");
  Ok(written)
}

/// The most recent rows, oldest first
pub async fn recent_logs(pool: &DbPool, limit: i64) -> Result<Vec<LoggedSet>, LogError> {
  let mut rows = sqlx::query_as::<_, LoggedSet>(
    "SELECT * FROM workout_log ORDER BY week DESC, id DESC LIMIT ?1",
  )
  .bind(limit)
  .fetch_all(pool)
  .await?;

  rows.reverse();
  Ok(rows)
}

/// Record actuals for a logged exercise. Returns false when no row has `id`.
pub async fn record_result(pool: &DbPool, id: i64, result: &SetResult) -> Result<bool, LogError> {
  let outcome = sqlx::query(
    r#"
    UPDATE workout_log SET
      actual_weight = COALESCE(?1, actual_weight),
      actual_reps = COALESCE(?2, actual_reps),
      rpe = COALESCE(?3, rpe),
      notes = COALESCE(?4, notes),
      done = ?5
    WHERE id = ?6
    "#,
  )
  .bind(&result.actual_weight)
  .bind(&result.actual_reps)
  .bind(result.rpe)
  .bind(&result.notes)
  .bind(result.done)
  .bind(id)
  .execute(pool)
  .await?;

  Ok(outcome.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::models::plan::{DayName, ExerciseEntry};
  use crate::test_utils::{mock_plan, mock_profile, setup_test_db, teardown_test_db};

  #[tokio::test]
  async fn test_log_week_follows_schedule_order() {
    let pool = setup_test_db().await;
    let profile = mock_profile();
    let plan = mock_plan();

    let written = log_week(&pool, &plan, 3, &profile).await.unwrap();
    assert_eq!(written, plan.exercise_count());

    let rows = recent_logs(&pool, 100).await.unwrap();
    assert_eq!(rows.len(), written);

    let days: Vec<&str> = rows.iter().map(|r| r.day.as_str()).collect();
    let first_wednesday = days.iter().position(|d| *d == "Wednesday").unwrap();
    let last_monday = days.iter().rposition(|d| *d == "Monday").unwrap();
    assert!(last_monday < first_wednesday);
    assert!(rows.iter().all(|r| r.week == 3 && !r.done));

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_log_week_fills_display_defaults() {
    let pool = setup_test_db().await;
    let profile = mock_profile();
    let mut plan = WeeklyPlan::default();
    plan.days.insert(DayName::Monday, vec![ExerciseEntry::named("Good Morning")]);

    log_week(&pool, &plan, 1, &profile).await.unwrap();

    let rows = recent_logs(&pool, 10).await.unwrap();
    assert_eq!(rows[0].exercise, "Good Morning");
    assert_eq!(rows[0].sets.as_deref(), Some("3"));
    assert_eq!(rows[0].target_weight.as_deref(), Some("RPE 7-8"));

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_relogging_week_replaces_rows() {
    let pool = setup_test_db().await;
    let profile = mock_profile();
    let plan = mock_plan();

    log_week(&pool, &plan, 2, &profile).await.unwrap();
    log_week(&pool, &plan, 2, &profile).await.unwrap();

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM workout_log WHERE week = 2")
      .fetch_one(&pool)
      .await
      .unwrap();
    assert_eq!(count as usize, plan.exercise_count());

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_recent_logs_limit_keeps_latest_week() {
    let pool = setup_test_db().await;
    let profile = mock_profile();
    let plan = mock_plan();

    log_week(&pool, &plan, 1, &profile).await.unwrap();
    log_week(&pool, &plan, 2, &profile).await.unwrap();

    let rows = recent_logs(&pool, 2).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|r| r.week == 2));
    assert!(rows[0].id < rows[1].id);

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_record_result() {
    let pool = setup_test_db().await;
    let profile = mock_profile();
    log_week(&pool, &mock_plan(), 1, &profile).await.unwrap();

    let row = recent_logs(&pool, 1).await.unwrap().remove(0);
    let result = SetResult {
      actual_weight: Some("135 lbs".to_string()),
      actual_reps: Some("10,10,8".to_string()),
      rpe: Some(8.5),
      notes: None,
      done: true,
    };

    assert!(record_result(&pool, row.id, &result).await.unwrap());
    assert!(!record_result(&pool, 9_999, &result).await.unwrap());

    let updated = recent_logs(&pool, 1).await.unwrap().remove(0);
    assert_eq!(updated.actual_weight.as_deref(), Some("135 lbs"));
    assert_eq!(updated.rpe, Some(8.5));
    assert!(updated.done);

    teardown_test_db(pool).await;
  }
}
