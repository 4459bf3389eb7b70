//! Plan distributors. Each one reads the finished plan and never mutates it.

pub mod calendar;
pub mod dashboard;
pub mod email;
pub mod workout_log;

use crate::models::plan::{DayName, ExerciseEntry, WeeklyPlan};
use crate::models::profile::Profile;

/// Plan days in the profile's schedule order.
///
/// Days the plan has but the schedule lacks are left out, matching what the
/// athlete signed up for. A profile without a schedule gets every plan day in
/// week order.
pub fn scheduled_days<'a>(
  profile: &Profile,
  plan: &'a WeeklyPlan,
) -> Vec<(DayName, &'a [ExerciseEntry])> {
  let order = profile.schedule_order();

  if order.is_empty() {
    return plan
      .days
      .iter()
      .map(|(day, entries)| (*day, entries.as_slice()))
      .collect();
  }

  order
    .into_iter()
    .filter_map(|day| plan.day(day).map(|entries| (day, entries)))
    .collect()
}
