//! Planning prompt composition
//!
//! Everything the model needs to plan a week goes into one user message:
//! athlete profile, cycle phase, recovery, last week's log and the schedule.
//! The fixed coaching rules and output format live in the system prompt.

use serde_json::json;

use crate::cycle::CyclePhase;
use crate::models::log::LoggedSet;
use crate::models::profile::Profile;
use crate::recovery::RecoverySnapshot;

const NOT_AVAILABLE: &str = "N/A";

/// Inputs for one planning request
#[derive(Debug, Clone, Copy)]
pub struct PlanContext<'a> {
  pub profile: &'a Profile,
  pub cycle: Option<&'a CyclePhase>,
  pub recovery: Option<&'a RecoverySnapshot>,
  /// Most recent workout log rows, oldest first
  pub performance: &'a [LoggedSet],
}

pub fn compose_plan_prompt(ctx: &PlanContext<'_>) -> String {
  let profile = ctx.profile;

  format!(
    r#"Create the complete workout plan for Week {week}.

ATHLETE PROFILE:
{athlete}

CYCLE PHASE:
{cycle}

RECOVERY:
{recovery}

LAST WEEK'S PERFORMANCE:
{performance}

TRAINING SCHEDULE:
{schedule}

EXERCISE DATABASE (reference, new exercises are allowed):
{database}

Respond with valid JSON matching the OUTPUT FORMAT specified in your instructions."#,
    week = profile.current_week,
    athlete = athlete_section(profile),
    cycle = cycle_section(ctx.cycle),
    recovery = ctx
      .recovery
      .map(RecoverySnapshot::to_prompt_context)
      .unwrap_or_else(|| "No wearable data available".to_string()),
    performance = performance_section(ctx.performance),
    schedule = schedule_section(profile),
    database = pretty(&json!(profile.exercise_database)),
  )
}

fn athlete_section(profile: &Profile) -> String {
  let context = profile.user_context.clone().unwrap_or_default();
  let or_na = |value: Option<String>| value.unwrap_or_else(|| NOT_AVAILABLE.to_string());

  let mut lines = vec![
    format!("- Name: {}", profile.user_name.as_deref().unwrap_or(NOT_AVAILABLE)),
    format!("- Stats: {}", or_na(context.stats)),
    format!("- Experience: {}", or_na(context.experience)),
    format!("- Gym: {}", or_na(context.gym_profile)),
    format!("- Goals: {}", profile.goals()),
    format!("- Known Maxes: {}", pretty(&json!(profile.maxes))),
  ];

  if let Some(nutrition) = &profile.nutrition {
    let target = |value: Option<f64>| {
      value
        .map(|v| v.to_string())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
    };
    lines.push(format!(
      "- Nutrition Targets: {} cal, Protein: {}g, Carbs: {}g, Fat: {}g",
      target(nutrition.calorie_target),
      target(nutrition.protein_target_g),
      target(nutrition.carb_target_g),
      target(nutrition.fat_target_g),
    ));
  }

  lines.join("\n")
}

fn cycle_section(cycle: Option<&CyclePhase>) -> String {
  match cycle {
    Some(phase) => format!(
      "- Current Phase: {} (Day {})\n- Energy Level: {}\n- Training Recommendation: {}\n- Intensity Modifier: {}",
      phase.phase, phase.day, phase.energy, phase.training_tip, phase.intensity_modifier
    ),
    None => "Not tracked".to_string(),
  }
}

fn performance_section(rows: &[LoggedSet]) -> String {
  if rows.is_empty() {
    return "No logged workouts yet".to_string();
  }

  let rows: Vec<_> = rows
    .iter()
    .map(|row| {
      json!({
        "week": row.week,
        "day": row.day,
        "exercise": row.exercise,
        "sets": row.sets,
        "reps": row.reps,
        "target_weight": row.target_weight,
        "actual_weight": row.actual_weight,
        "actual_reps": row.actual_reps,
        "rpe": row.rpe,
        "notes": row.notes,
        "done": row.done,
      })
    })
    .collect();

  pretty(&json!(rows))
}

fn schedule_section(profile: &Profile) -> String {
  let order = profile.schedule_order();
  if order.is_empty() {
    return "No fixed schedule; plan Monday through Friday".to_string();
  }

  let days: Vec<&str> = order.iter().map(|day| day.as_str()).collect();
  let mut lines = vec![format!("Training Days: {}", days.join(", "))];
  lines.push("Day focus (inspiration, not strict rules):".to_string());
  for day in order {
    lines.push(format!("- {}: {}", day, profile.focus_for(day)));
  }
  lines.join("\n")
}

fn pretty(value: &serde_json::Value) -> String {
  serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}
