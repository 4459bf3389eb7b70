use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use super::plan::DayName;

/// User profile as stored in `user_profile.json`.
///
/// Fields this crate does not know about are kept in `extra` and written back
/// untouched on save.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub user_name: Option<String>,
  #[serde(default)]
  pub primary_goal: String,
  #[serde(default = "default_week")]
  pub current_week: u32,
  #[serde(default)]
  pub schedule_slots: Vec<ScheduleSlot>,
  #[serde(default)]
  pub exercise_database: BTreeMap<String, Vec<ExerciseRecord>>,
  #[serde(default)]
  pub maxes: BTreeMap<String, f64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub menstrual_cycle: Option<CycleSettings>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub nutrition: Option<NutritionTargets>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub user_context: Option<UserContext>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub calendar_id: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub recipient_email: Option<String>,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

fn default_week() -> u32 {
  1
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScheduleSlot {
  pub day_name: String,
  #[serde(default)]
  pub focus: String,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

/// Reference exercise known to the coach
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExerciseRecord {
  pub name: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub url: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub desc: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub alt: Option<String>,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CycleSettings {
  #[serde(default)]
  pub track_cycle: bool,
  /// ISO date (YYYY-MM-DD)
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub last_period_start: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub average_cycle_length: Option<i64>,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NutritionTargets {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub calorie_target: Option<f64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub protein_target_g: Option<f64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub carb_target_g: Option<f64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub fat_target_g: Option<f64>,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserContext {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub stats: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub experience: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub gym_profile: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub specific_goals: Option<String>,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

impl Profile {
  pub fn display_name(&self) -> &str {
    self.user_name.as_deref().unwrap_or("Your")
  }

  /// Scheduled training days in slot order. Unrecognized labels are skipped.
  pub fn schedule_order(&self) -> Vec<DayName> {
    let mut order = Vec::new();
    for slot in &self.schedule_slots {
      if let Some(day) = DayName::parse_loose(&slot.day_name) {
        if !order.contains(&day) {
          order.push(day);
        }
      }
    }
    order
  }

  pub fn focus_for(&self, day: DayName) -> &str {
    self
      .schedule_slots
      .iter()
      .find(|slot| DayName::parse_loose(&slot.day_name) == Some(day))
      .map(|slot| slot.focus.as_str())
      .filter(|focus| !focus.is_empty())
      .unwrap_or("Workout")
  }

  pub fn goals(&self) -> &str {
    self
      .user_context
      .as_ref()
      .and_then(|ctx| ctx.specific_goals.as_deref())
      .unwrap_or(&self.primary_goal)
  }
}
