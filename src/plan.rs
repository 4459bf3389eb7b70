//! Plan normalization
//!
//! The model is asked for `{"coaching_notes": .., "Monday": [..], ..}` but what
//! comes back varies: a list of per-day objects, bare exercise names, single
//! objects where a list belongs, entries without a name. `normalize` coerces any
//! decoded JSON value into a `WeeklyPlan` and never fails. Anything it cannot
//! use is dropped, so a day with no usable data ends up as an empty list.
//!
//! Applying it to its own serialized output is a no-op.

use serde_json::{Map, Value};
use tracing::debug;

use crate::models::plan::{DayName, ExerciseEntry, WeeklyPlan};

/// ---------------------------------------------------------------------------
/// Defaults
/// ---------------------------------------------------------------------------

pub const COACHING_NOTES_KEY: &str = "coaching_notes";

/// Name given to an entry that arrives without a usable `exercise`
pub const PLACEHOLDER_EXERCISE: &str = "Unknown Exercise";

const SEARCH_URL_BASE: &str = "https://www.youtube.com/results";

/// Field values filled in when the model sends a bare exercise name
pub struct EntryDefaults {
  pub category: &'static str,
  pub sets: &'static str,
  pub reps: &'static str,
  pub rest: &'static str,
  pub cues: &'static str,
  pub is_new: bool,
}

pub const BARE_NAME_DEFAULTS: EntryDefaults = EntryDefaults {
  category: "Unspecified",
  sets: "3",
  reps: "10",
  rest: "60s",
  cues: "Focus on form.",
  is_new: false,
};

/// ---------------------------------------------------------------------------
/// Normalizer
/// ---------------------------------------------------------------------------

pub fn normalize(raw: Value) -> WeeklyPlan {
  let fields = match raw {
    Value::Object(fields) => fields,
    Value::Array(items) => {
      debug!(items = items.len(), "model returned a list, merging by day");
      merge_day_list(items)
    }
    other => {
      debug!(kind = value_kind(&other), "model response has no plan shape");
      Map::new()
    }
  };

  let mut plan = WeeklyPlan::default();

  for (key, value) in fields {
    if key == COACHING_NOTES_KEY {
      plan.coaching_notes = match value {
        Value::String(notes) => Some(notes),
        other => {
          debug!(kind = value_kind(&other), "dropping non-text coaching notes");
          None
        }
      };
      continue;
    }

    match DayName::parse_loose(&key) {
      Some(day) => {
        plan.days.insert(day, coerce_entries(value));
      }
      None => debug!(key = %key, "dropping non-day key"),
    }
  }

  plan
}

/// Merge `[{"Monday": [..]}, {"day": "Tuesday", "exercises": [..]}, ..]` into
/// a single day-keyed object. Elements of any other shape are dropped.
fn merge_day_list(items: Vec<Value>) -> Map<String, Value> {
  let mut merged = Map::new();

  for item in items {
    let Value::Object(mut fields) = item else {
      continue;
    };

    let day_keys: Vec<(String, DayName)> = fields
      .keys()
      .filter_map(|key| DayName::parse_loose(key).map(|day| (key.clone(), day)))
      .collect();

    if !day_keys.is_empty() {
      for (key, day) in day_keys {
        if let Some(value) = fields.remove(&key) {
          merged.insert(day.as_str().to_string(), value);
        }
      }
      continue;
    }

    // Keyed by canonical name so a later element replaces an earlier one
    let day = ["day", "day_name"]
      .iter()
      .find_map(|key| fields.get(*key).and_then(Value::as_str))
      .and_then(DayName::parse_loose);

    match (day, fields.remove("exercises")) {
      (Some(day), Some(exercises)) => {
        merged.insert(day.as_str().to_string(), exercises);
      }
      _ => debug!("dropping list element without a day"),
    }
  }

  merged
}

fn coerce_entries(value: Value) -> Vec<ExerciseEntry> {
  let items = match value {
    Value::Array(items) => items,
    single => vec![single],
  };

  items.into_iter().filter_map(coerce_entry).collect()
}

fn coerce_entry(item: Value) -> Option<ExerciseEntry> {
  match item {
    Value::String(name) => Some(entry_from_name(name)),
    Value::Object(fields) => Some(entry_from_fields(&fields)),
    other => {
      debug!(kind = value_kind(&other), "dropping non-exercise entry");
      None
    }
  }
}

fn entry_from_name(name: String) -> ExerciseEntry {
  let exercise = non_blank(Some(name)).unwrap_or_else(|| PLACEHOLDER_EXERCISE.to_string());
  let defaults = &BARE_NAME_DEFAULTS;

  ExerciseEntry {
    url: Some(search_url(&exercise)),
    category: Some(defaults.category.to_string()),
    sets: Some(defaults.sets.to_string()),
    reps: Some(defaults.reps.to_string()),
    rest: Some(defaults.rest.to_string()),
    target_weight: None,
    cues: Some(defaults.cues.to_string()),
    is_new: Some(defaults.is_new),
    exercise,
  }
}

fn entry_from_fields(fields: &Map<String, Value>) -> ExerciseEntry {
  let text = |key: &str| fields.get(key).and_then(text_value);

  ExerciseEntry {
    exercise: non_blank(text("exercise")).unwrap_or_else(|| PLACEHOLDER_EXERCISE.to_string()),
    category: text("category"),
    sets: text("sets"),
    reps: text("reps"),
    rest: text("rest"),
    target_weight: text("target_weight"),
    url: text("url"),
    cues: text("cues"),
    is_new: fields.get("is_new").and_then(flag_value),
  }
}

/// Scalars become text (`"sets": 3` -> `"3"`); containers and null are absent
fn text_value(value: &Value) -> Option<String> {
  match value {
    Value::String(s) => Some(s.clone()),
    Value::Number(n) => Some(n.to_string()),
    Value::Bool(b) => Some(b.to_string()),
    Value::Null | Value::Array(_) | Value::Object(_) => None,
  }
}

fn flag_value(value: &Value) -> Option<bool> {
  match value {
    Value::Bool(b) => Some(*b),
    Value::String(s) if s.trim().eq_ignore_ascii_case("true") => Some(true),
    Value::String(s) if s.trim().eq_ignore_ascii_case("false") => Some(false),
    _ => None,
  }
}

fn non_blank(name: Option<String>) -> Option<String> {
  name.filter(|n| !n.trim().is_empty())
}

/// Video search link for an exercise name (spaces encoded as `+`)
pub fn search_url(exercise: &str) -> String {
  let query = url::form_urlencoded::Serializer::new(String::new())
    .append_pair("search_query", exercise)
    .finish();
  format!("{}?{}", SEARCH_URL_BASE, query)
}

fn value_kind(value: &Value) -> &'static str {
  match value {
    Value::Null => "null",
    Value::Bool(_) => "bool",
    Value::Number(_) => "number",
    Value::String(_) => "string",
    Value::Array(_) => "array",
    Value::Object(_) => "object",
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
