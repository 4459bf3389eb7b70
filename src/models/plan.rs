use chrono::Weekday;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Training day label. Ordering follows the calendar week, Monday first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DayName {
  Monday,
  Tuesday,
  Wednesday,
  Thursday,
  Friday,
  Saturday,
  Sunday,
}

impl DayName {
  pub const ALL: [DayName; 7] = [
    DayName::Monday,
    DayName::Tuesday,
    DayName::Wednesday,
    DayName::Thursday,
    DayName::Friday,
    DayName::Saturday,
    DayName::Sunday,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      DayName::Monday => "Monday",
      DayName::Tuesday => "Tuesday",
      DayName::Wednesday => "Wednesday",
      DayName::Thursday => "Thursday",
      DayName::Friday => "Friday",
      DayName::Saturday => "Saturday",
      DayName::Sunday => "Sunday",
    }
  }

  /// Match a day label, ignoring case and surrounding whitespace
  pub fn parse_loose(label: &str) -> Option<Self> {
    let label = label.trim();
    Self::ALL
      .into_iter()
      .find(|day| day.as_str().eq_ignore_ascii_case(label))
  }

  pub fn weekday(&self) -> Weekday {
    match self {
      DayName::Monday => Weekday::Mon,
      DayName::Tuesday => Weekday::Tue,
      DayName::Wednesday => Weekday::Wed,
      DayName::Thursday => Weekday::Thu,
      DayName::Friday => Weekday::Fri,
      DayName::Saturday => Weekday::Sat,
      DayName::Sunday => Weekday::Sun,
    }
  }
}

impl fmt::Display for DayName {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl std::str::FromStr for DayName {
  type Err = String;
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Self::parse_loose(s).ok_or_else(|| format!("Unknown day name: {}", s))
  }
}

/// ---------------------------------------------------------------------------
/// Exercise Entry
/// ---------------------------------------------------------------------------

/// One prescribed exercise. `exercise` is never empty once normalized.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExerciseEntry {
  pub exercise: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub category: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub sets: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub reps: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub rest: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub target_weight: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub url: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub cues: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub is_new: Option<bool>,
}

impl ExerciseEntry {
  pub fn named(exercise: impl Into<String>) -> Self {
    Self {
      exercise: exercise.into(),
      category: None,
      sets: None,
      reps: None,
      rest: None,
      target_weight: None,
      url: None,
      cues: None,
      is_new: None,
    }
  }

  pub fn is_new(&self) -> bool {
    self.is_new.unwrap_or(false)
  }

  // Display fallbacks for renderers; the plan itself stays as the model sent it.

  pub fn sets_or_default(&self) -> &str {
    self.sets.as_deref().unwrap_or("3")
  }

  pub fn reps_or_default(&self) -> &str {
    self.reps.as_deref().unwrap_or("10")
  }

  pub fn rest_or_default(&self) -> &str {
    self.rest.as_deref().unwrap_or("60s")
  }

  pub fn target_weight_or_default(&self) -> &str {
    self.target_weight.as_deref().unwrap_or("RPE 7-8")
  }
}

/// ---------------------------------------------------------------------------
/// Weekly Plan
/// ---------------------------------------------------------------------------

/// Canonical plan shape: day -> ordered exercises, plus the coach's notes.
///
/// Serializes as one flat JSON object (`{"coaching_notes": .., "Monday": [..]}`).
/// Deserializing from any JSON value runs it through the plan normalizer, so a
/// `WeeklyPlan` read from disk or from the model always holds the invariants.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WeeklyPlan {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub coaching_notes: Option<String>,
  #[serde(flatten)]
  pub days: BTreeMap<DayName, Vec<ExerciseEntry>>,
}

impl<'de> Deserialize<'de> for WeeklyPlan {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let raw = serde_json::Value::deserialize(deserializer)?;
    Ok(crate::plan::normalize(raw))
  }
}

impl WeeklyPlan {
  pub fn day(&self, day: DayName) -> Option<&[ExerciseEntry]> {
    self.days.get(&day).map(Vec::as_slice)
  }

  /// True when no day holds a single exercise
  pub fn is_empty(&self) -> bool {
    self.days.values().all(Vec::is_empty)
  }

  pub fn exercise_count(&self) -> usize {
    self.days.values().map(Vec::len).sum()
  }

  pub fn entries(&self) -> impl Iterator<Item = (DayName, &ExerciseEntry)> {
    self
      .days
      .iter()
      .flat_map(|(day, entries)| entries.iter().map(move |entry| (*day, entry)))
  }
}
