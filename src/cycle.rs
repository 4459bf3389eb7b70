//! Menstrual cycle phase from elapsed days since the last period start.
//!
//! Phase copy is quoted to the user verbatim, so a bad configuration is an
//! error rather than a silently defaulted phase.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::profile::Profile;

pub const DEFAULT_CYCLE_LENGTH: i64 = 28;

#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
pub enum CycleError {
  #[error("Invalid cycle configuration: {0}")]
  InvalidConfiguration(String),
}

/// ---------------------------------------------------------------------------
/// Phases
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CyclePhaseKind {
  Menstrual,
  Follicular,
  Ovulation,
  Luteal,
}

impl CyclePhaseKind {
  /// Phase for a 1-based day in the cycle
  pub fn from_day(day_in_cycle: i64) -> Self {
    match day_in_cycle {
      d if d <= 5 => CyclePhaseKind::Menstrual,
      d if d <= 14 => CyclePhaseKind::Follicular,
      d if d <= 17 => CyclePhaseKind::Ovulation,
      _ => CyclePhaseKind::Luteal,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      CyclePhaseKind::Menstrual => "Menstrual",
      CyclePhaseKind::Follicular => "Follicular",
      CyclePhaseKind::Ovulation => "Ovulation",
      CyclePhaseKind::Luteal => "Luteal",
    }
  }

  pub fn energy(&self) -> &'static str {
    match self {
      CyclePhaseKind::Menstrual => "Variable - may be lower",
      CyclePhaseKind::Follicular => "HIGH - rising estrogen = strength gains!",
      CyclePhaseKind::Ovulation => "PEAK energy but ligament laxity increases",
      CyclePhaseKind::Luteal => "Moderate to low - progesterone rising",
    }
  }

  pub fn training_tip(&self) -> &'static str {
    match self {
      CyclePhaseKind::Menstrual => {
        "Listen to your body. Okay to reduce intensity if needed. Focus on form over load."
      }
      CyclePhaseKind::Follicular => {
        "BEST time for heavy lifts & PRs! Push hard, increase weights, train intensely."
      }
      CyclePhaseKind::Ovulation => {
        "High energy but be mindful of form. Good for power & HIIT. Warm up well."
      }
      CyclePhaseKind::Luteal => {
        "Maintain volume but may need longer rest. Great for hypertrophy work. Stay hydrated."
      }
    }
  }

  /// Suggested load multiplier relative to a neutral week
  pub fn intensity_modifier(&self) -> f64 {
    match self {
      CyclePhaseKind::Menstrual => 0.85,
      CyclePhaseKind::Follicular => 1.1,
      CyclePhaseKind::Ovulation => 1.05,
      CyclePhaseKind::Luteal => 0.95,
    }
  }

  /// Accent color used when the phase is rendered
  pub fn color(&self) -> &'static str {
    match self {
      CyclePhaseKind::Menstrual => "#e57373",
      CyclePhaseKind::Follicular => "#81c784",
      CyclePhaseKind::Ovulation => "#ffb74d",
      CyclePhaseKind::Luteal => "#9575cd",
    }
  }
}

impl std::fmt::Display for CyclePhaseKind {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CyclePhase {
  pub phase: CyclePhaseKind,
  /// 1-based day in the current cycle
  pub day: i64,
  pub energy: String,
  pub training_tip: String,
  pub intensity_modifier: f64,
}

impl CyclePhase {
  fn for_day(day: i64) -> Self {
    let phase = CyclePhaseKind::from_day(day);
    Self {
      phase,
      day,
      energy: phase.energy().to_string(),
      training_tip: phase.training_tip().to_string(),
      intensity_modifier: phase.intensity_modifier(),
    }
  }
}

/// ---------------------------------------------------------------------------
/// Calculation
/// ---------------------------------------------------------------------------

/// Phase on `reference` for a cycle that started on `last_period`.
///
/// Elapsed days wrap modulo the cycle length; a reference date before the
/// last period still lands in `[1, cycle_length]`.
pub fn cycle_phase(
  reference: NaiveDate,
  last_period: NaiveDate,
  cycle_length: i64,
) -> Result<CyclePhase, CycleError> {
  if cycle_length <= 0 {
    return Err(CycleError::InvalidConfiguration(format!(
      "cycle length must be positive, got {}",
      cycle_length
    )));
  }

  let days_since = (reference - last_period).num_days();
  let day_in_cycle = days_since.rem_euclid(cycle_length) + 1;

  Ok(CyclePhase::for_day(day_in_cycle))
}

/// Same as `cycle_phase` with the last period given as `YYYY-MM-DD`
pub fn cycle_phase_from_str(
  reference: NaiveDate,
  last_period: &str,
  cycle_length: i64,
) -> Result<CyclePhase, CycleError> {
  let last_period = NaiveDate::parse_from_str(last_period.trim(), "%Y-%m-%d").map_err(|e| {
    CycleError::InvalidConfiguration(format!("last period start '{}': {}", last_period, e))
  })?;
  cycle_phase(reference, last_period, cycle_length)
}

/// Phase for the profile's cycle settings.
///
/// `Ok(None)` when tracking is off or no start date is recorded.
pub fn phase_for_profile(
  profile: &Profile,
  reference: NaiveDate,
) -> Result<Option<CyclePhase>, CycleError> {
  let Some(settings) = profile.menstrual_cycle.as_ref() else {
    return Ok(None);
  };
  if !settings.track_cycle {
    return Ok(None);
  }
  let Some(last_period) = settings.last_period_start.as_deref() else {
    return Ok(None);
  };

  let cycle_length = settings.average_cycle_length.unwrap_or(DEFAULT_CYCLE_LENGTH);
  cycle_phase_from_str(reference, last_period, cycle_length).map(Some)
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
