//! The weekly run: gather context, generate the plan, fan it out.
//!
//! Only three things stop a run: an unreadable profile, a failed plan
//! generation, and a profile that cannot be written back. Every distributor
//! fails soft; its error is logged and recorded in the `RunSummary`.

use chrono::{Duration, NaiveDate, Utc};
use serde::Serialize;
use std::fmt;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::cycle::{self, CyclePhase, CyclePhaseKind};
use crate::db::{self, DbPool, LogError};
use crate::distribute::calendar::{build_events, CalendarClient, CalendarConfig, CalendarError};
use crate::distribute::dashboard::{self, DashboardData, DashboardError};
use crate::distribute::email::{self, Delivery, EmailConfig};
use crate::distribute::workout_log::{self, RECENT_LOG_LIMIT};
use crate::llm::{ClaudeClient, LlmError};
use crate::models::plan::WeeklyPlan;
use crate::models::profile::Profile;
use crate::profile::{self, ProfileError};
use crate::prompt::{compose_plan_prompt, PlanContext};
use crate::recovery::{self, RecoverySnapshot, WearableClient};

/// ---------------------------------------------------------------------------
/// Error Handling
/// ---------------------------------------------------------------------------

#[derive(Error, Debug)]
pub enum PipelineError {
  #[error(transparent)]
  Profile(#[from] ProfileError),

  #[error("Plan generation failed: {0}")]
  Llm(#[from] LlmError),

  #[error(transparent)]
  Calendar(#[from] CalendarError),

  #[error(transparent)]
  Dashboard(#[from] DashboardError),

  #[error(transparent)]
  Log(#[from] LogError),
}

/// ---------------------------------------------------------------------------
/// Run Summary
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum StepOutcome {
  Done(String),
  Skipped(String),
  Failed(String),
}

impl StepOutcome {
  pub fn is_done(&self) -> bool {
    matches!(self, StepOutcome::Done(_))
  }
}

impl fmt::Display for StepOutcome {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      StepOutcome::Done(detail) => write!(f, "done ({})", detail),
      StepOutcome::Skipped(reason) => write!(f, "skipped ({})", reason),
      StepOutcome::Failed(error) => write!(f, "FAILED ({})", error),
    }
  }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
  /// Week the plan was generated for (the profile now points at the next one)
  pub week: u32,
  pub exercises: usize,
  pub new_exercises: usize,
  pub cycle_phase: Option<CyclePhaseKind>,
  pub recovery_ready: bool,
  pub email: StepOutcome,
  pub calendar: StepOutcome,
  pub workout_log: StepOutcome,
  pub dashboard: StepOutcome,
}

impl RunSummary {
  pub fn steps(&self) -> [(&'static str, &StepOutcome); 4] {
    [
      ("email", &self.email),
      ("calendar", &self.calendar),
      ("workout log", &self.workout_log),
      ("dashboard", &self.dashboard),
    ]
  }
}

/// ---------------------------------------------------------------------------
/// External Services
/// ---------------------------------------------------------------------------

/// Clients for one run. Anything optional that is not configured is skipped.
pub struct Services {
  pub llm: ClaudeClient,
  pub wearable: Option<WearableClient>,
  pub calendar: Option<CalendarClient>,
  pub email: Option<EmailConfig>,
}

impl Services {
  /// The model client is required; the rest are optional
  pub fn from_env(config: &AppConfig, profile: &Profile) -> Result<Self, PipelineError> {
    let llm = ClaudeClient::from_env()?;

    let wearable = match WearableClient::from_env() {
      Ok(client) => Some(client),
      Err(e) => {
        info!(reason = %e, "wearable provider not configured");
        None
      }
    };

    let recipient = config.recipient_for(profile);
    let calendar = match CalendarConfig::from_env(profile, recipient.as_deref()) {
      Ok(calendar_config) => Some(CalendarClient::new(calendar_config)),
      Err(e) => {
        info!(reason = %e, "calendar not configured");
        None
      }
    };

    Ok(Self {
      llm,
      wearable,
      calendar,
      email: EmailConfig::from_env(),
    })
  }
}

/// ---------------------------------------------------------------------------
/// Weekly Run
/// ---------------------------------------------------------------------------

/// Full run against the configured services
pub async fn run_weekly(config: &AppConfig, today: NaiveDate) -> Result<RunSummary, PipelineError> {
  let profile = profile::load(&config.profile_path)?;
  let services = Services::from_env(config, &profile)?;
  run_weekly_with(config, &services, profile, today).await
}

pub async fn run_weekly_with(
  config: &AppConfig,
  services: &Services,
  mut profile: Profile,
  today: NaiveDate,
) -> Result<RunSummary, PipelineError> {
  let week = profile.current_week;
  info!(week, "generating weekly plan");

  let cycle = cycle_or_warn(&profile, today);
  if let Some(phase) = &cycle {
    info!(phase = %phase.phase, day = phase.day, "cycle phase");
  }

  let recovery = recovery::build_snapshot(services.wearable.as_ref(), today - Duration::days(1)).await;

  let pool = match db::initialize_db(&config.db_path).await {
    Ok(pool) => Some(pool),
    Err(e) => {
      warn!(error = %e, "workout log unavailable");
      None
    }
  };
  let performance = match &pool {
    Some(pool) => workout_log::recent_logs(pool, RECENT_LOG_LIMIT)
      .await
      .unwrap_or_else(|e| {
        warn!(error = %e, "could not read recent workout log");
        Vec::new()
      }),
    None => Vec::new(),
  };

  let prompt = compose_plan_prompt(&PlanContext {
    profile: &profile,
    cycle: cycle.as_ref(),
    recovery: Some(&recovery),
    performance: &performance,
  });
  let (plan, usage) = services.llm.generate_plan(&prompt).await?;
  info!(
    days = plan.days.len(),
    exercises = plan.exercise_count(),
    input_tokens = usage.input_tokens,
    output_tokens = usage.output_tokens,
    "plan generated"
  );

  let new_exercises = profile::record_new_exercises(&mut profile, &plan);

  let email = send_plan_email(config, services, &profile, &plan, cycle.as_ref()).await;
  let calendar = push_calendar(services, &plan, today).await;
  let workout_log = log_plan(pool.as_ref(), &plan, &profile).await;
  let dashboard = export_dashboard(config, &profile, &plan, &recovery, cycle.as_ref());

  profile::advance_week(&mut profile);
  profile::save(&config.profile_path, &profile)?;
  info!(next_week = profile.current_week, "profile saved");

  if let Some(pool) = pool {
    pool.close().await;
  }

  Ok(RunSummary {
    week,
    exercises: plan.exercise_count(),
    new_exercises,
    cycle_phase: cycle.map(|phase| phase.phase),
    recovery_ready: recovery.recovery_ready,
    email,
    calendar,
    workout_log,
    dashboard,
  })
}

/// Cycle phase for the profile; a bad configuration is logged and ignored
fn cycle_or_warn(profile: &Profile, today: NaiveDate) -> Option<CyclePhase> {
  cycle::phase_for_profile(profile, today).unwrap_or_else(|e| {
    warn!(error = %e, "continuing without cycle phase");
    None
  })
}

fn failed(step: &str, error: impl fmt::Display) -> StepOutcome {
  warn!(step, error = %error, "distribution step failed");
  StepOutcome::Failed(error.to_string())
}

async fn send_plan_email(
  config: &AppConfig,
  services: &Services,
  profile: &Profile,
  plan: &WeeklyPlan,
  cycle: Option<&CyclePhase>,
) -> StepOutcome {
  let html = email::render_html(profile, plan, cycle);
  let recipient = config
    .recipient_for(profile)
    .or_else(|| services.email.as_ref().map(|c| c.username.clone()))
    .unwrap_or_default();

  match email::send_email(
    services.email.as_ref(),
    &html,
    &recipient,
    profile.current_week,
    &config.email_fallback_path,
  )
  .await
  {
    Ok(Delivery::Sent { recipient }) => StepOutcome::Done(format!("sent to {}", recipient)),
    Ok(Delivery::Saved(path)) => StepOutcome::Done(format!("saved to {}", path.display())),
    Err(e) => failed("email", e),
  }
}

async fn push_calendar(services: &Services, plan: &WeeklyPlan, today: NaiveDate) -> StepOutcome {
  let Some(client) = &services.calendar else {
    return StepOutcome::Skipped("calendar not configured".to_string());
  };

  let expected = build_events(plan, today).len();
  let created = client.push_plan(plan, today).await;
  if created < expected {
    return failed(
      "calendar",
      format!("created {} of {} events", created, expected),
    );
  }
  StepOutcome::Done(format!("{} events on {}", created, client.calendar_id()))
}

async fn log_plan(pool: Option<&DbPool>, plan: &WeeklyPlan, profile: &Profile) -> StepOutcome {
  let Some(pool) = pool else {
    return StepOutcome::Failed("workout log unavailable".to_string());
  };

  match workout_log::log_week(pool, plan, profile.current_week, profile).await {
    Ok(rows) => StepOutcome::Done(format!("{} rows", rows)),
    Err(e) => failed("workout log", e),
  }
}

fn export_dashboard(
  config: &AppConfig,
  profile: &Profile,
  plan: &WeeklyPlan,
  recovery: &RecoverySnapshot,
  cycle: Option<&CyclePhase>,
) -> StepOutcome {
  let data = DashboardData::build(profile, plan, recovery, cycle, Utc::now());
  match dashboard::export(&config.dashboard_path, &data) {
    Ok(()) => StepOutcome::Done(config.dashboard_path.display().to_string()),
    Err(e) => failed("dashboard", e),
  }
}

/// ---------------------------------------------------------------------------
/// Daily Refresh
/// ---------------------------------------------------------------------------

/// Refresh the dashboard's recovery and cycle sections without a new plan
pub async fn refresh_dashboard(
  config: &AppConfig,
  today: NaiveDate,
) -> Result<RecoverySnapshot, PipelineError> {
  let cycle = match profile::load(&config.profile_path) {
    Ok(profile) => cycle_or_warn(&profile, today),
    Err(e) => {
      warn!(error = %e, "profile unavailable, refreshing without cycle phase");
      None
    }
  };

  let wearable = WearableClient::from_env().ok();
  let snapshot = recovery::build_snapshot(wearable.as_ref(), today - Duration::days(1)).await;

  dashboard::refresh_recovery(&config.dashboard_path, &snapshot, cycle.as_ref(), Utc::now())?;
  Ok(snapshot)
}

/// Remove every workout event this tool has pushed
pub async fn clear_calendar(config: &AppConfig) -> Result<usize, PipelineError> {
  let profile = profile::load(&config.profile_path)?;
  let calendar_config = CalendarConfig::from_env(&profile, config.recipient_for(&profile).as_deref())?;
  let deleted = CalendarClient::new(calendar_config)
    .clear_workout_events()
    .await?;
  Ok(deleted)
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
