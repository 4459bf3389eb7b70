use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::PathBuf;

use weekly_coach::config::AppConfig;
use weekly_coach::cycle;
use weekly_coach::db;
use weekly_coach::distribute::workout_log;
use weekly_coach::logger;
use weekly_coach::models::log::SetResult;
use weekly_coach::pipeline;
use weekly_coach::plan;
use weekly_coach::profile;
use weekly_coach::recovery::{self, WearableClient};

#[derive(Parser, Debug)]
#[command(name = "weekly-coach", version, about = "AI-coached weekly strength plans")]
struct Cli {
  /// Debug logging for this crate
  #[arg(short, long, global = true)]
  verbose: bool,

  /// Load environment from this file instead of ./.env
  #[arg(long, global = true, value_name = "FILE")]
  env_file: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Generate this week's plan and send it everywhere
  Generate {
    /// Run as if today were this date (YYYY-MM-DD)
    #[arg(long)]
    date: Option<NaiveDate>,
  },
  /// Show the cycle phase from the profile
  Phase {
    #[arg(long)]
    date: Option<NaiveDate>,
  },
  /// Show the recovery snapshot (defaults to yesterday)
  Recovery {
    #[arg(long)]
    date: Option<NaiveDate>,
  },
  /// Normalize a saved model response and print the plan JSON
  Normalize { file: PathBuf },
  /// Update the dashboard's recovery and cycle sections
  RefreshDashboard,
  /// Delete every pushed workout event from the calendar
  ClearCalendar,
  /// Show the most recent workout log rows
  History {
    #[arg(long, default_value_t = workout_log::RECENT_LOG_LIMIT)]
    limit: i64,
  },
  /// Record what was actually lifted for a workout log row
  Record {
    /// Row id as shown by `history`
    id: i64,
    #[arg(long)]
    weight: Option<String>,
    #[arg(long)]
    reps: Option<String>,
    #[arg(long)]
    rpe: Option<f64>,
    #[arg(long)]
    notes: Option<String>,
    /// Keep the row marked as not done
    #[arg(long)]
    skipped: bool,
  },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  let cli = Cli::parse();

  match &cli.env_file {
    Some(path) => {
      dotenvy::from_path(path)?;
    }
    None => {
      dotenvy::dotenv().ok();
    }
  }

  logger::init(cli.verbose);

  let config = AppConfig::from_env();
  let today = Local::now().date_naive();

  match cli.command {
    Command::Generate { date } => {
      let summary = pipeline::run_weekly(&config, date.unwrap_or(today)).await?;

      println!(
        "Week {}: {} exercises ({} new)",
        summary.week, summary.exercises, summary.new_exercises
      );
      if let Some(phase) = summary.cycle_phase {
        println!("Cycle phase: {}", phase);
      }
      println!(
        "Recovery: {}",
        if summary.recovery_ready { "ready" } else { "take it easy" }
      );
      for (step, outcome) in summary.steps() {
        println!("  {:<12} {}", step, outcome);
      }
    }

    Command::Phase { date } => {
      let profile = profile::load(&config.profile_path)?;
      match cycle::phase_for_profile(&profile, date.unwrap_or(today))? {
        Some(phase) => {
          println!("{} (Day {})", phase.phase, phase.day);
          println!("Energy: {}", phase.energy);
          println!("Tip: {}", phase.training_tip);
          println!("Intensity modifier: {}", phase.intensity_modifier);
        }
        None => println!("Cycle tracking is off"),
      }
    }

    Command::Recovery { date } => {
      let date = date.unwrap_or_else(recovery::default_snapshot_date);
      let client = WearableClient::from_env().ok();
      let snapshot = recovery::build_snapshot(client.as_ref(), date).await;

      println!("Recovery for {}", snapshot.date);
      println!("{}", snapshot.to_prompt_context());
      println!("Ready: {}", snapshot.recovery_ready);
    }

    Command::Normalize { file } => {
      let raw: serde_json::Value = serde_json::from_str(&fs::read_to_string(&file)?)?;
      let plan = plan::normalize(raw);
      println!("{}", serde_json::to_string_pretty(&plan)?);
    }

    Command::RefreshDashboard => {
      let snapshot = pipeline::refresh_dashboard(&config, today).await?;
      println!(
        "Dashboard refreshed ({})",
        if snapshot.has_data() { "with wearable data" } else { "no wearable data" }
      );
    }

    Command::ClearCalendar => {
      let deleted = pipeline::clear_calendar(&config).await?;
      println!("Deleted {} workout events", deleted);
    }

    Command::History { limit } => {
      let pool = db::initialize_db(&config.db_path).await?;
      for row in workout_log::recent_logs(&pool, limit).await? {
        println!(
          "{:>5}  W{:<3} {:<9} {:<32} {}x{} @ {}{}",
          row.id,
          row.week,
          row.day,
          row.exercise,
          row.sets.as_deref().unwrap_or("-"),
          row.reps.as_deref().unwrap_or("-"),
          row.target_weight.as_deref().unwrap_or("-"),
          if row.done { "  [done]" } else { "" }
        );
      }
      pool.close().await;
    }

    Command::Record {
      id,
      weight,
      reps,
      rpe,
      notes,
      skipped,
    } => {
      let pool = db::initialize_db(&config.db_path).await?;
      let result = SetResult {
        actual_weight: weight,
        actual_reps: reps,
        rpe,
        notes,
        done: !skipped,
      };

      if workout_log::record_result(&pool, id, &result).await? {
        println!("Recorded row {}", id);
      } else {
        eprintln!("No workout log row with id {}", id);
      }
      pool.close().await;
    }
  }

  Ok(())
}
