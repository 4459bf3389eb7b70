//! Weekly plan email: HTML rendering and delivery.
//!
//! Without SMTP credentials the rendered HTML is saved to a local file
//! instead, so a run is never lost for want of a mail account.

use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use std::env;
use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;
use url::Url;

use crate::cycle::CyclePhase;
use crate::models::plan::WeeklyPlan;
use crate::models::profile::Profile;

use super::scheduled_days;

const DEFAULT_SMTP_HOST: &str = "smtp.gmail.com";
const DEFAULT_NOTES: &str = "Train hard, stay focused!";
const ACCENT: &str = "#d81b60";

/// ---------------------------------------------------------------------------
/// Configuration
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct EmailConfig {
  pub smtp_host: String,
  pub username: String,
  pub password: String,
}

impl EmailConfig {
  /// `None` unless both `EMAIL_USER` and `EMAIL_PASS` are set
  pub fn from_env() -> Option<Self> {
    let username = env::var("EMAIL_USER").ok().filter(|v| !v.is_empty())?;
    let password = env::var("EMAIL_PASS").ok().filter(|v| !v.is_empty())?;

    Some(Self {
      smtp_host: env::var("SMTP_HOST").unwrap_or_else(|_| DEFAULT_SMTP_HOST.to_string()),
      username,
      password,
    })
  }
}

#[derive(Error, Debug)]
pub enum EmailError {
  #[error("Invalid email address: {0}")]
  Address(String),

  #[error("Failed to build message: {0}")]
  Message(String),

  #[error("SMTP error: {0}")]
  Smtp(String),

  #[error("Failed to save plan: {0}")]
  Io(#[from] io::Error),

  #[error("Mail task failed: {0}")]
  Task(String),
}

/// Where the plan ended up
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
  Sent { recipient: String },
  Saved(PathBuf),
}

/// ---------------------------------------------------------------------------
/// Rendering
/// ---------------------------------------------------------------------------

pub fn escape_html(text: &str) -> String {
  html_escape::encode_quoted_attribute(text).into_owned()
}

/// Only http(s) links are rendered; anything else becomes `#`
fn safe_href(url: Option<&str>) -> String {
  url
    .and_then(|raw| Url::parse(raw.trim()).ok())
    .filter(|parsed| matches!(parsed.scheme(), "http" | "https"))
    .map(|parsed| escape_html(parsed.as_str()))
    .unwrap_or_else(|| "#".to_string())
}

fn cycle_banner(phase: &CyclePhase) -> String {
  let color = phase.phase.color();
  format!(
    r#"<div style="background: linear-gradient(135deg, {color}22, {color}44); border-left: 4px solid {color}; padding: 15px; margin: 15px 0; border-radius: 8px;">
  <strong>Cycle Phase:</strong> {phase} (Day {day})<br>
  <strong>Energy:</strong> {energy}<br>
  <em>{tip}</em>
</div>"#,
    color = color,
    phase = phase.phase,
    day = phase.day,
    energy = escape_html(&phase.energy),
    tip = escape_html(&phase.training_tip),
  )
}

/// Render the plan as an HTML email body, one table per scheduled day
pub fn render_html(profile: &Profile, plan: &WeeklyPlan, cycle: Option<&CyclePhase>) -> String {
  let notes = plan.coaching_notes.as_deref().unwrap_or(DEFAULT_NOTES);
  let banner = cycle.map(cycle_banner).unwrap_or_default();

  let mut html = format!(
    r#"<html>
<body style="font-family: 'Segoe UI', sans-serif; color: #333; background: #f9f9f9; padding: 20px;">
<div style="max-width: 700px; margin: 0 auto; background: white; border-radius: 12px; box-shadow: 0 2px 8px rgba(0,0,0,0.1); padding: 30px;">
<h2 style="color: {accent};">{name} Training Protocol: Week {week}</h2>
{banner}
<div style="background: #f0f7ff; padding: 15px; border-radius: 8px; margin: 15px 0;">
  <strong>Coach's Notes:</strong><br>
  {notes}
</div>
<p><strong>Goal:</strong> {goal}</p>
<hr style="border: none; border-top: 2px solid #eee;">
"#,
    accent = ACCENT,
    name = escape_html(profile.display_name()),
    week = profile.current_week,
    banner = banner,
    notes = escape_html(notes),
    goal = escape_html(&profile.primary_goal),
  );

  for (day, entries) in scheduled_days(profile, plan) {
    let _ = write!(
      html,
      "<h3 style='color: {}; margin-top: 25px;'>{} - {}</h3>\n",
      ACCENT,
      day,
      escape_html(profile.focus_for(day))
    );
    html.push_str(
      "<table border='0' cellpadding='10' style='border-collapse: collapse; width: 100%; background: #fafafa; border-radius: 8px;'>\n",
    );
    let _ = write!(
      html,
      "<tr style='background-color: {}; color: white;'><th>Exercise</th><th>Sets</th><th>Reps</th><th>Weight</th><th>Rest</th><th>Cues</th></tr>\n",
      ACCENT
    );

    for (i, entry) in entries.iter().enumerate() {
      let row_bg = if i % 2 == 0 { "#ffffff" } else { "#f5f5f5" };
      let _ = write!(
        html,
        r#"<tr style="background-color: {bg};">
  <td><a href="{url}" style="color: #0066cc; text-decoration: none; font-weight: bold;">{name}</a></td>
  <td style="text-align: center;">{sets}</td>
  <td style="text-align: center;">{reps}</td>
  <td style="text-align: center; font-weight: bold;">{weight}</td>
  <td style="text-align: center;">{rest}</td>
  <td><small style="color: #666;">{cues}</small></td>
</tr>
"#,
        bg = row_bg,
        url = safe_href(entry.url.as_deref()),
        name = escape_html(&entry.exercise),
        sets = escape_html(entry.sets_or_default()),
        reps = escape_html(entry.reps_or_default()),
        weight = escape_html(entry.target_weight_or_default()),
        rest = escape_html(entry.rest_or_default()),
        cues = escape_html(entry.cues.as_deref().unwrap_or("")),
      );
    }
    html.push_str("</table>\n");
  }

  html.push_str(
    r#"<br><hr style="border: none; border-top: 2px solid #eee;">
<p style="color: #888; font-size: 12px;"><em>Your Personal AI Coach</em></p>
</div>
</body>
</html>
"#,
  );
  html
}

pub fn subject(week: u32) -> String {
  format!("Your Training Plan - Week {}", week)
}

/// ---------------------------------------------------------------------------
/// Delivery
/// ---------------------------------------------------------------------------

/// Send the plan over SMTPS, or save it to `fallback_path` when no mail
/// account is configured
pub async fn send_email(
  config: Option<&EmailConfig>,
  html: &str,
  recipient: &str,
  week: u32,
  fallback_path: &Path,
) -> Result<Delivery, EmailError> {
  let Some(config) = config else {
    fs::write(fallback_path, html)?;
    info!(path = %fallback_path.display(), "email credentials not set, saved plan HTML");
    return Ok(Delivery::Saved(fallback_path.to_path_buf()));
  };

  let message = build_message(config, html, recipient, week)?;
  let mailer = SmtpTransport::relay(&config.smtp_host)
    .map_err(|e| EmailError::Smtp(e.to_string()))?
    .credentials(Credentials::new(
      config.username.clone(),
      config.password.clone(),
    ))
    .build();

  // lettre's SmtpTransport blocks
  tokio::task::spawn_blocking(move || mailer.send(&message))
    .await
    .map_err(|e| EmailError::Task(e.to_string()))?
    .map_err(|e| EmailError::Smtp(e.to_string()))?;

  info!(recipient, week, "plan email sent");
  Ok(Delivery::Sent {
    recipient: recipient.to_string(),
  })
}

fn build_message(
  config: &EmailConfig,
  html: &str,
  recipient: &str,
  week: u32,
) -> Result<Message, EmailError> {
  let from = config
    .username
    .parse::<Mailbox>()
    .map_err(|e| EmailError::Address(format!("{}: {}", config.username, e)))?;
  let to = recipient
    .parse::<Mailbox>()
    .map_err(|e| EmailError::Address(format!("{}: {}", recipient, e)))?;

  Message::builder()
    .from(from)
    .to(to)
    .subject(subject(week))
    .header(ContentType::TEXT_HTML)
    .body(html.to_string())
    .map_err(|e| EmailError::Message(e.to_string()))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cycle::cycle_phase_from_str;
  use crate::models::plan::{DayName, ExerciseEntry};
  use crate::test_utils::{mock_plan, mock_profile};
  use chrono::NaiveDate;
  use serial_test::serial;

  #[test]
  fn test_escape_html() {
    let escaped = escape_html(r#"<b>"Tom" & 'Jerry'</b>"#);
    assert!(escaped.starts_with("&lt;b&gt;&quot;Tom&quot; &amp; "));
    assert!(escaped.ends_with("&lt;/b&gt;"));
    assert!(!escaped.contains('\''));
    assert!(!escaped.contains('"'));
  }

  #[test]
  fn test_only_web_links_are_rendered() {
    assert_eq!(
      safe_href(Some("https://youtu.be/hip-thrust")),
      "https://youtu.be/hip-thrust"
    );
    assert_eq!(
      safe_href(Some("http://example.com/a?x=1&y=2")),
      "http://example.com/a?x=1&amp;y=2"
    );
    assert_eq!(safe_href(Some("javascript:alert(1)")), "#");
    assert_eq!(safe_href(Some("JavaScript:alert(1)")), "#");
    assert_eq!(safe_href(Some("data:text/html,<b>x</b>")), "#");
    assert_eq!(safe_href(Some("not a url")), "#");
    assert_eq!(safe_href(None), "#");

    let mut profile = mock_profile();
    profile.user_name = None;
    let mut plan = WeeklyPlan::default();
    let mut entry = ExerciseEntry::named("Curl");
    entry.url = Some("javascript:alert(document.cookie)".to_string());
    plan.days.insert(DayName::Monday, vec![entry]);

    let html = render_html(&profile, &plan, None);
    assert!(!html.contains("javascript:"));
    assert!(html.contains(r##"href="#""##));
  }

  #[test]
  fn test_render_html_contents() {
    let profile = mock_profile();
    let plan = mock_plan();
    let reference = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
    let cycle = cycle_phase_from_str(reference, "2025-01-01", 28).unwrap();

    let html = render_html(&profile, &plan, Some(&cycle));

    assert!(html.contains("Alex Training Protocol: Week 4"));
    assert!(html.contains("Cycle Phase:</strong> Menstrual (Day 1)"));
    assert!(html.contains("border-left: 4px solid #e57373"));
    assert!(html.contains("Heavy hinge focus this week."));
    assert!(html.contains("<strong>Goal:</strong> Build glutes and back strength"));
    assert!(html.contains("Monday - Glutes &amp; Hamstrings"));
    assert!(html.contains(r#"href="https://youtu.be/hip-thrust""#));
    assert!(html.contains("Ribs down, squeeze at the top"));
    // Tuesday is scheduled but not in the plan
    assert!(!html.contains("Tuesday - "));

    let monday = html.find("Monday - ").unwrap();
    let wednesday = html.find("Wednesday - ").unwrap();
    assert!(monday < wednesday);
  }

  #[test]
  fn test_render_html_defaults_and_escaping() {
    let mut profile = mock_profile();
    profile.user_name = None;
    let mut plan = WeeklyPlan::default();
    plan
      .days
      .insert(DayName::Monday, vec![ExerciseEntry::named("<script>Curl</script>")]);

    let html = render_html(&profile, &plan, None);

    assert!(html.contains("Your Training Protocol"));
    assert!(html.contains(DEFAULT_NOTES));
    assert!(!html.contains("Cycle Phase"));
    assert!(html.contains("&lt;script&gt;Curl&lt;/script&gt;"));
    assert!(!html.contains("<script>"));
    assert!(html.contains(r##"href="#""##));
    assert!(html.contains(">RPE 7-8<"));
  }

  #[test]
  #[serial]
  fn test_email_config_requires_both_credentials() {
    temp_env::with_vars(
      [("EMAIL_USER", Some("coach@example.com")), ("EMAIL_PASS", None)],
      || assert!(EmailConfig::from_env().is_none()),
    );

    temp_env::with_vars(
      [
        ("EMAIL_USER", Some("coach@example.com")),
        ("EMAIL_PASS", Some("secret")),
        ("SMTP_HOST", None),
      ],
      || {
        let config = EmailConfig::from_env().unwrap();
        assert_eq!(config.smtp_host, "smtp.gmail.com");
        assert_eq!(config.username, "coach@example.com");
      },
    );
  }

  #[tokio::test]
  async fn test_send_without_credentials_saves_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("weekly_plan.html");

    let delivery = send_email(None, "<html></html>", "me@example.com", 4, &path)
      .await
      .unwrap();

    assert_eq!(delivery, Delivery::Saved(path.clone()));
    assert_eq!(fs::read_to_string(&path).unwrap(), "<html></html>");
  }

  #[tokio::test]
  async fn test_send_rejects_bad_recipient() {
    let config = EmailConfig {
      smtp_host: "localhost".to_string(),
      username: "coach@example.com".to_string(),
      password: "secret".to_string(),
    };
    let dir = tempfile::tempdir().unwrap();

    let result = send_email(Some(&config), "<html></html>", "not an address", 4, &dir.path().join("x.html")).await;
    assert!(matches!(result, Err(EmailError::Address(_))));
  }

  #[test]
  fn test_subject() {
    assert_eq!(subject(7), "Your Training Plan - Week 7");
  }
}
