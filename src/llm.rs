//! LLM integration for weekly plan generation
//!
//! Sends the composed planning prompt to the Claude messages API and turns
//! the reply into a normalized `WeeklyPlan`.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::models::plan::WeeklyPlan;
use crate::plan;

/// ---------------------------------------------------------------------------
/// Configuration
/// ---------------------------------------------------------------------------

const CLAUDE_API_URL: &str = "https://api.anthropic.com/v1/messages";
const CLAUDE_MODEL: &str = "claude-sonnet-4-20250514";
const API_VERSION: &str = "2023-06-01";
/// A full week of 5-6 exercises per day with cues runs long
const PLAN_MAX_TOKENS: u32 = 8000;

/// ---------------------------------------------------------------------------
/// Error Types
/// ---------------------------------------------------------------------------

#[derive(Error, Debug, Serialize)]
pub enum LlmError {
  #[error("API key not configured")]
  MissingApiKey,

  #[error("Request failed: {0}")]
  Request(String),

  #[error("API error: {0}")]
  Api(String),

  #[error("Parse error: {0}")]
  Parse(String),

  #[error("Model returned a plan with no workout days")]
  EmptyPlan,
}

/// ---------------------------------------------------------------------------
/// Claude API Types
/// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ClaudeRequest {
  model: String,
  max_tokens: u32,
  system: String,
  messages: Vec<ClaudeMessage>,
}

#[derive(Debug, Serialize)]
struct ClaudeMessage {
  role: String,
  content: String,
}

#[derive(Debug, Deserialize)]
struct ClaudeResponse {
  content: Vec<ContentBlock>,
  #[allow(dead_code)]
  stop_reason: Option<String>,
  usage: Usage,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
  #[serde(rename = "type")]
  content_type: String,
  text: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Usage {
  pub input_tokens: u32,
  pub output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ClaudeErrorResponse {
  error: ClaudeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ClaudeErrorDetail {
  message: String,
}

/// ---------------------------------------------------------------------------
/// Claude Client
/// ---------------------------------------------------------------------------

pub struct ClaudeClient {
  client: Client,
  api_key: String,
  api_url: String,
  model: String,
}

impl ClaudeClient {
  pub fn new(api_key: impl Into<String>) -> Self {
    Self {
      client: Client::new(),
      api_key: api_key.into(),
      api_url: CLAUDE_API_URL.to_string(),
      model: CLAUDE_MODEL.to_string(),
    }
  }

  /// Create a client from `ANTHROPIC_API_KEY`, with optional `COACH_MODEL`
  /// and `COACH_API_URL` overrides
  pub fn from_env() -> Result<Self, LlmError> {
    let api_key = std::env::var("ANTHROPIC_API_KEY").map_err(|_| LlmError::MissingApiKey)?;

    let mut client = Self::new(api_key);
    if let Ok(model) = std::env::var("COACH_MODEL") {
      client.model = model;
    }
    if let Ok(url) = std::env::var("COACH_API_URL") {
      client.api_url = url;
    }
    Ok(client)
  }

  pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
    self.api_url = api_url.into();
    self
  }

  pub fn model(&self) -> &str {
    &self.model
  }

  /// Call Claude with a system prompt and user message
  pub async fn complete(
    &self,
    system_prompt: &str,
    user_message: &str,
    max_tokens: u32,
  ) -> Result<(String, Usage), LlmError> {
    let request = ClaudeRequest {
      model: self.model.clone(),
      max_tokens,
      system: system_prompt.to_string(),
      messages: vec![ClaudeMessage {
        role: "user".to_string(),
        content: user_message.to_string(),
      }],
    };

    let response = self
      .client
      .post(&self.api_url)
      .header("x-api-key", &self.api_key)
      .header("anthropic-version", API_VERSION)
      .header("content-type", "application/json")
      .json(&request)
      .send()
      .await
      .map_err(|e| LlmError::Request(e.to_string()))?;

    let status = response.status();
    let body = response
      .text()
      .await
      .map_err(|e| LlmError::Request(e.to_string()))?;

    if !status.is_success() {
      if let Ok(error_resp) = serde_json::from_str::<ClaudeErrorResponse>(&body) {
        return Err(LlmError::Api(error_resp.error.message));
      }
      return Err(LlmError::Api(format!("HTTP {}: {}", status, body)));
    }

    let claude_response: ClaudeResponse =
      serde_json::from_str(&body).map_err(|e| LlmError::Parse(e.to_string()))?;

    let text = claude_response
      .content
      .iter()
      .find(|c| c.content_type == "text")
      .and_then(|c| c.text.clone())
      .ok_or_else(|| LlmError::Parse("No text content in response".to_string()))?;

    Ok((text, claude_response.usage))
  }

  /// Generate the week's plan from a composed prompt.
  ///
  /// Whatever JSON the model sends is normalized; only a reply with no JSON
  /// at all, or with no workout days, is an error.
  pub async fn generate_plan(&self, prompt: &str) -> Result<(WeeklyPlan, Usage), LlmError> {
    let system_prompt = include_str!("prompts/coach_system.txt");

    info!(model = %self.model, "requesting weekly plan");
    let (response_text, usage) = self
      .complete(system_prompt, prompt, PLAN_MAX_TOKENS)
      .await?;
    debug!(
      input_tokens = usage.input_tokens,
      output_tokens = usage.output_tokens,
      "plan response received"
    );

    let plan = parse_plan_response(&response_text)?;
    Ok((plan, usage))
  }
}

/// Extract, decode and normalize a plan from raw model text
pub fn parse_plan_response(text: &str) -> Result<WeeklyPlan, LlmError> {
  let json_str = extract_json(text)?;
  let raw: serde_json::Value = serde_json::from_str(&json_str)
    .map_err(|e| LlmError::Parse(format!("{}: {}", e, json_str)))?;

  let plan = plan::normalize(raw);
  if plan.is_empty() {
    return Err(LlmError::EmptyPlan);
  }
  Ok(plan)
}

/// Extract JSON from the model's response (handles markdown code blocks)
fn extract_json(text: &str) -> Result<String, LlmError> {
  let trimmed = text.trim();
  if trimmed.starts_with('{') || trimmed.starts_with('[') {
    return Ok(trimmed.to_string());
  }

  // Look for JSON in code blocks
  if let Some(start) = text.find("```json") {
    let start = start + 7;
    if let Some(end) = text[start..].find("```") {
      return Ok(text[start..start + end].trim().to_string());
    }
  }

  // Look for plain code blocks
  if let Some(start) = text.find("```") {
    let start = start + 3;
    // Skip language identifier if present
    let content_start = text[start..]
      .find('\n')
      .map(|i| start + i + 1)
      .unwrap_or(start);
    if let Some(end) = text[content_start..].find("```") {
      return Ok(text[content_start..content_start + end].trim().to_string());
    }
  }

  // Last resort: outermost object or array
  let open = match (text.find('{'), text.find('[')) {
    (Some(brace), Some(bracket)) => Some(brace.min(bracket)),
    (brace, bracket) => brace.or(bracket),
  };
  if let Some(start) = open {
    let close = if text[start..].starts_with('{') { '}' } else { ']' };
    if let Some(end) = text.rfind(close).filter(|end| *end > start) {
      return Ok(text[start..=end].to_string());
    }
  }

  Err(LlmError::Parse("Could not extract JSON from response".to_string()))
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
