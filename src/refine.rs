//! Optional narrative refinement over an OpenAI-compatible chat.completions endpoint.
//!
//! Purely cosmetic: it rewrites a variant's title/description in the story persona and never
//! sees or changes selection or registry state. Any failure keeps the template narrative.
//!
//! NOTE: We never log the API key, and response bodies are truncated before logging.

use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::config::Prompts;
use crate::domain::Problem;
use crate::narrative::{Narrative, Variant};
use crate::util::{fill_template, trunc_for_log};

#[derive(Clone)]
pub struct Refiner {
  pub client: reqwest::Client,
  pub api_key: String,
  pub base_url: String,
  pub model: String,
}

/// Shape the model is asked to return. Both fields must be non-empty to be accepted.
#[derive(Debug, Default, Deserialize)]
struct RefinedNarrative {
  #[serde(default)] title: String,
  #[serde(default)] description: String,
}

impl RefinedNarrative {
  fn accept(self) -> Option<Narrative> {
    let title = self.title.trim();
    let description = self.description.trim();
    if title.is_empty() || description.is_empty() {
      None
    } else {
      Some(Narrative { title: title.to_string(), description: description.to_string() })
    }
  }
}

impl Refiner {
  /// Construct the client if we find OPENAI_API_KEY; otherwise return None.
  pub fn from_env() -> Option<Self> {
    let api_key = std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.trim().is_empty())?;
    let base_url =
      std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".into());
    let model = std::env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".into());

    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(30))
      .build()
      .ok()?;

    Some(Self { client, api_key, base_url, model })
  }

  /// JSON-object chat completion. Generic over the target type T.
  #[instrument(level = "debug", skip(self, system, user), fields(model = %self.model))]
  async fn chat_json<T: for<'a> Deserialize<'a>>(
    &self,
    system: &str,
    user: &str,
    temperature: f32,
  ) -> Result<T, String> {
    let url = format!("{}/chat/completions", self.base_url);
    let req = ChatCompletionRequest {
      model: self.model.clone(),
      messages: vec![
        ChatMessageReq { role: "system".into(), content: system.into() },
        ChatMessageReq { role: "user".into(), content: user.into() },
      ],
      temperature,
      response_format: Some(ResponseFormat { r#type: "json_object".into() }),
    };

    let res = self.client.post(&url)
      .header(USER_AGENT, concat!("questforge/", env!("CARGO_PKG_VERSION")))
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .json(&req).send().await.map_err(|e| e.to_string())?;

    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      let msg = extract_api_error(&body).unwrap_or_else(|| trunc_for_log(&body, 200));
      return Err(format!("chat HTTP {}: {}", status, msg));
    }

    let body: ChatCompletionResponse = res.json().await.map_err(|e| e.to_string())?;
    if let Some(usage) = &body.usage {
      info!(target: "refine", prompt_tokens = ?usage.prompt_tokens, completion_tokens = ?usage.completion_tokens, total_tokens = ?usage.total_tokens, "Model usage");
    }
    let text = body.choices.first()
      .and_then(|c| c.message.content.clone())
      .unwrap_or_default();

    serde_json::from_str::<T>(&text).map_err(|e| format!("JSON parse error: {} in {}", e, trunc_for_log(&text, 120)))
  }

  /// Rewrite one variant's narrative in its story persona.
  #[instrument(level = "info", skip(self, prompts, variant, problem), fields(variant_id = %variant.variant_id))]
  pub async fn refine_narrative(
    &self,
    prompts: &Prompts,
    variant: &Variant,
    problem: &Problem,
  ) -> Result<Option<Narrative>, String> {
    let topic = problem.topic.to_string();
    let user = fill_template(
      &prompts.refine_user_template,
      &[
        ("persona", prompts.persona_for(&variant.story_id)),
        ("difficulty", problem.difficulty.as_str()),
        ("topic", topic.as_str()),
        ("title", variant.narrative.title.as_str()),
        ("description", variant.narrative.description.as_str()),
      ],
    );
    let refined: RefinedNarrative = self.chat_json(&prompts.refine_system, &user, 0.7).await?;
    Ok(refined.accept())
  }
}

/// Refine every variant in place. Without a refiner this is a no-op; failed or empty
/// refinements keep the template narrative.
pub async fn refine_variants(refiner: Option<&Refiner>, prompts: &Prompts, problem: &Problem, variants: &mut [Variant]) {
  let Some(refiner) = refiner else { return };
  for variant in variants.iter_mut() {
    match refiner.refine_narrative(prompts, variant, problem).await {
      Ok(Some(narrative)) => variant.narrative = narrative,
      Ok(None) => {
        warn!(target: "refine", variant_id = %variant.variant_id, "Refinement returned empty title/description; keeping template");
      }
      Err(e) => {
        warn!(target: "refine", variant_id = %variant.variant_id, error = %e, "Refinement failed; keeping template");
      }
    }
  }
}

// --- Chat DTOs ---

#[derive(Serialize)]
struct ChatCompletionRequest {
  model: String,
  messages: Vec<ChatMessageReq>,
  temperature: f32,
  #[serde(skip_serializing_if = "Option::is_none")]
  response_format: Option<ResponseFormat>,
}
#[derive(Serialize)]
struct ChatMessageReq { role: String, content: String }
#[derive(Serialize)]
struct ResponseFormat { #[serde(rename = "type")] r#type: String }

#[derive(Deserialize)]
struct ChatCompletionResponse {
  choices: Vec<ChatChoice>,
  #[serde(default)] usage: Option<Usage>,
}
#[derive(Deserialize)]
struct ChatChoice { message: ChatMessageResp }
#[derive(Deserialize)]
struct ChatMessageResp { content: Option<String> }
#[derive(Deserialize)]
struct Usage {
  #[serde(default)] prompt_tokens: Option<u32>,
  #[serde(default)] completion_tokens: Option<u32>,
  #[serde(default)] total_tokens: Option<u32>,
}

/// Try to extract a clean error message from an API error body.
fn extract_api_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  serde_json::from_str::<EWrap>(body).ok().map(|w| w.error.message)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::Stories;
  use crate::domain::fixtures::problem;
  use crate::domain::{Difficulty, Mode};
  use crate::narrative::make_language_variants;

  #[test]
  fn refinement_requires_both_fields() {
    let ok: RefinedNarrative = serde_json::from_str(r#"{"title": " T ", "description": "D"}"#).unwrap();
    assert_eq!(ok.accept(), Some(Narrative { title: "T".into(), description: "D".into() }));

    let missing: RefinedNarrative = serde_json::from_str(r#"{"title": "T"}"#).unwrap();
    assert_eq!(missing.accept(), None);
  }

  #[test]
  fn api_error_message_is_extracted() {
    let body = r#"{"error": {"message": "Invalid API key", "type": "auth"}}"#;
    assert_eq!(extract_api_error(body).as_deref(), Some("Invalid API key"));
    assert_eq!(extract_api_error("<html>bad gateway</html>"), None);
  }

  #[test]
  fn request_serializes_json_mode() {
    let req = ChatCompletionRequest {
      model: "m".into(),
      messages: vec![ChatMessageReq { role: "user".into(), content: "hi".into() }],
      temperature: 0.7,
      response_format: Some(ResponseFormat { r#type: "json_object".into() }),
    };
    let v = serde_json::to_value(&req).unwrap();
    assert_eq!(v["response_format"]["type"], "json_object");
    assert_eq!(v["messages"][0]["role"], "user");
  }

  #[tokio::test]
  async fn without_refiner_variants_are_untouched() {
    let p = problem(1, Difficulty::Medium);
    let mut variants = make_language_variants(&p, &["python".to_string()], &Stories::default(), Mode::Learn);
    let before = variants.clone();
    refine_variants(None, &Prompts::default(), &p, &mut variants).await;
    assert_eq!(variants, before);
  }
}
