//! Best-effort compression of long answers.

use crate::config::{GenerationConfig, SummaryConfig};
use crate::generate::{ChatModel, CompletionRequest};

/// Condenses answers longer than `threshold_chars` with a second model call.
pub struct Summarizer<'a> {
    pub model: &'a dyn ChatModel,
    pub settings: &'a SummaryConfig,
    pub generation: &'a GenerationConfig,
    pub persona_name: &'a str,
}

impl Summarizer<'_> {
    /// Whether `text` is long enough to be summarized.
    pub fn applies_to(&self, text: &str) -> bool {
        self.settings.enabled && text.chars().count() > self.settings.threshold_chars
    }

    /// Summarize `text` when it is over the threshold.
    ///
    /// Never fails: on any error the original text comes back unchanged.
    pub async fn summarize(&self, text: &str, api_key: &str) -> String {
        if !self.applies_to(text) {
            return text.to_string();
        }

        let request = CompletionRequest {
            prompt: summary_prompt(text, self.persona_name),
            api_key: api_key.to_string(),
            model: self.generation.model.clone(),
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
        };

        match self.model.complete(&request).await {
            Ok(summary) if !summary.trim().is_empty() => summary.trim().to_string(),
            Ok(_) => {
                tracing::warn!("summarization returned empty text; keeping original answer");
                text.to_string()
            }
            Err(e) => {
                tracing::warn!(error = %e, "summarization failed; keeping original answer");
                text.to_string()
            }
        }
    }
}

fn summary_prompt(text: &str, persona_name: &str) -> String {
    format!(
        "Condense the following answer. Keep the focus on:\n\
         - technical skills (languages, frameworks, tools, platforms)\n\
         - working skills (communication, collaboration, problem solving)\n\
         - concrete decisions and the reasoning behind them\n\
         - leadership and mentoring\n\n\
         Aim for 150-180 tokens, in the first person as {}. Use only what the answer states; \
         do not add or infer anything.\n\n\
         {}\n\n\
         Summary:",
        persona_name, text
    )
}
