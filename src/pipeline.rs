//! The question-answering pipeline.
//!
//! One sequential chain per question:
//! topic filter → retrieve → compose prompt → generate → summarize →
//! source links + confidence → assembled answer.
//!
//! Only failures to reach the index are returned as errors. Off-topic
//! questions and upstream model failures produce a normal [`AnswerResult`]
//! with a fixed message and no sources; upstream error text is logged, never
//! returned.

use anyhow::Result;

use crate::confidence;
use crate::context::AppContext;
use crate::error::GenerationError;
use crate::generate::generate;
use crate::links::format_links;
use crate::models::{AnswerResult, QueryRequest, RetrievedSource};
use crate::retrieve::retrieve;
use crate::summarize::Summarizer;

pub const BAD_KEY_MESSAGE: &str = "There seems to be an issue with the API key provided. \
Please check that it's a valid OpenAI API key and try again.";

pub const FAILURE_MESSAGE: &str =
    "I encountered an error processing your question. Please try again later.";

/// Fixed reply for questions the topic filter rejects.
pub fn refusal_message(name: &str) -> String {
    format!(
        "I can only answer questions about {}'s experience, skills, projects, and professional \
         background. Please ask something related to their work or career.",
        name
    )
}

/// Answer one question end to end.
pub async fn answer(ctx: &AppContext, request: &QueryRequest) -> Result<AnswerResult> {
    let config = &ctx.config;
    let question = request.question.trim();

    if !ctx.filter.is_in_scope(question) {
        tracing::info!("question rejected by topic filter");
        return Ok(fixed_reply(refusal_message(&config.persona.name)));
    }

    let caller_key = request
        .caller_api_key
        .as_deref()
        .map(str::trim)
        .filter(|k| !k.is_empty());
    let api_key = caller_key.or(config.api_key.as_deref());

    let index = ctx.index().await?;
    let retrieved = match retrieve(
        index.as_ref(),
        question,
        config.retrieval.k,
        config.retrieval.min_similarity,
    )
    .await
    {
        Ok(r) => r,
        Err(e) => {
            tracing::error!(error = %e, "retrieval failed");
            return Ok(fixed_reply(FAILURE_MESSAGE.to_string()));
        }
    };

    let chunks: Vec<_> = retrieved.iter().map(|sc| sc.chunk.clone()).collect();
    let prompt = ctx.template.compose(&chunks, question);

    let generation = match generate(
        ctx.chat.as_ref(),
        &config.generation,
        &prompt,
        &retrieved,
        api_key,
    )
    .await
    {
        Ok(g) => g,
        Err(e) => return Ok(fixed_reply(failure_message(&e))),
    };

    let summarizer = Summarizer {
        model: ctx.chat.as_ref(),
        settings: &config.summary,
        generation: &config.generation,
        persona_name: &config.persona.name,
    };
    // generate() only succeeds with a key, so this is always Some here
    let body = match api_key {
        Some(key) => summarizer.summarize(&generation.text, key).await,
        None => generation.text.clone(),
    };

    let sources: Vec<RetrievedSource> = retrieved.iter().map(RetrievedSource::from).collect();
    let links = format_links(&sources, config.links.base_url());
    let confidence = confidence::score(sources.len(), question, &config.confidence.keywords);

    let model_name = display_model_name(&config.generation.model);
    let model_note = if caller_key.is_some() {
        format!("\n\n*Response generated using your API key with {}*", model_name)
    } else {
        format!("\n\n*Free response powered by {}*", model_name)
    };
    let confidence_note = format!(
        "\n\n**Confidence: {}** ({})",
        confidence.label, confidence.explanation
    );

    tracing::info!(
        sources = sources.len(),
        confidence = %confidence.label,
        used_chunks = generation.used_chunks.len(),
        caller_key = caller_key.is_some(),
        "question answered"
    );

    Ok(AnswerResult {
        text: format!("{}{}{}{}", body, links, model_note, confidence_note),
        sources,
        confidence_label: Some(confidence.label),
    })
}

fn fixed_reply(text: String) -> AnswerResult {
    AnswerResult {
        text,
        sources: Vec::new(),
        confidence_label: None,
    }
}

fn failure_message(err: &GenerationError) -> String {
    tracing::error!(error = %err, auth = err.is_auth_failure(), "generation failed");
    if err.is_auth_failure() {
        BAD_KEY_MESSAGE.to_string()
    } else {
        FAILURE_MESSAGE.to_string()
    }
}

/// `gpt-4o-mini` → `GPT-4o-mini`; other names are shown as configured.
fn display_model_name(model: &str) -> String {
    match model.strip_prefix("gpt-") {
        Some(rest) => format!("GPT-{}", rest),
        None => model.to_string(),
    }
}
