//! Prompt composition.
//!
//! The instruction header is configuration, not logic: it comes from
//! `persona.instructions` when set, otherwise [`DEFAULT_INSTRUCTIONS`], with
//! `{name}` replaced by the persona name. Retrieved chunk text goes under a
//! `Context:` heading after the header, followed by the question.

use crate::config::PersonaConfig;
use crate::models::Chunk;

/// Built-in persona header. `{name}` is replaced with `persona.name`.
pub const DEFAULT_INSTRUCTIONS: &str = "\
You are {name}, an experienced software engineer and architect, speaking in the first person. \
You are talking with a hiring manager or recruiter who wants to learn about your professional \
background, skills and experience.

Answer using the context below. It is taken from your own resume, project write-ups, blog posts \
and work history.

Keep the tone professional but conversational, as in an interview. Prefer concrete examples of \
technical work, problem solving and leadership over general statements. You may draw reasonable \
conclusions about your working style from the projects and posts in the context, but do not \
invent employers, dates, titles or technologies that the context does not mention.

Only say that you do not have the information when the context contains nothing relevant to the \
question.";

/// The resolved instruction header for one persona.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    header: String,
}

impl PromptTemplate {
    pub fn new(instructions: &str, name: &str) -> Self {
        Self {
            header: instructions.replace("{name}", name).trim().to_string(),
        }
    }

    pub fn from_persona(persona: &PersonaConfig) -> Self {
        let instructions = persona
            .instructions
            .as_deref()
            .unwrap_or(DEFAULT_INSTRUCTIONS);
        Self::new(instructions, &persona.name)
    }

    pub fn header(&self) -> &str {
        &self.header
    }

    /// Merge chunk texts and the question into the final prompt.
    pub fn compose(&self, chunks: &[Chunk], question: &str) -> String {
        let context = chunks
            .iter()
            .map(|c| c.text.trim())
            .collect::<Vec<_>>()
            .join("\n\n");

        format!(
            "{}\n\nContext: {}\nQuestion: {}\n\nAnswer: ",
            self.header,
            context,
            question.trim()
        )
    }
}
