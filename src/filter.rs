//! Topic filter: keeps the service answering questions about one person.
//!
//! Two ordered rule sets run against the lowercased question. Any deny rule
//! match rejects. Otherwise any allow rule match accepts. Anything else is
//! rejected, so unfamiliar phrasings default to out of scope.

use anyhow::Result;
use regex::Regex;

use crate::config::PersonaConfig;

/// Off-topic requests, checked first.
const DENY_PATTERNS: &[&str] = &[
    // general knowledge and entertainment
    r"\b(weather|news|current events|stock|price|recipe|joke|story)\b",
    // arithmetic
    r"\b(calculate|solve)\s+\d+|what is \d+",
    // code generation
    r"write.*code",
    r"create.*function",
];

/// On-topic subjects. The direct-address rule is built separately from the
/// persona's aliases.
const ALLOW_PATTERNS: &[&str] = &[
    r"\b(tell me about|who is|who are you|about you|introduce)\b",
    r"\b(experience|work|job|career|project|skill|background|education|resume|cv)\b",
    r"\b(development|engineering|coding|programming|software|technical|ai|machine learning|data|architect)\b",
    r"\b(hire|hiring|interview|candidate|qualification|position|role)\b",
    r"\b(what do you do|what is your)\b",
    r"\b(personality|character|traits|values|culture|cultural|fit|working style|work style|communication|collaborate|collaboration|team|leadership|manage|management)\b",
    r"\b(motivation|motivated|drive|driven|passion|passionate|interest|interests|approach|philosophy|mindset|attitude)\b",
    r"\b(problem.solving|decision.making|conflict|stress|pressure|challenge|adapt|adaptable|flexible|creativity|creative)\b",
    r"\b(mentor|mentoring|learn|learning|grow|growth|feedback|improve|improvement|strengths|weaknesses|development)\b",
    r"\b(behavior|behavioral|situation|situational|example|tell me about a time|describe a time|how do you|how would you)\b",
];

struct DenyRule {
    pattern: Regex,
    /// The match is forgiven when the text after it matches this.
    unless_followed_by: Option<Regex>,
}

impl DenyRule {
    fn matches(&self, text: &str) -> bool {
        match self.pattern.find(text) {
            None => false,
            Some(m) => match &self.unless_followed_by {
                None => true,
                Some(exempt) => !exempt.is_match(&text[m.end()..]),
            },
        }
    }
}

/// Decides whether a question is about the persona.
pub struct TopicFilter {
    deny: Vec<DenyRule>,
    allow: Vec<Regex>,
}

impl TopicFilter {
    /// Build the filter. `aliases` are the lowercase names the persona is
    /// addressed by (e.g. `["tc", "heiner"]`); "you" and "your" always count.
    pub fn new(aliases: &[String]) -> Result<Self> {
        let mut deny = DENY_PATTERNS
            .iter()
            .map(|p| {
                Ok(DenyRule {
                    pattern: Regex::new(p)?,
                    unless_followed_by: None,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        // "generate a script" is fine when it is about the persona's own work.
        // Greedy `.*` makes the match end at the last "script".
        deny.push(DenyRule {
            pattern: Regex::new(r"generate.*script")?,
            unless_followed_by: Some(Regex::new(r"tc|work|project")?),
        });

        let mut address_terms: Vec<String> = aliases
            .iter()
            .map(|a| a.trim().to_lowercase())
            .filter(|a| !a.is_empty())
            .map(|a| regex::escape(&a))
            .collect();
        address_terms.push("you".to_string());
        address_terms.push("your".to_string());

        let mut allow = vec![Regex::new(&format!(r"\b({})\b", address_terms.join("|")))?];
        for p in ALLOW_PATTERNS {
            allow.push(Regex::new(p)?);
        }

        Ok(Self { deny, allow })
    }

    pub fn from_persona(persona: &PersonaConfig) -> Result<Self> {
        Self::new(&persona.aliases)
    }

    pub fn is_in_scope(&self, question: &str) -> bool {
        let q = question.to_lowercase();

        if self.deny.iter().any(|rule| rule.matches(&q)) {
            return false;
        }
        self.allow.iter().any(|re| re.is_match(&q))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter() -> TopicFilter {
        TopicFilter::from_persona(&PersonaConfig::default()).unwrap()
    }

    #[test]
    fn deny_wins_over_allow() {
        let f = filter();
        assert!(!f.is_in_scope("What's the weather today?"));
        assert!(!f.is_in_scope("TC, what's the weather like where you work?"));
        assert!(!f.is_in_scope("Tell me a joke about your career"));
        assert!(!f.is_in_scope("What is 42 times 7?"));
        assert!(!f.is_in_scope("Can you calculate 17 * 3"));
    }

    #[test]
    fn direct_address_is_in_scope() {
        let f = filter();
        assert!(f.is_in_scope("What does TC think about Rust?"));
        assert!(f.is_in_scope("Tell me about your experience"));
        assert!(f.is_in_scope("Where did Heiner study?"));
        assert!(f.is_in_scope("What's your experience with AWS?"));
    }

    #[test]
    fn professional_topics_are_in_scope() {
        let f = filter();
        assert!(f.is_in_scope("Describe a time of conflict on a team"));
        assert!(f.is_in_scope("Any machine learning background?"));
        assert!(f.is_in_scope("Problem-solving approach?"));
    }

    #[test]
    fn unknown_phrasing_defaults_to_out_of_scope() {
        let f = filter();
        assert!(!f.is_in_scope("Capital of France?"));
        assert!(!f.is_in_scope(""));
    }

    #[test]
    fn code_generation_requests_are_rejected() {
        let f = filter();
        assert!(!f.is_in_scope("Write some code that sorts your list"));
        assert!(!f.is_in_scope("Create a function for me, you bot"));
        assert!(!f.is_in_scope("generate a python script for you"));
    }

    #[test]
    fn script_generation_about_work_is_allowed() {
        let f = filter();
        assert!(f.is_in_scope("Did you generate a script for a project at ManaBurn?"));
        assert!(f.is_in_scope("generate a script like the ones you used at work"));
    }

    #[test]
    fn aliases_are_configurable() {
        let f = TopicFilter::new(&["ada".to_string()]).unwrap();
        assert!(f.is_in_scope("Where is Ada now?"));
        assert!(!f.is_in_scope("Where is Grace now?"));
    }

    #[test]
    fn word_boundaries_respected() {
        let f = filter();
        // "tc" inside another word is not direct address
        assert!(!f.is_in_scope("Is the batch finished?"));
    }
}
