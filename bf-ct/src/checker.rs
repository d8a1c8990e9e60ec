//! Consistency checker
//!
//! Checks a block of new manuscript text against a book's stored facts:
//! 1. Format up to [`MAX_CONTEXT_FACTS`] facts as one context line each
//! 2. Ask the language model to flag contradictions, conservatively
//! 3. Pull the JSON array out of the free-text reply and decode it
//!
//! A reply that cannot be decoded is a [`CheckOutcome::Degraded`] result,
//! not an error. Transport and API failures are errors.

use serde::Deserialize;
use tracing::{debug, warn};

use crate::llm::{CompletionRequest, LanguageModel, LlmError};
use crate::models::{IssueCandidate, IssueSeverity, IssueType};

/// Facts included in a single check
pub const MAX_CONTEXT_FACTS: i64 = 100;

/// New text beyond this many characters is not checked
pub const MAX_CONTENT_CHARS: usize = 5000;

/// Source label for facts with no originating chapter
const UNKNOWN_ORIGIN: &str = "earlier";

const SYSTEM_PROMPT: &str = "You are a meticulous continuity editor for fiction manuscripts. \
You compare new text against facts already established in the story and report only clear \
continuity errors.";

/// A stored fact as presented to the model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextFact {
    pub subject: String,
    pub attribute: String,
    pub current_value: String,
    /// Title of the chapter that established the fact
    pub chapter_title: Option<String>,
}

/// Result of a consistency check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    /// The book has no facts; the model was not called
    NoFacts,
    /// The reply was decoded; `issues` may be empty
    Checked {
        issues: Vec<IssueCandidate>,
        facts_checked: usize,
    },
    /// The reply could not be decoded
    Degraded {
        reason: String,
        facts_checked: usize,
    },
}

/// Render facts as prompt context, one line per fact, in input order
pub fn build_fact_context(facts: &[ContextFact]) -> String {
    facts
        .iter()
        .map(|fact| {
            format!(
                "{}: {} = \"{}\" (from {})",
                fact.subject,
                fact.attribute,
                fact.current_value,
                fact.chapter_title.as_deref().unwrap_or(UNKNOWN_ORIGIN)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// First [`MAX_CONTENT_CHARS`] characters of `content`
pub fn truncate_content(content: &str) -> &str {
    match content.char_indices().nth(MAX_CONTENT_CHARS) {
        Some((byte_index, _)) => &content[..byte_index],
        None => content,
    }
}

pub fn build_prompt(fact_context: &str, content: &str) -> String {
    format!(
        r#"ESTABLISHED FACTS:
{fact_context}

NEW TEXT TO CHECK:
{content}

Compare the new text against the established facts. Flag ONLY these problems:
1. contradiction - the text directly contradicts an established fact
2. character_knowledge - a character knows information they could not know yet
3. timeline_conflict - events happen in an impossible order or timeframe
4. location_impossible - a character is somewhere they cannot be
5. trait_inconsistency - a character acts against an established trait without explanation

Be conservative. Do not flag anything ambiguous, stylistic, or explainable by later text.

Respond with a JSON array only. Each element:
{{"type": "<one of the five types>", "severity": "critical" | "warning", "title": "...", "description": "...", "excerpt": "<quote from the new text>", "suggestion": "..."}}
If there are no problems respond with []."#
    )
}

/// The span from the first `[` to the last `]`, if any
pub fn extract_json_array(reply: &str) -> Option<&str> {
    let start = reply.find('[')?;
    let end = reply.rfind(']')?;
    (end > start).then(|| &reply[start..=end])
}

/// Candidate as the model writes it; every field optional
#[derive(Debug, Deserialize)]
struct RawCandidate {
    #[serde(rename = "type")]
    issue_type: Option<String>,
    severity: Option<String>,
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    excerpt: String,
    #[serde(default)]
    suggestion: String,
}

impl RawCandidate {
    /// Typed candidate, or `None` for an unknown type or severity
    fn into_candidate(self) -> Option<IssueCandidate> {
        let issue_type = IssueType::parse(self.issue_type.as_deref()?.trim())?;
        let severity = match self.severity.as_deref().map(str::trim) {
            None | Some("") => IssueSeverity::Warning,
            Some(s) => IssueSeverity::parse(s)?,
        };

        Some(IssueCandidate {
            issue_type,
            severity,
            title: self.title,
            description: self.description,
            excerpt: self.excerpt,
            suggestion: self.suggestion,
        })
    }
}

/// Decode the model reply into issue candidates
///
/// `Err` carries the reason the reply as a whole was unusable. Individual
/// elements with an unknown type or severity are skipped.
pub fn parse_candidates(reply: &str) -> Result<Vec<IssueCandidate>, String> {
    let json = extract_json_array(reply).ok_or_else(|| "no JSON array in reply".to_string())?;
    let raw: Vec<RawCandidate> =
        serde_json::from_str(json).map_err(|e| format!("invalid JSON array: {}", e))?;

    let total = raw.len();
    let candidates: Vec<IssueCandidate> =
        raw.into_iter().filter_map(RawCandidate::into_candidate).collect();

    if candidates.len() < total {
        warn!(
            dropped = total - candidates.len(),
            "Skipped candidates with unknown type or severity"
        );
    }

    Ok(candidates)
}

/// Runs checks against a language model
pub struct ConsistencyChecker<'a> {
    model: &'a dyn LanguageModel,
    max_tokens: u32,
}

impl<'a> ConsistencyChecker<'a> {
    pub fn new(model: &'a dyn LanguageModel, max_tokens: u32) -> Self {
        Self { model, max_tokens }
    }

    /// Check `content` against `facts`
    ///
    /// `facts` should already be bounded and ordered (see
    /// [`crate::db::facts::list_context_facts`]).
    pub async fn check(
        &self,
        facts: &[ContextFact],
        content: &str,
    ) -> Result<CheckOutcome, LlmError> {
        if facts.is_empty() {
            return Ok(CheckOutcome::NoFacts);
        }

        let content = truncate_content(content);
        let prompt = build_prompt(&build_fact_context(facts), content);

        debug!(
            model = %self.model.model_name(),
            facts = facts.len(),
            content_chars = content.chars().count(),
            "Running consistency check"
        );

        let reply = self
            .model
            .complete(CompletionRequest {
                system: Some(SYSTEM_PROMPT.to_string()),
                prompt,
                max_tokens: self.max_tokens,
            })
            .await?;

        Ok(match parse_candidates(&reply) {
            Ok(issues) => CheckOutcome::Checked {
                issues,
                facts_checked: facts.len(),
            },
            Err(reason) => {
                warn!(reason = %reason, "Consistency check reply unusable");
                CheckOutcome::Degraded {
                    reason,
                    facts_checked: facts.len(),
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct FixedReply {
        reply: String,
        prompts: Mutex<Vec<CompletionRequest>>,
    }

    impl FixedReply {
        fn new(reply: &str) -> Self {
            Self {
                reply: reply.to_string(),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl LanguageModel for FixedReply {
        fn model_name(&self) -> &str {
            "fixed"
        }

        async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError> {
            self.prompts.lock().unwrap().push(request);
            Ok(self.reply.clone())
        }
    }

    fn fact(subject: &str, attribute: &str, value: &str, chapter: Option<&str>) -> ContextFact {
        ContextFact {
            subject: subject.to_string(),
            attribute: attribute.to_string(),
            current_value: value.to_string(),
            chapter_title: chapter.map(str::to_string),
        }
    }

    #[test]
    fn test_fact_context_lines() {
        let context = build_fact_context(&[
            fact("Mara", "eye color", "green", Some("Chapter 1")),
            fact("Harbor Town", "season", "winter", None),
        ]);
        assert_eq!(
            context,
            "Mara: eye color = \"green\" (from Chapter 1)\nHarbor Town: season = \"winter\" (from earlier)"
        );
    }

    #[test]
    fn test_truncate_short_content_untouched() {
        assert_eq!(truncate_content("short"), "short");
    }

    #[test]
    fn test_truncate_counts_characters_not_bytes() {
        let content = "é".repeat(MAX_CONTENT_CHARS + 10);
        let truncated = truncate_content(&content);
        assert_eq!(truncated.chars().count(), MAX_CONTENT_CHARS);
    }

    #[test]
    fn test_extract_array_from_prose() {
        let reply = "Here you go:\n```json\n[{\"type\": \"contradiction\"}]\n```\nDone.";
        assert_eq!(extract_json_array(reply), Some("[{\"type\": \"contradiction\"}]"));
    }

    #[test]
    fn test_extract_array_missing() {
        assert_eq!(extract_json_array("No issues found."), None);
        assert_eq!(extract_json_array("] backwards ["), None);
    }

    #[test]
    fn test_parse_empty_array() {
        assert_eq!(parse_candidates("[]"), Ok(vec![]));
    }

    #[test]
    fn test_parse_candidates_skips_unknown_types() {
        let reply = r#"[
            {"type": "contradiction", "severity": "critical", "title": "Eyes",
             "description": "Green vs blue", "excerpt": "her blue eyes", "suggestion": "green"},
            {"type": "style", "severity": "warning", "title": "Adverbs"},
            {"type": "timeline_conflict", "title": "Too fast"}
        ]"#;
        let candidates = parse_candidates(reply).unwrap();

        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].issue_type, IssueType::Contradiction);
        assert_eq!(candidates[0].severity, IssueSeverity::Critical);
        assert_eq!(candidates[1].issue_type, IssueType::TimelineConflict);
        assert_eq!(candidates[1].severity, IssueSeverity::Warning);
        assert_eq!(candidates[1].excerpt, "");
    }

    #[test]
    fn test_parse_invalid_json_is_err() {
        assert!(parse_candidates("[{not json}]").is_err());
        assert!(parse_candidates("[1, 2, 3]").is_err());
        assert!(parse_candidates("nothing here").is_err());
    }

    #[tokio::test]
    async fn test_no_facts_skips_model() {
        let model = FixedReply::new("[]");
        let checker = ConsistencyChecker::new(&model, 2000);

        let outcome = checker.check(&[], "Any text at all").await.unwrap();

        assert_eq!(outcome, CheckOutcome::NoFacts);
        assert!(model.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_check_returns_candidates() {
        let model = FixedReply::new(
            r#"[{"type": "character_knowledge", "severity": "warning", "title": "Spoiler"}]"#,
        );
        let checker = ConsistencyChecker::new(&model, 1500);
        let facts = vec![fact("Mara", "knows secret", "no", None)];

        let outcome = checker.check(&facts, "Mara mentioned the secret.").await.unwrap();

        match outcome {
            CheckOutcome::Checked {
                issues,
                facts_checked,
            } => {
                assert_eq!(facts_checked, 1);
                assert_eq!(issues[0].issue_type, IssueType::CharacterKnowledge);
            }
            other => panic!("unexpected outcome {:?}", other),
        }

        let prompts = model.prompts.lock().unwrap();
        assert_eq!(prompts[0].max_tokens, 1500);
        assert!(prompts[0].prompt.contains("Mara: knows secret = \"no\" (from earlier)"));
        assert!(prompts[0].prompt.contains("Mara mentioned the secret."));
    }

    #[tokio::test]
    async fn test_unparseable_reply_is_degraded() {
        let model = FixedReply::new("I could not find any problems, everything looks fine!");
        let checker = ConsistencyChecker::new(&model, 2000);
        let facts = vec![
            fact("Mara", "eye color", "green", None),
            fact("Tomas", "age", "40", None),
        ];

        let outcome = checker.check(&facts, "text").await.unwrap();

        assert!(matches!(
            outcome,
            CheckOutcome::Degraded {
                facts_checked: 2,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_long_content_truncated_in_prompt() {
        let model = FixedReply::new("[]");
        let checker = ConsistencyChecker::new(&model, 2000);
        let facts = vec![fact("Mara", "eye color", "green", None)];
        let content = format!("{}{}", "a".repeat(MAX_CONTENT_CHARS), "TAIL_MARKER");

        checker.check(&facts, &content).await.unwrap();

        let prompts = model.prompts.lock().unwrap();
        assert!(!prompts[0].prompt.contains("TAIL_MARKER"));
    }
}
