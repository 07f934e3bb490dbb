//! Keyword-based standup text validation.
//!
//! A message counts as a standup when it touches all three categories:
//! problems encountered, work done yesterday, plans for today. Matching is
//! lower-cased substring containment against per-category keyword tables, not
//! tokenization, so stems like `проблем` cover their inflected forms.
//!
//! Categories are checked in a fixed order (problems, then yesterday, then
//! today) and validation stops at the first missing one — the submitter gets
//! a single pointed reason per attempt, not an exhaustive diagnosis.

use crate::config::ValidationConfig;
use crate::i18n::MessageKey;

// ── Keyword tables ──────────────────────────────────────────────────────

/// Problem-category tokens, English and Russian stems in one list.
const PROBLEM_KEYWORDS: &[&str] = &[
    "problem", "difficult", "stuck", "question", "issue", "block", "проблем", "трудност",
    "затрудн", "вопрос",
];

/// Past-work-category tokens.
const YESTERDAY_KEYWORDS: &[&str] = &[
    "yesterday", "friday", "completed", "вчера", "пятниц", "делал", "сделано",
];

/// Plan-category tokens.
const TODAY_KEYWORDS: &[&str] = &[
    "today", "going", "plan", "сегодня", "собираюсь", "план",
];

/// The first category a rejected text failed to mention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingCategory {
    /// No problem-related keywords found.
    Problems,
    /// No past-work keywords found.
    Yesterday,
    /// No plan keywords found.
    Today,
}

impl MissingCategory {
    /// Catalog key for the user-facing rejection reason.
    pub fn message_key(self) -> MessageKey {
        match self {
            Self::Problems => MessageKey::NoProblemKeywords,
            Self::Yesterday => MessageKey::NoYesterdayKeywords,
            Self::Today => MessageKey::NoTodayKeywords,
        }
    }
}

/// Active keyword set for one validator instance.
///
/// Starts from the built-in tables; deployment-specific tokens from the
/// config are merged on top (lower-cased).
#[derive(Debug, Clone)]
pub struct KeywordProfile {
    problems: Vec<String>,
    yesterday: Vec<String>,
    today: Vec<String>,
}

impl Default for KeywordProfile {
    fn default() -> Self {
        Self {
            problems: PROBLEM_KEYWORDS.iter().map(|s| (*s).to_owned()).collect(),
            yesterday: YESTERDAY_KEYWORDS.iter().map(|s| (*s).to_owned()).collect(),
            today: TODAY_KEYWORDS.iter().map(|s| (*s).to_owned()).collect(),
        }
    }
}

impl KeywordProfile {
    /// Built-in tables plus the extra tokens from the validation config.
    pub fn from_config(config: &ValidationConfig) -> Self {
        let mut profile = Self::default();
        profile
            .problems
            .extend(config.problem_keywords.iter().map(|s| s.to_lowercase()));
        profile
            .yesterday
            .extend(config.yesterday_keywords.iter().map(|s| s.to_lowercase()));
        profile
            .today
            .extend(config.today_keywords.iter().map(|s| s.to_lowercase()));
        profile
    }
}

/// Standup text validator over a fixed keyword profile.
#[derive(Debug, Clone, Default)]
pub struct StandupValidator {
    profile: KeywordProfile,
}

impl StandupValidator {
    pub fn new(profile: KeywordProfile) -> Self {
        Self { profile }
    }

    /// Check whether `text` qualifies as a standup.
    ///
    /// Returns `Ok(())` when all three categories are mentioned, otherwise
    /// the first missing category in check order (problems, yesterday,
    /// today). Pure function, no side effects.
    pub fn validate(&self, text: &str) -> Result<(), MissingCategory> {
        let lower = text.to_lowercase();

        if !contains_any(&lower, &self.profile.problems) {
            return Err(MissingCategory::Problems);
        }
        if !contains_any(&lower, &self.profile.yesterday) {
            return Err(MissingCategory::Yesterday);
        }
        if !contains_any(&lower, &self.profile.today) {
            return Err(MissingCategory::Today);
        }
        Ok(())
    }
}

fn contains_any(lower: &str, keywords: &[String]) -> bool {
    keywords.iter().any(|kw| lower.contains(kw.as_str()))
}

// ── Tests ───────────────────────────────────────────────────────────────
