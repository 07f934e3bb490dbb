//! Message catalog for user-visible text.
//!
//! Every string the bot posts goes through [`MessageCatalog::render`]: callers
//! supply a [`MessageKey`], template arguments and a plural count, never a
//! finished sentence. The catalog is built once at startup and shared by
//! `Arc` — components receive it at construction, so there is no global
//! localizer state to initialize in the right order.
//!
//! Built-in catalogs exist for English and Russian. Individual entries can be
//! overridden from a TOML file keyed by message name, with `one` / `other`
//! plural forms:
//!
//! ```toml
//! [WarnNonReporters]
//! one = "Hey {user}, {minutes} left and yours is still missing!"
//! other = "Hey {users}, {minutes} left and yours are still missing!"
//! ```

use serde::Deserialize;
use std::collections::HashMap;

use crate::error::{BotError, Result};

/// Keys for every user-visible message the bot can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKey {
    /// Minutes-to-deadline unit, pluralized by the minute count.
    Minutes,
    /// Pre-deadline warning to a channel, pluralized by non-reporter count.
    WarnNonReporters,
    /// Pre-deadline warning naming one individually scheduled member.
    WarnIndividualNonReporter,
    /// Direct message sent when the deadline passes.
    DeadlineDirectMessage,
    /// Post-deadline escalation broadcast, pluralized by non-reporter count.
    TagNonReporters,
    /// Post-deadline escalation naming one individually scheduled member.
    TagIndividualNonReporter,
    /// Congratulation when nobody missed the channel deadline.
    AllDone,
    /// Greeting sent to the manager when the bot starts.
    HelloManager,
    /// Acknowledgement for a newly saved standup.
    StandupCreated,
    /// Acknowledgement for an edited standup.
    StandupUpdated,
    /// Rejection of a second same-day submission.
    OneStandupPerDay,
    /// Storage failure notice to the submitting user.
    CouldNotSaveStandup,
    /// Validation reason: no problem-category keywords.
    NoProblemKeywords,
    /// Validation reason: no past-work-category keywords.
    NoYesterdayKeywords,
    /// Validation reason: no plan-category keywords.
    NoTodayKeywords,
    /// Report heading for a channel report.
    ReportChannelHead,
    /// Report heading for a member report.
    ReportMemberHead,
    /// Report heading for a channel+member report.
    ReportChannelMemberHead,
    /// Report line when a period holds no data.
    ReportNoData,
    /// Report sub-heading for one day of a period.
    ReportDayHead,
    /// Report line for a submitted standup.
    ReportStandupLine,
    /// Report line for a member who missed the day.
    ReportMissedLine,
}

impl MessageKey {
    /// Stable name used for TOML overrides and as a render fallback.
    pub fn name(self) -> &'static str {
        match self {
            Self::Minutes => "Minutes",
            Self::WarnNonReporters => "WarnNonReporters",
            Self::WarnIndividualNonReporter => "WarnIndividualNonReporter",
            Self::DeadlineDirectMessage => "DeadlineDirectMessage",
            Self::TagNonReporters => "TagNonReporters",
            Self::TagIndividualNonReporter => "TagIndividualNonReporter",
            Self::AllDone => "AllDone",
            Self::HelloManager => "HelloManager",
            Self::StandupCreated => "StandupCreated",
            Self::StandupUpdated => "StandupUpdated",
            Self::OneStandupPerDay => "OneStandupPerDay",
            Self::CouldNotSaveStandup => "CouldNotSaveStandup",
            Self::NoProblemKeywords => "NoProblemKeywords",
            Self::NoYesterdayKeywords => "NoYesterdayKeywords",
            Self::NoTodayKeywords => "NoTodayKeywords",
            Self::ReportChannelHead => "ReportChannelHead",
            Self::ReportMemberHead => "ReportMemberHead",
            Self::ReportChannelMemberHead => "ReportChannelMemberHead",
            Self::ReportNoData => "ReportNoData",
            Self::ReportDayHead => "ReportDayHead",
            Self::ReportStandupLine => "ReportStandupLine",
            Self::ReportMissedLine => "ReportMissedLine",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        ALL_KEYS.iter().copied().find(|k| k.name() == name)
    }
}

/// All known keys, used for override resolution and catalog completeness
/// checks in tests.
pub const ALL_KEYS: &[MessageKey] = &[
    MessageKey::Minutes,
    MessageKey::WarnNonReporters,
    MessageKey::WarnIndividualNonReporter,
    MessageKey::DeadlineDirectMessage,
    MessageKey::TagNonReporters,
    MessageKey::TagIndividualNonReporter,
    MessageKey::AllDone,
    MessageKey::HelloManager,
    MessageKey::StandupCreated,
    MessageKey::StandupUpdated,
    MessageKey::OneStandupPerDay,
    MessageKey::CouldNotSaveStandup,
    MessageKey::NoProblemKeywords,
    MessageKey::NoYesterdayKeywords,
    MessageKey::NoTodayKeywords,
    MessageKey::ReportChannelHead,
    MessageKey::ReportMemberHead,
    MessageKey::ReportChannelMemberHead,
    MessageKey::ReportNoData,
    MessageKey::ReportDayHead,
    MessageKey::ReportStandupLine,
    MessageKey::ReportMissedLine,
];

/// One catalog entry. `one` is used when the plural count is exactly 1;
/// everything else renders `other`. Keys without plural variation leave `one`
/// empty.
#[derive(Debug, Clone)]
struct MessageTemplate {
    one: Option<String>,
    other: String,
}

impl MessageTemplate {
    fn plain(other: &str) -> Self {
        Self {
            one: None,
            other: other.to_owned(),
        }
    }

    fn plural(one: &str, other: &str) -> Self {
        Self {
            one: Some(one.to_owned()),
            other: other.to_owned(),
        }
    }
}

/// Override entry shape for catalog TOML files.
#[derive(Debug, Deserialize)]
struct RawTemplate {
    one: Option<String>,
    other: String,
}

/// Immutable message catalog, constructed once and passed into components.
#[derive(Debug, Clone)]
pub struct MessageCatalog {
    entries: HashMap<MessageKey, MessageTemplate>,
}

impl MessageCatalog {
    /// Built-in catalog for a language code ("en" or "ru"); anything else
    /// falls back to English.
    pub fn for_language(language: &str) -> Self {
        match language {
            "ru" => Self::russian(),
            _ => Self::english(),
        }
    }

    /// Build the catalog described by the i18n config section: built-in
    /// language plus optional override file.
    ///
    /// # Errors
    ///
    /// Returns an error if the override file cannot be read or parsed.
    pub fn from_config(config: &crate::config::I18nConfig) -> Result<Self> {
        let mut catalog = Self::for_language(&config.language);
        if let Some(path) = &config.catalog_path {
            let content = std::fs::read_to_string(path)?;
            catalog.apply_overrides(&content)?;
        }
        Ok(catalog)
    }

    /// The built-in English catalog.
    pub fn english() -> Self {
        let mut entries = HashMap::new();
        entries.insert(
            MessageKey::Minutes,
            MessageTemplate::plural("{time} minute", "{time} minutes"),
        );
        entries.insert(
            MessageKey::WarnNonReporters,
            MessageTemplate::plural(
                "Hey, {user}! {minutes} to deadline and you are the only one who still did not submit a standup!",
                "Hey, {users}! {minutes} to deadline and you still did not submit standups!",
            ),
        );
        entries.insert(
            MessageKey::WarnIndividualNonReporter,
            MessageTemplate::plain(
                "Hey, {user}! {minutes} to your deadline and your standup is still missing! Hurry up!",
            ),
        );
        entries.insert(
            MessageKey::DeadlineDirectMessage,
            MessageTemplate::plain(
                "Hey, {user}! You failed to submit your standup in {channel} on time! Do it ASAP!",
            ),
        );
        entries.insert(
            MessageKey::TagNonReporters,
            MessageTemplate::plural(
                "Hey, {user}! You missed the deadline and you are the only one who still did not submit a standup! Get it done!",
                "Hey, {users}! You all missed the deadline and still did not submit standups!",
            ),
        );
        entries.insert(
            MessageKey::TagIndividualNonReporter,
            MessageTemplate::plain(
                "Hey, {user}! You failed to submit your standup in time! Get it done ASAP!",
            ),
        );
        entries.insert(
            MessageKey::AllDone,
            MessageTemplate::plain("Congratulations! Nobody missed the deadline! Well done!"),
        );
        entries.insert(
            MessageKey::HelloManager,
            MessageTemplate::plain("Hello, {user}! Standup tracking is up and running."),
        );
        entries.insert(
            MessageKey::StandupCreated,
            MessageTemplate::plain("{user}, your standup is saved! Well done!"),
        );
        entries.insert(
            MessageKey::StandupUpdated,
            MessageTemplate::plain("{user}, your standup is updated! Thanks!"),
        );
        entries.insert(
            MessageKey::OneStandupPerDay,
            MessageTemplate::plain(
                "{user}, you can submit only one standup per day. Please edit today's standup or submit the next one tomorrow!",
            ),
        );
        entries.insert(
            MessageKey::CouldNotSaveStandup,
            MessageTemplate::plain(
                "{user}, something went wrong and I could not save your standup. Please report this to your manager.",
            ),
        );
        entries.insert(
            MessageKey::NoProblemKeywords,
            MessageTemplate::plain(
                "No 'problems' related keywords detected! Please use one of the following: 'problem', 'difficult', 'stuck', 'question', 'issue'",
            ),
        );
        entries.insert(
            MessageKey::NoYesterdayKeywords,
            MessageTemplate::plain(
                "No 'yesterday' related keywords detected! Please use one of the following: 'yesterday', 'friday', 'completed'",
            ),
        );
        entries.insert(
            MessageKey::NoTodayKeywords,
            MessageTemplate::plain(
                "No 'today' related keywords detected! Please use one of the following: 'today', 'going', 'plan'",
            ),
        );
        entries.insert(
            MessageKey::ReportChannelHead,
            MessageTemplate::plain("Full report on channel {channel} from {from} to {to}:"),
        );
        entries.insert(
            MessageKey::ReportMemberHead,
            MessageTemplate::plain("Full report on {user} from {from} to {to}:"),
        );
        entries.insert(
            MessageKey::ReportChannelMemberHead,
            MessageTemplate::plain(
                "Report on {user} in channel {channel} from {from} to {to}:",
            ),
        );
        entries.insert(
            MessageKey::ReportNoData,
            MessageTemplate::plain("No standup data for this period."),
        );
        entries.insert(
            MessageKey::ReportDayHead,
            MessageTemplate::plain("Report for {date}:"),
        );
        entries.insert(
            MessageKey::ReportStandupLine,
            MessageTemplate::plain("Standup from {user}: {comment}"),
        );
        entries.insert(
            MessageKey::ReportMissedLine,
            MessageTemplate::plain("{user} did not submit a standup."),
        );
        Self { entries }
    }

    /// The built-in Russian catalog.
    ///
    /// Uses the simplified one/other plural split of the render contract, not
    /// full Russian declension.
    pub fn russian() -> Self {
        let mut entries = HashMap::new();
        entries.insert(
            MessageKey::Minutes,
            MessageTemplate::plural("{time} минута", "{time} минут"),
        );
        entries.insert(
            MessageKey::WarnNonReporters,
            MessageTemplate::plural(
                "Эй, {user}! До дедлайна {minutes}, а твоего стендапа всё ещё нет!",
                "Эй, {users}! До дедлайна {minutes}, а ваших стендапов всё ещё нет!",
            ),
        );
        entries.insert(
            MessageKey::WarnIndividualNonReporter,
            MessageTemplate::plain(
                "Эй, {user}! До твоего дедлайна {minutes}, а стендапа всё ещё нет! Поторопись!",
            ),
        );
        entries.insert(
            MessageKey::DeadlineDirectMessage,
            MessageTemplate::plain(
                "Эй, {user}! Ты не сдал стендап в {channel} вовремя! Сделай это как можно скорее!",
            ),
        );
        entries.insert(
            MessageKey::TagNonReporters,
            MessageTemplate::plural(
                "Эй, {user}! Дедлайн прошёл, а твоего стендапа всё ещё нет! Напиши его!",
                "Эй, {users}! Дедлайн прошёл, а ваших стендапов всё ещё нет!",
            ),
        );
        entries.insert(
            MessageKey::TagIndividualNonReporter,
            MessageTemplate::plain(
                "Эй, {user}! Ты не сдал стендап вовремя! Напиши его как можно скорее!",
            ),
        );
        entries.insert(
            MessageKey::AllDone,
            MessageTemplate::plain("Поздравляю! Никто не пропустил дедлайн! Отличная работа!"),
        );
        entries.insert(
            MessageKey::HelloManager,
            MessageTemplate::plain("Привет, {user}! Отслеживание стендапов запущено."),
        );
        entries.insert(
            MessageKey::StandupCreated,
            MessageTemplate::plain("{user}, твой стендап сохранён! Молодец!"),
        );
        entries.insert(
            MessageKey::StandupUpdated,
            MessageTemplate::plain("{user}, твой стендап обновлён! Спасибо!"),
        );
        entries.insert(
            MessageKey::OneStandupPerDay,
            MessageTemplate::plain(
                "{user}, можно сдавать только один стендап в день. Отредактируй сегодняшний или сдай следующий завтра!",
            ),
        );
        entries.insert(
            MessageKey::CouldNotSaveStandup,
            MessageTemplate::plain(
                "{user}, что-то пошло не так, и я не смог сохранить твой стендап. Сообщи об этом менеджеру.",
            ),
        );
        entries.insert(
            MessageKey::NoProblemKeywords,
            MessageTemplate::plain(
                "Не найдено ключевых слов о проблемах! Используй одно из: 'проблем', 'трудност', 'вопрос'",
            ),
        );
        entries.insert(
            MessageKey::NoYesterdayKeywords,
            MessageTemplate::plain(
                "Не найдено ключевых слов о сделанном! Используй одно из: 'вчера', 'делал', 'сделано'",
            ),
        );
        entries.insert(
            MessageKey::NoTodayKeywords,
            MessageTemplate::plain(
                "Не найдено ключевых слов о планах! Используй одно из: 'сегодня', 'собираюсь', 'план'",
            ),
        );
        entries.insert(
            MessageKey::ReportChannelHead,
            MessageTemplate::plain("Полный отчёт по каналу {channel} с {from} по {to}:"),
        );
        entries.insert(
            MessageKey::ReportMemberHead,
            MessageTemplate::plain("Полный отчёт по {user} с {from} по {to}:"),
        );
        entries.insert(
            MessageKey::ReportChannelMemberHead,
            MessageTemplate::plain("Отчёт по {user} в канале {channel} с {from} по {to}:"),
        );
        entries.insert(
            MessageKey::ReportNoData,
            MessageTemplate::plain("Нет данных о стендапах за этот период."),
        );
        entries.insert(
            MessageKey::ReportDayHead,
            MessageTemplate::plain("Отчёт за {date}:"),
        );
        entries.insert(
            MessageKey::ReportStandupLine,
            MessageTemplate::plain("Стендап от {user}: {comment}"),
        );
        entries.insert(
            MessageKey::ReportMissedLine,
            MessageTemplate::plain("{user} не сдал стендап."),
        );
        Self { entries }
    }

    /// Merge entries from a TOML override document into this catalog.
    ///
    /// Unknown message names are rejected so typos surface at startup rather
    /// than as silently untranslated text.
    ///
    /// # Errors
    ///
    /// Returns an error on malformed TOML or an unrecognized message name.
    pub fn apply_overrides(&mut self, toml_str: &str) -> Result<()> {
        let raw: HashMap<String, RawTemplate> =
            toml::from_str(toml_str).map_err(|e| BotError::Catalog(e.to_string()))?;
        for (name, template) in raw {
            let key = MessageKey::from_name(&name)
                .ok_or_else(|| BotError::Catalog(format!("unknown message name: {name}")))?;
            self.entries.insert(
                key,
                MessageTemplate {
                    one: template.one,
                    other: template.other,
                },
            );
        }
        Ok(())
    }

    /// Render a message: pick the `one` form when `plural_count == 1` and it
    /// exists, substitute `{name}` placeholders from `args`.
    ///
    /// A key missing from the catalog renders as its name so a gap never
    /// panics or drops a notification.
    pub fn render(&self, key: MessageKey, args: &[(&str, &str)], plural_count: usize) -> String {
        let template = match self.entries.get(&key) {
            Some(t) => t,
            None => return key.name().to_owned(),
        };
        let raw = if plural_count == 1 {
            template.one.as_deref().unwrap_or(&template.other)
        } else {
            &template.other
        };
        let mut out = raw.to_owned();
        for (name, value) in args {
            out = out.replace(&format!("{{{name}}}"), value);
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
