//! Configuration types for the standup bot.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level configuration for the bot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    /// Reminder/escalation scheduling settings.
    pub notifier: NotifierConfig,
    /// Slack workspace settings.
    pub slack: SlackConfig,
    /// Standup storage settings.
    pub storage: StorageConfig,
    /// Message language and catalog overrides.
    pub i18n: I18nConfig,
    /// Extra keyword tokens merged into the validator profile.
    pub validation: ValidationConfig,
    /// Message intake behavior.
    pub intake: IntakeConfig,
}

/// Reminder and escalation timing configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifierConfig {
    /// Minutes before a deadline at which the warning message is sent.
    pub warning_lead_minutes: u32,
    /// Maximum number of escalation nags after the deadline notification.
    pub repeats_max: u32,
    /// Constant wait between escalation attempts, in minutes.
    pub backoff_minutes: u32,
    /// Scan cadence of the scheduler loop, in seconds.
    ///
    /// Must stay at or below 60: deadline matching is minute-granular, so a
    /// tick has to land inside every calendar minute.
    pub cadence_secs: u64,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            warning_lead_minutes: 10,
            repeats_max: 3,
            backoff_minutes: 30,
            cadence_secs: 60,
        }
    }
}

/// Slack workspace configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SlackConfig {
    /// Bot token (`xoxb-...`). The `ROLLCALL_SLACK_TOKEN` environment
    /// variable overrides this field when set.
    pub bot_token: String,
    /// User ID of the workspace manager. When set, housekeeping failures are
    /// reported to this user by direct message.
    pub manager_user_id: Option<String>,
}

impl SlackConfig {
    /// Apply the token override from the environment lookup result.
    pub fn apply_env(&mut self, token: Option<String>) {
        if let Some(token) = token {
            if !token.is_empty() {
                self.bot_token = token;
            }
        }
    }
}

/// Storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    pub db_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: crate::paths::database_file(),
        }
    }
}

/// Localization configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct I18nConfig {
    /// Built-in catalog language: "en" or "ru".
    pub language: String,
    /// Optional TOML file whose entries override the built-in catalog.
    pub catalog_path: Option<PathBuf>,
}

impl Default for I18nConfig {
    fn default() -> Self {
        Self {
            language: "en".to_owned(),
            catalog_path: None,
        }
    }
}

/// Extra keyword tokens merged into the built-in validator profile.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Additional problem-category tokens.
    pub problem_keywords: Vec<String>,
    /// Additional past-work-category tokens.
    pub yesterday_keywords: Vec<String>,
    /// Additional plan-category tokens.
    pub today_keywords: Vec<String>,
}

/// How a second valid standup on the same day is handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResubmitPolicy {
    /// Reject the new message and point the author at editing today's entry.
    #[default]
    RejectDuplicate,
    /// Replace today's entry with the new message.
    AllowEditReplace,
}

/// Message intake configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IntakeConfig {
    /// Hashtag that marks a message as a standup. Mentioning the bot works
    /// the same way.
    pub trigger_tag: String,
    /// Policy for a second valid same-day submission.
    pub resubmit_policy: ResubmitPolicy,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            trigger_tag: "#standup".to_owned(),
            resubmit_policy: ResubmitPolicy::default(),
        }
    }
}

impl BotConfig {
    /// Load configuration from a TOML file, falling back to defaults for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| crate::error::BotError::Config(e.to_string()))
    }

    /// Load from the default path, or defaults if no file exists there, then
    /// apply environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if a file exists at the default path but cannot be
    /// parsed.
    pub fn load() -> crate::error::Result<Self> {
        let path = Self::default_config_path();
        let mut config = if path.exists() {
            Self::from_file(&path)?
        } else {
            Self::default()
        };
        config.slack.apply_env(std::env::var("ROLLCALL_SLACK_TOKEN").ok());
        Ok(config)
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &std::path::Path) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::BotError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the default config file path ([`crate::paths::config_file`]).
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        crate::paths::config_file()
    }
}
