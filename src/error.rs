//! Error types for the rollcall bot.

/// Top-level error type for the standup bot.
#[derive(Debug, thiserror::Error)]
pub enum BotError {
    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Standup / timetable storage error.
    #[error("store error: {0}")]
    Store(String),

    /// Chat transport error (send, reaction, user listing).
    #[error("transport error: {0}")]
    Transport(String),

    /// Message catalog error (missing file, malformed overrides).
    #[error("catalog error: {0}")]
    Catalog(String),

    /// Reporting error (bad date range).
    #[error("report error: {0}")]
    Report(String),

    /// Time-of-day parsing error.
    #[error("time error: {0}")]
    Time(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Notifier scheduling error.
    #[error("notifier error: {0}")]
    Notifier(String),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, BotError>;
