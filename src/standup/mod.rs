//! Standup domain model and report validation.

pub mod types;
pub mod validator;

pub use types::{day_start, Channel, ChannelMember, Standup, TimeTable};
pub use validator::{KeywordProfile, MissingCategory, StandupValidator};
