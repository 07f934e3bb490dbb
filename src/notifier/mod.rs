//! Deadline scheduling and escalation.
//!
//! `deadlines` resolves stored times of day onto concrete days; `escalation`
//! sends the actual messages; `runner` is the loop that ties the two to the
//! clock.

pub mod deadlines;
pub mod escalation;
pub mod runner;

pub use deadlines::{
    ResolvedDeadline, fires_at, format_time_of_day, is_weekend, parse_time_of_day,
    resolve_channel_deadline, resolve_member_deadline,
};
pub use escalation::EscalationEngine;
pub use runner::{FiredLedger, Notifier};
