//! Chat platform integration.
//!
//! `traits` defines the transport contract; `slack` implements it over the
//! RTM websocket + Web API; `intake` turns inbound events into stored
//! standups.

pub mod intake;
pub mod slack;
pub mod traits;

pub use intake::MessageIntake;
pub use slack::SlackTransport;
pub use traits::{
    ChatTransport, InboundEvent, InboundMessage, WorkspaceUser, channel_link, mention,
    mention_list,
};
