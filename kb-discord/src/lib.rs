//! Discord adapter for KlassBot.
//!
//! Pure I/O: the gateway loop turns `INTERACTION_CREATE` events into
//! `InboundInteraction` values on a queue, the REST surface acknowledges
//! and delivers messages, and the render module maps core page views to
//! component JSON. No selection state lives here.

mod gateway;
mod render;
mod rest;
mod types;

pub use gateway::DiscordGateway;
pub use render::{
    EMBED_COLOR_RED, NO_RESOURCES_TEXT, SUBJECT_SELECT_ID, main_menu_components, page_components,
    resources_embed,
};
pub use rest::{DiscordRest, FLAG_EPHEMERAL};
pub use types::{InboundInteraction, InteractionKind};
