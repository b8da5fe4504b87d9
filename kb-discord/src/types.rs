use chrono::{DateTime, Utc};
use kb_core::{SurfaceId, UserId};

/// What the user did on the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InteractionKind {
    /// Slash command invocation.
    Command { name: String },
    /// Message-component action: a button press or a select-menu pick.
    Component {
        custom_id: String,
        values: Vec<String>,
    },
}

/// One inbound interaction, decoupled from the gateway wire shape.
///
/// `interaction_id` + `interaction_token` acknowledge the event;
/// `surface_id` is the id of the message the component lives on, which is
/// the key the router dispatches by.
#[derive(Debug, Clone)]
pub struct InboundInteraction {
    pub kind: InteractionKind,
    pub interaction_id: String,
    pub interaction_token: String,
    pub surface_id: Option<SurfaceId>,
    pub user_id: UserId,
    pub received_at: DateTime<Utc>,
}
