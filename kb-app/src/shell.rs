//! Bot shell: the single consumer loop over the inbound interaction queue.
//!
//! One interaction is handled to completion before the next is dequeued.
//! Every inbound event is acknowledged exactly once — control events via
//! a single update-message callback built from the router's instruction,
//! everything else via one deferred ack followed by followups. Commit
//! logic in the core never acknowledges.

use crate::commands;
use anyhow::Result;
use kb_core::{
    ControlId, MenuAction, NO_PREFERENCES_GUIDANCE, PREFERENCES_RESET, PendingSurface,
    RenderInstruction, SubjectId, SubjectService, SurfaceId, ViewerOutcome,
};
use kb_discord::{
    DiscordRest, FLAG_EPHEMERAL, InboundInteraction, InteractionKind, SUBJECT_SELECT_ID,
    main_menu_components, page_components, resources_embed,
};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::mpsc;

pub struct BotShell {
    service: SubjectService,
    rest: DiscordRest,
    inbound_rx: Arc<tokio::sync::Mutex<mpsc::Receiver<InboundInteraction>>>,
}

impl BotShell {
    pub fn new(
        service: SubjectService,
        rest: DiscordRest,
        inbound_rx: mpsc::Receiver<InboundInteraction>,
    ) -> Self {
        Self {
            service,
            rest,
            inbound_rx: Arc::new(tokio::sync::Mutex::new(inbound_rx)),
        }
    }

    #[tracing::instrument(level = "info", skip_all)]
    pub async fn run(&self) -> Result<()> {
        loop {
            let inbound = {
                let mut rx = self.inbound_rx.lock().await;
                rx.recv().await
            };
            let Some(inbound) = inbound else {
                return Ok(());
            };

            if let Err(e) = self.handle_inbound(inbound).await {
                tracing::warn!(%e, "handle_inbound failed");
            }
        }
    }

    async fn handle_inbound(&self, inbound: InboundInteraction) -> Result<()> {
        match inbound.kind.clone() {
            InteractionKind::Command { name } => self.handle_command(&name, &inbound).await,
            InteractionKind::Component { custom_id, values } => {
                self.handle_component(&custom_id, &values, &inbound).await
            }
        }
    }

    async fn handle_command(&self, name: &str, inbound: &InboundInteraction) -> Result<()> {
        self.rest
            .ack_command(&inbound.interaction_id, &inbound.interaction_token)
            .await?;
        let token = &inbound.interaction_token;

        match name {
            commands::COMMAND_START => {
                let menu = self.service.start_session(&inbound.user_id);
                let payload = json!({
                    "content": menu.text,
                    "components": main_menu_components(&menu.actions),
                    "flags": FLAG_EPHEMERAL,
                });
                self.rest.followup(token, payload).await?;
                Ok(())
            }
            commands::COMMAND_REGISTER => self.open_registration(inbound).await,
            commands::COMMAND_SUBJECTS => self.open_viewer(inbound).await,
            other => {
                tracing::debug!(command = other, "unknown slash command");
                self.followup_text(token, "Unknown command.").await
            }
        }
    }

    async fn handle_component(
        &self,
        custom_id: &str,
        values: &[String],
        inbound: &InboundInteraction,
    ) -> Result<()> {
        if let Some(action) = MenuAction::parse(custom_id) {
            self.rest
                .ack_component_deferred(&inbound.interaction_id, &inbound.interaction_token)
                .await?;
            return self.handle_menu_action(action, inbound).await;
        }

        if let Some(control) = ControlId::parse(custom_id) {
            return self.handle_control(control, inbound).await;
        }

        if custom_id == SUBJECT_SELECT_ID {
            self.rest
                .ack_component_deferred(&inbound.interaction_id, &inbound.interaction_token)
                .await?;
            return self.handle_select(values, inbound).await;
        }

        tracing::debug!(custom_id, "unknown component custom id");
        self.rest
            .ack_component_deferred(&inbound.interaction_id, &inbound.interaction_token)
            .await
    }

    async fn handle_menu_action(
        &self,
        action: MenuAction,
        inbound: &InboundInteraction,
    ) -> Result<()> {
        match action {
            MenuAction::RegisterSubjects => self.open_registration(inbound).await,
            MenuAction::ViewSubjects => self.open_viewer(inbound).await,
            MenuAction::ResetPreferences => {
                let token = &inbound.interaction_token;
                match self.service.reset_preferences(&inbound.user_id).await {
                    Ok(()) => self.followup_text(token, PREFERENCES_RESET).await,
                    Err(e) => self.followup_text(token, &e.user_message()).await,
                }
            }
        }
    }

    /// A Previous/Next/Done press. The router yields at most one render
    /// instruction, applied through a single update-message callback; a
    /// stale surface still gets its one (deferred, contentless) ack.
    async fn handle_control(
        &self,
        control: ControlId,
        inbound: &InboundInteraction,
    ) -> Result<()> {
        let instruction = inbound
            .surface_id
            .as_ref()
            .and_then(|surface_id| self.service.on_control(surface_id, control));

        match instruction {
            Some(RenderInstruction::Update { view, .. }) => {
                self.rest
                    .ack_component_update(
                        &inbound.interaction_id,
                        &inbound.interaction_token,
                        None,
                        page_components(&view),
                    )
                    .await
            }
            Some(RenderInstruction::UpdateWithNotice { view, notice, .. }) => {
                self.rest
                    .ack_component_update(
                        &inbound.interaction_id,
                        &inbound.interaction_token,
                        None,
                        page_components(&view),
                    )
                    .await?;
                self.followup_text(&inbound.interaction_token, &notice).await
            }
            Some(RenderInstruction::Disable { .. }) | None => {
                self.rest
                    .ack_component_deferred(&inbound.interaction_id, &inbound.interaction_token)
                    .await
            }
        }
    }

    async fn handle_select(&self, values: &[String], inbound: &InboundInteraction) -> Result<()> {
        let token = &inbound.interaction_token;
        let Some(surface_id) = inbound.surface_id.clone() else {
            return Ok(());
        };
        let picked: Vec<SubjectId> = values.iter().map(SubjectId::new).collect();

        let outcome = match self.service.on_select(&surface_id, &picked).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(%e, %surface_id, "selection commit failed");
                return self.followup_text(token, &e.user_message()).await;
            }
        };

        match outcome {
            None => Ok(()),
            Some(kb_core::SelectionOutcome::Resources {
                subject,
                resources,
                confirmation,
            }) => {
                let payload = json!({
                    "embeds": [resources_embed(&subject.name, &resources)],
                    "flags": FLAG_EPHEMERAL,
                });
                self.rest.followup(token, payload).await?;
                if let Some(confirmation) = confirmation {
                    self.followup_text(token, confirmation).await?;
                }
                Ok(())
            }
            Some(kb_core::SelectionOutcome::Registered { notice, view }) => {
                self.followup_text(token, notice).await?;
                if let Some(view) = view {
                    self.rest
                        .edit_original(token, json!({ "components": page_components(&view) }))
                        .await?;
                }
                Ok(())
            }
        }
    }

    async fn open_registration(&self, inbound: &InboundInteraction) -> Result<()> {
        let token = &inbound.interaction_token;
        match self.service.open_registration(&inbound.user_id).await {
            Ok(pending) => self.deliver_surface(token, pending).await,
            Err(e) => self.followup_text(token, &e.user_message()).await,
        }
    }

    async fn open_viewer(&self, inbound: &InboundInteraction) -> Result<()> {
        let token = &inbound.interaction_token;
        match self.service.open_viewer(&inbound.user_id).await {
            Ok(ViewerOutcome::Surface(pending)) => self.deliver_surface(token, pending).await,
            Ok(ViewerOutcome::NoPreferences) => {
                self.followup_text(token, NO_PREFERENCES_GUIDANCE).await
            }
            Err(e) => self.followup_text(token, &e.user_message()).await,
        }
    }

    /// Render a pending surface as a followup message, bind the created
    /// message id as its surface id, and arm the expiry timer.
    async fn deliver_surface(&self, token: &str, pending: PendingSurface) -> Result<()> {
        let payload = json!({
            "content": pending.prompt(),
            "components": page_components(&pending.view()),
            "flags": FLAG_EPHEMERAL,
        });
        let message_id = self.rest.followup(token, payload).await?;
        let surface_id = SurfaceId::new(message_id);
        self.service.attach(surface_id.clone(), pending);
        self.spawn_expiry(surface_id, token.to_string());
        Ok(())
    }

    /// Fixed-duration timer: fires once, disables the rendered controls,
    /// and evicts the surface. Not refreshed by interaction. Edit failures
    /// (the message may already be gone) are logged and swallowed.
    fn spawn_expiry(&self, surface_id: SurfaceId, token: String) {
        let service = self.service.clone();
        let rest = self.rest.clone();
        let ttl = service.router().ttl();
        tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            if let Some(RenderInstruction::Disable { view, .. }) = service.expire(&surface_id) {
                let payload = json!({ "components": page_components(&view) });
                if let Err(e) = rest
                    .edit_followup(&token, surface_id.as_str(), payload)
                    .await
                {
                    tracing::warn!(%e, %surface_id, "failed to disable expired surface");
                }
            }
        });
    }

    async fn followup_text(&self, token: &str, content: &str) -> Result<()> {
        let payload = json!({ "content": content, "flags": FLAG_EPHEMERAL });
        self.rest.followup(token, payload).await?;
        Ok(())
    }
}
