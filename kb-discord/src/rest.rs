use anyhow::Result;
use serde_json::Value;
use std::time::Duration;

const CALLBACK_DEFERRED_CHANNEL_MESSAGE: u8 = 5;
const CALLBACK_DEFERRED_UPDATE_MESSAGE: u8 = 6;
const CALLBACK_UPDATE_MESSAGE: u8 = 7;

/// Message flag for ephemeral responses.
pub const FLAG_EPHEMERAL: u64 = 64;

/// REST surface: interaction acknowledgment, followups, message edits,
/// and command registration.
///
/// An interaction accepts exactly one callback; the shell calls exactly
/// one `ack_*` method per inbound event and everything after that goes
/// through `followup` / `edit_followup`.
#[derive(Clone)]
pub struct DiscordRest {
    http: reqwest::Client,
    bot_token: String,
    application_id: String,
}

impl DiscordRest {
    pub fn new(bot_token: &str, application_id: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self {
            http,
            bot_token: bot_token.to_string(),
            application_id: application_id.to_string(),
        })
    }

    fn api_url(&self, path: &str) -> String {
        format!("https://discord.com/api/v10{path}")
    }

    async fn post_checked(&self, url: String, body: &Value) -> Result<reqwest::Response> {
        let resp = self
            .http
            .post(url)
            .header("Authorization", format!("Bot {}", self.bot_token))
            .json(body)
            .send()
            .await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await?;
            return Err(anyhow::anyhow!(
                "discord request failed: status={status} body={text}"
            ));
        }
        Ok(resp)
    }

    /// Ack a slash command with a deferred ephemeral response.
    pub async fn ack_command(&self, interaction_id: &str, token: &str) -> Result<()> {
        let body = serde_json::json!({
            "type": CALLBACK_DEFERRED_CHANNEL_MESSAGE,
            "data": { "flags": FLAG_EPHEMERAL }
        });
        self.post_checked(
            self.api_url(&format!("/interactions/{interaction_id}/{token}/callback")),
            &body,
        )
        .await?;
        Ok(())
    }

    /// Ack a component interaction and redraw its message in one call.
    pub async fn ack_component_update(
        &self,
        interaction_id: &str,
        token: &str,
        content: Option<&str>,
        components: Value,
    ) -> Result<()> {
        let mut data = serde_json::json!({ "components": components });
        if let Some(content) = content {
            data["content"] = Value::String(content.to_string());
        }
        let body = serde_json::json!({ "type": CALLBACK_UPDATE_MESSAGE, "data": data });
        self.post_checked(
            self.api_url(&format!("/interactions/{interaction_id}/{token}/callback")),
            &body,
        )
        .await?;
        Ok(())
    }

    /// Ack a component interaction without touching its message yet.
    pub async fn ack_component_deferred(&self, interaction_id: &str, token: &str) -> Result<()> {
        let body = serde_json::json!({ "type": CALLBACK_DEFERRED_UPDATE_MESSAGE });
        self.post_checked(
            self.api_url(&format!("/interactions/{interaction_id}/{token}/callback")),
            &body,
        )
        .await?;
        Ok(())
    }

    /// Send a followup on an acknowledged interaction. Returns the created
    /// message id, which doubles as the surface id for rendered lists.
    pub async fn followup(&self, token: &str, payload: Value) -> Result<String> {
        let url = self.api_url(&format!(
            "/webhooks/{}/{token}?wait=true",
            self.application_id
        ));
        let resp = self.post_checked(url, &payload).await?;
        let body: Value = resp.json().await?;
        body.get("id")
            .and_then(|id| id.as_str())
            .map(|id| id.to_string())
            .ok_or_else(|| anyhow::anyhow!("discord followup response missing message id"))
    }

    /// Edit the message a component interaction was acknowledged on. Only
    /// valid after a deferred-update ack on that interaction.
    pub async fn edit_original(&self, token: &str, payload: Value) -> Result<()> {
        self.edit_followup(token, "@original", payload).await
    }

    /// Edit a followup message by id (used by expiry to disable controls).
    pub async fn edit_followup(
        &self,
        token: &str,
        message_id: &str,
        payload: Value,
    ) -> Result<()> {
        let url = self.api_url(&format!(
            "/webhooks/{}/{token}/messages/{message_id}",
            self.application_id
        ));
        let resp = self
            .http
            .patch(url)
            .header("Authorization", format!("Bot {}", self.bot_token))
            .json(&payload)
            .send()
            .await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await?;
            return Err(anyhow::anyhow!(
                "discord edit failed: status={status} body={text}"
            ));
        }
        Ok(())
    }

    /// Overwrite the application's slash commands, globally or per guild.
    pub async fn register_commands(
        &self,
        guild_id: Option<&str>,
        commands: &Value,
    ) -> Result<()> {
        let path = match guild_id {
            Some(guild_id) => format!(
                "/applications/{}/guilds/{guild_id}/commands",
                self.application_id
            ),
            None => format!("/applications/{}/commands", self.application_id),
        };
        let resp = self
            .http
            .put(self.api_url(&path))
            .header("Authorization", format!("Bot {}", self.bot_token))
            .json(commands)
            .send()
            .await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await?;
            return Err(anyhow::anyhow!(
                "discord command registration failed: status={status} body={text}"
            ));
        }
        Ok(())
    }
}
