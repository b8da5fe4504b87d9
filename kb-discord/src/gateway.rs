use crate::types::{InboundInteraction, InteractionKind};
use anyhow::Result;
use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock, mpsc};
use tokio::time::Duration;
use tokio_tungstenite::tungstenite::Message;

const DISCORD_GATEWAY_URL: &str = "wss://gateway.discord.gg/?v=10&encoding=json";
const GATEWAY_RECONNECT_DELAY: Duration = Duration::from_secs(5);

// Interactions are delivered regardless of intents.
const DISCORD_DEFAULT_INTENTS: u64 = 0;

const INTERACTION_TYPE_COMMAND: u8 = 2;
const INTERACTION_TYPE_COMPONENT: u8 = 3;

/// Gateway connection feeding slash-command and component interactions
/// into the shell's inbound queue.
#[derive(Clone)]
pub struct DiscordGateway {
    bot_token: String,
    gateway_intents: u64,
}

impl DiscordGateway {
    pub fn new(bot_token: &str) -> Self {
        Self {
            bot_token: bot_token.to_string(),
            gateway_intents: DISCORD_DEFAULT_INTENTS,
        }
    }

    pub fn with_gateway_intents(mut self, gateway_intents: u64) -> Self {
        self.gateway_intents = gateway_intents;
        self
    }

    /// Start receiving interactions. Reconnects with a fixed delay when
    /// the gateway stream drops.
    pub fn start(&self, tx: mpsc::Sender<InboundInteraction>) {
        let adapter = self.clone();
        tokio::spawn(async move {
            loop {
                if let Err(e) = adapter.run_gateway_once(tx.clone()).await {
                    tracing::warn!(%e, "discord gateway loop exited; reconnecting");
                }
                if tx.is_closed() {
                    return;
                }
                tokio::time::sleep(GATEWAY_RECONNECT_DELAY).await;
            }
        });
    }

    async fn run_gateway_once(&self, tx: mpsc::Sender<InboundInteraction>) -> Result<()> {
        let (ws, _) = tokio_tungstenite::connect_async(DISCORD_GATEWAY_URL).await?;
        let (write, mut read) = ws.split();
        let write = Arc::new(Mutex::new(write));

        // HELLO.
        let heartbeat_interval_ms: u64 = if let Some(msg) = read.next().await {
            let msg = msg?;
            let v: serde_json::Value = serde_json::from_str(msg.to_text()?)?;
            v.get("d")
                .and_then(|d| d.get("heartbeat_interval"))
                .and_then(|x| x.as_u64())
                .ok_or_else(|| anyhow::anyhow!("discord HELLO missing heartbeat_interval"))?
        } else {
            return Err(anyhow::anyhow!("discord gateway closed before HELLO"));
        };

        // IDENTIFY.
        let identify = serde_json::json!({
            "op": 2,
            "d": {
                "token": format!("Bot {}", self.bot_token),
                "intents": self.gateway_intents,
                "properties": { "os": "linux", "browser": "klassbot", "device": "klassbot" }
            }
        });
        write
            .lock()
            .await
            .send(Message::Text(identify.to_string().into()))
            .await?;

        let seq: Arc<RwLock<Option<i64>>> = Arc::new(RwLock::new(None));

        // Heartbeat loop.
        {
            let write = write.clone();
            let seq = seq.clone();
            tokio::spawn(async move {
                let mut interval =
                    tokio::time::interval(Duration::from_millis(heartbeat_interval_ms));
                loop {
                    interval.tick().await;
                    let s = *seq.read().await;
                    let payload = serde_json::json!({ "op": 1, "d": s });
                    if write
                        .lock()
                        .await
                        .send(Message::Text(payload.to_string().into()))
                        .await
                        .is_err()
                    {
                        break;
                    }
                }
            });
        }

        while let Some(msg) = read.next().await {
            let msg = msg?;
            let txt = msg.to_text()?;
            let v: serde_json::Value = serde_json::from_str(txt)?;

            if let Some(s) = v.get("s").and_then(|s| s.as_i64()) {
                *seq.write().await = Some(s);
            }

            let op = v
                .get("op")
                .and_then(|o| o.as_i64())
                .ok_or_else(|| anyhow::anyhow!("discord payload missing op"))?;
            if op == 11 {
                continue;
            }

            let t = v.get("t").and_then(|t| t.as_str());
            match t {
                Some("READY") => {
                    let user_id = v
                        .get("d")
                        .and_then(|d| d.get("user"))
                        .and_then(|u| u.get("id"))
                        .and_then(|id| id.as_str())
                        .unwrap_or("unknown");
                    tracing::info!(bot_user_id = %user_id, "discord gateway ready");
                }
                Some("INTERACTION_CREATE") => {
                    let payload = v
                        .get("d")
                        .cloned()
                        .ok_or_else(|| anyhow::anyhow!("INTERACTION_CREATE missing payload"))?;
                    let event: InteractionCreate = serde_json::from_value(payload)?;
                    let Some(inbound) = build_inbound(event) else {
                        continue;
                    };
                    tx.send(inbound)
                        .await
                        .map_err(|e| anyhow::anyhow!("discord inbound queue closed: {e}"))?;
                }
                Some(_) | None => {}
            }
        }

        Err(anyhow::anyhow!("discord gateway stream ended unexpectedly"))
    }
}

fn build_inbound(event: InteractionCreate) -> Option<InboundInteraction> {
    let user_id = event
        .member
        .as_ref()
        .and_then(|m| m.user.as_ref())
        .or(event.user.as_ref())
        .map(|u| u.id.clone())?;

    let data = event.data?;
    let kind = match event.kind {
        INTERACTION_TYPE_COMMAND => InteractionKind::Command { name: data.name? },
        INTERACTION_TYPE_COMPONENT => InteractionKind::Component {
            custom_id: data.custom_id?,
            values: data.values,
        },
        _ => return None,
    };

    Some(InboundInteraction {
        kind,
        interaction_id: event.id,
        interaction_token: event.token,
        surface_id: event.message.map(|m| m.id.into()),
        user_id: user_id.into(),
        received_at: Utc::now(),
    })
}

#[derive(Debug, Deserialize)]
struct InteractionCreate {
    id: String,
    token: String,
    #[serde(rename = "type")]
    kind: u8,
    #[serde(default)]
    data: Option<InteractionData>,
    #[serde(default)]
    member: Option<GuildMember>,
    #[serde(default)]
    user: Option<DiscordUser>,
    #[serde(default)]
    message: Option<MessageRef>,
}

#[derive(Debug, Deserialize)]
struct InteractionData {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    custom_id: Option<String>,
    #[serde(default)]
    values: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct GuildMember {
    #[serde(default)]
    user: Option<DiscordUser>,
}

#[derive(Debug, Deserialize)]
struct DiscordUser {
    id: String,
}

#[derive(Debug, Deserialize)]
struct MessageRef {
    id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(v: serde_json::Value) -> Option<InboundInteraction> {
        build_inbound(serde_json::from_value(v).expect("wire parse"))
    }

    #[test]
    fn slash_command_maps_to_a_command_interaction() {
        let inbound = parse(serde_json::json!({
            "id": "i1",
            "token": "t1",
            "type": 2,
            "data": {"name": "register"},
            "member": {"user": {"id": "42"}}
        }))
        .expect("inbound");

        assert_eq!(
            inbound.kind,
            InteractionKind::Command {
                name: "register".into()
            }
        );
        assert_eq!(inbound.user_id.as_str(), "42");
        assert!(inbound.surface_id.is_none());
    }

    #[test]
    fn component_event_carries_surface_id_and_values() {
        let inbound = parse(serde_json::json!({
            "id": "i2",
            "token": "t2",
            "type": 3,
            "data": {"custom_id": "subject_select", "values": ["u1", "u2"]},
            "user": {"id": "7"},
            "message": {"id": "m9"}
        }))
        .expect("inbound");

        let InteractionKind::Component { custom_id, values } = inbound.kind else {
            panic!("expected component");
        };
        assert_eq!(custom_id, "subject_select");
        assert_eq!(values, vec!["u1".to_string(), "u2".to_string()]);
        assert_eq!(inbound.surface_id.expect("surface").as_str(), "m9");
        assert_eq!(inbound.user_id.as_str(), "7", "DM interactions use the top-level user");
    }

    #[test]
    fn unsupported_interaction_types_are_dropped() {
        // Type 1 is the gateway ping; type 5 a modal submit.
        for kind in [1, 5] {
            assert!(
                parse(serde_json::json!({
                    "id": "i3",
                    "token": "t3",
                    "type": kind,
                    "data": {},
                    "user": {"id": "7"}
                }))
                .is_none()
            );
        }
    }
}
