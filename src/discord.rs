//! Chat REST adapter: sink implementations over the Discord HTTP API.
//!
//! Only the REST surface lives here (messages, pins, channel rename). The
//! gateway connection is outside this crate's boundary.

use crate::delta::{DeltaKind, MembershipDelta};
use crate::report::StatusReport;
use crate::sink::{CounterSink, DisplaySink, NotificationSink, SinkError};
use async_trait::async_trait;
use log::{info, warn};
use reqwest::{Method, StatusCode};
use serde_json::{Value, json};

const API_BASE: &str = "https://discord.com/api/v10";

/// Field cap per embed, minus one slot kept free for the stats footer row.
const MAX_ROOM_FIELDS: usize = 24;

/// Members listed per room before trimming to `+N more`.
const MEMBERS_SHOWN: usize = 8;

const COLOR_GREEN: u32 = 0x2ecc71;
const COLOR_RED: u32 = 0xe74c3c;

/// Minimal authenticated client for the REST endpoints the sinks need.
#[derive(Clone)]
pub struct DiscordApi {
    http: reqwest::Client,
    token: String,
    base: String,
}

impl DiscordApi {
    pub fn new(token: impl Into<String>) -> Self {
        Self::with_base(token, API_BASE)
    }

    /// Point the client at a different base URL (test servers).
    pub fn with_base(token: impl Into<String>, base: impl Into<String>) -> Self {
        DiscordApi {
            http: reqwest::Client::new(),
            token: token.into(),
            base: base.into(),
        }
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, SinkError> {
        let url = format!("{}{}", self.base, path);
        let mut request = self
            .http
            .request(method, url)
            .header("Authorization", format!("Bot {}", self.token));
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(SinkError::NotFound);
        }
        if !status.is_success() {
            return Err(SinkError::Api {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&bytes).map_err(|e| SinkError::Api {
            status: status.as_u16(),
            body: format!("invalid response body: {e}"),
        })
    }

    /// Post an embed; returns the new message id.
    pub async fn create_message(&self, channel: u64, embed: &Value) -> Result<String, SinkError> {
        let payload = json!({ "embeds": [embed] });
        let response = self
            .send(
                Method::POST,
                &format!("/channels/{channel}/messages"),
                Some(&payload),
            )
            .await?;
        response
            .get("id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or(SinkError::Api {
                status: 200,
                body: "response missing message id".to_string(),
            })
    }

    pub async fn edit_message(
        &self,
        channel: u64,
        message: &str,
        embed: &Value,
    ) -> Result<(), SinkError> {
        let payload = json!({ "embeds": [embed] });
        self.send(
            Method::PATCH,
            &format!("/channels/{channel}/messages/{message}"),
            Some(&payload),
        )
        .await?;
        Ok(())
    }

    pub async fn pin_message(&self, channel: u64, message: &str) -> Result<(), SinkError> {
        self.send(
            Method::PUT,
            &format!("/channels/{channel}/pins/{message}"),
            None,
        )
        .await?;
        Ok(())
    }

    pub async fn rename_channel(&self, channel: u64, name: &str) -> Result<(), SinkError> {
        let payload = json!({ "name": name });
        self.send(Method::PATCH, &format!("/channels/{channel}"), Some(&payload))
            .await?;
        Ok(())
    }
}

/// Maintains the pinned live-status message in one channel.
pub struct DiscordDisplaySink {
    api: DiscordApi,
    channel: u64,
}

impl DiscordDisplaySink {
    pub fn new(api: DiscordApi, channel: u64) -> Self {
        DiscordDisplaySink { api, channel }
    }
}

#[async_trait]
impl DisplaySink for DiscordDisplaySink {
    async fn publish(
        &self,
        report: &StatusReport,
        handle: Option<&str>,
    ) -> Result<String, SinkError> {
        let embed = render_status_embed(report);

        if let Some(message) = handle {
            match self.api.edit_message(self.channel, message, &embed).await {
                Ok(()) => return Ok(message.to_string()),
                Err(SinkError::NotFound) => {
                    info!("pinned display message is gone, creating a new one");
                }
                Err(e) => return Err(e),
            }
        }

        let message = self.api.create_message(self.channel, &embed).await?;
        if let Err(e) = self.api.pin_message(self.channel, &message).await {
            warn!("cannot pin display message: {e}");
        }
        Ok(message)
    }
}

/// Posts one embed per join/leave delta.
pub struct DiscordNotificationSink {
    api: DiscordApi,
    channel: u64,
}

impl DiscordNotificationSink {
    pub fn new(api: DiscordApi, channel: u64) -> Self {
        DiscordNotificationSink { api, channel }
    }
}

#[async_trait]
impl NotificationSink for DiscordNotificationSink {
    async fn notify(&self, deltas: &[MembershipDelta]) -> Result<(), SinkError> {
        for delta in deltas {
            let embed = render_delta_embed(delta);
            self.api.create_message(self.channel, &embed).await?;
        }
        Ok(())
    }
}

/// Renames a counter channel to carry the live user count.
pub struct DiscordCounterSink {
    api: DiscordApi,
    channel: u64,
}

impl DiscordCounterSink {
    pub fn new(api: DiscordApi, channel: u64) -> Self {
        DiscordCounterSink { api, channel }
    }
}

#[async_trait]
impl CounterSink for DiscordCounterSink {
    async fn publish(&self, users: usize) -> Result<(), SinkError> {
        self.api
            .rename_channel(self.channel, &format!("Users Online: {users}"))
            .await
    }
}

/// Render the live-status embed.
///
/// Trimming rules: at most [`MAX_ROOM_FIELDS`] rooms, [`MEMBERS_SHOWN`]
/// members listed per room with a `+N more` suffix, totals in the footer.
/// Join order makes the trim stable between refreshes.
pub fn render_status_embed(report: &StatusReport) -> Value {
    let snapshot = &report.snapshot;
    let mut fields = Vec::new();

    if !report.service.active {
        fields.push(json!({
            "name": "Server Offline",
            "value": "The server is currently not running",
            "inline": false,
        }));
    } else if snapshot.is_empty() {
        fields.push(json!({
            "name": "Server Online",
            "value": "No active sessions\nWaiting for users to connect...",
            "inline": false,
        }));
    } else {
        for (group, members) in snapshot.groups().take(MAX_ROOM_FIELDS) {
            let mut listing: Vec<String> = members
                .iter()
                .take(MEMBERS_SHOWN)
                .map(|m| format!("- {m}"))
                .collect();
            if members.len() > MEMBERS_SHOWN {
                listing.push(format!("*... +{} more*", members.len() - MEMBERS_SHOWN));
            }
            fields.push(json!({
                "name": format!("{group} ({})", members.len()),
                "value": listing.join("\n"),
                "inline": true,
            }));
        }
    }

    let color = if report.service.active {
        COLOR_GREEN
    } else {
        COLOR_RED
    };

    json!({
        "title": "Live Sessions",
        "description": "*Auto-updates every minute*",
        "color": color,
        "timestamp": report.generated_at.to_rfc3339(),
        "fields": fields,
        "footer": {
            "text": format!(
                "{} rooms | {} users | {} connections",
                snapshot.group_count(),
                snapshot.user_count(),
                report.connections,
            ),
        },
    })
}

/// Render one join/leave notification embed.
pub fn render_delta_embed(delta: &MembershipDelta) -> Value {
    let (title, color, verb) = match delta.kind {
        DeltaKind::Joined => ("User Joined", COLOR_GREEN, "joined"),
        DeltaKind::Left => ("User Left", COLOR_RED, "left"),
    };
    json!({
        "author": { "name": title },
        "description": format!("**{}** {verb} **{}**", delta.user, delta.group),
        "color": color,
    })
}
