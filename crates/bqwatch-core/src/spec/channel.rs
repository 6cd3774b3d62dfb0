//! Email notification channel.

use serde::Serialize;
use serde_json::json;

use crate::BqwatchConfig;

/// Channel label holding the destination address.
pub const EMAIL_LABEL: &str = "email_address";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelSpec {
    pub display_name: String,
    pub email: String,
}

impl ChannelSpec {
    pub fn from_config(config: &BqwatchConfig) -> Self {
        Self {
            display_name: config.channel_display_name.clone(),
            email: config.notification_email.trim().to_string(),
        }
    }

    /// `NotificationChannel` resource document.
    pub fn to_payload(&self) -> serde_json::Value {
        json!({
            "type": "email",
            "displayName": self.display_name,
            "labels": { EMAIL_LABEL: self.email },
            "enabled": true
        })
    }
}
