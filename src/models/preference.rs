use serde::{Deserialize, Serialize};
use tracing::warn;

/// Subscription source a channel preference belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationSource {
    /// Direct notifications about the user's own content.
    Inbox,
    /// Every new question on the site.
    AllNewQuestion,
    /// New questions under tags the user follows.
    AllNewQuestionForFollowingTags,
}

impl NotificationSource {
    pub fn as_str(&self) -> &str {
        match self {
            NotificationSource::Inbox => "inbox",
            NotificationSource::AllNewQuestion => "all_new_question",
            NotificationSource::AllNewQuestionForFollowingTags => {
                "all_new_question_for_following_tags"
            }
        }
    }
}

/// Delivery channel. Stored rows may name channels this build does not
/// ship, so unknown keys decode to `Unknown` and are skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    Email,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    pub key: ChannelKind,
    pub enable: bool,
}

impl ChannelConfig {
    pub fn email(enable: bool) -> Self {
        Self {
            key: ChannelKind::Email,
            enable,
        }
    }
}

/// Per-user, per-source channel preference row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserNotificationConfig {
    pub user_id: String,
    pub source: NotificationSource,
    pub channels: Vec<ChannelConfig>,
}

impl UserNotificationConfig {
    pub fn enabled_channels(&self) -> impl Iterator<Item = &ChannelConfig> {
        self.channels.iter().filter(|c| c.enable)
    }
}

/// Parses the stored channel list. A row that fails to parse disables
/// delivery for that user instead of failing the whole fan-out.
pub fn parse_channels(user_id: &str, raw: &str) -> Vec<ChannelConfig> {
    match serde_json::from_str::<Vec<ChannelConfig>>(raw) {
        Ok(channels) => channels,
        Err(e) => {
            warn!(
                user_id = %user_id,
                error = %e,
                "Malformed channel config, treating as no channels"
            );
            Vec::new()
        }
    }
}
