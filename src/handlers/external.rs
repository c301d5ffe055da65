use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::handlers::subscriber::SubscriberResolver;
use crate::handlers::templates;
use crate::models::external::{EmailPayload, ExternalNotificationMsg, NewQuestionPayload};
use crate::models::preference::{ChannelKind, NotificationSource};
use crate::stores::{Cache, PreferenceStore};
use crate::{clients::mailer::EmailSender, utils::new_code};

pub const UNSUBSCRIBE_CODE_KEY_PREFIX: &str = "notification:email_code:";

/// Worker behind the external notification channel. Direct payloads go
/// to the named receiver subject to their inbox channel preferences;
/// new-question payloads fan out to the resolved audience.
pub struct ExternalDispatcher {
    mailer: Arc<dyn EmailSender>,
    preferences: Arc<dyn PreferenceStore>,
    cache: Arc<dyn Cache>,
    resolver: SubscriberResolver,
    site_url: String,
    code_ttl: Duration,
}

impl ExternalDispatcher {
    pub fn new(
        mailer: Arc<dyn EmailSender>,
        preferences: Arc<dyn PreferenceStore>,
        cache: Arc<dyn Cache>,
        resolver: SubscriberResolver,
        site_url: String,
        code_ttl: Duration,
    ) -> Self {
        Self {
            mailer,
            preferences,
            cache,
            resolver,
            site_url,
            code_ttl,
        }
    }

    pub async fn handle(&self, msg: ExternalNotificationMsg) -> Result<()> {
        match &msg.payload {
            EmailPayload::NewQuestion(payload) => self.broadcast_new_question(&msg, payload).await,
            EmailPayload::NewComment(_)
            | EmailPayload::NewAnswer(_)
            | EmailPayload::NewInviteAnswer(_) => self.send_direct(&msg).await,
        }
    }

    async fn send_direct(&self, msg: &ExternalNotificationMsg) -> Result<()> {
        if msg.receiver_user_id.is_empty() || msg.receiver_email.is_empty() {
            warn!("Direct external notification without receiver, dropped");
            return Ok(());
        }

        let config = self
            .preferences
            .get_by_user_and_source(&msg.receiver_user_id, NotificationSource::Inbox)
            .await?;

        let Some(config) = config else {
            debug!(user_id = %msg.receiver_user_id, "No inbox channel config, skipping email");
            return Ok(());
        };

        for channel in config.enabled_channels() {
            match channel.key {
                ChannelKind::Email => {
                    self.deliver_email(
                        &msg.receiver_user_id,
                        &msg.receiver_email,
                        &msg.receiver_lang,
                        NotificationSource::Inbox,
                        &msg.payload,
                    )
                    .await?;
                }
                ChannelKind::Unknown => {
                    debug!(user_id = %msg.receiver_user_id, "Skipping unimplemented channel");
                }
            }
        }

        Ok(())
    }

    async fn broadcast_new_question(
        &self,
        msg: &ExternalNotificationMsg,
        payload: &NewQuestionPayload,
    ) -> Result<()> {
        let audience = self
            .resolver
            .resolve_new_question_audience(&payload.author_user_id, &payload.tag_ids)
            .await?;

        info!(
            question_id = %payload.question_id,
            recipients = audience.len(),
            "Broadcasting new question"
        );

        for subscriber in &audience {
            for channel in subscriber.channels.iter().filter(|c| c.enable) {
                match channel.key {
                    ChannelKind::Email => {
                        // One failed recipient must not stall the rest
                        // of the fan-out.
                        if let Err(e) = self
                            .deliver_email(
                                &subscriber.user.user_id,
                                &subscriber.user.email,
                                &subscriber.user.language,
                                subscriber.source,
                                &msg.payload,
                            )
                            .await
                        {
                            warn!(
                                user_id = %subscriber.user.user_id,
                                error = %e,
                                "Broadcast email failed, continuing"
                            );
                        }
                    }
                    ChannelKind::Unknown => {
                        debug!(user_id = %subscriber.user.user_id, "Skipping unimplemented channel");
                    }
                }
            }
        }

        Ok(())
    }

    /// Renders and sends one email. Every delivery gets its own
    /// unsubscribe code, saved before the send so the link works even
    /// if the user opens it immediately.
    async fn deliver_email(
        &self,
        user_id: &str,
        email: &str,
        lang: &str,
        source: NotificationSource,
        payload: &EmailPayload,
    ) -> Result<()> {
        let code = new_code();
        let content = serde_json::json!({
            "user_id": user_id,
            "source": source.as_str(),
        })
        .to_string();

        self.cache
            .set_string(
                &format!("{}{}", UNSUBSCRIBE_CODE_KEY_PREFIX, code),
                &content,
                self.code_ttl,
            )
            .await?;

        let rendered = templates::render(lang, payload, &self.site_url, &code)?;
        self.mailer
            .send(email, &rendered.subject, &rendered.body)
            .await
    }
}
