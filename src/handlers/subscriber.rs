use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::{debug, warn};

use crate::models::preference::{ChannelConfig, NotificationSource, UserNotificationConfig};
use crate::models::user::UserInfo;
use crate::stores::{Cache, FollowStore, PreferenceStore, UserStore};

pub const RATE_KEY_PREFIX: &str = "notification:rate:new_question:";

/// Caps how many sitewide new-question emails one user receives per
/// window. The counter is bumped first and compared after, so two
/// concurrent checks can never both slip under the cap.
pub struct RateLimiter {
    cache: Arc<dyn Cache>,
    max: i64,
    window: Option<Duration>,
}

impl RateLimiter {
    pub fn new(cache: Arc<dyn Cache>, max: i64, window: Option<Duration>) -> Self {
        Self { cache, max, window }
    }

    /// Counts one broadcast against `user_id` and reports whether the
    /// user is still under the cap.
    pub async fn check_and_count(&self, user_id: &str) -> Result<bool> {
        let key = format!("{}{}", RATE_KEY_PREFIX, user_id);

        let count = self.cache.incr(&key).await?;
        if count == 1 {
            if let Some(window) = self.window {
                self.cache.expire(&key, window).await?;
            }
        }

        Ok(count <= self.max)
    }
}

/// One member of a broadcast audience, with the channels their
/// subscription enables.
pub struct ResolvedSubscriber {
    pub user: UserInfo,
    pub source: NotificationSource,
    pub channels: Vec<ChannelConfig>,
}

/// Computes the audience for a new-question broadcast.
pub struct SubscriberResolver {
    follows: Arc<dyn FollowStore>,
    preferences: Arc<dyn PreferenceStore>,
    users: Arc<dyn UserStore>,
    limiter: RateLimiter,
}

impl SubscriberResolver {
    pub fn new(
        follows: Arc<dyn FollowStore>,
        preferences: Arc<dyn PreferenceStore>,
        users: Arc<dyn UserStore>,
        limiter: RateLimiter,
    ) -> Self {
        Self {
            follows,
            preferences,
            users,
            limiter,
        }
    }

    /// Resolves who hears about a new question: followers of its tags
    /// who subscribed to followed-tag questions, then sitewide
    /// subscribers still under the rate cap. Each user appears at most
    /// once, and the author is never included (nor counted against
    /// their rate cap).
    pub async fn resolve_new_question_audience(
        &self,
        author_id: &str,
        tag_ids: &[String],
    ) -> Result<Vec<ResolvedSubscriber>> {
        let mut included: HashSet<String> = HashSet::new();
        let mut audience: Vec<ResolvedSubscriber> = Vec::new();

        // Union of followers across the question's tags.
        let mut follower_seen: HashSet<String> = HashSet::new();
        let mut follower_ids: Vec<String> = Vec::new();
        for tag_id in tag_ids {
            for user_id in self.follows.follower_ids(tag_id).await? {
                if user_id != author_id && follower_seen.insert(user_id.clone()) {
                    follower_ids.push(user_id);
                }
            }
        }

        // Tag followers get the broadcast unconditionally.
        let tag_configs = self
            .preferences
            .get_by_users_and_source(
                &follower_ids,
                NotificationSource::AllNewQuestionForFollowingTags,
            )
            .await?;
        for config in tag_configs {
            if included.contains(&config.user_id) {
                continue;
            }
            if let Some(subscriber) = self.load_subscriber(config).await {
                included.insert(subscriber.user.user_id.clone());
                audience.push(subscriber);
            }
        }

        // Sitewide subscribers are rate capped.
        let global_configs = self
            .preferences
            .get_by_source(NotificationSource::AllNewQuestion)
            .await?;
        for config in global_configs {
            if config.user_id == author_id || included.contains(&config.user_id) {
                continue;
            }

            match self.limiter.check_and_count(&config.user_id).await {
                Ok(true) => {}
                Ok(false) => {
                    debug!(user_id = %config.user_id, "Rate cap reached, skipping subscriber");
                    continue;
                }
                Err(e) => {
                    warn!(user_id = %config.user_id, error = %e, "Rate check failed, skipping subscriber");
                    continue;
                }
            }

            if let Some(subscriber) = self.load_subscriber(config).await {
                included.insert(subscriber.user.user_id.clone());
                audience.push(subscriber);
            }
        }

        Ok(audience)
    }

    /// A subscriber whose profile cannot be loaded is dropped from the
    /// audience; the rest of the broadcast proceeds.
    async fn load_subscriber(&self, config: UserNotificationConfig) -> Option<ResolvedSubscriber> {
        match self.users.by_id(&config.user_id).await {
            Ok(Some(user)) => Some(ResolvedSubscriber {
                user,
                source: config.source,
                channels: config.channels,
            }),
            Ok(None) => {
                debug!(user_id = %config.user_id, "Subscriber profile missing, skipping");
                None
            }
            Err(e) => {
                warn!(user_id = %config.user_id, error = %e, "Subscriber lookup failed, skipping");
                None
            }
        }
    }
}
