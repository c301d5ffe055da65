use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::notification::{
    InboxFilter, NotificationAction, NotificationMsg, NotificationPage, NotificationRecord,
    NotificationType, RedDot,
};
use crate::stores::{Cache, NotificationStore, RevisionStore};

const MAX_PAGE_SIZE: i64 = 100;

pub fn red_dot_key(kind: NotificationType, user_id: &str) -> String {
    format!("notification:reddot:{}:{}", kind.as_str(), user_id)
}

/// Persists in-app notifications and serves the unread state around
/// them.
pub struct InboxService {
    notifications: Arc<dyn NotificationStore>,
    revisions: Arc<dyn RevisionStore>,
    cache: Arc<dyn Cache>,
}

impl InboxService {
    pub fn new(
        notifications: Arc<dyn NotificationStore>,
        revisions: Arc<dyn RevisionStore>,
        cache: Arc<dyn Cache>,
    ) -> Self {
        Self {
            notifications,
            revisions,
            cache,
        }
    }

    /// Worker entry point for the in-app notification channel. Stores
    /// the row, then bumps the matching red dot counter.
    pub async fn handle(&self, msg: NotificationMsg) -> Result<()> {
        if msg.receiver_user_id.is_empty() {
            warn!(
                action = msg.action.as_str(),
                "Notification without receiver, dropped"
            );
            return Ok(());
        }

        let record = NotificationRecord::from_msg(&msg);
        self.notifications.insert(&record).await?;

        self.cache
            .incr(&red_dot_key(msg.kind, &msg.receiver_user_id))
            .await?;

        debug!(
            notification_id = %record.id,
            receiver = %msg.receiver_user_id,
            action = msg.action.as_str(),
            "Notification stored"
        );

        Ok(())
    }

    pub async fn red_dot(&self, user_id: &str, can_review: bool) -> Result<RedDot> {
        let inbox = self
            .cache
            .get_i64(&red_dot_key(NotificationType::Inbox, user_id))
            .await?;
        let achievement = self
            .cache
            .get_i64(&red_dot_key(NotificationType::Achievement, user_id))
            .await?;

        let revision_count = if can_review {
            self.revisions.pending_count().await?
        } else {
            0
        };

        Ok(RedDot {
            inbox,
            achievement,
            can_review,
            revision_count,
        })
    }

    pub async fn clear_red_dot(&self, user_id: &str, kind: NotificationType) -> Result<()> {
        self.cache.del(&red_dot_key(kind, user_id)).await
    }

    /// Marks every unread notification of `kind` as read. The red dot
    /// is cleared separately when the user opens the page.
    pub async fn clear_all_unread(&self, user_id: &str, kind: NotificationType) -> Result<u64> {
        let cleared = self.notifications.mark_all_read(user_id, kind).await?;

        debug!(
            user_id,
            kind = kind.as_str(),
            cleared,
            "Unread notifications cleared"
        );

        Ok(cleared)
    }

    /// Marks one notification as read. Already-read, foreign and
    /// missing rows are a no-op.
    pub async fn clear_one_unread(&self, user_id: &str, notification_id: Uuid) -> Result<()> {
        let changed = self.notifications.mark_read(user_id, notification_id).await?;
        if !changed {
            debug!(user_id, %notification_id, "Nothing to mark read");
        }

        Ok(())
    }

    /// One page of the user's notification list, newest first. Down
    /// vote entries come back with the actor blanked; the receiver is
    /// never told who voted them down.
    pub async fn page(
        &self,
        user_id: &str,
        kind: NotificationType,
        filter: InboxFilter,
        page: i64,
        page_size: i64,
    ) -> Result<NotificationPage> {
        let page = page.max(1);
        let page_size = page_size.clamp(1, MAX_PAGE_SIZE);

        let mut result = self
            .notifications
            .page(user_id, kind, filter, page, page_size)
            .await?;

        for item in &mut result.list {
            if item.action == NotificationAction::DownVotedYou {
                item.trigger_user_id = None;
            }
        }

        Ok(result)
    }
}
