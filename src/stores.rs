use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use crate::models::activity::ActivityRecord;
use crate::models::notification::{
    InboxFilter, NotificationPage, NotificationRecord, NotificationType,
};
use crate::models::preference::{NotificationSource, UserNotificationConfig};
use crate::models::user::UserInfo;

/// Counter and short-lived-value cache backing red dots, rate limits
/// and unsubscribe codes.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Reads a counter. Missing keys read as 0.
    async fn get_i64(&self, key: &str) -> Result<i64>;

    /// Atomically increments `key` and returns the incremented value.
    /// The key is created at 1 when absent.
    async fn incr(&self, key: &str) -> Result<i64>;

    async fn del(&self, key: &str) -> Result<()>;

    async fn expire(&self, key: &str, ttl: Duration) -> Result<()>;

    async fn set_string(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;
}

#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn insert(&self, record: &NotificationRecord) -> Result<()>;

    /// Marks every unread row of `kind` as read. Returns how many rows
    /// changed.
    async fn mark_all_read(&self, user_id: &str, kind: NotificationType) -> Result<u64>;

    /// Marks one row as read. Returns false when the row is missing,
    /// already read, or belongs to someone else.
    async fn mark_read(&self, user_id: &str, notification_id: Uuid) -> Result<bool>;

    async fn page(
        &self,
        user_id: &str,
        kind: NotificationType,
        filter: InboxFilter,
        page: i64,
        page_size: i64,
    ) -> Result<NotificationPage>;
}

#[async_trait]
pub trait PreferenceStore: Send + Sync {
    async fn get_by_user_and_source(
        &self,
        user_id: &str,
        source: NotificationSource,
    ) -> Result<Option<UserNotificationConfig>>;

    async fn get_by_users_and_source(
        &self,
        user_ids: &[String],
        source: NotificationSource,
    ) -> Result<Vec<UserNotificationConfig>>;

    async fn get_by_source(&self, source: NotificationSource)
    -> Result<Vec<UserNotificationConfig>>;
}

#[async_trait]
pub trait FollowStore: Send + Sync {
    async fn follower_ids(&self, tag_id: &str) -> Result<Vec<String>>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn by_id(&self, user_id: &str) -> Result<Option<UserInfo>>;

    /// Resolves usernames to profiles. Unknown names are silently
    /// absent from the result.
    async fn by_usernames(&self, usernames: &[String]) -> Result<Vec<UserInfo>>;
}

#[async_trait]
pub trait ActivityStore: Send + Sync {
    async fn insert(&self, record: &ActivityRecord) -> Result<()>;

    async fn list_for_object(&self, object_id: &str) -> Result<Vec<ActivityRecord>>;
}

#[async_trait]
pub trait RevisionStore: Send + Sync {
    async fn pending_count(&self) -> Result<i64>;
}
