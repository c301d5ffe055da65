use anyhow::{Error, Result, anyhow};
use async_trait::async_trait;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use tracing::info;
use uuid::Uuid;

use crate::models::activity::{ActivityRecord, ActivityType};
use crate::models::notification::{
    InboxFilter, NotificationAction, NotificationPage, NotificationRecord, NotificationType,
};
use crate::models::preference::{NotificationSource, UserNotificationConfig, parse_channels};
use crate::models::user::UserInfo;
use crate::stores::{
    ActivityStore, FollowStore, NotificationStore, PreferenceStore, RevisionStore, UserStore,
};

/// Postgres-backed persistence. One pool serves every store trait the
/// pipeline consumes.
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub async fn connect(database_url: &str) -> Result<Self, Error> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| anyhow!("Failed to connect to database: {}", e))?;

        info!("PostgreSQL connection established");

        Ok(Self { pool })
    }

    pub async fn health_check(&self) -> Result<(), Error> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| anyhow!("Database health check failed: {}", e))?;

        Ok(())
    }
}

#[async_trait]
impl NotificationStore for Database {
    async fn insert(&self, record: &NotificationRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO notifications
                (id, receiver_user_id, trigger_user_id, kind, action,
                 object_id, object_type, is_read, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(record.id)
        .bind(&record.receiver_user_id)
        .bind(&record.trigger_user_id)
        .bind(record.kind.as_str())
        .bind(record.action.as_str())
        .bind(&record.object_id)
        .bind(&record.object_type)
        .bind(record.is_read)
        .bind(record.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| anyhow!("Failed to insert notification: {}", e))?;

        Ok(())
    }

    async fn mark_all_read(&self, user_id: &str, kind: NotificationType) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE notifications SET is_read = TRUE
            WHERE receiver_user_id = $1 AND kind = $2 AND is_read = FALSE
            "#,
        )
        .bind(user_id)
        .bind(kind.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| anyhow!("Failed to mark notifications read: {}", e))?;

        Ok(result.rows_affected())
    }

    async fn mark_read(&self, user_id: &str, notification_id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE notifications SET is_read = TRUE
            WHERE id = $1 AND receiver_user_id = $2 AND is_read = FALSE
            "#,
        )
        .bind(notification_id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(|e| anyhow!("Failed to mark notification read: {}", e))?;

        Ok(result.rows_affected() > 0)
    }

    async fn page(
        &self,
        user_id: &str,
        kind: NotificationType,
        filter: InboxFilter,
        page: i64,
        page_size: i64,
    ) -> Result<NotificationPage> {
        let unread_only = filter == InboxFilter::Unread;

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM notifications
            WHERE receiver_user_id = $1 AND kind = $2 AND ($3 = FALSE OR is_read = FALSE)
            "#,
        )
        .bind(user_id)
        .bind(kind.as_str())
        .bind(unread_only)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| anyhow!("Failed to count notifications: {}", e))?;

        let rows = sqlx::query(
            r#"
            SELECT id, receiver_user_id, trigger_user_id, kind, action,
                   object_id, object_type, is_read, created_at
            FROM notifications
            WHERE receiver_user_id = $1 AND kind = $2 AND ($3 = FALSE OR is_read = FALSE)
            ORDER BY created_at DESC
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(user_id)
        .bind(kind.as_str())
        .bind(unread_only)
        .bind(page_size)
        .bind((page - 1) * page_size)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| anyhow!("Failed to list notifications: {}", e))?;

        let list = rows
            .iter()
            .map(notification_from_row)
            .collect::<Result<Vec<_>>>()?;

        Ok(NotificationPage { total, list })
    }
}

#[async_trait]
impl PreferenceStore for Database {
    async fn get_by_user_and_source(
        &self,
        user_id: &str,
        source: NotificationSource,
    ) -> Result<Option<UserNotificationConfig>> {
        let row = sqlx::query(
            "SELECT channels FROM user_notification_configs WHERE user_id = $1 AND source = $2",
        )
        .bind(user_id)
        .bind(source.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| anyhow!("Failed to read notification config: {}", e))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let raw: String = row.try_get("channels")?;
        Ok(Some(UserNotificationConfig {
            user_id: user_id.to_string(),
            source,
            channels: parse_channels(user_id, &raw),
        }))
    }

    async fn get_by_users_and_source(
        &self,
        user_ids: &[String],
        source: NotificationSource,
    ) -> Result<Vec<UserNotificationConfig>> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(
            r#"
            SELECT user_id, channels FROM user_notification_configs
            WHERE user_id = ANY($1) AND source = $2
            "#,
        )
        .bind(user_ids)
        .bind(source.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| anyhow!("Failed to read notification configs: {}", e))?;

        rows.iter().map(|row| config_from_row(row, source)).collect()
    }

    async fn get_by_source(
        &self,
        source: NotificationSource,
    ) -> Result<Vec<UserNotificationConfig>> {
        let rows =
            sqlx::query("SELECT user_id, channels FROM user_notification_configs WHERE source = $1")
                .bind(source.as_str())
                .fetch_all(&self.pool)
                .await
                .map_err(|e| anyhow!("Failed to read notification configs: {}", e))?;

        rows.iter().map(|row| config_from_row(row, source)).collect()
    }
}

#[async_trait]
impl FollowStore for Database {
    async fn follower_ids(&self, tag_id: &str) -> Result<Vec<String>> {
        let ids = sqlx::query_scalar::<_, String>(
            "SELECT user_id FROM tag_follows WHERE tag_id = $1",
        )
        .bind(tag_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| anyhow!("Failed to list tag followers: {}", e))?;

        Ok(ids)
    }
}

#[async_trait]
impl UserStore for Database {
    async fn by_id(&self, user_id: &str) -> Result<Option<UserInfo>> {
        let row = sqlx::query(
            r#"
            SELECT user_id, username, display_name, email, language
            FROM users WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| anyhow!("Failed to read user: {}", e))?;

        row.as_ref().map(user_from_row).transpose()
    }

    async fn by_usernames(&self, usernames: &[String]) -> Result<Vec<UserInfo>> {
        if usernames.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(
            r#"
            SELECT user_id, username, display_name, email, language
            FROM users WHERE username = ANY($1)
            "#,
        )
        .bind(usernames)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| anyhow!("Failed to read users: {}", e))?;

        rows.iter().map(user_from_row).collect()
    }
}

#[async_trait]
impl ActivityStore for Database {
    async fn insert(&self, record: &ActivityRecord) -> Result<()> {
        let extra = serde_json::to_string(&record.extra)
            .map_err(|e| anyhow!("Failed to encode activity extra: {}", e))?;

        sqlx::query(
            r#"
            INSERT INTO activities
                (id, user_id, trigger_user_id, object_id, original_object_id,
                 activity_type, revision_id, extra, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(record.id)
        .bind(&record.user_id)
        .bind(&record.trigger_user_id)
        .bind(&record.object_id)
        .bind(&record.original_object_id)
        .bind(record.activity_type.as_str())
        .bind(&record.revision_id)
        .bind(extra)
        .bind(record.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| anyhow!("Failed to insert activity: {}", e))?;

        Ok(())
    }

    async fn list_for_object(&self, object_id: &str) -> Result<Vec<ActivityRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, trigger_user_id, object_id, original_object_id,
                   activity_type, revision_id, extra, created_at
            FROM activities
            WHERE object_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(object_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| anyhow!("Failed to list activities: {}", e))?;

        rows.iter().map(activity_from_row).collect()
    }
}

#[async_trait]
impl RevisionStore for Database {
    async fn pending_count(&self) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM revisions WHERE status = 'pending'")
                .fetch_one(&self.pool)
                .await
                .map_err(|e| anyhow!("Failed to count pending revisions: {}", e))?;

        Ok(count)
    }
}

fn notification_from_row(row: &PgRow) -> Result<NotificationRecord> {
    let kind: String = row.try_get("kind")?;
    let action: String = row.try_get("action")?;

    Ok(NotificationRecord {
        id: row.try_get("id")?,
        receiver_user_id: row.try_get("receiver_user_id")?,
        trigger_user_id: row.try_get("trigger_user_id")?,
        kind: NotificationType::from_string(&kind),
        action: NotificationAction::from_string(&action),
        object_id: row.try_get("object_id")?,
        object_type: row.try_get("object_type")?,
        is_read: row.try_get("is_read")?,
        created_at: row.try_get("created_at")?,
    })
}

fn config_from_row(row: &PgRow, source: NotificationSource) -> Result<UserNotificationConfig> {
    let user_id: String = row.try_get("user_id")?;
    let raw: String = row.try_get("channels")?;
    let channels = parse_channels(&user_id, &raw);

    Ok(UserNotificationConfig {
        user_id,
        source,
        channels,
    })
}

fn user_from_row(row: &PgRow) -> Result<UserInfo> {
    Ok(UserInfo {
        user_id: row.try_get("user_id")?,
        username: row.try_get("username")?,
        display_name: row.try_get("display_name")?,
        email: row.try_get("email")?,
        language: row.try_get("language")?,
    })
}

fn activity_from_row(row: &PgRow) -> Result<ActivityRecord> {
    let activity_type: String = row.try_get("activity_type")?;
    let extra_raw: String = row.try_get("extra")?;

    Ok(ActivityRecord {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        trigger_user_id: row.try_get("trigger_user_id")?,
        object_id: row.try_get("object_id")?,
        original_object_id: row.try_get("original_object_id")?,
        activity_type: ActivityType::from_string(&activity_type),
        revision_id: row.try_get("revision_id")?,
        extra: serde_json::from_str(&extra_raw).unwrap_or_default(),
        created_at: row.try_get("created_at")?,
    })
}
