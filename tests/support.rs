use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use uuid::Uuid;

use notify_service::clients::mailer::EmailSender;
use notify_service::config::Config;
use notify_service::models::activity::ActivityRecord;
use notify_service::models::notification::{
    InboxFilter, NotificationPage, NotificationRecord, NotificationType,
};
use notify_service::models::preference::{ChannelConfig, NotificationSource, UserNotificationConfig};
use notify_service::models::user::UserInfo;
use notify_service::pipeline::Collaborators;
use notify_service::stores::{
    ActivityStore, Cache, FollowStore, NotificationStore, PreferenceStore, RevisionStore,
    UserStore,
};

pub fn test_config() -> Config {
    Config {
        database_url: "postgres://unused".to_string(),
        redis_url: "redis://unused".to_string(),
        mailer_url: "http://unused".to_string(),
        site_url: "https://qa.example.com".to_string(),
        server_port: 0,
        activity_queue_capacity: 16,
        notification_queue_capacity: 16,
        external_queue_capacity: 16,
        rate_limit_max: 50,
        rate_limit_window_seconds: 604_800,
        unsubscribe_code_ttl_seconds: 86_400,
        max_retry_attempts: 3,
        initial_retry_delay_ms: 10,
        max_retry_delay_ms: 50,
        retry_backoff_multiplier: 2,
        log_json: false,
    }
}

pub fn test_user(user_id: &str, username: &str) -> UserInfo {
    UserInfo {
        user_id: user_id.to_string(),
        username: username.to_string(),
        display_name: username.to_string(),
        email: format!("{}@example.com", username),
        language: "en_US".to_string(),
    }
}

/// In-memory [`Cache`] mirroring the Redis semantics the pipeline
/// relies on: counters created at 1, per-key expiries, string values.
#[derive(Default)]
pub struct MemoryCache {
    values: Mutex<HashMap<String, String>>,
    ttls: Mutex<HashMap<String, Duration>>,
}

impl MemoryCache {
    pub fn seed_counter(&self, key: &str, value: i64) {
        self.values
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
    }

    pub fn string_value(&self, key: &str) -> Option<String> {
        self.values.lock().unwrap().get(key).cloned()
    }

    pub fn ttl_of(&self, key: &str) -> Option<Duration> {
        self.ttls.lock().unwrap().get(key).copied()
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get_i64(&self, key: &str) -> Result<i64> {
        Ok(self
            .values
            .lock()
            .unwrap()
            .get(key)
            .and_then(|v| v.parse().ok())
            .unwrap_or(0))
    }

    async fn incr(&self, key: &str) -> Result<i64> {
        let mut values = self.values.lock().unwrap();
        let next = values
            .get(key)
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(0)
            + 1;
        values.insert(key.to_string(), next.to_string());
        Ok(next)
    }

    async fn del(&self, key: &str) -> Result<()> {
        self.values.lock().unwrap().remove(key);
        self.ttls.lock().unwrap().remove(key);
        Ok(())
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<()> {
        self.ttls.lock().unwrap().insert(key.to_string(), ttl);
        Ok(())
    }

    async fn set_string(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        self.values
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        self.ttls.lock().unwrap().insert(key.to_string(), ttl);
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryNotificationStore {
    rows: Mutex<Vec<NotificationRecord>>,
}

impl MemoryNotificationStore {
    pub fn all(&self) -> Vec<NotificationRecord> {
        self.rows.lock().unwrap().clone()
    }

    pub fn push(&self, record: NotificationRecord) {
        self.rows.lock().unwrap().push(record);
    }
}

#[async_trait]
impl NotificationStore for MemoryNotificationStore {
    async fn insert(&self, record: &NotificationRecord) -> Result<()> {
        self.rows.lock().unwrap().push(record.clone());
        Ok(())
    }

    async fn mark_all_read(&self, user_id: &str, kind: NotificationType) -> Result<u64> {
        let mut rows = self.rows.lock().unwrap();
        let mut changed = 0;
        for row in rows.iter_mut() {
            if row.receiver_user_id == user_id && row.kind == kind && !row.is_read {
                row.is_read = true;
                changed += 1;
            }
        }
        Ok(changed)
    }

    async fn mark_read(&self, user_id: &str, notification_id: Uuid) -> Result<bool> {
        let mut rows = self.rows.lock().unwrap();
        for row in rows.iter_mut() {
            if row.id == notification_id && row.receiver_user_id == user_id && !row.is_read {
                row.is_read = true;
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn page(
        &self,
        user_id: &str,
        kind: NotificationType,
        filter: InboxFilter,
        page: i64,
        page_size: i64,
    ) -> Result<NotificationPage> {
        let rows = self.rows.lock().unwrap();
        let mut matching: Vec<NotificationRecord> = rows
            .iter()
            .filter(|r| {
                r.receiver_user_id == user_id
                    && r.kind == kind
                    && (filter == InboxFilter::All || !r.is_read)
            })
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = matching.len() as i64;
        let start = ((page - 1) * page_size).max(0) as usize;
        let list = matching
            .into_iter()
            .skip(start)
            .take(page_size as usize)
            .collect();

        Ok(NotificationPage { total, list })
    }
}

#[derive(Default)]
pub struct MemoryPreferenceStore {
    rows: Mutex<Vec<UserNotificationConfig>>,
}

impl MemoryPreferenceStore {
    pub fn add(&self, user_id: &str, source: NotificationSource, channels: Vec<ChannelConfig>) {
        self.rows.lock().unwrap().push(UserNotificationConfig {
            user_id: user_id.to_string(),
            source,
            channels,
        });
    }
}

#[async_trait]
impl PreferenceStore for MemoryPreferenceStore {
    async fn get_by_user_and_source(
        &self,
        user_id: &str,
        source: NotificationSource,
    ) -> Result<Option<UserNotificationConfig>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.user_id == user_id && r.source == source)
            .cloned())
    }

    async fn get_by_users_and_source(
        &self,
        user_ids: &[String],
        source: NotificationSource,
    ) -> Result<Vec<UserNotificationConfig>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.source == source && user_ids.contains(&r.user_id))
            .cloned()
            .collect())
    }

    async fn get_by_source(
        &self,
        source: NotificationSource,
    ) -> Result<Vec<UserNotificationConfig>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.source == source)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct MemoryFollowStore {
    follows: Mutex<HashMap<String, Vec<String>>>,
}

impl MemoryFollowStore {
    pub fn follow(&self, tag_id: &str, user_id: &str) {
        self.follows
            .lock()
            .unwrap()
            .entry(tag_id.to_string())
            .or_default()
            .push(user_id.to_string());
    }
}

#[async_trait]
impl FollowStore for MemoryFollowStore {
    async fn follower_ids(&self, tag_id: &str) -> Result<Vec<String>> {
        Ok(self
            .follows
            .lock()
            .unwrap()
            .get(tag_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[derive(Default)]
pub struct MemoryUserStore {
    users: Mutex<Vec<UserInfo>>,
}

impl MemoryUserStore {
    pub fn add(&self, user: UserInfo) {
        self.users.lock().unwrap().push(user);
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn by_id(&self, user_id: &str) -> Result<Option<UserInfo>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.user_id == user_id)
            .cloned())
    }

    async fn by_usernames(&self, usernames: &[String]) -> Result<Vec<UserInfo>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .filter(|u| usernames.contains(&u.username))
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct MemoryActivityStore {
    rows: Mutex<Vec<ActivityRecord>>,
}

impl MemoryActivityStore {
    pub fn all(&self) -> Vec<ActivityRecord> {
        self.rows.lock().unwrap().clone()
    }
}

#[async_trait]
impl ActivityStore for MemoryActivityStore {
    async fn insert(&self, record: &ActivityRecord) -> Result<()> {
        self.rows.lock().unwrap().push(record.clone());
        Ok(())
    }

    async fn list_for_object(&self, object_id: &str) -> Result<Vec<ActivityRecord>> {
        let mut records: Vec<ActivityRecord> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.object_id == object_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(records)
    }
}

pub struct StaticRevisionStore {
    pending: i64,
}

impl StaticRevisionStore {
    pub fn new(pending: i64) -> Self {
        Self { pending }
    }
}

#[async_trait]
impl RevisionStore for StaticRevisionStore {
    async fn pending_count(&self) -> Result<i64> {
        Ok(self.pending)
    }
}

#[derive(Clone, Debug)]
pub struct SentEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// [`EmailSender`] that records instead of sending. Can be told to
/// fail its first N calls to exercise failure isolation.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<SentEmail>>,
    fail_remaining: AtomicU32,
}

impl RecordingMailer {
    pub fn failing_first(n: u32) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail_remaining: AtomicU32::new(n),
        }
    }

    pub fn sent(&self) -> Vec<SentEmail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl EmailSender for RecordingMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        let remaining = self.fail_remaining.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_remaining.store(remaining - 1, Ordering::SeqCst);
            return Err(anyhow!("simulated mailer outage"));
        }

        self.sent.lock().unwrap().push(SentEmail {
            to: to.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }
}

/// The full set of fakes, ready to hand to a [`Pipeline`].
///
/// [`Pipeline`]: notify_service::pipeline::Pipeline
pub struct Fakes {
    pub cache: Arc<MemoryCache>,
    pub mailer: Arc<RecordingMailer>,
    pub notifications: Arc<MemoryNotificationStore>,
    pub preferences: Arc<MemoryPreferenceStore>,
    pub follows: Arc<MemoryFollowStore>,
    pub users: Arc<MemoryUserStore>,
    pub activities: Arc<MemoryActivityStore>,
    pub revisions: Arc<StaticRevisionStore>,
}

impl Fakes {
    pub fn new() -> Self {
        Self {
            cache: Arc::new(MemoryCache::default()),
            mailer: Arc::new(RecordingMailer::default()),
            notifications: Arc::new(MemoryNotificationStore::default()),
            preferences: Arc::new(MemoryPreferenceStore::default()),
            follows: Arc::new(MemoryFollowStore::default()),
            users: Arc::new(MemoryUserStore::default()),
            activities: Arc::new(MemoryActivityStore::default()),
            revisions: Arc::new(StaticRevisionStore::new(0)),
        }
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            cache: self.cache.clone(),
            mailer: self.mailer.clone(),
            notifications: self.notifications.clone(),
            preferences: self.preferences.clone(),
            follows: self.follows.clone(),
            users: self.users.clone(),
            activities: self.activities.clone(),
            revisions: self.revisions.clone(),
        }
    }
}
