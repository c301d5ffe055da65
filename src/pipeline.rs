use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use crate::clients::mailer::EmailSender;
use crate::config::Config;
use crate::handlers::activity::ActivityService;
use crate::handlers::comment::{CommentEvent, CommentPlanner};
use crate::handlers::external::ExternalDispatcher;
use crate::handlers::inbox::InboxService;
use crate::handlers::subscriber::{RateLimiter, SubscriberResolver};
use crate::models::activity::ActivityMsg;
use crate::models::external::ExternalNotificationMsg;
use crate::models::notification::NotificationMsg;
use crate::queue::EventQueue;
use crate::stores::{
    ActivityStore, Cache, FollowStore, NotificationStore, PreferenceStore, RevisionStore,
    UserStore,
};

/// Everything the pipeline talks to. Wired from Postgres, Redis and
/// the mail gateway in production; tests swap in memory fakes.
pub struct Collaborators {
    pub cache: Arc<dyn Cache>,
    pub mailer: Arc<dyn EmailSender>,
    pub notifications: Arc<dyn NotificationStore>,
    pub preferences: Arc<dyn PreferenceStore>,
    pub follows: Arc<dyn FollowStore>,
    pub users: Arc<dyn UserStore>,
    pub activities: Arc<dyn ActivityStore>,
    pub revisions: Arc<dyn RevisionStore>,
}

/// The three event channels plus the services behind them. Queues and
/// handlers come up together, so nothing can be sent before its
/// consumer exists.
pub struct Pipeline {
    activity_queue: EventQueue<ActivityMsg>,
    notification_queue: EventQueue<NotificationMsg>,
    external_queue: EventQueue<ExternalNotificationMsg>,
    activity: Arc<ActivityService>,
    inbox: Arc<InboxService>,
    comments: CommentPlanner,
}

impl Pipeline {
    pub fn new(config: &Config, deps: Collaborators) -> Self {
        let activity = Arc::new(ActivityService::new(deps.activities.clone()));
        let inbox = Arc::new(InboxService::new(
            deps.notifications.clone(),
            deps.revisions.clone(),
            deps.cache.clone(),
        ));

        let limiter = RateLimiter::new(
            deps.cache.clone(),
            config.rate_limit_max,
            config.rate_limit_window(),
        );
        let resolver = SubscriberResolver::new(
            deps.follows.clone(),
            deps.preferences.clone(),
            deps.users.clone(),
            limiter,
        );
        let dispatcher = Arc::new(ExternalDispatcher::new(
            deps.mailer.clone(),
            deps.preferences.clone(),
            deps.cache.clone(),
            resolver,
            config.site_url.clone(),
            config.unsubscribe_code_ttl(),
        ));

        let activity_queue = EventQueue::new("activity", config.activity_queue_capacity, {
            let service = activity.clone();
            move |msg| {
                let service = service.clone();
                async move { service.handle(msg).await }
            }
        });

        let notification_queue =
            EventQueue::new("notification", config.notification_queue_capacity, {
                let service = inbox.clone();
                move |msg| {
                    let service = service.clone();
                    async move { service.handle(msg).await }
                }
            });

        let external_queue = EventQueue::new("external", config.external_queue_capacity, {
            let service = dispatcher.clone();
            move |msg| {
                let service = service.clone();
                async move { service.handle(msg).await }
            }
        });

        info!(
            activity_capacity = config.activity_queue_capacity,
            notification_capacity = config.notification_queue_capacity,
            external_capacity = config.external_queue_capacity,
            "Notification pipeline started"
        );

        Self {
            activity_queue,
            notification_queue,
            external_queue,
            activity,
            inbox,
            comments: CommentPlanner::new(deps.users),
        }
    }

    /// Routes a fresh comment: picks its audience, then queues the
    /// resulting in-app and email messages.
    pub async fn notify_comment(&self, event: &CommentEvent) -> Result<()> {
        let plan = self.comments.plan(event).await?;

        for msg in plan.notifications {
            self.notification_queue.send(msg).await;
        }
        for msg in plan.emails {
            self.external_queue.send(msg).await;
        }

        Ok(())
    }

    pub fn activity_queue(&self) -> &EventQueue<ActivityMsg> {
        &self.activity_queue
    }

    pub fn notification_queue(&self) -> &EventQueue<NotificationMsg> {
        &self.notification_queue
    }

    pub fn external_queue(&self) -> &EventQueue<ExternalNotificationMsg> {
        &self.external_queue
    }

    /// Read-side operations on stored notifications and red dots.
    pub fn inbox(&self) -> &InboxService {
        &self.inbox
    }

    /// Read-side operations on object timelines.
    pub fn activity(&self) -> &ActivityService {
        &self.activity
    }

    /// Closes all three channels and waits until their workers have
    /// drained everything already queued.
    pub async fn shutdown(self) {
        self.activity_queue.shutdown().await;
        self.notification_queue.shutdown().await;
        self.external_queue.shutdown().await;
        info!("Notification pipeline stopped");
    }
}
