use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, warn};

use crate::models::external::{EmailPayload, ExternalNotificationMsg, NewCommentPayload};
use crate::models::notification::{NotificationAction, NotificationMsg, NotificationType};
use crate::models::user::UserInfo;
use crate::stores::UserStore;

/// Everything known about a freshly posted comment that notification
/// routing needs.
#[derive(Debug, Clone)]
pub struct CommentEvent {
    pub comment_id: String,
    pub commenter_user_id: String,
    pub commenter_display_name: String,
    pub question_id: String,
    pub question_title: String,
    /// Set when the comment sits under an answer.
    pub answer_id: Option<String>,
    /// Owner of the commented question or answer.
    pub object_owner_user_id: String,
    pub comment_summary: String,
    pub reply_to_user_id: Option<String>,
    pub mentioned_usernames: Vec<String>,
}

/// Messages a comment should produce, ready to queue.
#[derive(Default)]
pub struct CommentPlan {
    pub notifications: Vec<NotificationMsg>,
    pub emails: Vec<ExternalNotificationMsg>,
}

/// Decides who hears about a comment. Exactly one audience applies,
/// in priority order: the reply target, else the mentioned users,
/// else the owner of the commented object. Nobody is notified about
/// their own comment.
pub struct CommentPlanner {
    users: Arc<dyn UserStore>,
}

impl CommentPlanner {
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self { users }
    }

    pub async fn plan(&self, event: &CommentEvent) -> Result<CommentPlan> {
        let mut plan = CommentPlan::default();

        if let Some(reply_to) = &event.reply_to_user_id {
            if *reply_to != event.commenter_user_id {
                match self.users.by_id(reply_to).await {
                    Ok(Some(user)) => {
                        add_recipient(&mut plan, event, &user, NotificationAction::ReplyToYou);
                    }
                    Ok(None) => {
                        debug!(user_id = %reply_to, "Reply target no longer exists");
                    }
                    Err(e) => {
                        warn!(user_id = %reply_to, error = %e, "Reply target lookup failed");
                    }
                }
                return Ok(plan);
            }
        }

        let mentioned = dedup_names(&event.mentioned_usernames);
        if !mentioned.is_empty() {
            let users = match self.users.by_usernames(&mentioned).await {
                Ok(users) => users,
                Err(e) => {
                    warn!(error = %e, "Mention lookup failed");
                    return Ok(plan);
                }
            };

            for user in &users {
                if user.user_id == event.commenter_user_id {
                    continue;
                }
                add_recipient(&mut plan, event, user, NotificationAction::MentionYou);
            }
            return Ok(plan);
        }

        if event.object_owner_user_id != event.commenter_user_id {
            let action = if event.answer_id.is_some() {
                NotificationAction::CommentAnswer
            } else {
                NotificationAction::CommentQuestion
            };

            match self.users.by_id(&event.object_owner_user_id).await {
                Ok(Some(owner)) => add_recipient(&mut plan, event, &owner, action),
                Ok(None) => {
                    debug!(user_id = %event.object_owner_user_id, "Object owner no longer exists");
                }
                Err(e) => {
                    warn!(user_id = %event.object_owner_user_id, error = %e, "Owner lookup failed");
                }
            }
        }

        Ok(plan)
    }
}

fn add_recipient(
    plan: &mut CommentPlan,
    event: &CommentEvent,
    user: &UserInfo,
    action: NotificationAction,
) {
    plan.notifications.push(NotificationMsg {
        receiver_user_id: user.user_id.clone(),
        trigger_user_id: event.commenter_user_id.clone(),
        kind: NotificationType::Inbox,
        action,
        object_id: event.comment_id.clone(),
        object_type: "comment".to_string(),
    });

    plan.emails.push(ExternalNotificationMsg::direct(
        &user.user_id,
        &user.email,
        &user.language,
        EmailPayload::NewComment(comment_payload(event)),
    ));
}

fn comment_payload(event: &CommentEvent) -> NewCommentPayload {
    NewCommentPayload {
        commenter_display_name: event.commenter_display_name.clone(),
        question_id: event.question_id.clone(),
        question_title: event.question_title.clone(),
        answer_id: event.answer_id.clone(),
        comment_id: event.comment_id.clone(),
        comment_summary: event.comment_summary.clone(),
    }
}

/// First occurrence wins; later duplicates of a mention are dropped.
fn dedup_names(names: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    names
        .iter()
        .filter(|name| seen.insert(name.as_str()))
        .cloned()
        .collect()
}
