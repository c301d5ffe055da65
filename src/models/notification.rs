use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which red dot / inbox bucket a notification belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationType {
    Inbox,
    Achievement,
}

impl NotificationType {
    pub fn from_string(s: &str) -> Self {
        match s {
            "achievement" => NotificationType::Achievement,
            _ => NotificationType::Inbox,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            NotificationType::Inbox => "inbox",
            NotificationType::Achievement => "achievement",
        }
    }
}

/// What happened to the receiver. Stored as a snake_case string; rows
/// written by older or newer releases may carry actions this build does
/// not know, so those decode to `Unknown` and render as plain entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationAction {
    CommentQuestion,
    CommentAnswer,
    ReplyToYou,
    MentionYou,
    AnswerTheQuestion,
    InvitedYouToAnswer,
    AcceptAnswer,
    AdoptAnswer,
    UpVotedYou,
    DownVotedYou,
    UpdateQuestion,
    UpdateAnswer,
    YourQuestionWasDeleted,
    YourAnswerWasDeleted,
    YourCommentWasDeleted,
    YourQuestionIsClosed,
    AchievementEarned,
    #[serde(other)]
    Unknown,
}

impl NotificationAction {
    pub fn from_string(s: &str) -> Self {
        match s {
            "comment_question" => NotificationAction::CommentQuestion,
            "comment_answer" => NotificationAction::CommentAnswer,
            "reply_to_you" => NotificationAction::ReplyToYou,
            "mention_you" => NotificationAction::MentionYou,
            "answer_the_question" => NotificationAction::AnswerTheQuestion,
            "invited_you_to_answer" => NotificationAction::InvitedYouToAnswer,
            "accept_answer" => NotificationAction::AcceptAnswer,
            "adopt_answer" => NotificationAction::AdoptAnswer,
            "up_voted_you" => NotificationAction::UpVotedYou,
            "down_voted_you" => NotificationAction::DownVotedYou,
            "update_question" => NotificationAction::UpdateQuestion,
            "update_answer" => NotificationAction::UpdateAnswer,
            "your_question_was_deleted" => NotificationAction::YourQuestionWasDeleted,
            "your_answer_was_deleted" => NotificationAction::YourAnswerWasDeleted,
            "your_comment_was_deleted" => NotificationAction::YourCommentWasDeleted,
            "your_question_is_closed" => NotificationAction::YourQuestionIsClosed,
            "achievement_earned" => NotificationAction::AchievementEarned,
            _ => NotificationAction::Unknown,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            NotificationAction::CommentQuestion => "comment_question",
            NotificationAction::CommentAnswer => "comment_answer",
            NotificationAction::ReplyToYou => "reply_to_you",
            NotificationAction::MentionYou => "mention_you",
            NotificationAction::AnswerTheQuestion => "answer_the_question",
            NotificationAction::InvitedYouToAnswer => "invited_you_to_answer",
            NotificationAction::AcceptAnswer => "accept_answer",
            NotificationAction::AdoptAnswer => "adopt_answer",
            NotificationAction::UpVotedYou => "up_voted_you",
            NotificationAction::DownVotedYou => "down_voted_you",
            NotificationAction::UpdateQuestion => "update_question",
            NotificationAction::UpdateAnswer => "update_answer",
            NotificationAction::YourQuestionWasDeleted => "your_question_was_deleted",
            NotificationAction::YourAnswerWasDeleted => "your_answer_was_deleted",
            NotificationAction::YourCommentWasDeleted => "your_comment_was_deleted",
            NotificationAction::YourQuestionIsClosed => "your_question_is_closed",
            NotificationAction::AchievementEarned => "achievement_earned",
            NotificationAction::Unknown => "unknown",
        }
    }
}

/// Message consumed by the in-app notification worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationMsg {
    pub receiver_user_id: String,
    pub trigger_user_id: String,
    pub kind: NotificationType,
    pub action: NotificationAction,
    pub object_id: String,
    pub object_type: String,
}

/// Persisted inbox row. `trigger_user_id` is blanked in listings where
/// the actor must stay hidden from the receiver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub id: Uuid,
    pub receiver_user_id: String,
    pub trigger_user_id: Option<String>,
    pub kind: NotificationType,
    pub action: NotificationAction,
    pub object_id: String,
    pub object_type: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl NotificationRecord {
    pub fn from_msg(msg: &NotificationMsg) -> Self {
        Self {
            id: Uuid::new_v4(),
            receiver_user_id: msg.receiver_user_id.clone(),
            trigger_user_id: Some(msg.trigger_user_id.clone()),
            kind: msg.kind,
            action: msg.action,
            object_id: msg.object_id.clone(),
            object_type: msg.object_type.clone(),
            is_read: false,
            created_at: Utc::now(),
        }
    }
}

/// Read-state filter for inbox listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InboxFilter {
    All,
    Unread,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationPage {
    pub total: i64,
    pub list: Vec<NotificationRecord>,
}

/// Unread-state summary shown as badge counters in the site header.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedDot {
    pub inbox: i64,
    pub achievement: i64,
    pub can_review: bool,
    pub revision_count: i64,
}
