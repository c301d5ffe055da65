use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Actions that can appear on an object's change timeline.
///
/// The wire representation is the snake_case string; producers we don't
/// control may emit new actions, so unknown strings decode to `Unknown`
/// and consumers treat them as no-ops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    Asked,
    Answered,
    Commented,
    Edited,
    Deleted,
    Undeleted,
    Accepted,
    VoteUp,
    VoteDown,
    CancelVote,
    VotedUp,
    VotedDown,
    Follow,
    #[serde(other)]
    Unknown,
}

impl ActivityType {
    pub fn from_string(s: &str) -> Self {
        match s {
            "asked" => ActivityType::Asked,
            "answered" => ActivityType::Answered,
            "commented" => ActivityType::Commented,
            "edited" => ActivityType::Edited,
            "deleted" => ActivityType::Deleted,
            "undeleted" => ActivityType::Undeleted,
            "accepted" => ActivityType::Accepted,
            "vote_up" => ActivityType::VoteUp,
            "vote_down" => ActivityType::VoteDown,
            "cancel_vote" => ActivityType::CancelVote,
            "voted_up" => ActivityType::VotedUp,
            "voted_down" => ActivityType::VotedDown,
            "follow" => ActivityType::Follow,
            _ => ActivityType::Unknown,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ActivityType::Asked => "asked",
            ActivityType::Answered => "answered",
            ActivityType::Commented => "commented",
            ActivityType::Edited => "edited",
            ActivityType::Deleted => "deleted",
            ActivityType::Undeleted => "undeleted",
            ActivityType::Accepted => "accepted",
            ActivityType::VoteUp => "vote_up",
            ActivityType::VoteDown => "vote_down",
            ActivityType::CancelVote => "cancel_vote",
            ActivityType::VotedUp => "voted_up",
            ActivityType::VotedDown => "voted_down",
            ActivityType::Follow => "follow",
            ActivityType::Unknown => "unknown",
        }
    }

    /// Display label for public timelines, or `None` when the row is
    /// bookkeeping that must never be shown (received votes, follows,
    /// actions we don't recognize).
    pub fn timeline_label(&self) -> Option<&'static str> {
        match self {
            ActivityType::VotedUp
            | ActivityType::VotedDown
            | ActivityType::Follow
            | ActivityType::Unknown => None,
            ActivityType::VoteUp => Some("upvote"),
            ActivityType::VoteDown => Some("downvote"),
            ActivityType::Accepted => Some("accept"),
            ActivityType::Asked => Some("asked"),
            ActivityType::Answered => Some("answered"),
            ActivityType::Commented => Some("commented"),
            ActivityType::Edited => Some("edited"),
            ActivityType::Deleted => Some("deleted"),
            ActivityType::Undeleted => Some("undeleted"),
            ActivityType::CancelVote => Some("cancel_vote"),
        }
    }
}

/// Message consumed by the activity channel worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityMsg {
    pub user_id: String,
    #[serde(default)]
    pub trigger_user_id: Option<String>,
    pub object_id: String,
    pub original_object_id: String,
    pub activity_type: ActivityType,
    #[serde(default)]
    pub revision_id: Option<String>,
    /// Free-form producer metadata, carried through to the stored row.
    #[serde(default)]
    pub extra: HashMap<String, String>,
}

/// Persisted timeline row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub id: Uuid,
    pub user_id: String,
    pub trigger_user_id: Option<String>,
    pub object_id: String,
    pub original_object_id: String,
    pub activity_type: ActivityType,
    pub revision_id: Option<String>,
    pub extra: HashMap<String, String>,
    pub created_at: DateTime<Utc>,
}

impl ActivityRecord {
    pub fn from_msg(msg: &ActivityMsg) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: msg.user_id.clone(),
            trigger_user_id: msg.trigger_user_id.clone(),
            object_id: msg.object_id.clone(),
            original_object_id: msg.original_object_id.clone(),
            activity_type: msg.activity_type,
            revision_id: msg.revision_id.clone(),
            extra: msg.extra.clone(),
            created_at: Utc::now(),
        }
    }
}

/// One rendered timeline entry, already filtered and anonymized for the
/// requesting viewer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub activity_id: Uuid,
    pub label: String,
    /// `None` when the actor is hidden from this viewer.
    pub actor_id: Option<String>,
    pub object_id: String,
    pub revision_id: Option<String>,
    pub created_at: DateTime<Utc>,
}
