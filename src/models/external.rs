use serde::{Deserialize, Serialize};

/// Message consumed by the external notification worker.
///
/// `receiver_user_id` is empty for broadcast payloads (`NewQuestion`);
/// the worker resolves the audience itself in that case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalNotificationMsg {
    #[serde(default)]
    pub receiver_user_id: String,
    #[serde(default)]
    pub receiver_email: String,
    #[serde(default)]
    pub receiver_lang: String,
    pub payload: EmailPayload,
}

impl ExternalNotificationMsg {
    pub fn direct(user_id: &str, email: &str, lang: &str, payload: EmailPayload) -> Self {
        Self {
            receiver_user_id: user_id.to_string(),
            receiver_email: email.to_string(),
            receiver_lang: lang.to_string(),
            payload,
        }
    }

    pub fn broadcast(payload: EmailPayload) -> Self {
        Self {
            receiver_user_id: String::new(),
            receiver_email: String::new(),
            receiver_lang: String::new(),
            payload,
        }
    }
}

/// Exactly one email template applies to a message, so the payload is a
/// tagged union rather than a bag of optional fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum EmailPayload {
    NewQuestion(NewQuestionPayload),
    NewComment(NewCommentPayload),
    NewAnswer(NewAnswerPayload),
    NewInviteAnswer(NewInviteAnswerPayload),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewQuestionPayload {
    pub author_user_id: String,
    pub question_id: String,
    pub question_title: String,
    pub tag_ids: Vec<String>,
    pub tag_names: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCommentPayload {
    pub commenter_display_name: String,
    pub question_id: String,
    pub question_title: String,
    #[serde(default)]
    pub answer_id: Option<String>,
    pub comment_id: String,
    pub comment_summary: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAnswerPayload {
    pub answerer_display_name: String,
    pub question_id: String,
    pub question_title: String,
    pub answer_id: String,
    pub answer_summary: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewInviteAnswerPayload {
    pub inviter_display_name: String,
    pub question_id: String,
    pub question_title: String,
}
