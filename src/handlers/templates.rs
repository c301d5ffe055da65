use std::collections::HashMap;

use anyhow::{Error, Result, anyhow};
use tracing::warn;

use crate::models::external::EmailPayload;

pub struct RenderedEmail {
    pub subject: String,
    pub body: String,
}

/// Renders the email for a payload in the receiver's language. Every
/// rendered body ends with a personal unsubscribe link built from
/// `unsubscribe_code`.
pub fn render(
    lang: &str,
    payload: &EmailPayload,
    site_url: &str,
    unsubscribe_code: &str,
) -> Result<RenderedEmail, Error> {
    let catalog = catalog_for(lang);
    let unsubscribe_url = format!("{}/users/unsubscribe?code={}", site_url, unsubscribe_code);

    let (subject_tpl, body_tpl, vars) = match payload {
        EmailPayload::NewQuestion(p) => {
            let mut vars = HashMap::new();
            vars.insert("question_title".to_string(), p.question_title.clone());
            vars.insert(
                "question_url".to_string(),
                question_url(site_url, &p.question_id),
            );
            vars.insert("tag_names".to_string(), p.tag_names.join(", "));
            (catalog.new_question_subject, catalog.new_question_body, vars)
        }
        EmailPayload::NewComment(p) => {
            let comment_url = match &p.answer_id {
                Some(answer_id) => answer_url(site_url, &p.question_id, answer_id),
                None => question_url(site_url, &p.question_id),
            };

            let mut vars = HashMap::new();
            vars.insert(
                "commenter_name".to_string(),
                p.commenter_display_name.clone(),
            );
            vars.insert("question_title".to_string(), p.question_title.clone());
            vars.insert("comment_summary".to_string(), p.comment_summary.clone());
            vars.insert("comment_url".to_string(), comment_url);
            (catalog.new_comment_subject, catalog.new_comment_body, vars)
        }
        EmailPayload::NewAnswer(p) => {
            let mut vars = HashMap::new();
            vars.insert(
                "answerer_name".to_string(),
                p.answerer_display_name.clone(),
            );
            vars.insert("question_title".to_string(), p.question_title.clone());
            vars.insert("answer_summary".to_string(), p.answer_summary.clone());
            vars.insert(
                "answer_url".to_string(),
                answer_url(site_url, &p.question_id, &p.answer_id),
            );
            (catalog.new_answer_subject, catalog.new_answer_body, vars)
        }
        EmailPayload::NewInviteAnswer(p) => {
            let mut vars = HashMap::new();
            vars.insert("inviter_name".to_string(), p.inviter_display_name.clone());
            vars.insert("question_title".to_string(), p.question_title.clone());
            vars.insert(
                "question_url".to_string(),
                question_url(site_url, &p.question_id),
            );
            (catalog.new_invite_subject, catalog.new_invite_body, vars)
        }
    };

    let mut vars = vars;
    vars.insert("unsubscribe_url".to_string(), unsubscribe_url);

    Ok(RenderedEmail {
        subject: replace_variables(subject_tpl, &vars)?,
        body: replace_variables(body_tpl, &vars)?,
    })
}

fn question_url(site_url: &str, question_id: &str) -> String {
    format!("{}/questions/{}", site_url, question_id)
}

fn answer_url(site_url: &str, question_id: &str, answer_id: &str) -> String {
    format!("{}/questions/{}/{}", site_url, question_id, answer_id)
}

fn replace_variables(template: &str, variables: &HashMap<String, String>) -> Result<String, Error> {
    let mut result = template.to_string();

    for (key, value) in variables {
        let placeholder = format!("{{{{{}}}}}", key);
        result = result.replace(&placeholder, value);
    }

    // A "{{" counts as a leftover placeholder only when a "}}" closes
    // it; stray braces in user content pass through verbatim.
    if let Some(start) = result.find("{{") {
        if let Some(rel) = result[start..].find("}}") {
            let missing_var = &result[start..start + rel + 2];

            warn!(
                missing_variable = %missing_var,
                "Template contains unreplaced variable"
            );

            return Err(anyhow!("Missing variable in template: {}", missing_var));
        }
    }

    Ok(result)
}

struct Catalog {
    new_question_subject: &'static str,
    new_question_body: &'static str,
    new_comment_subject: &'static str,
    new_comment_body: &'static str,
    new_answer_subject: &'static str,
    new_answer_body: &'static str,
    new_invite_subject: &'static str,
    new_invite_body: &'static str,
}

// Only English ships today; unknown locales fall back to it.
static CATALOGS: &[(&str, &Catalog)] = &[("en", &EN)];

fn catalog_for(lang: &str) -> &'static Catalog {
    let prefix = lang.split(['_', '-']).next().unwrap_or("en");

    CATALOGS
        .iter()
        .find(|(code, _)| *code == prefix)
        .map(|(_, catalog)| *catalog)
        .unwrap_or(&EN)
}

static EN: Catalog = Catalog {
    new_question_subject: "New question: {{question_title}}",
    new_question_body: "\
A new question was posted under tags you subscribe to.

{{question_title}}
{{question_url}}

Tags: {{tag_names}}

--
Unsubscribe: {{unsubscribe_url}}
",
    new_comment_subject: "{{commenter_name}} commented on {{question_title}}",
    new_comment_body: "\
{{commenter_name}} left a comment:

{{comment_summary}}

{{comment_url}}

--
Unsubscribe: {{unsubscribe_url}}
",
    new_answer_subject: "{{answerer_name}} answered {{question_title}}",
    new_answer_body: "\
{{answerer_name}} posted an answer:

{{answer_summary}}

{{answer_url}}

--
Unsubscribe: {{unsubscribe_url}}
",
    new_invite_subject: "{{inviter_name}} invited you to answer {{question_title}}",
    new_invite_body: "\
{{inviter_name}} thinks you can answer this question:

{{question_title}}
{{question_url}}

--
Unsubscribe: {{unsubscribe_url}}
",
};
