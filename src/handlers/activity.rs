use std::sync::Arc;

use anyhow::Result;
use tracing::debug;

use crate::models::activity::{ActivityMsg, ActivityRecord, ActivityType, TimelineEntry};
use crate::stores::ActivityStore;

/// Records object activity and serves the rendered change timeline.
pub struct ActivityService {
    activities: Arc<dyn ActivityStore>,
}

impl ActivityService {
    pub fn new(activities: Arc<dyn ActivityStore>) -> Self {
        Self { activities }
    }

    /// Worker entry point for the activity channel.
    pub async fn handle(&self, msg: ActivityMsg) -> Result<()> {
        if msg.activity_type == ActivityType::Unknown {
            debug!(object_id = %msg.object_id, "Ignoring unrecognized activity type");
            return Ok(());
        }

        let record = ActivityRecord::from_msg(&msg);
        self.activities.insert(&record).await?;

        debug!(
            activity_id = %record.id,
            activity_type = msg.activity_type.as_str(),
            object_id = %msg.object_id,
            "Activity recorded"
        );

        Ok(())
    }

    pub async fn timeline(
        &self,
        object_id: &str,
        viewer_is_admin: bool,
    ) -> Result<Vec<TimelineEntry>> {
        let records = self.activities.list_for_object(object_id).await?;
        Ok(render_timeline(&records, viewer_is_admin))
    }
}

/// Turns raw activity rows into what a viewer may see. Received votes
/// and follows never render; down-vote actors are hidden from everyone
/// but admins.
pub fn render_timeline(records: &[ActivityRecord], viewer_is_admin: bool) -> Vec<TimelineEntry> {
    records
        .iter()
        .filter_map(|record| {
            let label = record.activity_type.timeline_label()?;

            let actor_id = if record.activity_type == ActivityType::VoteDown && !viewer_is_admin {
                None
            } else {
                Some(record.user_id.clone())
            };

            Some(TimelineEntry {
                activity_id: record.id,
                label: label.to_string(),
                actor_id,
                object_id: record.object_id.clone(),
                revision_id: record.revision_id.clone(),
                created_at: record.created_at,
            })
        })
        .collect()
}
