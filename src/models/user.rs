use serde::{Deserialize, Serialize};

/// Subset of the user profile the pipeline needs: identity for dedup
/// and mention resolution, email and language for delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserInfo {
    pub user_id: String,
    pub username: String,
    pub display_name: String,
    pub email: String,
    pub language: String,
}
