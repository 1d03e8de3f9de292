use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An uploaded file listed in the room's media manifest
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct MediaAsset {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub mime_type: String,
    #[serde(rename = "size")]
    pub size_bytes: u64,
    pub url: String,
    pub uploaded_at: DateTime<Utc>,
    pub uploaded_by: String,
}
