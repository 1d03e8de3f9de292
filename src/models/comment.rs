use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A line comment. The server assigns `id`, `author` and `created_at`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Comment {
    pub id: String,
    pub line_number: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_range: Option<String>,
    pub author: String,
    pub author_id: String,
    pub content: String,
    #[serde(rename = "timestamp")]
    pub created_at: DateTime<Utc>,
}

impl Comment {
    /// Payload for a delete request, only the id is meaningful
    pub fn reference(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Lines the editor should select when this comment is activated
    pub fn selection(&self) -> Option<(u32, u32)> {
        let line = self.line_number?;
        let parsed = self.line_range.as_deref().and_then(parse_line_range);
        Some(parsed.unwrap_or((line, line)))
    }
}

/// Parse a `"start-end"` line range
pub fn parse_line_range(range: &str) -> Option<(u32, u32)> {
    let (start, end) = range.split_once('-')?;
    let start = start.trim().parse().ok()?;
    let end = end.trim().parse().ok()?;
    Some((start, end))
}

/// Display order: anchored comments by ascending line, unanchored last.
/// Ties keep their arrival order.
pub fn sorted_for_display(comments: &[Comment]) -> Vec<&Comment> {
    let mut sorted: Vec<&Comment> = comments.iter().collect();
    sorted.sort_by_key(|c| (c.line_number.is_none(), c.line_number));
    sorted
}
