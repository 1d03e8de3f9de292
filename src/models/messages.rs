use serde::{Deserialize, Deserializer, Serialize};

use crate::models::{Comment, MediaAsset, Participant};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct JoinRoomMessage {
    pub code: String,
    pub user: Participant,
}

/// Full document content, used by both `text-update` and `initial-content`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ContentMessage {
    pub code: String,
    pub content: String,
}

/// Room-scoped message without payload (`ping`, `pong`)
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RoomMessage {
    pub code: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CommentMessage {
    pub code: String,
    pub comment: Comment,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CommentsSyncMessage {
    pub code: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub comments: Vec<Comment>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserMessage {
    pub code: String,
    pub user: Participant,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UsersSyncMessage {
    pub code: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub users: Vec<Participant>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserActivityMessage {
    pub code: String,
    pub user_id: String,
    pub is_typing: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_line: Option<u32>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MediaMessage {
    pub code: String,
    pub media: MediaAsset,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MediaSyncMessage {
    pub code: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub media_files: Vec<MediaAsset>,
}

/// Messages sent by this client
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum ClientMessage {
    #[serde(rename = "join-room")]
    JoinRoom(JoinRoomMessage),
    #[serde(rename = "text-update")]
    TextUpdate(ContentMessage),
    #[serde(rename = "ping")]
    Ping(RoomMessage),
    #[serde(rename = "comment-add")]
    CommentAdd(CommentMessage),
    #[serde(rename = "comment-update")]
    CommentUpdate(CommentMessage),
    #[serde(rename = "comment-delete")]
    CommentDelete(CommentMessage),
    #[serde(rename = "user-activity")]
    UserActivity(UserActivityMessage),
}

/// Messages received from the room server
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum ServerMessage {
    #[serde(rename = "initial-content")]
    InitialContent(ContentMessage),
    #[serde(rename = "text-update")]
    TextUpdate(ContentMessage),
    #[serde(rename = "pong")]
    Pong(RoomMessage),
    #[serde(rename = "comment-add")]
    CommentAdd(CommentMessage),
    #[serde(rename = "comment-update")]
    CommentUpdate(CommentMessage),
    #[serde(rename = "comment-delete")]
    CommentDelete(CommentMessage),
    #[serde(rename = "comments-sync")]
    CommentsSync(CommentsSyncMessage),
    #[serde(rename = "user-joined")]
    UserJoined(UserMessage),
    #[serde(rename = "user-left")]
    UserLeft(UserMessage),
    #[serde(rename = "users-sync")]
    UsersSync(UsersSyncMessage),
    #[serde(rename = "user-activity")]
    UserActivity(UserActivityMessage),
    #[serde(rename = "media-upload")]
    MediaUpload(MediaMessage),
    #[serde(rename = "media-delete")]
    MediaDelete(MediaMessage),
    #[serde(rename = "media-sync")]
    MediaSync(MediaSyncMessage),
    #[serde(other)]
    Unknown,
}

// The server encodes empty collections as `null`
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}
