use crate::models::{ClientMessage, ServerMessage, SyncError};

/// Encode an outbound message as a single JSON text frame
pub fn encode(msg: &ClientMessage) -> Result<String, SyncError> {
    serde_json::to_string(msg).map_err(SyncError::Encode)
}

/// Decode an inbound text frame. Unknown `type` values decode to
/// [`ServerMessage::Unknown`]; anything else that fails is an error for the
/// caller to drop.
pub fn decode(frame: &str) -> Result<ServerMessage, SyncError> {
    serde_json::from_str(frame).map_err(SyncError::Decode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        Comment, ContentMessage, CommentMessage, RoomMessage, UserActivityMessage,
    };
    use serde_json::{json, Value};

    fn as_value(msg: &ClientMessage) -> Value {
        serde_json::from_str(&encode(msg).expect("encode")).expect("valid json")
    }

    #[test]
    fn text_update_uses_server_field_names() {
        let msg = ClientMessage::TextUpdate(ContentMessage {
            code: "ABC123".to_string(),
            content: "hello".to_string(),
        });
        assert_eq!(
            as_value(&msg),
            json!({"type": "text-update", "code": "ABC123", "content": "hello"})
        );
    }

    #[test]
    fn ping_and_heartbeat_activity_shape() {
        let ping = ClientMessage::Ping(RoomMessage { code: "R1".to_string() });
        assert_eq!(as_value(&ping), json!({"type": "ping", "code": "R1"}));

        let idle = ClientMessage::UserActivity(UserActivityMessage {
            code: "R1".to_string(),
            user_id: "user_1".to_string(),
            is_typing: false,
            current_line: None,
        });
        assert_eq!(
            as_value(&idle),
            json!({"type": "user-activity", "code": "R1", "userId": "user_1", "isTyping": false})
        );
    }

    #[test]
    fn comment_add_carries_line_and_range() {
        let msg = ClientMessage::CommentAdd(CommentMessage {
            code: "R1".to_string(),
            comment: Comment {
                line_number: Some(5),
                line_range: Some("5-7".to_string()),
                content: "nice".to_string(),
                ..Default::default()
            },
        });
        let value = as_value(&msg);
        assert_eq!(value["type"], "comment-add");
        assert_eq!(value["comment"]["id"], "");
        assert_eq!(value["comment"]["lineNumber"], 5);
        assert_eq!(value["comment"]["lineRange"], "5-7");
        assert!(value["comment"]["timestamp"].is_string());
    }

    #[test]
    fn decodes_snapshots_with_null_collections() {
        let frame = r#"{"type":"comments-sync","code":"R1","comments":null}"#;
        match decode(frame).expect("decode") {
            ServerMessage::CommentsSync(sync) => assert!(sync.comments.is_empty()),
            other => panic!("wrong variant: {:?}", other),
        }

        let frame = r#"{"type":"media-sync","code":"R1","mediaFiles":[{"id":"file_1","name":"a.png","type":"image/png","size":42,"url":"/files/R1/a.png","uploadedAt":"2024-05-01T10:00:00Z","uploadedBy":"Red Cat"}]}"#;
        match decode(frame).expect("decode") {
            ServerMessage::MediaSync(sync) => {
                assert_eq!(sync.media_files.len(), 1);
                assert_eq!(sync.media_files[0].mime_type, "image/png");
                assert_eq!(sync.media_files[0].size_bytes, 42);
            }
            other => panic!("wrong variant: {:?}", other),
        }
    }

    #[test]
    fn unknown_types_are_not_errors() {
        let frame = r#"{"type":"cursor-move","code":"R1","x":3}"#;
        assert_eq!(decode(frame).expect("decode"), ServerMessage::Unknown);
    }

    #[test]
    fn malformed_frames_fail_decode() {
        assert!(matches!(decode("{not json"), Err(SyncError::Decode(_))));
        assert!(matches!(decode(r#"{"code":"R1"}"#), Err(SyncError::Decode(_))));
        assert!(matches!(
            decode(r#"{"type":"text-update","code":"R1"}"#),
            Err(SyncError::Decode(_))
        ));
    }
}
