use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::debug;

use crate::identity::Identity;
use crate::models::{Comment, MediaAsset, Participant, ServerMessage};
use crate::reconcile::content::{self, Document};
use crate::reconcile::store::Store;
use crate::reconcile::{comments, media, presence};
use crate::services::room_session::LinkStatus;

/// Applies inbound broadcasts to the four per-room stores.
///
/// Each stream is reduced independently; a message only ever touches the store
/// it belongs to.
#[derive(Debug, Default)]
pub struct ReconciliationEngine {
    document: Store<Document>,
    comments: Store<Vec<Comment>>,
    participants: Store<Vec<Participant>>,
    media: Store<Vec<MediaAsset>>,
}

impl ReconciliationEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether any store changed
    pub fn apply(&self, msg: ServerMessage, now: DateTime<Utc>) -> bool {
        match msg {
            ServerMessage::InitialContent(m) | ServerMessage::TextUpdate(m) => {
                self.document.update(|doc| content::replace(doc, &m.content))
            }

            ServerMessage::CommentsSync(m) => self.comments.update(|c| comments::sync(c, m.comments)),
            ServerMessage::CommentAdd(m) => self.comments.update(|c| comments::add(c, m.comment)),
            ServerMessage::CommentUpdate(m) => self.comments.update(|c| comments::update(c, &m.comment)),
            ServerMessage::CommentDelete(m) => self.comments.update(|c| comments::delete(c, &m.comment.id)),

            ServerMessage::UsersSync(m) => self.participants.update(|p| presence::sync(p, m.users)),
            ServerMessage::UserJoined(m) => self.participants.update(|p| presence::join(p, m.user)),
            ServerMessage::UserLeft(m) => self.participants.update(|p| presence::leave(p, &m.user.id)),
            ServerMessage::UserActivity(m) => self
                .participants
                .update(|p| presence::activity(p, &m.user_id, m.is_typing, m.current_line, now)),

            ServerMessage::MediaSync(m) => self.media.update(|f| media::sync(f, m.media_files)),
            ServerMessage::MediaUpload(m) => self.media.update(|f| media::upload(f, m.media)),
            ServerMessage::MediaDelete(m) => self.media.update(|f| media::delete(f, &m.media.id)),

            ServerMessage::Pong(_) => false,
            ServerMessage::Unknown => {
                debug!("Ignoring message of unknown type");
                false
            }
        }
    }

    /// Record the local editor buffer so its echo is recognised
    pub fn apply_local_edit(&self, content: &str) -> bool {
        self.document.update(|doc| content::replace(doc, content))
    }

    pub fn document(&self) -> watch::Ref<'_, Document> {
        self.document.get()
    }

    pub fn comments(&self) -> watch::Ref<'_, Vec<Comment>> {
        self.comments.get()
    }

    pub fn participants(&self) -> watch::Ref<'_, Vec<Participant>> {
        self.participants.get()
    }

    pub fn media(&self) -> watch::Ref<'_, Vec<MediaAsset>> {
        self.media.get()
    }

    pub fn view(
        &self,
        link: watch::Receiver<LinkStatus>,
        identity: watch::Receiver<Option<Identity>>,
    ) -> RoomView {
        RoomView {
            document: self.document.subscribe(),
            comments: self.comments.subscribe(),
            participants: self.participants.subscribe(),
            media: self.media.subscribe(),
            link,
            identity,
        }
    }
}

/// Read side of a room for presentation code
#[derive(Debug, Clone)]
pub struct RoomView {
    pub document: watch::Receiver<Document>,
    pub comments: watch::Receiver<Vec<Comment>>,
    pub participants: watch::Receiver<Vec<Participant>>,
    pub media: watch::Receiver<Vec<MediaAsset>>,
    pub link: watch::Receiver<LinkStatus>,
    pub identity: watch::Receiver<Option<Identity>>,
}
