use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use teloxide::types::MessageEntity;

pub type Err = anyhow::Error;
pub type Res<T> = Result<T, Err>;
pub type Void = Res<()>;

// Identities.

/// Identity of a Telegram user (the customer).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub i64);

/// Identity of a Telegram chat (a customer's private chat, or the staff group).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChatId(pub i64);

/// Identity of a forum topic inside the staff group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ThreadId(pub i32);

impl ThreadId {
    /// Sentinel meaning "no topic has been created for this ticket yet".
    pub const NONE: ThreadId = ThreadId(0);

    pub fn is_none(&self) -> bool {
        *self == Self::NONE
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// Tickets.

/// A customer's ticket: the mapping from a user to their topic in the staff group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    pub user_id: UserId,
    pub user_chat_id: ChatId,
    pub thread_id: ThreadId,
    pub last_update: DateTime<Utc>,
}

impl Ticket {
    /// Creates a ticket stamped with the current time.
    ///
    /// The store overwrites `last_update` on every upsert, so the stamp here only
    /// matters for tickets that never reach the store.
    pub fn new(user_id: UserId, user_chat_id: ChatId, thread_id: ThreadId) -> Self {
        Self {
            user_id,
            user_chat_id,
            thread_id,
            last_update: Utc::now(),
        }
    }

    /// Whether the ticket points at a real topic.
    pub fn has_thread(&self) -> bool {
        !self.thread_id.is_none()
    }
}

// Messages.

/// The author of an inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sender {
    pub id: UserId,
    pub is_bot: bool,
    pub username: Option<String>,
}

impl Sender {
    /// Topic title used when opening a ticket for this sender.
    ///
    /// Falls back to a generic label when the username is missing or blank.
    pub fn display_title(&self) -> String {
        match self.username.as_deref() {
            Some(name) if !name.trim().is_empty() => name.to_string(),
            _ => format!("TG User: {}", self.id),
        }
    }
}

/// A transport-agnostic view of an inbound chat message.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InboundMessage {
    pub sender: Option<Sender>,
    pub chat_id: ChatId,
    pub thread_id: Option<ThreadId>,
    pub text: Option<String>,
    /// File ids of the photo sizes, smallest first.
    pub photo: Vec<String>,
    /// File id of an attached document.
    pub document: Option<String>,
    pub caption: Option<String>,
    pub caption_entities: Vec<MessageEntity>,
}

/// Where an outbound message goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Destination {
    pub chat_id: ChatId,
    pub thread_id: Option<ThreadId>,
}

impl Destination {
    pub fn chat(chat_id: ChatId) -> Self {
        Self { chat_id, thread_id: None }
    }

    pub fn thread(chat_id: ChatId, thread_id: ThreadId) -> Self {
        Self {
            chat_id,
            thread_id: Some(thread_id),
        }
    }
}

/// Content to forward, as classified from an inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    Photo {
        file_id: String,
        caption: Option<String>,
        caption_entities: Vec<MessageEntity>,
    },
    Document {
        file_id: String,
        caption: Option<String>,
        caption_entities: Vec<MessageEntity>,
    },
    Text {
        text: String,
    },
}

impl Content {
    /// Classifies a message: photo first, then document, then plain text.
    ///
    /// Photos forward the largest size, which Telegram lists last.
    pub fn classify(message: &InboundMessage) -> Self {
        if let Some(file_id) = message.photo.last() {
            return Content::Photo {
                file_id: file_id.clone(),
                caption: message.caption.clone(),
                caption_entities: message.caption_entities.clone(),
            };
        }

        if let Some(file_id) = &message.document {
            return Content::Document {
                file_id: file_id.clone(),
                caption: message.caption.clone(),
                caption_entities: message.caption_entities.clone(),
            };
        }

        Content::Text {
            text: message.text.clone().unwrap_or_default(),
        }
    }

    /// Short name of the content kind, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Content::Photo { .. } => "photo",
            Content::Document { .. } => "document",
            Content::Text { .. } => "text",
        }
    }
}

// Tests.

#[cfg(test)]
mod tests {
    use teloxide::types::MessageEntityKind;

    use super::*;

    fn sender(username: Option<&str>) -> Sender {
        Sender {
            id: UserId(42),
            is_bot: false,
            username: username.map(str::to_string),
        }
    }

    #[test]
    fn test_display_title_uses_username() {
        assert_eq!(sender(Some("alice")).display_title(), "alice");
    }

    #[test]
    fn test_display_title_falls_back_on_blank_username() {
        assert_eq!(sender(None).display_title(), "TG User: 42");
        assert_eq!(sender(Some("")).display_title(), "TG User: 42");
        assert_eq!(sender(Some("   ")).display_title(), "TG User: 42");
    }

    #[test]
    fn test_thread_sentinel() {
        assert!(ThreadId::NONE.is_none());
        assert!(!ThreadId(7).is_none());
        assert!(!Ticket::new(UserId(1), ChatId(1), ThreadId::NONE).has_thread());
        assert!(Ticket::new(UserId(1), ChatId(1), ThreadId(7)).has_thread());
    }

    #[test]
    fn test_classify_photo_wins_over_document() {
        let entities = vec![MessageEntity::new(MessageEntityKind::Bold, 0, 4)];
        let message = InboundMessage {
            photo: vec!["small".to_string(), "large".to_string()],
            document: Some("doc".to_string()),
            text: Some("ignored".to_string()),
            caption: Some("look".to_string()),
            caption_entities: entities.clone(),
            ..Default::default()
        };

        assert_eq!(
            Content::classify(&message),
            Content::Photo {
                file_id: "large".to_string(),
                caption: Some("look".to_string()),
                caption_entities: entities,
            }
        );
    }

    #[test]
    fn test_classify_document_without_photo() {
        let message = InboundMessage {
            document: Some("doc".to_string()),
            caption: Some("report".to_string()),
            ..Default::default()
        };

        let content = Content::classify(&message);

        assert_eq!(content.kind(), "document");
        assert_eq!(
            content,
            Content::Document {
                file_id: "doc".to_string(),
                caption: Some("report".to_string()),
                caption_entities: vec![],
            }
        );
    }

    #[test]
    fn test_classify_defaults_to_text() {
        let message = InboundMessage {
            text: Some("hello".to_string()),
            ..Default::default()
        };
        assert_eq!(Content::classify(&message), Content::Text { text: "hello".to_string() });

        let empty = InboundMessage::default();
        assert_eq!(Content::classify(&empty), Content::Text { text: String::new() });
    }
}
