pub mod telegram;

use std::{ops::Deref, sync::Arc};

use async_trait::async_trait;

use crate::{
    base::types::{ChatId, Content, Destination, Res, ThreadId, Void},
    interaction::router::Router,
};

// Traits.

/// Generic "chat" trait that clients must implement.
///
/// This trait defines the transport the relay consumes: receiving messages,
/// sending text and media, and opening topics in the staff group. Implementing
/// this trait allows different chat services to be used with the relay.
#[async_trait]
pub trait GenericChatClient: Send + Sync + 'static {
    /// Start the chat client listener.
    ///
    /// Every inbound message is handed to `router`. Returns once the listener
    /// has been interrupted.
    async fn start(&self, router: Router) -> Void;

    /// Send a plain text message.
    async fn send_text(&self, destination: Destination, text: &str) -> Void;

    /// Send forwarded content (text, photo, or document).
    async fn send_content(&self, destination: Destination, content: &Content) -> Void;

    /// Create a topic in a forum chat, returning its identity.
    async fn create_thread(&self, chat_id: ChatId, title: &str) -> Res<ThreadId>;
}

// Structs.

/// Chat client for the application.
///
/// It is designed to be trivially cloneable, allowing it to be passed around
/// without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct ChatClient {
    inner: Arc<dyn GenericChatClient>,
}

impl Deref for ChatClient {
    type Target = dyn GenericChatClient;

    fn deref(&self) -> &Self::Target {
        &*self.inner
    }
}

impl ChatClient {
    pub fn new(inner: Arc<dyn GenericChatClient>) -> Self {
        Self { inner }
    }
}
