//! Telegram chat service integration.
//!
//! This module provides the `GenericChatClient` implementation backed by the
//! Telegram Bot API:
//! - Long polling for message updates, dispatched to the router
//! - Sending text, photos, and documents, optionally into a forum topic
//! - Creating forum topics in the staff group

use std::sync::Arc;

use async_trait::async_trait;
use teloxide::{
    Bot,
    dispatching::{Dispatcher, UpdateFilterExt},
    dptree,
    payloads::setters::*,
    requests::{Requester, ResponseResult},
    respond,
    types::{self as tg, InputFile, Message, Update},
};
use tracing::{info, instrument, warn};

use crate::{
    base::{
        config::Config,
        types::{ChatId, Content, Destination, InboundMessage, Res, Sender, ThreadId, UserId, Void},
    },
    interaction::router::Router,
};

use super::{ChatClient, GenericChatClient};

// Extra methods on `ChatClient` applied by the telegram implementation.

impl ChatClient {
    /// Creates a new Telegram chat client.
    pub async fn telegram(config: &Config) -> Res<Self> {
        let client = TelegramChatClient::new(config).await?;
        Ok(Self { inner: Arc::new(client) })
    }
}

/// Icon colour of new forum topics (light blue, one of the six colours Telegram accepts).
const TOPIC_ICON_COLOR: u32 = 0x6FB9F0;

// Conversions.

fn to_tg_chat(chat_id: ChatId) -> tg::ChatId {
    tg::ChatId(chat_id.0)
}

fn to_tg_thread(thread_id: ThreadId) -> tg::ThreadId {
    tg::ThreadId(tg::MessageId(thread_id.0))
}

/// Converts a Telegram message into the transport-agnostic inbound message.
fn to_inbound(message: &Message) -> Res<InboundMessage> {
    let sender = match &message.from {
        Some(user) => Some(Sender {
            id: UserId(i64::try_from(user.id.0)?),
            is_bot: user.is_bot,
            username: user.username.clone(),
        }),
        None => None,
    };

    Ok(InboundMessage {
        sender,
        chat_id: ChatId(message.chat.id.0),
        thread_id: message.thread_id.map(|thread_id| ThreadId(thread_id.0.0)),
        text: message.text().map(str::to_string),
        photo: message.photo().unwrap_or_default().iter().map(|size| size.file.id.to_string()).collect(),
        document: message.document().map(|document| document.file.id.to_string()),
        caption: message.caption().map(str::to_string),
        caption_entities: message.caption_entities().map(<[_]>::to_vec).unwrap_or_default(),
    })
}

// Structs.

/// Telegram client implementation.
#[derive(Clone)]
struct TelegramChatClient {
    bot: Bot,
}

impl TelegramChatClient {
    /// Create a new Telegram chat client, verifying the token.
    #[instrument(name = "TelegramChatClient::new", skip_all)]
    pub async fn new(config: &Config) -> Res<Self> {
        let bot = Bot::new(&config.token);

        // Verify the token and get the bot's identity.

        let me = bot.get_me().await?;

        info!("Telegram bot user: @{} ({}).", me.username(), me.id.0);

        Ok(Self { bot })
    }
}

#[async_trait]
impl GenericChatClient for TelegramChatClient {
    async fn start(&self, router: Router) -> Void {
        let handler = Update::filter_message().endpoint(handle_message);

        info!("Listening for Telegram updates ...");

        // Dispatch until Ctrl-C.
        Dispatcher::builder(self.bot.clone(), handler)
            .dependencies(dptree::deps![router])
            .default_handler(|_| async {})
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await;

        info!("Telegram listener stopped.");

        Ok(())
    }

    #[instrument(skip(self, text))]
    async fn send_text(&self, destination: Destination, text: &str) -> Void {
        let mut request = self.bot.send_message(to_tg_chat(destination.chat_id), text);

        if let Some(thread_id) = destination.thread_id {
            request = request.message_thread_id(to_tg_thread(thread_id));
        }

        request.await.map_err(|e| anyhow::anyhow!("Failed to send message: {}", e))?;

        Ok(())
    }

    #[instrument(skip(self, content), fields(kind = content.kind()))]
    async fn send_content(&self, destination: Destination, content: &Content) -> Void {
        let chat_id = to_tg_chat(destination.chat_id);

        match content {
            Content::Photo {
                file_id,
                caption,
                caption_entities,
            } => {
                let mut request = self.bot.send_photo(chat_id, InputFile::file_id(file_id.clone()));

                if let Some(thread_id) = destination.thread_id {
                    request = request.message_thread_id(to_tg_thread(thread_id));
                }
                if let Some(caption) = caption {
                    request = request.caption(caption.clone());
                }
                if !caption_entities.is_empty() {
                    request = request.caption_entities(caption_entities.clone());
                }

                request.await.map_err(|e| anyhow::anyhow!("Failed to send photo: {}", e))?;
            }
            Content::Document {
                file_id,
                caption,
                caption_entities,
            } => {
                let mut request = self.bot.send_document(chat_id, InputFile::file_id(file_id.clone()));

                if let Some(thread_id) = destination.thread_id {
                    request = request.message_thread_id(to_tg_thread(thread_id));
                }
                if let Some(caption) = caption {
                    request = request.caption(caption.clone());
                }
                if !caption_entities.is_empty() {
                    request = request.caption_entities(caption_entities.clone());
                }

                request.await.map_err(|e| anyhow::anyhow!("Failed to send document: {}", e))?;
            }
            Content::Text { text } => {
                self.send_text(destination, text).await?;
            }
        }

        Ok(())
    }

    #[instrument(skip(self))]
    async fn create_thread(&self, chat_id: ChatId, title: &str) -> Res<ThreadId> {
        let topic = self
            .bot
            .create_forum_topic(to_tg_chat(chat_id), title, TOPIC_ICON_COLOR, "")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to create forum topic: {}", e))?;

        Ok(ThreadId(topic.thread_id.0.0))
    }
}

// Dispatcher endpoints.

/// Handles a message update from Telegram.
async fn handle_message(message: Message, router: Router) -> ResponseResult<()> {
    match to_inbound(&message) {
        Ok(inbound) => router.handle(inbound).await,
        Err(err) => warn!("Skipping message `{}` that could not be converted: {}", message.id.0, err),
    }

    respond(())
}

// Tests.
