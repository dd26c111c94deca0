//! Routing of inbound messages between customers and the staff group.

use tracing::{Instrument, debug, error, info, instrument, trace, warn};

use crate::{
    base::{
        config::Config,
        types::{Content, Destination, InboundMessage, Res, Sender, ThreadId, Ticket},
    },
    service::{chat::ChatClient, db::DbClient},
};

/// The literal command that asks for usage instructions.
pub const START_COMMAND: &str = "/start";

/// Why a message was not routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// The message has no sender.
    NoSender,
    /// The sender is a bot account.
    FromBot,
    /// A staff message outside any topic.
    NoThread,
    /// A staff message in a topic that belongs to no ticket.
    UnknownThread,
}

/// What the router did with a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    /// Nothing was sent and nothing was stored.
    Dropped(DropReason),
    /// The start instructions were sent back.
    StartCommand,
    /// A staff reply was forwarded to the customer.
    ForwardedToCustomer,
    /// A customer message was forwarded into their topic.
    ForwardedToStaff { first_contact: bool },
}

/// Routes each inbound message to the customer or to the staff group.
///
/// This is trivially cloneable and can be passed around without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct Router {
    config: Config,
    db: DbClient,
    chat: ChatClient,
}

impl Router {
    pub fn new(config: Config, db: DbClient, chat: ChatClient) -> Self {
        Self { config, db, chat }
    }

    /// Handles one inbound message, logging the outcome.
    ///
    /// Failures are not reported to the customer or staff; the message is dropped.
    #[instrument(skip_all)]
    pub async fn handle(&self, message: InboundMessage) {
        let result = self.route(message).in_current_span().await;

        match result {
            Ok(RouteOutcome::Dropped(reason)) => debug!("Message dropped: {:?}.", reason),
            Ok(outcome) => trace!("Message routed: {:?}.", outcome),
            Err(err) => error!("Error while routing message: {:#}", err),
        }
    }

    /// Routes one inbound message.
    ///
    /// Unroutable messages are `Ok(RouteOutcome::Dropped(..))`; store and
    /// transport failures are `Err`.
    #[instrument(skip_all, fields(chat_id = %message.chat_id))]
    pub async fn route(&self, message: InboundMessage) -> Res<RouteOutcome> {
        let Some(sender) = message.sender.clone() else {
            return Ok(RouteOutcome::Dropped(DropReason::NoSender));
        };

        if sender.is_bot {
            return Ok(RouteOutcome::Dropped(DropReason::FromBot));
        }

        if message.text.as_deref() == Some(START_COMMAND) {
            self.chat.send_text(Destination::chat(message.chat_id), &self.config.start_message).await?;

            return Ok(RouteOutcome::StartCommand);
        }

        if message.chat_id == self.config.staff_chat_id() {
            self.route_from_staff(&message).await
        } else {
            self.route_from_customer(&sender, &message).await
        }
    }

    /// Forwards a staff message from a ticket's topic to the customer.
    async fn route_from_staff(&self, message: &InboundMessage) -> Res<RouteOutcome> {
        let Some(thread_id) = message.thread_id else {
            return Ok(RouteOutcome::Dropped(DropReason::NoThread));
        };

        let Some(ticket) = self.db.get_ticket_by_thread(thread_id).await? else {
            return Ok(RouteOutcome::Dropped(DropReason::UnknownThread));
        };

        let content = Content::classify(message);
        self.chat.send_content(Destination::chat(ticket.user_chat_id), &content).await?;

        self.db.upsert_ticket(&ticket).await?;

        info!("Forwarded {} from thread `{}` to user `{}`.", content.kind(), thread_id, ticket.user_id);

        Ok(RouteOutcome::ForwardedToCustomer)
    }

    /// Forwards a customer message into their topic, opening a ticket on first contact.
    async fn route_from_customer(&self, sender: &Sender, message: &InboundMessage) -> Res<RouteOutcome> {
        let existing = self.db.get_ticket_by_user(sender.id).await?.filter(Ticket::has_thread);

        let (ticket, first_contact) = match existing {
            Some(ticket) => (ticket, false),
            None => (self.open_ticket(sender, message).await?, true),
        };

        let content = Content::classify(message);
        let destination = Destination::thread(self.config.staff_chat_id(), ticket.thread_id);
        let forwarded = self.chat.send_content(destination, &content).await;

        // The ticket is already stored, so the greeting goes out even if the forward failed.
        if first_contact && let Err(err) = self.chat.send_text(Destination::chat(message.chat_id), &self.config.first_message).await {
            warn!("Failed to greet user `{}`: {:#}", sender.id, err);
        }

        forwarded?;

        // Opening the ticket just stamped it.
        if !first_contact {
            self.db.upsert_ticket(&ticket).await?;
        }

        info!("Forwarded {} from user `{}` to thread `{}`.", content.kind(), sender.id, ticket.thread_id);

        Ok(RouteOutcome::ForwardedToStaff { first_contact })
    }

    /// Creates a topic for the sender in the staff group and stores the new ticket.
    async fn open_ticket(&self, sender: &Sender, message: &InboundMessage) -> Res<Ticket> {
        let title = sender.display_title();

        let thread_id = self
            .chat
            .create_thread(self.config.staff_chat_id(), &title)
            .await
            .map_err(|e| e.context(format!("Could not open a thread for user `{}`", sender.id)))?;

        if thread_id == ThreadId::NONE {
            return Err(anyhow::anyhow!("Thread created for user `{}` has no identity.", sender.id));
        }

        info!("Opened thread `{}` ({}) for user `{}`.", thread_id, title, sender.id);

        let ticket = Ticket::new(sender.id, message.chat_id, thread_id);

        self.db.upsert_ticket(&ticket).await
    }
}
