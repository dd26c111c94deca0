use std::{ops::Deref, sync::Arc};

use async_trait::async_trait;

use crate::base::types::{Res, ThreadId, Ticket, UserId, Void};

pub mod surreal;

// Traits.

/// Generic ticket store trait that clients must implement.
///
/// This trait defines the durable mapping from customers to their topics in the
/// staff group. Implementing this trait allows different database backends to be
/// used by the router and the sweeper.
#[async_trait]
pub trait GenericDbClient: Send + Sync + 'static {
    /// Gets the ticket for a customer.
    ///
    /// `None` is not an error: it signals a new customer, or one whose ticket expired.
    async fn get_ticket_by_user(&self, user_id: UserId) -> Res<Option<Ticket>>;

    /// Gets the ticket that owns a topic in the staff group.
    ///
    /// `None` means the topic does not belong to any known ticket.
    async fn get_ticket_by_thread(&self, thread_id: ThreadId) -> Res<Option<Ticket>>;

    /// Inserts the ticket, or overwrites the chat and topic of an existing one.
    ///
    /// The store is authoritative for timestamps: `last_update` is always set to
    /// the current time, whatever the caller passed. Returns the stored ticket.
    async fn upsert_ticket(&self, ticket: &Ticket) -> Res<Ticket>;

    /// Lists every ticket, in no particular order.
    async fn list_tickets(&self) -> Res<Vec<Ticket>>;

    /// Deletes the ticket for a customer; deleting a missing ticket is not an error.
    async fn delete_ticket(&self, user_id: UserId) -> Void;
}

// Structs.

/// Ticket store client for the application.
///
/// This is trivially cloneable and can be passed around without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct DbClient {
    inner: Arc<dyn GenericDbClient>,
}

impl Deref for DbClient {
    type Target = dyn GenericDbClient;

    fn deref(&self) -> &Self::Target {
        &*self.inner
    }
}

impl DbClient {
    pub fn new(inner: Arc<dyn GenericDbClient>) -> Self {
        Self { inner }
    }
}
