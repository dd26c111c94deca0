//! SurrealDB implementation of the ticket store.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use surrealdb::{
    Surreal,
    engine::local::{Db, Mem, SurrealKv},
    sql::Datetime,
};
use tracing::{debug, info, instrument};

use crate::base::types::{ChatId, Res, ThreadId, Ticket, UserId, Void};

use super::{DbClient, GenericDbClient};

const TICKET_TABLE: &str = "ticket";

// Extra methods on `DbClient` applied by the surreal implementation.

impl DbClient {
    /// Opens the persistent ticket store at `path`.
    pub async fn surreal_file(path: &str) -> Res<Self> {
        let client = SurrealDbClient::file(path).await?;
        Ok(Self { inner: Arc::new(client) })
    }

    /// Creates an in-memory ticket store.
    pub async fn surreal_memory() -> Res<Self> {
        let client = SurrealDbClient::memory().await?;
        Ok(Self { inner: Arc::new(client) })
    }
}

// Records.

/// A ticket row as stored in the database, keyed by the user id.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TicketRecord {
    user_id: i64,
    user_chat_id: i64,
    thread_id: i64,
    last_update: Datetime,
}

impl TicketRecord {
    /// Builds the record for `ticket`, stamped with the current time.
    fn stamped(ticket: &Ticket) -> Self {
        Self {
            user_id: ticket.user_id.0,
            user_chat_id: ticket.user_chat_id.0,
            thread_id: i64::from(ticket.thread_id.0),
            last_update: Datetime::from(Utc::now()),
        }
    }
}

impl TryFrom<TicketRecord> for Ticket {
    type Error = anyhow::Error;

    fn try_from(record: TicketRecord) -> Res<Self> {
        Ok(Ticket {
            user_id: UserId(record.user_id),
            user_chat_id: ChatId(record.user_chat_id),
            thread_id: ThreadId(i32::try_from(record.thread_id)?),
            last_update: record.last_update.0,
        })
    }
}

// Client.

/// SurrealDB ticket store.
#[derive(Clone)]
struct SurrealDbClient {
    db: Surreal<Db>,
}

impl SurrealDbClient {
    /// Opens an embedded, file-backed database.
    #[instrument(name = "SurrealDbClient::file", skip_all)]
    async fn file(path: &str) -> Res<Self> {
        let db = Surreal::new::<SurrealKv>(path).await?;
        let client = Self::init(db).await?;

        info!("Ticket store opened at `{}`.", path);

        Ok(client)
    }

    /// Opens an in-memory database.
    async fn memory() -> Res<Self> {
        let db = Surreal::new::<Mem>(()).await?;
        Self::init(db).await
    }

    /// Selects the namespace and defines the schema.
    async fn init(db: Surreal<Db>) -> Res<Self> {
        db.use_ns("support").use_db("relay").await?;

        db.query(
            "
            DEFINE TABLE IF NOT EXISTS ticket SCHEMAFULL;
            DEFINE FIELD IF NOT EXISTS user_id ON ticket TYPE int;
            DEFINE FIELD IF NOT EXISTS user_chat_id ON ticket TYPE int;
            DEFINE FIELD IF NOT EXISTS thread_id ON ticket TYPE int;
            DEFINE FIELD IF NOT EXISTS last_update ON ticket TYPE datetime;
            DEFINE INDEX IF NOT EXISTS ticket_thread_id ON ticket FIELDS thread_id;
            ",
        )
        .await?
        .check()?;

        Ok(Self { db })
    }
}

#[async_trait]
impl GenericDbClient for SurrealDbClient {
    #[instrument(skip(self))]
    async fn get_ticket_by_user(&self, user_id: UserId) -> Res<Option<Ticket>> {
        let record: Option<TicketRecord> = self.db.select((TICKET_TABLE, user_id.0)).await?;

        record.map(Ticket::try_from).transpose()
    }

    #[instrument(skip(self))]
    async fn get_ticket_by_thread(&self, thread_id: ThreadId) -> Res<Option<Ticket>> {
        let mut response = self
            .db
            .query("SELECT * FROM ticket WHERE thread_id = $thread_id LIMIT 1")
            .bind(("thread_id", i64::from(thread_id.0)))
            .await?;

        let records: Vec<TicketRecord> = response.take(0)?;

        records.into_iter().next().map(Ticket::try_from).transpose()
    }

    #[instrument(skip(self))]
    async fn upsert_ticket(&self, ticket: &Ticket) -> Res<Ticket> {
        let record: Option<TicketRecord> = self.db.upsert((TICKET_TABLE, ticket.user_id.0)).content(TicketRecord::stamped(ticket)).await?;

        let record = record.ok_or_else(|| anyhow::anyhow!("Upsert of ticket for user `{}` returned no record.", ticket.user_id))?;

        debug!("Ticket for user `{}` stored with thread `{}`.", record.user_id, record.thread_id);

        Ticket::try_from(record)
    }

    #[instrument(skip(self))]
    async fn list_tickets(&self) -> Res<Vec<Ticket>> {
        let records: Vec<TicketRecord> = self.db.select(TICKET_TABLE).await?;

        records.into_iter().map(Ticket::try_from).collect()
    }

    #[instrument(skip(self))]
    async fn delete_ticket(&self, user_id: UserId) -> Void {
        let _: Option<TicketRecord> = self.db.delete((TICKET_TABLE, user_id.0)).await?;

        Ok(())
    }
}

// Tests.

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    async fn store() -> DbClient {
        DbClient::surreal_memory().await.expect("Failed to create DB client")
    }

    #[tokio::test]
    async fn test_missing_ticket_is_none() {
        let db = store().await;

        assert_eq!(db.get_ticket_by_user(UserId(1)).await.unwrap(), None);
        assert_eq!(db.get_ticket_by_thread(ThreadId(10)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_upsert_stamps_current_time() {
        let db = store().await;
        let before = Utc::now();

        let mut ticket = Ticket::new(UserId(1), ChatId(100), ThreadId(10));
        ticket.last_update = before - Duration::days(30);

        let stored = db.upsert_ticket(&ticket).await.unwrap();
        assert!(stored.last_update >= before);

        let fetched = db.get_ticket_by_user(UserId(1)).await.unwrap().unwrap();
        assert!(fetched.last_update >= before);
        assert_eq!(fetched.user_chat_id, ChatId(100));
        assert_eq!(fetched.thread_id, ThreadId(10));
    }

    #[tokio::test]
    async fn test_upsert_overwrites_existing_ticket() {
        let db = store().await;

        db.upsert_ticket(&Ticket::new(UserId(1), ChatId(100), ThreadId(10))).await.unwrap();
        db.upsert_ticket(&Ticket::new(UserId(1), ChatId(200), ThreadId(20))).await.unwrap();

        let tickets = db.list_tickets().await.unwrap();
        assert_eq!(tickets.len(), 1);
        assert_eq!(tickets[0].user_chat_id, ChatId(200));
        assert_eq!(tickets[0].thread_id, ThreadId(20));

        assert_eq!(db.get_ticket_by_thread(ThreadId(10)).await.unwrap(), None);
        assert_eq!(db.get_ticket_by_thread(ThreadId(20)).await.unwrap().unwrap().user_id, UserId(1));
    }

    #[tokio::test]
    async fn test_refresh_never_moves_backwards() {
        let db = store().await;
        let ticket = Ticket::new(UserId(1), ChatId(100), ThreadId(10));

        let first = db.upsert_ticket(&ticket).await.unwrap();
        let second = db.upsert_ticket(&first).await.unwrap();

        assert!(second.last_update >= first.last_update);
    }

    #[tokio::test]
    async fn test_lookup_by_thread() {
        let db = store().await;

        db.upsert_ticket(&Ticket::new(UserId(1), ChatId(100), ThreadId(10))).await.unwrap();
        db.upsert_ticket(&Ticket::new(UserId(2), ChatId(200), ThreadId(20))).await.unwrap();

        let ticket = db.get_ticket_by_thread(ThreadId(20)).await.unwrap().unwrap();
        assert_eq!(ticket.user_id, UserId(2));
        assert_eq!(ticket.user_chat_id, ChatId(200));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let db = store().await;

        db.upsert_ticket(&Ticket::new(UserId(1), ChatId(100), ThreadId(10))).await.unwrap();
        db.upsert_ticket(&Ticket::new(UserId(2), ChatId(200), ThreadId(20))).await.unwrap();

        db.delete_ticket(UserId(1)).await.unwrap();
        db.delete_ticket(UserId(1)).await.unwrap();
        db.delete_ticket(UserId(3)).await.unwrap();

        let tickets = db.list_tickets().await.unwrap();
        assert_eq!(tickets.len(), 1);
        assert_eq!(tickets[0].user_id, UserId(2));
    }
}
