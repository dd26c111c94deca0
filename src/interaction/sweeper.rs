//! Background expiry of inactive tickets.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, error, info, info_span, instrument, warn};

use crate::{
    base::types::{Res, Ticket},
    service::db::DbClient,
};

/// Timing and threshold of the sweeper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweeperSettings {
    /// Days of inactivity after which a ticket expires.
    pub expiry_days: u32,
    /// Delay before the first sweep.
    pub initial_delay: Duration,
    /// Interval between sweeps.
    pub interval: Duration,
}

/// Returns the tickets whose last activity is strictly before `now - expiry_days`.
///
/// A threshold reaching past the earliest representable time expires nothing.
pub fn filter_expired(tickets: Vec<Ticket>, expiry_days: u32, now: DateTime<Utc>) -> Vec<Ticket> {
    let Some(cutoff) = chrono::Duration::try_days(i64::from(expiry_days)).and_then(|age| now.checked_sub_signed(age)) else {
        return Vec::new();
    };

    tickets.into_iter().filter(|ticket| ticket.last_update < cutoff).collect()
}

/// Deletes every expired ticket, returning how many were deleted.
///
/// Each deletion stands alone; a failed one is logged and the rest proceed.
#[instrument(skip(db))]
pub async fn sweep(db: &DbClient, expiry_days: u32) -> Res<usize> {
    let tickets = db.list_tickets().await?;
    let expired = filter_expired(tickets, expiry_days, Utc::now());

    let mut deleted = 0;
    for ticket in expired {
        match db.delete_ticket(ticket.user_id).await {
            Ok(()) => deleted += 1,
            Err(err) => warn!("Failed to delete expired ticket for user `{}`: {:#}", ticket.user_id, err),
        }
    }

    info!("Expired {} ticket(s).", deleted);

    Ok(deleted)
}

/// Spawns the sweeper: one run after the initial delay, then one per interval,
/// until `shutdown` is cancelled.
pub fn spawn_sweeper(db: DbClient, settings: SweeperSettings, shutdown: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(
        async move {
            tokio::select! {
                _ = shutdown.cancelled() => return,
                _ = tokio::time::sleep(settings.initial_delay) => {}
            }

            let mut ticker = tokio::time::interval(settings.interval);

            loop {
                // The first tick completes immediately.
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                if let Err(err) = sweep(&db, settings.expiry_days).await {
                    error!("Error while sweeping tickets: {:#}", err);
                }
            }

            info!("Sweeper stopped.");
        }
        .instrument(info_span!("sweeper")),
    )
}

// Tests.

#[cfg(test)]
mod tests {
    use chrono::Duration as ChronoDuration;

    use super::*;
    use crate::base::types::{ChatId, ThreadId, UserId};

    fn ticket(user_id: i64, last_update: DateTime<Utc>) -> Ticket {
        Ticket {
            user_id: UserId(user_id),
            user_chat_id: ChatId(user_id),
            thread_id: ThreadId(user_id as i32),
            last_update,
        }
    }

    #[test]
    fn test_filter_expired_boundaries() {
        let now = Utc::now();
        let cutoff = now - ChronoDuration::days(15);

        let tickets = vec![
            ticket(1, cutoff - ChronoDuration::seconds(1)),
            ticket(2, cutoff + ChronoDuration::seconds(1)),
            ticket(3, cutoff),
            ticket(4, now),
            ticket(5, now - ChronoDuration::days(100)),
        ];

        let expired: Vec<UserId> = filter_expired(tickets, 15, now).into_iter().map(|t| t.user_id).collect();

        assert_eq!(expired, vec![UserId(1), UserId(5)]);
    }

    #[test]
    fn test_filter_expired_empty() {
        assert!(filter_expired(vec![], 1, Utc::now()).is_empty());
    }

    #[test]
    fn test_filter_expired_huge_threshold_expires_nothing() {
        let now = Utc::now();
        let tickets = vec![ticket(1, now - ChronoDuration::days(400)), ticket(2, DateTime::<Utc>::MIN_UTC)];

        assert!(filter_expired(tickets.clone(), 100_000_000, now).is_empty());
        assert!(filter_expired(tickets, u32::MAX, now).is_empty());
    }

    #[tokio::test]
    async fn test_sweep_on_fresh_store_deletes_nothing() {
        let db = DbClient::surreal_memory().await.unwrap();

        db.upsert_ticket(&Ticket::new(UserId(1), ChatId(1), ThreadId(1))).await.unwrap();

        assert_eq!(sweep(&db, 1).await.unwrap(), 0);
        assert_eq!(db.list_tickets().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_spawned_sweeper_stops_on_cancel() {
        let db = DbClient::surreal_memory().await.unwrap();
        let shutdown = CancellationToken::new();

        let settings = SweeperSettings {
            expiry_days: 1,
            initial_delay: Duration::from_secs(3600),
            interval: Duration::from_secs(3600),
        };

        let handle = spawn_sweeper(db, settings, shutdown.clone());
        shutdown.cancel();

        tokio::time::timeout(Duration::from_secs(5), handle).await.unwrap().unwrap();
    }
}
