use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::order::OrderId;

/// A downstream a persisted order is pushed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Channel {
    OrderStore,
    SecondaryStore,
    Queue,
}

impl Channel {
    /// Channels tracked in the outbox. The secondary store is best-effort
    /// only and is never redelivered.
    pub const DURABLE: [Channel; 2] = [Channel::OrderStore, Channel::Queue];

    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::OrderStore => "order_store",
            Channel::SecondaryStore => "secondary_store",
            Channel::Queue => "queue",
        }
    }

    pub fn is_durable(&self) -> bool {
        Channel::DURABLE.contains(self)
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Channel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "order_store" => Ok(Channel::OrderStore),
            "secondary_store" => Ok(Channel::SecondaryStore),
            "queue" => Ok(Channel::Queue),
            other => Err(format!("unknown channel: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutboxStatus {
    Pending,
    Delivered,
    /// Gave up; needs manual reconciliation
    Failed,
}

impl OutboxStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutboxStatus::Pending => "pending",
            OutboxStatus::Delivered => "delivered",
            OutboxStatus::Failed => "failed",
        }
    }
}

impl FromStr for OutboxStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OutboxStatus::Pending),
            "delivered" => Ok(OutboxStatus::Delivered),
            "failed" => Ok(OutboxStatus::Failed),
            other => Err(format!("unknown outbox status: {other}")),
        }
    }
}

/// Delivery record for one order on one durable channel. The payload is
/// rebuilt from the stored order at dispatch time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboxEntry {
    pub order_id: OrderId,
    pub channel: Channel,
    pub status: OutboxStatus,
    pub attempts: u32,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OutboxEntry {
    pub fn pending(order_id: OrderId, channel: Channel) -> Self {
        let now = Utc::now();
        Self {
            order_id,
            channel,
            status: OutboxStatus::Pending,
            attempts: 0,
            last_error: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == OutboxStatus::Pending
    }

    pub fn complete(&mut self) {
        self.attempts += 1;
        self.status = OutboxStatus::Delivered;
        self.last_error = None;
        self.updated_at = Utc::now();
    }

    /// Record a failed attempt. Stays pending until `max_attempts` is
    /// reached, then turns `Failed`.
    pub fn record_failure(&mut self, error: impl Into<String>, max_attempts: u32) {
        self.attempts += 1;
        self.last_error = Some(error.into());
        self.updated_at = Utc::now();
        if self.attempts >= max_attempts {
            self.status = OutboxStatus::Failed;
        }
    }

    /// Give up without another attempt, e.g. when the order is gone.
    pub fn abandon(&mut self, error: impl Into<String>) {
        self.last_error = Some(error.into());
        self.status = OutboxStatus::Failed;
        self.updated_at = Utc::now();
    }
}

/// Pending entries last touched at or before `updated_before`, oldest
/// first. The cutoff is applied before `limit`, so entries that are not yet
/// due never crowd out ones that are.
pub fn due_oldest_first(
    entries: impl IntoIterator<Item = OutboxEntry>,
    limit: usize,
    updated_before: DateTime<Utc>,
) -> Vec<OutboxEntry> {
    let mut due: Vec<OutboxEntry> = entries
        .into_iter()
        .filter(|entry| entry.is_pending() && entry.updated_at <= updated_before)
        .collect();

    due.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.channel.cmp(&b.channel)));
    due.truncate(limit);
    due
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_channel_round_trips_through_str() {
        for channel in [Channel::OrderStore, Channel::SecondaryStore, Channel::Queue] {
            assert_eq!(channel.as_str().parse::<Channel>().unwrap(), channel);
        }
        assert!("nope".parse::<Channel>().is_err());
    }

    #[test]
    fn test_secondary_store_is_not_durable() {
        assert!(Channel::OrderStore.is_durable());
        assert!(Channel::Queue.is_durable());
        assert!(!Channel::SecondaryStore.is_durable());
    }

    #[test]
    fn test_failure_keeps_entry_pending_until_budget_spent() {
        let mut entry = OutboxEntry::pending(OrderId::generate(), Channel::Queue);

        entry.record_failure("broker down", 3);
        entry.record_failure("broker down", 3);
        assert!(entry.is_pending());
        assert_eq!(entry.attempts, 2);

        entry.record_failure("broker down", 3);
        assert_eq!(entry.status, OutboxStatus::Failed);
        assert_eq!(entry.last_error.as_deref(), Some("broker down"));
    }

    #[test]
    fn test_complete_clears_error() {
        let mut entry = OutboxEntry::pending(OrderId::generate(), Channel::OrderStore);
        entry.record_failure("timeout", 5);
        entry.complete();

        assert_eq!(entry.status, OutboxStatus::Delivered);
        assert_eq!(entry.attempts, 2);
        assert!(entry.last_error.is_none());
    }

    #[test]
    fn test_recently_retried_entries_do_not_crowd_out_due_ones() {
        let now = Utc::now();

        // Created first but retried just now, so still inside the grace window.
        let mut retried = OutboxEntry::pending(OrderId::generate(), Channel::OrderStore);
        retried.created_at = now - Duration::hours(2);
        retried.updated_at = now;

        let mut due = OutboxEntry::pending(OrderId::generate(), Channel::Queue);
        due.created_at = now - Duration::hours(1);
        due.updated_at = now - Duration::hours(1);

        let picked = due_oldest_first(vec![retried, due.clone()], 1, now - Duration::minutes(1));
        assert_eq!(picked, vec![due]);
    }

    #[test]
    fn test_due_entries_sorted_and_limited() {
        let now = Utc::now();
        let entries: Vec<OutboxEntry> = (1..=4)
            .map(|age| {
                let mut entry = OutboxEntry::pending(OrderId::generate(), Channel::Queue);
                entry.created_at = now - Duration::minutes(age);
                entry.updated_at = entry.created_at;
                entry
            })
            .collect();

        let mut delivered = OutboxEntry::pending(OrderId::generate(), Channel::OrderStore);
        delivered.created_at = now - Duration::hours(3);
        delivered.complete();

        let mut all = entries.clone();
        all.push(delivered);

        let picked = due_oldest_first(all, 2, now);
        assert_eq!(picked, vec![entries[3].clone(), entries[2].clone()]);
    }
}
