//! Change notification channel
//!
//! A process-wide broadcast hub carrying row inserts. Consumers subscribe
//! with a [`ChangeFilter`] and treat every delivered event as a signal to
//! re-fetch; events carry the inserted row but nothing relies on it.
//!
//! Delivery is at-least-once per subscriber. A receiver that falls behind the
//! buffer gets one [`Signal::Lagged`] in place of the dropped events.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::auth::Table;

/// Default number of events buffered per subscriber
pub const DEFAULT_BUFFER: usize = 256;

/// An insert into one of the row stores
#[derive(Debug, Clone, Serialize)]
pub struct InsertEvent {
    pub table: Table,
    /// The inserted row as JSON
    pub record: serde_json::Value,
    pub at: DateTime<Utc>,
}

/// Which inserts a subscription cares about
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeFilter {
    table: Table,
    column_eq: Option<(String, String)>,
}

impl ChangeFilter {
    /// Every insert into `table`
    pub fn table(table: Table) -> Self {
        Self {
            table,
            column_eq: None,
        }
    }

    /// Narrow to inserts whose top-level `column` equals `value`
    pub fn eq(mut self, column: impl Into<String>, value: impl ToString) -> Self {
        self.column_eq = Some((column.into(), value.to_string()));
        self
    }

    pub fn matches(&self, event: &InsertEvent) -> bool {
        if event.table != self.table {
            return false;
        }
        match &self.column_eq {
            None => true,
            Some((column, value)) => event
                .record
                .get(column)
                .and_then(|v| v.as_str())
                .is_some_and(|v| v == value),
        }
    }
}

/// What a subscriber wakes up for
#[derive(Debug, Clone)]
pub enum Signal {
    /// A matching insert
    Insert(Arc<InsertEvent>),
    /// Events were dropped because the subscriber fell behind
    Lagged(u64),
}

/// Broadcast hub for row inserts
pub struct ChangeHub {
    sender: broadcast::Sender<Arc<InsertEvent>>,
}

impl ChangeHub {
    pub fn new(buffer: usize) -> Self {
        let (sender, _) = broadcast::channel(buffer.max(1));
        Self { sender }
    }

    /// Publish an insert. Returns the number of subscribers reached.
    pub fn publish_insert<T: Serialize>(&self, table: Table, row: &T) -> usize {
        let record = match serde_json::to_value(row) {
            Ok(v) => v,
            Err(e) => {
                warn!(%table, error = %e, "Failed to encode insert event");
                return 0;
            }
        };

        let event = Arc::new(InsertEvent {
            table,
            record,
            at: Utc::now(),
        });

        // No subscribers is not an error
        let reached = self.sender.send(event).unwrap_or(0);
        debug!(%table, subscribers = reached, "Published insert");
        reached
    }

    pub fn subscribe(&self, filter: ChangeFilter) -> Subscription {
        Subscription {
            receiver: self.sender.subscribe(),
            filter,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for ChangeHub {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER)
    }
}

/// A filtered view of the hub
pub struct Subscription {
    receiver: broadcast::Receiver<Arc<InsertEvent>>,
    filter: ChangeFilter,
}

impl Subscription {
    /// Wait for the next matching signal. `None` once the hub is gone.
    ///
    /// Cancel-safe: dropping the future loses no matching event.
    pub async fn next(&mut self) -> Option<Signal> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if self.filter.matches(&event) => return Some(Signal::Insert(event)),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    return Some(Signal::Lagged(skipped))
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Non-blocking variant of [`Subscription::next`]
    pub fn try_next(&mut self) -> Option<Signal> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) if self.filter.matches(&event) => return Some(Signal::Insert(event)),
                Ok(_) => continue,
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    return Some(Signal::Lagged(skipped))
                }
                Err(_) => return None,
            }
        }
    }

    pub fn filter(&self) -> &ChangeFilter {
        &self.filter
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_filter_by_column() {
        let hub = ChangeHub::default();
        let mut mine = hub.subscribe(
            ChangeFilter::table(Table::DistressNotifications).eq("user_id", "alice"),
        );

        hub.publish_insert(Table::DistressNotifications, &json!({ "user_id": "bob" }));
        hub.publish_insert(Table::IncidentReports, &json!({ "user_id": "alice" }));
        hub.publish_insert(Table::DistressNotifications, &json!({ "user_id": "alice" }));

        match mine.next().await {
            Some(Signal::Insert(event)) => assert_eq!(event.record["user_id"], "alice"),
            other => panic!("expected insert, got {other:?}"),
        }
        assert!(mine.try_next().is_none());
    }

    #[tokio::test]
    async fn test_unfiltered_table_subscription() {
        let hub = ChangeHub::default();
        let mut reports = hub.subscribe(ChangeFilter::table(Table::IncidentReports));

        hub.publish_insert(Table::Profiles, &json!({ "id": "x" }));
        hub.publish_insert(Table::IncidentReports, &json!({ "id": "r1" }));
        hub.publish_insert(Table::IncidentReports, &json!({ "id": "r2" }));

        assert!(matches!(reports.try_next(), Some(Signal::Insert(_))));
        assert!(matches!(reports.try_next(), Some(Signal::Insert(_))));
        assert!(reports.try_next().is_none());
    }

    #[test]
    fn test_lagged_subscriber_still_signalled() {
        let hub = ChangeHub::new(1);
        let mut sub = hub.subscribe(ChangeFilter::table(Table::IncidentReports));

        for i in 0..3 {
            hub.publish_insert(Table::IncidentReports, &json!({ "id": i }));
        }

        assert!(matches!(sub.try_next(), Some(Signal::Lagged(2))));
        assert!(matches!(sub.try_next(), Some(Signal::Insert(_))));
    }

    #[test]
    fn test_publish_without_subscribers() {
        let hub = ChangeHub::default();
        assert_eq!(hub.publish_insert(Table::Profiles, &json!({})), 0);
        let _sub = hub.subscribe(ChangeFilter::table(Table::Profiles));
        assert_eq!(hub.subscriber_count(), 1);
    }
}
