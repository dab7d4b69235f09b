//! Realtime change feed.
//!
//! Writers publish a [`ChangeNotification`] after every accepted mutation.
//! Each session listens through a [`FeedSubscription`], which only passes on
//! notifications for its own facility that some *other* session produced.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Context, Result};
use chrono::Local;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};

const DEFAULT_CAPACITY: usize = 64;

static SESSION_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Identifies the session that originated a write.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// A fresh id, unique within this process and unlikely to collide across
    /// processes.
    pub fn generate() -> Self {
        let sequence = SESSION_COUNTER.fetch_add(1, Ordering::Relaxed);
        Self(format!(
            "{}-{}-{}",
            std::process::id(),
            Local::now().timestamp_millis(),
            sequence
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeTable {
    Events,
    Resources,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeNotification {
    pub facility_id: String,
    pub table: ChangeTable,
    pub origin: SessionId,
}

impl ChangeNotification {
    pub fn new(facility_id: impl Into<String>, table: ChangeTable, origin: SessionId) -> Self {
        Self {
            facility_id: facility_id.into(),
            table,
            origin,
        }
    }

    /// Parses a payload delivered by an external realtime service.
    pub fn from_json(payload: &str) -> Result<Self> {
        serde_json::from_str(payload).context("Failed to parse change notification")
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).context("Failed to serialize change notification")
    }
}

/// Broadcast hub shared by every session in the process.
#[derive(Debug, Clone)]
pub struct ChangeFeed {
    sender: broadcast::Sender<ChangeNotification>,
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Returns how many subscribers saw the notification.
    pub fn publish(&self, notification: ChangeNotification) -> usize {
        match self.sender.send(notification) {
            Ok(receivers) => receivers,
            // Nobody listening is not an error
            Err(_) => 0,
        }
    }

    /// Injects a JSON payload received from outside the process.
    pub fn publish_json(&self, payload: &str) -> Result<usize> {
        let notification = ChangeNotification::from_json(payload)?;
        Ok(self.publish(notification))
    }

    pub fn subscribe(&self, facility_id: impl Into<String>, session: SessionId) -> FeedSubscription {
        FeedSubscription {
            receiver: self.sender.subscribe(),
            facility_id: facility_id.into(),
            session,
        }
    }
}

/// What arrived since the last poll.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PendingChanges {
    pub notifications: Vec<ChangeNotification>,
    /// Notifications were dropped because the subscriber fell behind
    pub lagged: bool,
}

impl PendingChanges {
    pub fn requires_refetch(&self) -> bool {
        self.lagged || !self.notifications.is_empty()
    }
}

pub struct FeedSubscription {
    receiver: broadcast::Receiver<ChangeNotification>,
    facility_id: String,
    session: SessionId,
}

impl FeedSubscription {
    pub fn session(&self) -> &SessionId {
        &self.session
    }

    pub fn facility_id(&self) -> &str {
        &self.facility_id
    }

    fn is_relevant(&self, notification: &ChangeNotification) -> bool {
        notification.facility_id == self.facility_id && notification.origin != self.session
    }

    /// Drains everything queued without waiting.
    pub fn drain(&mut self) -> PendingChanges {
        let mut pending = PendingChanges::default();
        loop {
            match self.receiver.try_recv() {
                Ok(notification) => {
                    if self.is_relevant(&notification) {
                        pending.notifications.push(notification);
                    }
                }
                Err(TryRecvError::Lagged(skipped)) => {
                    log::warn!("Change feed lagged, {} notifications skipped", skipped);
                    pending.lagged = true;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
        pending
    }

    /// Waits for the next relevant change. Returns `false` once the feed is
    /// closed.
    pub async fn changed(&mut self) -> bool {
        loop {
            match self.receiver.recv().await {
                Ok(notification) if self.is_relevant(&notification) => return true,
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    log::warn!("Change feed lagged, {} notifications skipped", skipped);
                    return true;
                }
                Err(RecvError::Closed) => return false,
            }
        }
    }
}
