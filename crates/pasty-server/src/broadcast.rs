//! Snapshot fan-out to every connection in a group.

use std::sync::Arc;
use std::time::Duration;

use pasty_core::{encode_snapshot, Group, NetworkField};
use pasty_store::PasteStore;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::connection::{Connection, Delivery};
use crate::error::PublishError;
use crate::registry::ConnectionRegistry;

/// Outcome of one publish round.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PublishReport {
    pub recipients: usize,
    pub delivered: usize,
    /// Members that already had a newer snapshot.
    pub superseded: usize,
    pub evicted: usize,
}

/// An encoded group snapshot and its place in read order.
#[derive(Clone, Debug)]
struct Snapshot {
    version: u64,
    payload: Arc<str>,
}

/// Recomputes a group's snapshot and pushes it to all of its members.
///
/// Snapshot reads are serialized and numbered, so a higher version always
/// reflects every mutation a lower one saw. Connections drop any snapshot
/// older than the last one they sent, which leaves every member on the
/// newest read no matter how concurrent publishes interleave.
pub struct BroadcastCoordinator {
    store: Arc<dyn PasteStore>,
    /// Version of the most recent snapshot read.
    read_version: Mutex<u64>,
    registry: Arc<ConnectionRegistry>,
    send_timeout: Duration,
    network_field: NetworkField,
}

impl BroadcastCoordinator {
    pub fn new(
        store: Arc<dyn PasteStore>,
        registry: Arc<ConnectionRegistry>,
        send_timeout: Duration,
        network_field: NetworkField,
    ) -> Self {
        Self {
            store,
            read_version: Mutex::new(0),
            registry,
            send_timeout,
            network_field,
        }
    }

    pub fn store(&self) -> &Arc<dyn PasteStore> {
        &self.store
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    async fn snapshot(&self, group: &Group) -> Result<Snapshot, PublishError> {
        let (version, pastes) = {
            let mut read_version = self.read_version.lock().await;
            let pastes = self.store.list(group).await?;
            *read_version += 1;
            (*read_version, pastes)
        };
        Ok(Snapshot {
            version,
            payload: Arc::from(encode_snapshot(&pastes, self.network_field)?),
        })
    }

    /// Send the group's current snapshot to one connection.
    pub async fn send_snapshot(&self, conn: &Connection) -> Result<Delivery, PublishError> {
        let snapshot = self.snapshot(conn.group()).await?;
        Ok(conn
            .send_snapshot(snapshot.version, &snapshot.payload, self.send_timeout)
            .await?)
    }

    /// Push a fresh snapshot to every member of `group`.
    ///
    /// Each member gets its own task and send timeout. Members whose send
    /// fails are closed and deregistered; that does not fail the publish.
    pub async fn publish(&self, group: &Group) -> Result<PublishReport, PublishError> {
        let snapshot = self.snapshot(group).await?;
        let members = self.registry.members_of(group);
        let mut report = PublishReport {
            recipients: members.len(),
            ..PublishReport::default()
        };

        let mut deliveries = JoinSet::new();
        for conn in members {
            let snapshot = snapshot.clone();
            let limit = self.send_timeout;
            let _ = deliveries.spawn(async move {
                let result = conn
                    .send_snapshot(snapshot.version, &snapshot.payload, limit)
                    .await;
                (conn, result)
            });
        }

        while let Some(joined) = deliveries.join_next().await {
            match joined {
                Ok((_, Ok(Delivery::Sent))) => report.delivered += 1,
                Ok((_, Ok(Delivery::Superseded))) => report.superseded += 1,
                Ok((conn, Err(e))) => {
                    warn!(conn_id = %conn.id(), group = %group, error = %e, "evicting unresponsive connection");
                    self.evict(&conn);
                    report.evicted += 1;
                }
                Err(e) => warn!(group = %group, error = %e, "delivery task failed"),
            }
        }

        debug!(
            group = %group,
            version = snapshot.version,
            recipients = report.recipients,
            delivered = report.delivered,
            superseded = report.superseded,
            evicted = report.evicted,
            "published snapshot"
        );
        Ok(report)
    }

    fn evict(&self, conn: &Connection) {
        conn.close();
        let _ = self.registry.remove(conn);
    }
}
