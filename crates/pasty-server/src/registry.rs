use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use pasty_core::{ConnectionId, Group};
use tracing::debug;

use crate::connection::Connection;

type Members = HashMap<ConnectionId, Arc<Connection>>;

/// Live connections partitioned by group.
///
/// Every read and mutation goes through one lock, so membership snapshots
/// never observe a half-applied add or remove.
#[derive(Default)]
pub struct ConnectionRegistry {
    groups: RwLock<HashMap<Group, Members>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, conn: Arc<Connection>) {
        let mut groups = self.groups.write();
        let group_size = {
            let members = groups.entry(conn.group().clone()).or_default();
            let _ = members.insert(conn.id().clone(), Arc::clone(&conn));
            members.len()
        };
        debug!(conn_id = %conn.id(), group = %conn.group(), group_size, "registered connection");
    }

    /// Remove a connection. Returns false if it was already gone.
    pub fn remove(&self, conn: &Connection) -> bool {
        let mut groups = self.groups.write();
        let Some(members) = groups.get_mut(conn.group()) else {
            return false;
        };
        let removed = members.remove(conn.id()).is_some();
        if members.is_empty() {
            let _ = groups.remove(conn.group());
        }
        removed
    }

    /// Point-in-time copy of a group's members.
    pub fn members_of(&self, group: &Group) -> Vec<Arc<Connection>> {
        self.groups
            .read()
            .get(group)
            .map(|members| members.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Point-in-time copy of every live connection.
    pub fn all(&self) -> Vec<Arc<Connection>> {
        self.groups
            .read()
            .values()
            .flat_map(|members| members.values().cloned())
            .collect()
    }

    pub fn connection_count(&self) -> usize {
        self.groups.read().values().map(HashMap::len).sum()
    }

    pub fn group_count(&self) -> usize {
        self.groups.read().len()
    }
}
