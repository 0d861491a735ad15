use async_trait::async_trait;
use tracing::instrument;

use pasty_core::{Device, Group, NewPaste, Paste, PasteId};

use crate::database::Database;
use crate::error::StoreError;
use crate::row_helpers;
use crate::store::PasteStore;

const TABLE: &str = "pastes";

#[derive(Clone)]
pub struct PasteRepo {
    db: Database,
}

impl PasteRepo {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Insert a paste and return its assigned id.
    #[instrument(skip(self, paste), fields(group = %paste.group))]
    pub fn insert(&self, paste: &NewPaste) -> Result<PasteId, StoreError> {
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO pastes (created_at, network, user, device, content)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![
                    row_helpers::format_timestamp(&paste.created_at),
                    paste.group.as_str(),
                    paste.user,
                    paste.device.as_str(),
                    paste.content,
                ],
            )?;
            Ok(PasteId(conn.last_insert_rowid()))
        })
    }

    /// List a group's pastes, newest first.
    #[instrument(skip(self), fields(group = %group))]
    pub fn list(&self, group: &Group) -> Result<Vec<Paste>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, created_at, network, user, device, content
                 FROM pastes WHERE network = ?1
                 ORDER BY created_at DESC, id ASC",
            )?;
            let mut rows = stmt.query([group.as_str()])?;
            let mut pastes = Vec::new();
            while let Some(row) = rows.next()? {
                let created_at: String = row_helpers::get(row, 1, TABLE, "created_at")?;
                pastes.push(Paste {
                    id: PasteId(row_helpers::get(row, 0, TABLE, "id")?),
                    created_at: row_helpers::parse_timestamp(&created_at, TABLE, "created_at")?,
                    group: Group::new(row_helpers::get::<String>(row, 2, TABLE, "network")?),
                    user: row_helpers::get(row, 3, TABLE, "user")?,
                    device: Device::new(row_helpers::get::<String>(row, 4, TABLE, "device")?),
                    content: row_helpers::get(row, 5, TABLE, "content")?,
                });
            }
            Ok(pastes)
        })
    }

    /// Delete one of `group`'s pastes by id. Returns whether a row was removed.
    #[instrument(skip(self), fields(group = %group, paste_id = %id))]
    pub fn delete(&self, group: &Group, id: PasteId) -> Result<bool, StoreError> {
        self.db.with_conn(|conn| {
            let changed = conn.execute(
                "DELETE FROM pastes WHERE id = ?1 AND network = ?2",
                rusqlite::params![id.get(), group.as_str()],
            )?;
            Ok(changed > 0)
        })
    }
}

/// SQL runs on the blocking pool; each call is one round trip.
#[async_trait]
impl PasteStore for PasteRepo {
    async fn insert(&self, paste: NewPaste) -> Result<PasteId, StoreError> {
        let repo = self.clone();
        tokio::task::spawn_blocking(move || repo.insert(&paste))
            .await
            .map_err(|e| StoreError::Task(e.to_string()))?
    }

    async fn list(&self, group: &Group) -> Result<Vec<Paste>, StoreError> {
        let repo = self.clone();
        let group = group.clone();
        tokio::task::spawn_blocking(move || repo.list(&group))
            .await
            .map_err(|e| StoreError::Task(e.to_string()))?
    }

    async fn delete(&self, group: &Group, id: PasteId) -> Result<bool, StoreError> {
        let repo = self.clone();
        let group = group.clone();
        tokio::task::spawn_blocking(move || repo.delete(&group, id))
            .await
            .map_err(|e| StoreError::Task(e.to_string()))?
    }
}
