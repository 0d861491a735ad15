use async_trait::async_trait;
use pasty_core::{Group, NewPaste, Paste, PasteId};

use crate::error::StoreError;

/// Persistence seam used by sessions and the broadcast coordinator.
///
/// Each call is one store round trip; callers never hold a transaction
/// across calls.
#[async_trait]
pub trait PasteStore: Send + Sync {
    /// Persist a paste and return the id the store assigned.
    async fn insert(&self, paste: NewPaste) -> Result<PasteId, StoreError>;

    /// All pastes for `group`, newest first; equal timestamps in ascending id order.
    async fn list(&self, group: &Group) -> Result<Vec<Paste>, StoreError>;

    /// Remove a paste from `group`. Returns whether a row was removed; an id
    /// that is missing or belongs to another group is not an error.
    async fn delete(&self, group: &Group, id: PasteId) -> Result<bool, StoreError>;
}
