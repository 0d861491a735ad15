use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{Device, Group, PasteId};

/// A stored text snippet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paste {
    pub id: PasteId,
    pub created_at: DateTime<Utc>,
    pub group: Group,
    pub user: String,
    pub device: Device,
    pub content: String,
}

/// A paste that has not been written yet. The store assigns the id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewPaste {
    pub created_at: DateTime<Utc>,
    pub group: Group,
    pub user: String,
    pub device: Device,
    pub content: String,
}

impl NewPaste {
    /// Stamp a paste with the current time.
    pub fn now(group: Group, user: String, device: Device, content: String) -> Self {
        Self {
            created_at: Utc::now(),
            group,
            user,
            device,
            content,
        }
    }

    pub fn into_paste(self, id: PasteId) -> Paste {
        Paste {
            id,
            created_at: self.created_at,
            group: self.group,
            user: self.user,
            device: self.device,
            content: self.content,
        }
    }
}
