pub mod ids;
pub mod paste;
pub mod protocol;

pub use ids::{ConnectionId, Device, Group, PasteId};
pub use paste::{NewPaste, Paste};
pub use protocol::{encode_snapshot, Action, Command, NetworkField, ProtocolError};
