pub mod broadcast;
pub mod config;
pub mod connection;
pub mod error;
pub mod health;
pub mod identity;
pub mod names;
pub mod registry;
pub mod server;
pub mod session;

#[cfg(test)]
mod test_support;

pub use broadcast::{BroadcastCoordinator, PublishReport};
pub use config::ServerConfig;
pub use connection::{Connection, Delivery, FrameSink};
pub use error::{PublishError, SendError, ServerError};
pub use registry::ConnectionRegistry;
pub use server::{build_router, start, AppState, ServerHandle};
pub use session::{CloseReason, Session};
