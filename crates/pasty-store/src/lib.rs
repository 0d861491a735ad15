pub mod database;
pub mod error;
pub mod pastes;
pub mod row_helpers;
pub mod schema;
pub mod store;

pub use database::Database;
pub use error::StoreError;
pub use pastes::PasteRepo;
pub use store::PasteStore;
