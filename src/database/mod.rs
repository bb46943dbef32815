pub mod delegation;
pub mod manager;
pub mod models;

pub use delegation::PgDelegationStore;
pub use manager::{DatabaseError, DatabaseManager};
