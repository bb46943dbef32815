pub mod event;
pub mod managed_record;
pub mod manager;

pub use event::{Event, Venue};
pub use managed_record::{ManagedRecord, ManagedTarget};
pub use manager::{ContactMethod, Manager};
