pub mod diesel_pool;
pub mod diesel_store;
pub mod memory_store;
pub mod store;

pub use diesel_pool::{create_diesel_pool, mask_connection_string, DieselDatabaseConfig, DieselPool};
pub use diesel_store::DieselStore;
pub use memory_store::MemoryStore;
pub use store::{CreditOutcome, PaymentTransition, PortalStore, StoreError};
