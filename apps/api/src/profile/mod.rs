// Profile persistence: the downstream side of an import.

pub mod handlers;
pub mod store;

pub use store::{MemoryProfileStore, PgProfileStore, ProfileStore};
