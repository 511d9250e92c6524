pub mod index;
pub mod memory;
pub mod models;
pub mod schema;

pub use index::{FingerprintIndex, PostgresIndex, BATCH};
pub use memory::InMemoryIndex;
