pub mod error;
pub mod functions;
pub mod schema;
pub mod store;

pub use error::{Result, StoreError};
pub use store::{PaneWord, Pending, StoreStats, WordReader, WordStore};
