mod error;
mod memory;
mod models;
mod postgrest;
mod trait_def;

pub use error::StoreError;
pub use memory::InMemoryPointStore;
pub use models::*;
pub use postgrest::PostgrestPointStore;
#[cfg(test)]
pub use trait_def::MockPointStore;
pub use trait_def::{PointStore, StoreResult};
