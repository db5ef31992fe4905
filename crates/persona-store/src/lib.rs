//! Persona storage: the single-flight in-memory cache and the on-disk
//! record store.

pub mod cache;
pub mod records;

pub use cache::{CacheEntry, CacheError, PersonaCache};
pub use records::{RecordStore, StoreError, StoredPersona};
