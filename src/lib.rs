//! Keeps an in-memory configuration record in sync with a hierarchical key-value
//! store such as etcd.
//!
//! Each leaf field of the record is bound to one store key derived from its
//! annotations. [`LiveConfig::load_snapshot`] pulls the current values once, and
//! [`LiveConfig::watch`] applies changes as the store publishes them, invoking
//! per-key reload callbacks.
//!
//! ```ignore
//! let store = Arc::new(MemoryStore::default());
//! let live = LiveConfigBuilder::new("/svc/config").build(AppConfig::default(), store)?;
//! live.register_callback("log/level", |key| println!("{key} reloaded"));
//! live.load_snapshot().await?;
//! let handle = live.watch().await?;
//! ```

mod callback;
mod coerce;
mod config;
mod errors;
mod key_map;
mod live_config;
mod merge;
mod schema;
mod store;

pub use callback::*;
pub use coerce::*;
pub use config::*;
pub use errors::*;
pub use key_map::*;
pub use live_config::*;
pub use merge::*;
pub use schema::*;
pub use store::*;

//-----------------------------------------------------------
// Test utils


#[cfg(test)]
pub mod test_utils;
