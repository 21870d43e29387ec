pub mod channel;
pub mod config;
pub mod error;
pub mod histogram;
pub mod models;
pub mod query;
pub mod runtime;
pub mod search;
pub mod store;
pub mod tracing_setup;

// Re-export the message surface at crate root for convenience
pub use channel::{IncomingMessage, NoiseWorker, OutgoingMessage, WorkerCommand};
pub use config::{Backend, NoiseConfig};
pub use error::{NoiseError, Result};
pub use models::{NoiseEvent, NoiseField, PagedResult};
pub use runtime::{NoiseHandle, NoiseRuntime};
