//! Message boundary between callers and the store.
//!
//! Requests and responses are JSON values tagged by `type`. The worker owns
//! the record store, so nothing outside it touches storage.

pub mod messages;
pub mod worker;

pub use messages::{sniff_tag, IncomingMessage, OutgoingMessage, SearchRequest};
pub use worker::{NoiseWorker, RequestPhase, WorkerCommand};
