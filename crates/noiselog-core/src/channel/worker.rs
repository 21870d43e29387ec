use std::fmt;
use std::sync::mpsc::{Receiver, Sender};

use serde_json::Value;
use tracing::{debug, error, trace, warn};

use super::messages::{sniff_tag, IncomingMessage, OutgoingMessage};
use crate::config::NoiseConfig;
use crate::error::{NoiseError, Result};
use crate::query;
use crate::store::{open_store, BoxedStore};

#[derive(Debug)]
pub enum WorkerCommand {
    /// A raw message from the transport. Anything without a known `type` is dropped.
    Message(Value),
    Shutdown,
}

/// Lifecycle of one request inside the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestPhase {
    Received,
    Dispatching,
    Completed,
    Failed,
}

impl fmt::Display for RequestPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RequestPhase::Received => "received",
            RequestPhase::Dispatching => "dispatching",
            RequestPhase::Completed => "completed",
            RequestPhase::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Owns the record store and serves requests one at a time.
///
/// The store is opened on the first request that needs it and kept for the
/// worker's lifetime. If opening fails the request gets an `io` error and the
/// next request tries again.
pub struct NoiseWorker {
    config: NoiseConfig,
    store: Option<BoxedStore>,
    command_rx: Receiver<WorkerCommand>,
    response_tx: Sender<OutgoingMessage>,
}

impl NoiseWorker {
    pub fn new(
        config: NoiseConfig,
        command_rx: Receiver<WorkerCommand>,
        response_tx: Sender<OutgoingMessage>,
    ) -> Self {
        Self {
            config,
            store: None,
            command_rx,
            response_tx,
        }
    }

    pub fn run(mut self) {
        debug!(backend = ?self.config.backend, "noise worker started");

        while let Ok(command) = self.command_rx.recv() {
            match command {
                WorkerCommand::Message(raw) => {
                    let Some(response) = self.handle_message(raw) else {
                        continue;
                    };
                    if self.response_tx.send(response).is_err() {
                        warn!("response receiver dropped, stopping noise worker");
                        break;
                    }
                }
                WorkerCommand::Shutdown => {
                    debug!("noise worker shutting down");
                    break;
                }
            }
        }
    }

    /// Serve one raw message. `None` means the message was not addressed to us.
    pub fn handle_message(&mut self, raw: Value) -> Option<OutgoingMessage> {
        let tag = match sniff_tag(&raw) {
            Some(tag) if IncomingMessage::is_known_tag(tag) => tag.to_string(),
            _ => {
                trace!("ignoring message without a known type");
                return None;
            }
        };
        trace!(%tag, phase = %RequestPhase::Received, "request");

        let result = IncomingMessage::decode(&raw).and_then(|request| {
            trace!(%tag, phase = %RequestPhase::Dispatching, "request");
            self.dispatch(request)
        });

        match result {
            Ok(response) => {
                trace!(%tag, phase = %RequestPhase::Completed, response = response.tag(), "request");
                Some(response)
            }
            Err(err) => {
                match &err {
                    NoiseError::Precondition(_) | NoiseError::Io(_) => {
                        error!(%tag, phase = %RequestPhase::Failed, kind = err.kind(), "{}", err)
                    }
                    _ => warn!(%tag, phase = %RequestPhase::Failed, kind = err.kind(), "{}", err),
                }
                Some(OutgoingMessage::error(raw, &err))
            }
        }
    }

    fn dispatch(&mut self, request: IncomingMessage) -> Result<OutgoingMessage> {
        match request {
            IncomingMessage::SubmitEvent(event) => {
                let event = event.validated()?;
                self.store()?.insert(&event)?;
                debug!(datetime = %event.datetime, "logged noise event");
                Ok(OutgoingMessage::SubmitEvent(event))
            }
            IncomingMessage::GetPage { page, page_size } => {
                let store = self.store()?;
                let result = query::get_page(&**store, page, page_size)?;
                Ok(OutgoingMessage::PageResult(result))
            }
            IncomingMessage::GetDistinctValues { field } => {
                let store = self.store()?;
                let mut values: Vec<String> =
                    query::distinct_values(&**store, field)?.into_iter().collect();
                values.sort();
                Ok(OutgoingMessage::DistinctValues { field, values })
            }
            IncomingMessage::Search(request) => {
                let criteria = request.criteria()?;
                let store = self.store()?;
                let result = query::search(&**store, &criteria)?;
                Ok(OutgoingMessage::SearchResult {
                    logs: result.logs,
                    histogram: result.histogram,
                })
            }
        }
    }

    fn store(&mut self) -> Result<&mut BoxedStore> {
        if self.store.is_none() {
            let store = open_store(&self.config)?;
            debug!(backend = ?self.config.backend, "opened record store");
            self.store = Some(store);
        }
        self.store
            .as_mut()
            .ok_or_else(|| NoiseError::Io("record store is not open".to_string()))
    }
}
