use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::JoinHandle;

use anyhow::{Context, Result};
use serde_json::Value;

use crate::channel::{IncomingMessage, NoiseWorker, OutgoingMessage, WorkerCommand};
use crate::config::NoiseConfig;

/// Cloneable sending side of the command channel.
#[derive(Clone)]
pub struct NoiseHandle {
    command_tx: Sender<WorkerCommand>,
}

impl NoiseHandle {
    pub(crate) fn new(command_tx: Sender<WorkerCommand>) -> Self {
        Self { command_tx }
    }

    /// Forward a raw transport message. Messages the worker does not recognize
    /// get no response.
    pub fn send(&self, message: Value) -> Result<(), mpsc::SendError<WorkerCommand>> {
        self.command_tx.send(WorkerCommand::Message(message))
    }

    pub fn send_request(&self, request: &IncomingMessage) -> Result<()> {
        self.send(request.to_value())
            .map_err(|_| anyhow::anyhow!("noise worker has stopped"))
    }
}

/// Runs a [`NoiseWorker`] on its own thread.
///
/// Responses come back on the receiver from [`NoiseRuntime::take_response_rx`]
/// in completion order; callers match them to requests by content.
pub struct NoiseRuntime {
    handle: NoiseHandle,
    response_rx: Option<Receiver<OutgoingMessage>>,
    worker_handle: Option<JoinHandle<()>>,
}

impl NoiseRuntime {
    pub fn new(config: NoiseConfig) -> Result<Self> {
        let (command_tx, command_rx) = mpsc::channel::<WorkerCommand>();
        let (response_tx, response_rx) = mpsc::channel::<OutgoingMessage>();

        let worker = NoiseWorker::new(config, command_rx, response_tx);
        let worker_handle = std::thread::Builder::new()
            .name("noise-worker".to_string())
            .spawn(move || worker.run())
            .context("failed to spawn noise worker thread")?;

        Ok(Self {
            handle: NoiseHandle::new(command_tx),
            response_rx: Some(response_rx),
            worker_handle: Some(worker_handle),
        })
    }

    pub fn handle(&self) -> NoiseHandle {
        self.handle.clone()
    }

    pub fn take_response_rx(&mut self) -> Option<Receiver<OutgoingMessage>> {
        self.response_rx.take()
    }

    pub fn shutdown(&mut self) {
        let _ = self.handle.command_tx.send(WorkerCommand::Shutdown);
        if let Some(worker_handle) = self.worker_handle.take() {
            let _ = worker_handle.join();
        }
    }
}

impl Drop for NoiseRuntime {
    fn drop(&mut self) {
        self.shutdown();
    }
}
