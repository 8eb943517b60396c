//! Port fakes shared by the use case tests.

use crate::cancellation::CancellationController;
use crate::ports::chat_gateway::{ChatGateway, DeltaResult, DeltaStream, GatewayError};
use crate::ports::storage::{StorageError, StoragePort};
use async_trait::async_trait;
use futures::stream;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use streamchat_domain::{ChatMessage, ChatParams, StreamDelta};

#[derive(Default)]
pub(crate) struct MockStorage {
    values: Mutex<HashMap<String, Value>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl MockStorage {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn failure(operation: &str) -> Box<dyn std::error::Error + Send + Sync> {
        format!("{operation} refused by test storage").into()
    }

    fn check_write(&self, operation: &str) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Write {
                operation: operation.to_string(),
                source: Self::failure(operation),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl StoragePort for MockStorage {
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StorageError::Read {
                key: key.to_string(),
                source: Self::failure("get"),
            });
        }
        Ok(self.values.lock().unwrap().get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StorageError> {
        self.check_write("set")?;
        self.values.lock().unwrap().insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.check_write("remove")?;
        self.values.lock().unwrap().remove(key);
        Ok(())
    }

    async fn clear(&self) -> Result<(), StorageError> {
        self.check_write("clear")?;
        self.values.lock().unwrap().clear();
        Ok(())
    }
}

/// Gateway that replays one scripted response per `open_stream` call.
pub(crate) struct MockGateway {
    scripts: Mutex<VecDeque<Vec<DeltaResult>>>,
    opened: Mutex<Vec<Vec<ChatMessage>>>,
    stops: AtomicUsize,
    controller: Arc<CancellationController>,
}

impl MockGateway {
    pub(crate) fn new() -> Self {
        Self {
            scripts: Mutex::new(VecDeque::new()),
            opened: Mutex::new(Vec::new()),
            stops: AtomicUsize::new(0),
            controller: Arc::new(CancellationController::new()),
        }
    }

    pub(crate) fn with_script(self, script: Vec<DeltaResult>) -> Self {
        self.scripts.lock().unwrap().push_back(script);
        self
    }

    pub(crate) fn replying(chunks: &[&str]) -> Self {
        let mut script: Vec<DeltaResult> =
            chunks.iter().map(|c| Ok(StreamDelta::text(*c))).collect();
        script.push(Ok(StreamDelta::finished()));
        Self::new().with_script(script)
    }

    pub(crate) fn failing(error: GatewayError) -> Self {
        Self::new().with_script(vec![Err(error)])
    }

    pub(crate) fn opened(&self) -> Vec<Vec<ChatMessage>> {
        self.opened.lock().unwrap().clone()
    }

    pub(crate) fn stop_count(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

impl ChatGateway for MockGateway {
    fn open_stream(&self, messages: &[ChatMessage], _params: &ChatParams) -> DeltaStream {
        self.opened.lock().unwrap().push(messages.to_vec());
        let ticket = self.controller.begin();
        let token = ticket.token().clone();
        let script = self.scripts.lock().unwrap().pop_front().unwrap_or_default();
        let items = stream::iter(script.into_iter().map(move |item| {
            let _ = &ticket;
            item
        }));
        DeltaStream::new(items, token)
    }

    fn stop_stream(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
        self.controller.cancel();
    }

    fn is_streaming(&self) -> bool {
        self.controller.is_active()
    }
}
