//! Recording broker writer for tests/dev.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::producer::{BrokerWriter, ProducerError};

/// Collects written (key, payload) pairs instead of talking to a broker.
#[derive(Debug, Default)]
pub struct InMemoryBrokerWriter {
    written: Mutex<Vec<(Vec<u8>, Vec<u8>)>>,
}

impl InMemoryBrokerWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn written(&self) -> Vec<(Vec<u8>, Vec<u8>)> {
        self.written.lock().expect("writer mutex poisoned").clone()
    }

    pub fn len(&self) -> usize {
        self.written.lock().expect("writer mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl BrokerWriter for InMemoryBrokerWriter {
    async fn write(&self, key: &[u8], payload: Vec<u8>) -> Result<(), ProducerError> {
        self.written
            .lock()
            .expect("writer mutex poisoned")
            .push((key.to_vec(), payload));
        Ok(())
    }
}
