//! In-process fanout exchange
//!
//! Messages carry a monotonic sequence number and are shared between bound
//! queues through `Arc`. Each queue tracks its own read position, so every
//! queue sees every message published after it was bound, whatever the
//! routing key. Messages read by all queues are collected.

use super::error::{MessagingError, MessagingResult};
use super::EventPublisher;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::SystemTime;

/// A message as received by a bound queue
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub sequence: u64,
    pub exchange: String,
    pub routing_key: String,
    pub body: Vec<u8>,
    pub timestamp: SystemTime,
}

impl Delivery {
    pub fn json<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_slice(&self.body)
    }
}

#[derive(Debug, Default)]
struct ExchangeState {
    next_sequence: u64,
    messages: VecDeque<Arc<Delivery>>,
    /// Next sequence each bound queue will read
    positions: HashMap<String, u64>,
}

impl ExchangeState {
    fn collect_garbage(&mut self) -> usize {
        let Some(min_sequence) = self.positions.values().copied().min() else {
            let dropped = self.messages.len();
            self.messages.clear();
            return dropped;
        };
        let before = self.messages.len();
        self.messages.retain(|delivery| delivery.sequence >= min_sequence);
        before - self.messages.len()
    }
}

/// Fanout exchange with independently bound queues
#[derive(Debug, Clone)]
pub struct FanoutExchange {
    name: String,
    state: Arc<RwLock<ExchangeState>>,
}

fn poisoned<T>(_: T) -> MessagingError {
    MessagingError::OperationFailed {
        message: "exchange state lock poisoned".to_string(),
    }
}

impl FanoutExchange {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Arc::new(RwLock::new(ExchangeState {
                next_sequence: 1,
                ..ExchangeState::default()
            })),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn read_state(&self) -> MessagingResult<RwLockReadGuard<'_, ExchangeState>> {
        self.state.read().map_err(poisoned)
    }

    fn write_state(&self) -> MessagingResult<RwLockWriteGuard<'_, ExchangeState>> {
        self.state.write().map_err(poisoned)
    }

    /// Bind a named queue; it receives messages published from now on
    ///
    /// Binding an already bound name returns a handle to the same queue.
    pub fn bind(&self, queue: impl Into<String>) -> MessagingResult<BoundQueue> {
        let queue = queue.into();
        let mut state = self.write_state()?;
        let head = state.next_sequence;
        state.positions.entry(queue.clone()).or_insert(head);
        Ok(BoundQueue {
            name: queue,
            exchange: self.clone(),
        })
    }

    pub fn unbind(&self, queue: &str) -> MessagingResult<()> {
        let mut state = self.write_state()?;
        state.positions.remove(queue);
        state.collect_garbage();
        Ok(())
    }

    pub fn bound_queues(&self) -> MessagingResult<Vec<String>> {
        let mut names: Vec<String> = self.read_state()?.positions.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    /// Publish to every bound queue, returning the assigned sequence
    ///
    /// With no queues bound the message is dropped, as a broker drops
    /// unroutable messages.
    pub fn publish(&self, routing_key: &str, body: Vec<u8>) -> MessagingResult<u64> {
        let mut state = self.write_state()?;
        let sequence = state.next_sequence;
        state.next_sequence += 1;

        if state.positions.is_empty() {
            log::trace!("No queues bound to {}, dropping message {}", self.name, sequence);
            return Ok(sequence);
        }

        state.messages.push_back(Arc::new(Delivery {
            sequence,
            exchange: self.name.clone(),
            routing_key: routing_key.to_string(),
            body,
            timestamp: SystemTime::now(),
        }));
        Ok(sequence)
    }

    fn read_next(&self, queue: &str) -> MessagingResult<Option<Arc<Delivery>>> {
        let mut state = self.write_state()?;
        let position = *state
            .positions
            .get(queue)
            .ok_or_else(|| MessagingError::OperationFailed {
                message: format!("queue '{queue}' is not bound to {}", self.name),
            })?;

        let next = state
            .messages
            .iter()
            .find(|delivery| delivery.sequence >= position)
            .cloned();

        if let Some(delivery) = &next {
            state.positions.insert(queue.to_string(), delivery.sequence + 1);
            state.collect_garbage();
        }
        Ok(next)
    }

    fn pending(&self, queue: &str) -> MessagingResult<usize> {
        let state = self.read_state()?;
        let position = state.positions.get(queue).copied().unwrap_or(u64::MAX);
        Ok(state
            .messages
            .iter()
            .filter(|delivery| delivery.sequence >= position)
            .count())
    }

    /// Messages still held for at least one queue
    pub fn retained(&self) -> MessagingResult<usize> {
        Ok(self.read_state()?.messages.len())
    }
}

#[async_trait]
impl EventPublisher for FanoutExchange {
    fn exchange(&self) -> &str {
        &self.name
    }

    async fn publish_bytes(&self, routing_key: &str, body: Vec<u8>) -> MessagingResult<()> {
        self.publish(routing_key, body).map(|_| ())
    }
}

/// Handle to a queue bound to a [`FanoutExchange`]
#[derive(Debug, Clone)]
pub struct BoundQueue {
    name: String,
    exchange: FanoutExchange,
}

impl BoundQueue {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn read(&self) -> MessagingResult<Option<Arc<Delivery>>> {
        self.exchange.read_next(&self.name)
    }

    pub fn read_batch(&self, batch_size: usize) -> MessagingResult<Vec<Arc<Delivery>>> {
        let mut batch = Vec::with_capacity(batch_size);
        for _ in 0..batch_size {
            match self.read()? {
                Some(delivery) => batch.push(delivery),
                None => break,
            }
        }
        Ok(batch)
    }

    /// Everything currently waiting on this queue
    pub fn drain(&self) -> MessagingResult<Vec<Arc<Delivery>>> {
        let pending = self.len()?;
        self.read_batch(pending)
    }

    pub fn len(&self) -> MessagingResult<usize> {
        self.exchange.pending(&self.name)
    }

    pub fn is_empty(&self) -> MessagingResult<bool> {
        Ok(self.len()? == 0)
    }
}
