//! 인메모리 브로커
//!
//! 큐마다 unbounded mpsc 채널 하나를 두고, 수신 측을 `tokio::sync::Mutex`로
//! 감싸 여러 소비자가 공유합니다. 메시지 하나는 정확히 한 소비자에게만
//! 전달됩니다.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use logrelay_core::broker::{BoxFuture, Broker, Consumer, Delivery};
use logrelay_core::error::BrokerError;
use tokio::sync::mpsc;

#[derive(Debug)]
struct Envelope {
    id: u64,
    payload: Bytes,
    attempt: u32,
}

#[derive(Debug)]
struct MemoryQueue {
    name: String,
    tx: Mutex<Option<mpsc::UnboundedSender<Envelope>>>,
    rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<Envelope>>,
    next_id: AtomicU64,
    pending: AtomicUsize,
    dead: Mutex<Vec<Delivery>>,
}

impl MemoryQueue {
    fn new(name: &str) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            name: name.to_owned(),
            tx: Mutex::new(Some(tx)),
            rx: tokio::sync::Mutex::new(rx),
            next_id: AtomicU64::new(1),
            pending: AtomicUsize::new(0),
            dead: Mutex::new(Vec::new()),
        }
    }

    fn send(&self, payload: Bytes, attempt: u32) -> Result<(), BrokerError> {
        let guard = self
            .tx
            .lock()
            .map_err(|_| BrokerError::Connection(format!("queue '{}' lock poisoned", self.name)))?;
        let Some(tx) = guard.as_ref() else {
            return Err(BrokerError::Closed(self.name.clone()));
        };
        let envelope = Envelope {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            payload,
            attempt,
        };
        // 소비자가 send 직후 바로 받아 감소시킬 수 있으므로 먼저 증가
        self.pending.fetch_add(1, Ordering::Relaxed);
        // 수신 측은 큐가 살아 있는 동안 유지되므로 send는 close 이후에만 실패
        tx.send(envelope).map_err(|_| {
            self.pending.fetch_sub(1, Ordering::Relaxed);
            BrokerError::Closed(self.name.clone())
        })
    }
}

/// 인메모리 브로커
#[derive(Debug, Default)]
pub struct MemoryBroker {
    queues: Mutex<HashMap<String, Arc<MemoryQueue>>>,
}

impl MemoryBroker {
    /// 빈 브로커를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    fn queue(&self, name: &str) -> Result<Arc<MemoryQueue>, BrokerError> {
        let mut queues = self
            .queues
            .lock()
            .map_err(|_| BrokerError::Connection("memory broker lock poisoned".to_owned()))?;
        Ok(Arc::clone(
            queues
                .entry(name.to_owned())
                .or_insert_with(|| Arc::new(MemoryQueue::new(name))),
        ))
    }

    /// 큐를 닫습니다.
    ///
    /// 이후 발행은 실패하며, 소비자는 남은 메시지를 모두 받은 뒤 `None`을 받습니다.
    pub fn close(&self, queue: &str) {
        let Ok(q) = self.queue(queue) else {
            return;
        };
        if let Ok(mut tx) = q.tx.lock() {
            tx.take();
        }
    }

    /// 아직 전달되지 않은 메시지 수
    pub fn pending(&self, queue: &str) -> usize {
        self.queue(queue)
            .map(|q| q.pending.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// dead letter로 보내진 전달 목록
    pub fn dead_letters(&self, queue: &str) -> Vec<Delivery> {
        self.queue(queue)
            .ok()
            .and_then(|q| q.dead.lock().ok().map(|dead| dead.clone()))
            .unwrap_or_default()
    }
}

impl Broker for MemoryBroker {
    fn name(&self) -> &str {
        "memory"
    }

    fn publish<'a>(&'a self, queue: &'a str, payload: Bytes) -> BoxFuture<'a, Result<(), BrokerError>> {
        Box::pin(async move { self.queue(queue)?.send(payload, 1) })
    }

    fn consume<'a>(&'a self, queue: &'a str) -> BoxFuture<'a, Result<Box<dyn Consumer>, BrokerError>> {
        Box::pin(async move {
            let queue = self.queue(queue)?;
            Ok(Box::new(MemoryConsumer { queue }) as Box<dyn Consumer>)
        })
    }
}

/// 인메모리 큐 소비자
#[derive(Debug)]
pub struct MemoryConsumer {
    queue: Arc<MemoryQueue>,
}

impl Consumer for MemoryConsumer {
    fn queue(&self) -> &str {
        &self.queue.name
    }

    fn recv(&mut self) -> BoxFuture<'_, Result<Option<Delivery>, BrokerError>> {
        Box::pin(async move {
            let mut rx = self.queue.rx.lock().await;
            let Some(envelope) = rx.recv().await else {
                return Ok(None);
            };
            self.queue.pending.fetch_sub(1, Ordering::Relaxed);
            Ok(Some(Delivery {
                queue: self.queue.name.clone(),
                payload: envelope.payload,
                attempt: envelope.attempt,
                tag: envelope.id.to_string(),
            }))
        })
    }

    fn ack(&mut self, _delivery: Delivery) -> BoxFuture<'_, Result<(), BrokerError>> {
        // 수신 시점에 이미 채널에서 제거됨
        Box::pin(async { Ok(()) })
    }

    fn reject(&mut self, delivery: Delivery, requeue: bool) -> BoxFuture<'_, Result<(), BrokerError>> {
        Box::pin(async move {
            if requeue {
                return self
                    .queue
                    .send(delivery.payload, delivery.attempt.saturating_add(1));
            }
            let mut dead = self.queue.dead.lock().map_err(|_| {
                BrokerError::Connection(format!("queue '{}' lock poisoned", self.queue.name))
            })?;
            dead.push(delivery);
            Ok(())
        })
    }
}
