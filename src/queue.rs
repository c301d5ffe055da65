use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures_util::FutureExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

/// Bounded in-process event channel with a single consumer task.
///
/// The handler is fixed at construction, so a queue can never exist
/// without a consumer. Messages are handled strictly in send order,
/// exactly one at a time. Delivery is at most once: a handler error or
/// panic is logged and the message is dropped, and the worker moves on
/// to the next message.
pub struct EventQueue<T> {
    name: &'static str,
    tx: mpsc::Sender<T>,
    worker: JoinHandle<()>,
}

impl<T: Send + 'static> EventQueue<T> {
    /// Spawns the consumer task. `capacity` must be at least 1; a full
    /// buffer makes `send` wait, it never discards.
    pub fn new<H, Fut>(name: &'static str, capacity: usize, handler: H) -> Self
    where
        H: Fn(T) -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send,
    {
        let (tx, mut rx) = mpsc::channel(capacity);

        let worker = tokio::spawn(async move {
            while let Some(msg) = rx.recv().await {
                match AssertUnwindSafe(handler(msg)).catch_unwind().await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        error!(queue = name, error = %e, "Handler failed, message dropped");
                    }
                    Err(panic) => {
                        error!(
                            queue = name,
                            panic = panic_message(panic.as_ref()),
                            "Handler panicked, message dropped"
                        );
                    }
                }
            }
            debug!(queue = name, "Worker stopped");
        });

        Self { name, tx, worker }
    }

    /// Queues a message for the worker, waiting while the buffer is
    /// full. Fire and forget: handling failures never surface here. If
    /// the worker is gone (only possible through runtime teardown,
    /// since `shutdown` consumes the queue) the message is dropped
    /// with a warning.
    pub async fn send(&self, msg: T) {
        if self.tx.send(msg).await.is_err() {
            warn!(queue = self.name, "Worker is gone, message dropped");
        }
    }

    /// Stops accepting new messages, lets the worker drain everything
    /// already queued, and waits for it to finish.
    pub async fn shutdown(self) {
        let Self { name, tx, worker } = self;
        drop(tx);
        if let Err(e) = worker.await {
            error!(queue = name, error = %e, "Worker did not stop cleanly");
        } else {
            debug!(queue = name, "Queue drained");
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Messages currently waiting in the buffer.
    pub fn depth(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    pub fn max_capacity(&self) -> usize {
        self.tx.max_capacity()
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}
