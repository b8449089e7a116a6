//! Owned signal subscriptions
//!
//! A [`Subscription`] forwards a signal stream into the registry's event
//! queue from a spawned task. Dropping the subscription aborts the task,
//! which drops the stream and disconnects from the signal.

use std::future::Future;

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;

use crate::transport::EventStream;

/// Guard over a forwarding task; aborts it on drop
#[derive(Debug)]
pub struct Subscription {
    label: &'static str,
    handle: AbortHandle,
}

impl Subscription {
    /// Forward every item of `stream` into `tx`, wrapped by `wrap`
    pub fn forward<T, E, F>(
        label: &'static str,
        mut stream: EventStream<T>,
        tx: mpsc::UnboundedSender<E>,
        wrap: F,
    ) -> Self
    where
        T: Send + 'static,
        E: Send + 'static,
        F: Fn(T) -> E + Send + 'static,
    {
        let task = tokio::spawn(async move {
            while let Some(item) = stream.next().await {
                if tx.send(wrap(item)).is_err() {
                    break;
                }
            }
        });
        Self {
            label,
            handle: task.abort_handle(),
        }
    }

    /// Run `future` once and forward its output into `tx`
    pub fn once<Fut, E>(label: &'static str, future: Fut, tx: mpsc::UnboundedSender<E>) -> Self
    where
        Fut: Future<Output = E> + Send + 'static,
        E: Send + 'static,
    {
        let task = tokio::spawn(async move {
            let _ = tx.send(future.await);
        });
        Self {
            label,
            handle: task.abort_handle(),
        }
    }

    /// What this subscription listens to
    pub fn label(&self) -> &'static str {
        self.label
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
