use std::sync::Arc;

use parking_lot::Mutex;
use tokio::{sync::oneshot, task};

use super::envelope::EventEnvelope;
use super::sink::{EventSink, StdOutSink};

/// Fans envelopes out from the tracer to multiple sinks.
///
/// The bus owns a flume channel; the tracer keeps a cloned sender and a
/// background listener task broadcasts each envelope to every registered
/// sink.
pub struct EventBus {
    sinks: Arc<Mutex<Vec<Box<dyn EventSink>>>>,
    channel: (flume::Sender<EventEnvelope>, flume::Receiver<EventEnvelope>),
    listener: Arc<Mutex<Option<ListenerState>>>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_sink(StdOutSink::default())
    }
}

impl EventBus {
    /// Create a bus with a single sink.
    pub fn with_sink<T>(sink: T) -> Self
    where
        T: EventSink + 'static,
    {
        Self::with_sinks(vec![Box::new(sink)])
    }

    /// Create a bus with multiple sinks.
    #[must_use]
    pub fn with_sinks(sinks: Vec<Box<dyn EventSink>>) -> Self {
        Self {
            sinks: Arc::new(Mutex::new(sinks)),
            channel: flume::unbounded(),
            listener: Arc::new(Mutex::new(None)),
        }
    }

    /// Dynamically add a sink (useful for per-request streaming).
    pub fn add_sink<T: EventSink + 'static>(&self, sink: T) {
        self.sinks.lock().push(Box::new(sink));
    }

    /// Get a clone of the sender side so producers can emit envelopes.
    #[must_use]
    pub fn sender(&self) -> flume::Sender<EventEnvelope> {
        self.channel.0.clone()
    }

    /// Spawn a background task that listens for envelopes and broadcasts to
    /// all sinks. Idempotent: calling multiple times has no effect.
    pub fn listen(&self) {
        let mut guard = self.listener.lock();
        if guard.is_some() {
            return;
        }

        let receiver = self.channel.1.clone();
        let sinks = self.sinks.clone();
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();

        let handle = task::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    recv = receiver.recv_async() => match recv {
                        Err(_) => break,
                        Ok(envelope) => {
                            let mut sinks_guard = sinks.lock();
                            for sink in sinks_guard.iter_mut() {
                                if let Err(e) = sink.handle(&envelope) {
                                    tracing::warn!(error = %e, "event sink error");
                                }
                            }
                        }
                    }
                }
            }
        });

        *guard = Some(ListenerState {
            shutdown_tx,
            handle,
        });
    }

    /// Stop the background listener task, draining nothing further.
    pub async fn stop_listener(&self) {
        let state = self.listener.lock().take();
        if let Some(state) = state {
            let _ = state.shutdown_tx.send(());
            let _ = state.handle.await;
        }
    }
}

impl Drop for EventBus {
    fn drop(&mut self) {
        if let Some(state) = self.listener.lock().take() {
            let _ = state.shutdown_tx.send(());
            state.handle.abort();
        }
    }
}

struct ListenerState {
    shutdown_tx: oneshot::Sender<()>,
    handle: task::JoinHandle<()>,
}
