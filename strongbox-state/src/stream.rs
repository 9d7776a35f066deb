//! Observable view over a state slot.

use crate::error::{StateError, StateResult};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::watch;

/// What a slot currently holds, as broadcast to subscribers.
#[derive(Clone, Debug)]
pub(crate) enum Snapshot {
    /// Not loaded yet. Never surfaced to subscribers.
    Pending,
    Ready(Option<Value>),
    Failed(StateError),
}

pub(crate) type Decoder<T> = Arc<dyn Fn(Value) -> StateResult<T> + Send + Sync>;

/// A subscription to one state value.
///
/// The first call to [`StateStream::next`] yields the current value; later
/// calls wait for the next change. Intermediate values may be skipped when
/// several writes land between two reads, but the latest is never lost.
/// Dropping the stream detaches the subscriber.
pub struct StateStream<T> {
    rx: watch::Receiver<Snapshot>,
    decode: Decoder<T>,
    primed: bool,
}

impl<T> StateStream<T> {
    pub(crate) fn new(rx: watch::Receiver<Snapshot>, decode: Decoder<T>) -> Self {
        Self {
            rx,
            decode,
            primed: false,
        }
    }

    /// Waits for the next emission. `None` once the source is gone.
    pub async fn next(&mut self) -> Option<StateResult<Option<T>>> {
        loop {
            if self.primed && self.rx.changed().await.is_err() {
                return None;
            }
            self.primed = true;
            let snapshot = self.rx.borrow_and_update().clone();
            match snapshot {
                Snapshot::Pending => continue,
                Snapshot::Ready(value) => return Some(self.decode(value)),
                Snapshot::Failed(err) => return Some(Err(err)),
            }
        }
    }

    /// Returns the latest value without consuming a change notification,
    /// waiting only while the slot is still loading.
    pub async fn current(&mut self) -> StateResult<Option<T>> {
        loop {
            let snapshot = self.rx.borrow().clone();
            match snapshot {
                Snapshot::Pending => {
                    self.rx.changed().await.map_err(|_| StateError::Closed)?;
                }
                Snapshot::Ready(value) => return self.decode(value),
                Snapshot::Failed(err) => return Err(err),
            }
        }
    }

    fn decode(&self, value: Option<Value>) -> StateResult<Option<T>> {
        value.map(|v| (self.decode)(v)).transpose()
    }
}
