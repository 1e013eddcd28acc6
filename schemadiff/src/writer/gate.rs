//! Backpressure gate: exclusive, ordered access to one sink.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};

use log::{debug, warn};
use tokio::sync::{Mutex, MutexGuard, watch};

use super::sink::{Sink, WriteOutcome};
use crate::errors::SinkError;

/// Owns one sink for the lifetime of a run.
///
/// Blocks are written in ticket order: [`Gate::reserve`] hands out tickets in
/// submission order and a ticket may only write once every earlier ticket has
/// been released. Within a ticket, chunks go through [`SinkSlot::push`], which
/// waits for the sink to drain whenever it reported saturation.
pub struct Gate<S> {
    slot: Mutex<SinkSlot<S>>,
    book: StdMutex<TurnBook>,
    serving: watch::Sender<u64>,
}

#[derive(Default)]
struct TurnBook {
    next: u64,
    finished: BTreeSet<u64>,
}

pub(crate) struct SinkSlot<S> {
    sink: S,
    saturated: bool,
    poisoned: Option<String>,
    closed: bool,
}

/// A reserved position in a gate's write order. Dropping it releases the position.
pub struct Turn<S> {
    gate: Arc<Gate<S>>,
    ticket: u64,
}

impl<S> Gate<S> {
    pub fn new(sink: S) -> Arc<Self> {
        let (serving, _) = watch::channel(0);
        Arc::new(Self {
            slot: Mutex::new(SinkSlot {
                sink,
                saturated: false,
                poisoned: None,
                closed: false,
            }),
            book: StdMutex::new(TurnBook::default()),
            serving,
        })
    }

    /// Reserve the next position in write order.
    pub fn reserve(self: &Arc<Self>) -> Turn<S> {
        let mut book = self.book.lock().unwrap_or_else(PoisonError::into_inner);
        let ticket = book.next;
        book.next += 1;
        Turn {
            gate: Arc::clone(self),
            ticket,
        }
    }

    fn release(&self, ticket: u64) {
        let mut book = self.book.lock().unwrap_or_else(PoisonError::into_inner);
        book.finished.insert(ticket);
        self.serving.send_modify(|serving| {
            while book.finished.remove(&*serving) {
                *serving += 1;
            }
        });
    }
}

impl<S: Sink> Gate<S> {
    /// Write an unticketed frame (header or footer) directly to the sink.
    pub async fn write_frame(&self, text: &str) -> Result<(), SinkError> {
        if text.is_empty() {
            return Ok(());
        }
        self.slot.lock().await.push(text).await
    }

    /// Write the footer, flush and close the sink.
    ///
    /// A poisoned sink is closed without a footer. The write that poisoned it
    /// already failed its content type, so the skip is not reported again.
    pub async fn close(&self, footer: &str) -> Result<(), SinkError> {
        let mut slot = self.slot.lock().await;
        if slot.closed {
            return Ok(());
        }
        let footer_result = if let Some(cause) = &slot.poisoned {
            debug!("skipping footer on poisoned sink: {cause}");
            Ok(())
        } else if footer.is_empty() {
            Ok(())
        } else {
            slot.push(footer).await
        };
        slot.closed = true;
        let close_result = slot.sink.close().await;
        footer_result.and(close_result)
    }
}

impl<S: Sink> Turn<S> {
    pub fn ticket(&self) -> u64 {
        self.ticket
    }

    /// Wait until every earlier ticket is released, then take the sink.
    pub(crate) async fn acquire(&self) -> Result<MutexGuard<'_, SinkSlot<S>>, SinkError> {
        let mut serving = self.gate.serving.subscribe();
        serving
            .wait_for(|now| *now == self.ticket)
            .await
            .map_err(|_| SinkError::Closed)?;
        debug!("ticket {} acquired the sink", self.ticket);
        Ok(self.gate.slot.lock().await)
    }
}

impl<S> Drop for Turn<S> {
    fn drop(&mut self) {
        self.gate.release(self.ticket);
    }
}

impl<S: Sink> SinkSlot<S> {
    /// Write one chunk, honouring saturation. Any failure poisons the sink.
    pub(crate) async fn push(&mut self, chunk: &str) -> Result<(), SinkError> {
        if let Some(cause) = &self.poisoned {
            return Err(SinkError::Poisoned { cause: cause.clone() });
        }
        if self.closed {
            return Err(SinkError::Closed);
        }
        let result = self.push_unchecked(chunk).await;
        if let Err(err) = &result {
            warn!("sink failed, rejecting further writes: {err}");
            self.poisoned = Some(err.to_string());
        }
        result
    }

    async fn push_unchecked(&mut self, chunk: &str) -> Result<(), SinkError> {
        if self.saturated {
            self.sink.drain().await?;
            self.saturated = false;
        }
        if self.sink.write(chunk)? == WriteOutcome::Pending {
            self.saturated = true;
        }
        Ok(())
    }
}
