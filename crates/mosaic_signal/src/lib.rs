//! # mosaic_signal - Typed Signal Channels
//!
//! Publish/subscribe plumbing used by the editor to decouple mutation from
//! reaction:
//! - One [`Channel`] per named signal, each carrying a typed payload
//! - Priority-based delivery order
//! - Counted suppression through RAII [`SuppressGuard`]s, so a batch of
//!   mutations can be announced once at the end
//!
//! Dispatch is synchronous: handlers run to completion inside
//! [`Channel::dispatch`].

use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

/// Handler priority
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Priority {
    Low = 0,
    #[default]
    Normal = 1,
    High = 2,
    Critical = 3,
}

/// Subscriber ID, unique within one channel
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriberId(pub u64);

/// Signal handler function type
pub type Handler<P> = Box<dyn Fn(&P) + Send + Sync>;

/// A named signal with a typed payload.
pub struct Channel<P> {
    name: &'static str,
    /// Handlers, highest priority first
    handlers: Vec<(SubscriberId, Priority, Handler<P>)>,
    /// Number of live suppression guards
    suppressed: Arc<AtomicUsize>,
    next_subscriber_id: u64,
    /// Dispatches that reached the handlers
    delivered: AtomicU64,
}

impl<P> Channel<P> {
    /// Create a new channel
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            handlers: Vec::new(),
            suppressed: Arc::new(AtomicUsize::new(0)),
            next_subscriber_id: 1,
            delivered: AtomicU64::new(0),
        }
    }

    /// Channel name
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Subscribe with normal priority
    pub fn subscribe<F>(&mut self, handler: F) -> SubscriberId
    where
        F: Fn(&P) + Send + Sync + 'static,
    {
        self.subscribe_with_priority(handler, Priority::Normal)
    }

    /// Subscribe with priority
    pub fn subscribe_with_priority<F>(&mut self, handler: F, priority: Priority) -> SubscriberId
    where
        F: Fn(&P) + Send + Sync + 'static,
    {
        let id = SubscriberId(self.next_subscriber_id);
        self.next_subscriber_id += 1;

        self.handlers.push((id, priority, Box::new(handler)));
        // Stable sort keeps subscription order within one priority
        self.handlers.sort_by(|a, b| b.1.cmp(&a.1));

        id
    }

    /// Unsubscribe. Returns false if the id was unknown.
    pub fn unsubscribe(&mut self, id: SubscriberId) -> bool {
        let before = self.handlers.len();
        self.handlers.retain(|(sub_id, _, _)| *sub_id != id);
        self.handlers.len() != before
    }

    /// Remove every handler
    pub fn clear(&mut self) {
        self.handlers.clear();
    }

    /// Number of handlers
    pub fn subscriber_count(&self) -> usize {
        self.handlers.len()
    }

    /// Whether dispatches currently reach the handlers
    pub fn is_active(&self) -> bool {
        self.suppressed.load(Ordering::Acquire) == 0
    }

    /// Deliver a payload to every handler.
    ///
    /// Returns false when the channel is suppressed and nothing was delivered.
    pub fn dispatch(&self, payload: &P) -> bool {
        if !self.is_active() {
            log::trace!("signal '{}' suppressed", self.name);
            return false;
        }

        for (_, _, handler) in &self.handlers {
            handler(payload);
        }
        self.delivered.fetch_add(1, Ordering::Relaxed);
        true
    }

    /// Suppress dispatch until the returned guard is dropped.
    ///
    /// Guards nest: the channel is active again once the last one drops.
    pub fn suppress(&self) -> SuppressGuard {
        self.suppressed.fetch_add(1, Ordering::AcqRel);
        SuppressGuard {
            counter: Arc::clone(&self.suppressed),
        }
    }

    /// Total number of delivered dispatches
    pub fn delivered_count(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }
}

impl Channel<()> {
    /// Dispatch a payload-less signal
    pub fn notify(&self) -> bool {
        self.dispatch(&())
    }
}

impl<P> fmt::Debug for Channel<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("name", &self.name)
            .field("subscribers", &self.handlers.len())
            .field("active", &self.is_active())
            .finish()
    }
}

/// Keeps a channel suppressed while alive.
#[must_use = "the channel is re-enabled as soon as the guard is dropped"]
#[derive(Debug)]
pub struct SuppressGuard {
    counter: Arc<AtomicUsize>,
}

impl Drop for SuppressGuard {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Prelude
pub mod prelude {
    pub use crate::{Channel, Handler, Priority, SubscriberId, SuppressGuard};
}
